//! Segment-length equalization along polylines.

use relax_core::{Constraint, DeltaAccumulator, Energy, ParticleSystem};
use relax_types::{ConfigError, Weight};

use crate::element::{Delta, ElementBatch};

/// Equalizes consecutive segment lengths within each element's polyline.
///
/// Each element is a chain of at least 3 particle indices; its `count - 1`
/// segments are corrected toward their common mean length, splitting each
/// segment's correction evenly between its endpoints. Interior particles
/// belong to two segments and receive the sum of both corrections.
///
/// Chains shorter than 3 points have a single segment (or none) and are
/// trivially equalized; they contribute nothing. A chain containing a
/// zero-length segment has no defined correction direction there and is
/// skipped whole.
#[derive(Debug)]
pub struct EqualLength {
    batch: ElementBatch,
}

impl EqualLength {
    /// Create from polyline chains, one element per chain.
    #[must_use]
    pub fn new<G: AsRef<[usize]>>(chains: impl IntoIterator<Item = G>, weight: Weight) -> Self {
        Self {
            batch: ElementBatch::from_groups(chains, weight),
        }
    }

    /// Enable chunked parallel evaluation of the chains.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.batch.set_parallel(parallel);
        self
    }
}

impl Constraint for EqualLength {
    fn initialize(&mut self, system: &ParticleSystem) -> Result<(), ConfigError> {
        self.batch.validate(system)
    }

    fn calculate(&mut self, system: &ParticleSystem) {
        let positions = system.positions();

        self.batch.calculate_each(|_, element, indices, deltas| {
            if indices.len() < 3 {
                return;
            }

            let segment_count = indices.len() - 1;
            let mut total = 0.0;
            for pair in indices.windows(2) {
                let length = (positions[pair[1]].current - positions[pair[0]].current).norm();
                if length < 1e-12 {
                    return;
                }
                total += length;
            }
            let mean = total / segment_count as f64;

            let weight = element.weight().value();
            for k in 0..segment_count {
                let separation =
                    positions[indices[k + 1]].current - positions[indices[k]].current;
                let length = separation.norm();
                let correction = separation * (1.0 - mean / length) * 0.5;

                deltas[k] = Delta::new(deltas[k].correction + correction, weight);
                deltas[k + 1] = Delta::new(deltas[k + 1].correction - correction, weight);
            }
        });
    }

    fn apply(&self, _system: &mut ParticleSystem, accumulator: &mut DeltaAccumulator) {
        self.batch.apply(accumulator);
    }

    fn energy(&self) -> Energy {
        self.batch.energy()
    }

    fn particles(&self) -> &[usize] {
        self.batch.indices()
    }

    fn is_parallel(&self) -> bool {
        self.batch.parallel()
    }
}
