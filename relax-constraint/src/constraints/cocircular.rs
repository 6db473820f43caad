//! Cocircularity constraints.

use relax_core::fit::fit_circle;
use relax_core::{Constraint, DeltaAccumulator, Energy, ParticleSystem};
use relax_types::{ConfigError, Weight};

use crate::element::{Delta, ElementBatch};

/// Pulls each element's particles onto their best-fit circle.
///
/// The circle is refit on every calculate pass; each particle moves toward
/// its closest point on the fit. Groups with fewer than 3 points or with a
/// degenerate fit (collinear/coincident points) contribute nothing, and a
/// particle sitting on the circle's axis - where every circle point is
/// equidistant - is skipped individually.
#[derive(Debug)]
pub struct Cocircular {
    batch: ElementBatch,
}

impl Cocircular {
    /// Create from particle groups, one element per group.
    #[must_use]
    pub fn new<G: AsRef<[usize]>>(groups: impl IntoIterator<Item = G>, weight: Weight) -> Self {
        Self {
            batch: ElementBatch::from_groups(groups, weight),
        }
    }

    /// Enable chunked parallel evaluation of the groups.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.batch.set_parallel(parallel);
        self
    }
}

impl Constraint for Cocircular {
    fn initialize(&mut self, system: &ParticleSystem) -> Result<(), ConfigError> {
        self.batch.validate(system)
    }

    fn calculate(&mut self, system: &ParticleSystem) {
        let positions = system.positions();

        self.batch.calculate_each(|_, element, indices, deltas| {
            if indices.len() < 3 {
                return;
            }
            let points: Vec<_> = indices.iter().map(|&i| positions[i].current).collect();
            let Some(circle) = fit_circle(&points) else {
                return;
            };

            let weight = element.weight().value();
            for (local, point) in points.iter().enumerate() {
                if let Some(closest) = circle.closest_point(point) {
                    deltas[local] = Delta::new(closest - point, weight);
                }
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
