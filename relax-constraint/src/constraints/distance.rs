//! Pairwise distance (spring) constraints.

use relax_core::{Constraint, DeltaAccumulator, Energy, ParticleSystem};
use relax_types::{ConfigError, Weight};

use crate::element::{Delta, ElementBatch};

/// How rest lengths are determined at initialize time.
#[derive(Debug, Clone)]
enum RestLength {
    /// Capture each pair's separation when `initialize` runs.
    FromPositions,
    /// One shared rest length for every pair.
    Uniform(f64),
    /// Explicit rest length per pair.
    PerPair(Vec<f64>),
}

/// Batched distance constraints: many independent springs in one pass.
///
/// Each element is a particle pair corrected toward its rest length, with
/// the correction split between the two particles in inverse proportion to
/// their masses: for inverse masses `w0, w1` and separation error `d`,
/// particle 0 receives `d·w0/(w0+w1)` and particle 1 receives
/// `-d·w1/(w0+w1)`. A fixed particle (`w == 0`) therefore absorbs nothing.
///
/// Degenerate pairs contribute nothing: coincident particles have no
/// defined correction direction, and a pair of two fixed particles has
/// nowhere to put the correction.
#[derive(Debug)]
pub struct Distance {
    batch: ElementBatch,
    rest: RestLength,
    rest_lengths: Vec<f64>,
}

impl Distance {
    /// Springs that capture their rest lengths from the particle positions
    /// at initialize time.
    #[must_use]
    pub fn new(pairs: Vec<[usize; 2]>, weight: Weight) -> Self {
        Self {
            batch: ElementBatch::from_groups(pairs, weight),
            rest: RestLength::FromPositions,
            rest_lengths: Vec::new(),
        }
    }

    /// Springs sharing one explicit rest length.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidLength`] for a negative or non-finite
    /// rest length.
    pub fn with_rest_length(
        pairs: Vec<[usize; 2]>,
        rest_length: f64,
        weight: Weight,
    ) -> Result<Self, ConfigError> {
        if !(rest_length.is_finite() && rest_length >= 0.0) {
            return Err(ConfigError::invalid_length("rest length", rest_length));
        }
        Ok(Self {
            batch: ElementBatch::from_groups(pairs, weight),
            rest: RestLength::Uniform(rest_length),
            rest_lengths: Vec::new(),
        })
    }

    /// Springs with an explicit rest length per pair.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MismatchedArrays`] when the lengths array does
    /// not pair up with the pairs, or [`ConfigError::InvalidLength`] for a
    /// negative or non-finite entry.
    pub fn with_rest_lengths(
        pairs: Vec<[usize; 2]>,
        rest_lengths: Vec<f64>,
        weight: Weight,
    ) -> Result<Self, ConfigError> {
        if pairs.len() != rest_lengths.len() {
            return Err(ConfigError::mismatched_arrays(
                pairs.len(),
                rest_lengths.len(),
                "rest lengths",
            ));
        }
        for &length in &rest_lengths {
            if !(length.is_finite() && length >= 0.0) {
                return Err(ConfigError::invalid_length("rest length", length));
            }
        }
        Ok(Self {
            batch: ElementBatch::from_groups(pairs, weight),
            rest: RestLength::PerPair(rest_lengths),
            rest_lengths: Vec::new(),
        })
    }

    /// Enable chunked parallel evaluation of the pairs.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.batch.set_parallel(parallel);
        self
    }

    /// The resolved rest lengths (empty before `initialize`).
    #[must_use]
    pub fn rest_lengths(&self) -> &[f64] {
        &self.rest_lengths
    }
}

impl Constraint for Distance {
    fn initialize(&mut self, system: &ParticleSystem) -> Result<(), ConfigError> {
        self.batch.validate(system)?;

        self.rest_lengths = match &self.rest {
            RestLength::FromPositions => {
                let positions = system.positions();
                self.batch
                    .elements()
                    .iter()
                    .map(|element| {
                        let indices = &self.batch.indices()[element.range()];
                        (positions[indices[1]].current - positions[indices[0]].current).norm()
                    })
                    .collect()
            }
            RestLength::Uniform(length) => vec![*length; self.batch.elements().len()],
            RestLength::PerPair(lengths) => lengths.clone(),
        };
        Ok(())
    }

    fn calculate(&mut self, system: &ParticleSystem) {
        let positions = system.positions();
        let rest_lengths = &self.rest_lengths;

        self.batch.calculate_each(|ordinal, element, indices, deltas| {
            let Some(&rest) = rest_lengths.get(ordinal) else {
                return;
            };
            let i0 = indices[0];
            let i1 = indices[1];
            if i0 == i1 {
                return;
            }

            let w0 = positions[i0].inverse_mass;
            let w1 = positions[i1].inverse_mass;
            let w_sum = w0 + w1;
            if w_sum <= 0.0 {
                return;
            }

            let separation = positions[i1].current - positions[i0].current;
            let length = separation.norm();
            if length < 1e-12 {
                // Direction undefined; skip rather than invent one.
                return;
            }

            let correction = separation * (1.0 - rest / length);
            let weight = element.weight().value();
            deltas[0] = Delta::new(correction * (w0 / w_sum), weight);
            deltas[1] = Delta::new(-correction * (w1 / w_sum), weight);
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
