//! Containment constraints inside axis-aligned bounds.

use relax_core::{Constraint, DeltaAccumulator, Energy, ParticleSystem};
use relax_types::{Bounds, ConfigError, Target, Weight};

use super::TargetMap;

/// Clamps each mapped particle back inside its target bounds.
///
/// Particles already inside contribute nothing - they neither move nor
/// dilute corrections other constraints submit for the same particle.
#[derive(Debug)]
pub struct InsideBounds {
    map: TargetMap<Bounds>,
}

impl InsideBounds {
    /// Map `indices[k]` to `targets[target_indices[k]]`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for mismatched arrays or a target index
    /// outside `targets`.
    pub fn new(
        indices: Vec<usize>,
        target_indices: Vec<usize>,
        targets: Vec<Target<Bounds>>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            map: TargetMap::new(indices, target_indices, targets)?,
        })
    }

    /// Keep many particles inside one shared box.
    #[must_use]
    pub fn uniform(indices: Vec<usize>, bounds: Bounds, weight: Weight) -> Self {
        Self {
            map: TargetMap::uniform(indices, Target::new(bounds, weight)),
        }
    }
}

impl Constraint for InsideBounds {
    fn initialize(&mut self, system: &ParticleSystem) -> Result<(), ConfigError> {
        self.map.validate(system)
    }

    fn calculate(&mut self, system: &ParticleSystem) {
        self.map.calculate_with(system, |position, bounds| {
            if bounds.contains(position) {
                None
            } else {
                Some(bounds.clamp(position) - position)
            }
        });
    }

    fn apply(&self, _system: &mut ParticleSystem, accumulator: &mut DeltaAccumulator) {
        self.map.apply(accumulator);
    }

    fn energy(&self) -> Energy {
        self.map.energy()
    }

    fn particles(&self) -> &[usize] {
        self.map.indices()
    }
}
