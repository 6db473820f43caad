//! Constraints onto opaque host geometry.

use relax_core::{Constraint, DeltaAccumulator, Energy, ParticleSystem};
use relax_types::{ConfigError, Target, Weight};

use super::{ClosestPoint, TargetMap};

/// Pulls each mapped particle onto host-supplied geometry through the
/// [`ClosestPoint`] trait.
///
/// This is the seam for CAD curves, surfaces, and meshes: the constraint
/// knows nothing about the geometry beyond its closest-point query. Pairs
/// whose query returns `None` (no unique closest point) are skipped for the
/// step.
pub struct OnGeometry {
    map: TargetMap<Box<dyn ClosestPoint>>,
}

impl OnGeometry {
    /// Map `indices[k]` to `targets[target_indices[k]]`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for mismatched arrays or a target index
    /// outside `targets`.
    pub fn new(
        indices: Vec<usize>,
        target_indices: Vec<usize>,
        targets: Vec<Target<Box<dyn ClosestPoint>>>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            map: TargetMap::new(indices, target_indices, targets)?,
        })
    }

    /// Constrain many particles onto one shared piece of geometry.
    #[must_use]
    pub fn uniform(indices: Vec<usize>, geometry: Box<dyn ClosestPoint>, weight: Weight) -> Self {
        Self {
            map: TargetMap::uniform(indices, Target::new(geometry, weight)),
        }
    }
}

impl std::fmt::Debug for OnGeometry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnGeometry")
            .field("particles", &self.map.indices().len())
            .finish_non_exhaustive()
    }
}

impl Constraint for OnGeometry {
    fn initialize(&mut self, system: &ParticleSystem) -> Result<(), ConfigError> {
        self.map.validate(system)
    }

    fn calculate(&mut self, system: &ParticleSystem) {
        self.map.calculate_with(system, |position, geometry| {
            geometry
                .closest_point(position)
                .map(|surface| surface.point - position)
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
