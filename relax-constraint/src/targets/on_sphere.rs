//! Constraints onto fixed spheres.

use relax_core::{Constraint, DeltaAccumulator, Energy, ParticleSystem};
use relax_types::{ConfigError, Sphere, Target, Weight};

use super::TargetMap;

/// Pulls each mapped particle radially onto its target sphere's surface.
///
/// A particle coinciding with the sphere center has no unique closest point
/// and is skipped for the step.
#[derive(Debug)]
pub struct OnSphere {
    map: TargetMap<Sphere>,
}

impl OnSphere {
    /// Map `indices[k]` to `targets[target_indices[k]]`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for mismatched arrays or a target index
    /// outside `targets`.
    pub fn new(
        indices: Vec<usize>,
        target_indices: Vec<usize>,
        targets: Vec<Target<Sphere>>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            map: TargetMap::new(indices, target_indices, targets)?,
        })
    }

    /// Constrain many particles onto one shared sphere.
    #[must_use]
    pub fn uniform(indices: Vec<usize>, sphere: Sphere, weight: Weight) -> Self {
        Self {
            map: TargetMap::uniform(indices, Target::new(sphere, weight)),
        }
    }
}

impl Constraint for OnSphere {
    fn initialize(&mut self, system: &ParticleSystem) -> Result<(), ConfigError> {
        self.map.validate(system)
    }

    fn calculate(&mut self, system: &ParticleSystem) {
        self.map.calculate_with(system, |position, sphere| {
            sphere.closest_point(position).map(|closest| closest - position)
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

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_radial_correction() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::new(4.0, 0.0, 0.0), 1.0).unwrap();
        system.add_particle(Point3::new(0.5, 0.0, 0.0), 1.0).unwrap();

        let sphere = Sphere::new(Point3::origin(), 2.0).unwrap();
        let mut constraint = OnSphere::uniform(vec![0, 1], sphere, Weight::ONE);
        constraint.initialize(&system).unwrap();
        constraint.calculate(&system);

        let deltas = constraint.map.deltas();
        // Outside point moves inward, inside point moves outward.
        assert_relative_eq!(deltas[0].correction.x, -2.0, epsilon = 1e-12);
        assert_relative_eq!(deltas[1].correction.x, 1.5, epsilon = 1e-12);
    }

    #[test]
    fn test_center_point_is_skipped() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::origin(), 1.0).unwrap();

        let sphere = Sphere::new(Point3::origin(), 2.0).unwrap();
        let mut constraint = OnSphere::uniform(vec![0], sphere, Weight::ONE);
        constraint.initialize(&system).unwrap();
        constraint.calculate(&system);

        assert!(!constraint.map.deltas()[0].is_valid());
        assert_eq!(constraint.energy().linear, 0.0);
    }
}
