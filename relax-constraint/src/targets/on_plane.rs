//! Constraints onto fixed planes.

use relax_core::{Constraint, DeltaAccumulator, Energy, ParticleSystem};
use relax_types::{ConfigError, Plane, Target, Weight};

use super::TargetMap;

/// Projects each mapped particle onto its target plane.
#[derive(Debug)]
pub struct OnPlane {
    map: TargetMap<Plane>,
}

impl OnPlane {
    /// Map `indices[k]` to `targets[target_indices[k]]`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for mismatched arrays or a target index
    /// outside `targets`.
    pub fn new(
        indices: Vec<usize>,
        target_indices: Vec<usize>,
        targets: Vec<Target<Plane>>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            map: TargetMap::new(indices, target_indices, targets)?,
        })
    }

    /// Constrain many particles onto one shared plane.
    #[must_use]
    pub fn uniform(indices: Vec<usize>, plane: Plane, weight: Weight) -> Self {
        Self {
            map: TargetMap::uniform(indices, Target::new(plane, weight)),
        }
    }
}

impl Constraint for OnPlane {
    fn initialize(&mut self, system: &ParticleSystem) -> Result<(), ConfigError> {
        self.map.validate(system)
    }

    fn calculate(&mut self, system: &ParticleSystem) {
        self.map
            .calculate_with(system, |position, plane| Some(plane.project(position) - position));
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
    use nalgebra::{Point3, Vector3};

    #[test]
    fn test_projection_onto_shared_plane() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::new(1.0, 2.0, 5.0), 1.0).unwrap();
        system.add_particle(Point3::new(-1.0, 0.0, -3.0), 1.0).unwrap();

        let plane = Plane::from_point_normal(Point3::origin(), Vector3::z()).unwrap();
        let mut constraint = OnPlane::uniform(vec![0, 1], plane, Weight::ONE);
        constraint.initialize(&system).unwrap();
        constraint.calculate(&system);

        let deltas = constraint.map.deltas();
        assert_relative_eq!(deltas[0].correction.z, -5.0, epsilon = 1e-12);
        assert_relative_eq!(deltas[1].correction.z, 3.0, epsilon = 1e-12);
        // In-plane components are untouched.
        assert_relative_eq!(deltas[0].correction.x, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_point_on_plane_is_satisfied() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::new(7.0, -4.0, 0.0), 1.0).unwrap();

        let plane = Plane::from_point_normal(Point3::origin(), Vector3::z()).unwrap();
        let mut constraint = OnPlane::uniform(vec![0], plane, Weight::ONE);
        constraint.initialize(&system).unwrap();
        constraint.calculate(&system);

        assert_relative_eq!(constraint.energy().linear, 0.0, epsilon = 1e-12);
    }
}
