//! Anchor constraints toward fixed positions.

use nalgebra::Point3;

use relax_core::{Constraint, DeltaAccumulator, Energy, ParticleSystem};
use relax_types::{ConfigError, Target, Weight};

use super::TargetMap;

/// Pulls each mapped particle toward its target position.
///
/// The classic anchor: with a large weight it pins a particle against all
/// other influences, with a small one it biases the equilibrium.
#[derive(Debug)]
pub struct OnPosition {
    map: TargetMap<Point3<f64>>,
}

impl OnPosition {
    /// Map `indices[k]` to `targets[target_indices[k]]`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for mismatched arrays or a target index
    /// outside `targets`.
    pub fn new(
        indices: Vec<usize>,
        target_indices: Vec<usize>,
        targets: Vec<Target<Point3<f64>>>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            map: TargetMap::new(indices, target_indices, targets)?,
        })
    }

    /// Anchor one particle to one position.
    #[must_use]
    pub fn anchor(index: usize, position: Point3<f64>, weight: Weight) -> Self {
        Self {
            map: TargetMap::uniform(vec![index], Target::new(position, weight)),
        }
    }
}

impl Constraint for OnPosition {
    fn initialize(&mut self, system: &ParticleSystem) -> Result<(), ConfigError> {
        self.map.validate(system)
    }

    fn calculate(&mut self, system: &ParticleSystem) {
        self.map
            .calculate_with(system, |position, target| Some(target - position));
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

    #[test]
    fn test_anchor_pulls_toward_target() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::new(3.0, 0.0, 0.0), 1.0).unwrap();

        let mut constraint = OnPosition::anchor(0, Point3::origin(), Weight::ONE);
        constraint.initialize(&system).unwrap();
        constraint.calculate(&system);

        assert_relative_eq!(constraint.map.deltas()[0].correction.x, -3.0, epsilon = 1e-12);
        assert_relative_eq!(constraint.energy().linear, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_per_particle_targets() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::origin(), 1.0).unwrap();
        system.add_particle(Point3::origin(), 1.0).unwrap();

        let targets = vec![
            Target::new(Point3::new(1.0, 0.0, 0.0), Weight::ONE),
            Target::new(Point3::new(0.0, 1.0, 0.0), Weight::new(2.0).unwrap()),
        ];
        let mut constraint = OnPosition::new(vec![0, 1], vec![0, 1], targets).unwrap();
        constraint.initialize(&system).unwrap();
        constraint.calculate(&system);

        let deltas = constraint.map.deltas();
        assert_relative_eq!(deltas[0].correction.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(deltas[1].correction.y, 1.0, epsilon = 1e-12);
        assert_relative_eq!(deltas[1].weight, 2.0, epsilon = 1e-12);
    }
}
