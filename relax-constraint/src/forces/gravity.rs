//! Constant-acceleration loads (self-weight).

use nalgebra::Vector3;

use relax_core::{Constraint, DeltaAccumulator, Energy, ParticleSystem};
use relax_types::{ConfigError, Weight};

/// Applies a constant acceleration to each referenced particle, scaled by
/// its mass: the classic self-weight load.
///
/// Being a force, contributions add straight into the per-particle force
/// sums - loads from several sources on one particle superpose, they are
/// never averaged. Fixed particles are skipped.
#[derive(Debug)]
pub struct GravityLoad {
    indices: Vec<usize>,
    acceleration: Vector3<f64>,
    weight: Weight,
    forces: Vec<Vector3<f64>>,
}

impl GravityLoad {
    /// Create a load on the given particles.
    #[must_use]
    pub fn new(indices: Vec<usize>, acceleration: Vector3<f64>, weight: Weight) -> Self {
        let forces = vec![Vector3::zeros(); indices.len()];
        Self {
            indices,
            acceleration,
            weight,
            forces,
        }
    }

    /// Standard gravity (`-z`, 9.81 m/s²) on the given particles.
    #[must_use]
    pub fn earth(indices: Vec<usize>) -> Self {
        Self::new(indices, Vector3::new(0.0, 0.0, -9.81), Weight::ONE)
    }
}

impl Constraint for GravityLoad {
    fn initialize(&mut self, system: &ParticleSystem) -> Result<(), ConfigError> {
        system.check_indices(&self.indices)
    }

    fn calculate(&mut self, system: &ParticleSystem) {
        let positions = system.positions();
        for (&index, force) in self.indices.iter().zip(&mut self.forces) {
            let record = &positions[index];
            *force = if record.inverse_mass > 0.0 {
                self.acceleration * (record.mass * self.weight.value())
            } else {
                Vector3::zeros()
            };
        }
    }

    fn apply(&self, system: &mut ParticleSystem, _accumulator: &mut DeltaAccumulator) {
        for (&index, &force) in self.indices.iter().zip(&self.forces) {
            system.add_force(index, force);
        }
    }

    fn energy(&self) -> Energy {
        Energy::new(self.forces.iter().map(|force| force.norm()).sum(), 0.0)
    }

    fn particles(&self) -> &[usize] {
        &self.indices
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_force_scales_with_mass() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::origin(), 2.0).unwrap();
        system.add_particle(Point3::origin(), 0.5).unwrap();

        let mut load = GravityLoad::earth(vec![0, 1]);
        load.initialize(&system).unwrap();
        load.calculate(&system);

        let mut accumulator = DeltaAccumulator::new();
        accumulator.reset(&system);
        load.apply(&mut system, &mut accumulator);

        assert_relative_eq!(system.positions()[0].force_sum.z, -19.62, epsilon = 1e-9);
        assert_relative_eq!(system.positions()[1].force_sum.z, -4.905, epsilon = 1e-9);
    }

    #[test]
    fn test_forces_superpose() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::origin(), 1.0).unwrap();

        let mut down = GravityLoad::new(vec![0], Vector3::new(0.0, 0.0, -1.0), Weight::ONE);
        let mut side = GravityLoad::new(vec![0], Vector3::new(2.0, 0.0, 0.0), Weight::ONE);
        down.initialize(&system).unwrap();
        side.initialize(&system).unwrap();
        down.calculate(&system);
        side.calculate(&system);

        let mut accumulator = DeltaAccumulator::new();
        accumulator.reset(&system);
        down.apply(&mut system, &mut accumulator);
        side.apply(&mut system, &mut accumulator);

        // Additive, not averaged.
        let sum = system.positions()[0].force_sum;
        assert_relative_eq!(sum.x, 2.0, epsilon = 1e-12);
        assert_relative_eq!(sum.z, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_fixed_particle_is_skipped() {
        let mut system = ParticleSystem::new();
        system.add_fixed_particle(Point3::origin());

        let mut load = GravityLoad::earth(vec![0]);
        load.initialize(&system).unwrap();
        load.calculate(&system);

        assert_eq!(load.energy().linear, 0.0);
    }
}
