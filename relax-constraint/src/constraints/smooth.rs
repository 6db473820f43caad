//! Laplacian smoothing constraints.

use nalgebra::Vector3;

use relax_core::{Constraint, DeltaAccumulator, Energy, ParticleSystem};
use relax_types::{ConfigError, Weight};

use crate::element::{Delta, ElementBatch};

/// Pulls each element's center particle toward the centroid of its
/// neighbors (uniform umbrella weights).
///
/// Each element is a vertex star `[center, neighbor, neighbor, ...]`; only
/// the center receives a correction, so overlapping stars compose through
/// the accumulator exactly like any other constraints sharing a particle.
/// Stars with fewer than 2 neighbors contribute nothing.
#[derive(Debug)]
pub struct Smooth {
    batch: ElementBatch,
}

impl Smooth {
    /// Create from vertex stars, one element per star, each listing the
    /// center index first.
    #[must_use]
    pub fn new<G: AsRef<[usize]>>(stars: impl IntoIterator<Item = G>, weight: Weight) -> Self {
        Self {
            batch: ElementBatch::from_groups(stars, weight),
        }
    }

    /// Enable chunked parallel evaluation of the stars.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.batch.set_parallel(parallel);
        self
    }
}

impl Constraint for Smooth {
    fn initialize(&mut self, system: &ParticleSystem) -> Result<(), ConfigError> {
        self.batch.validate(system)
    }

    fn calculate(&mut self, system: &ParticleSystem) {
        let positions = system.positions();

        self.batch.calculate_each(|_, element, indices, deltas| {
            if indices.len() < 3 {
                return;
            }

            let neighbors = &indices[1..];
            let centroid: Vector3<f64> = neighbors
                .iter()
                .map(|&i| positions[i].current.coords)
                .sum::<Vector3<f64>>()
                / neighbors.len() as f64;

            let center = positions[indices[0]].current.coords;
            deltas[0] = Delta::new(centroid - center, element.weight().value());
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

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_center_moves_to_neighbor_centroid() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::new(0.0, 0.0, 2.0), 1.0).unwrap();
        system.add_particle(Point3::new(-1.0, 0.0, 0.0), 1.0).unwrap();
        system.add_particle(Point3::new(1.0, 0.0, 0.0), 1.0).unwrap();

        let mut constraint = Smooth::new([vec![0, 1, 2]], Weight::ONE);
        constraint.initialize(&system).unwrap();
        constraint.calculate(&system);

        let deltas = constraint.batch.deltas();
        assert_relative_eq!(deltas[0].correction.z, -2.0, epsilon = 1e-12);
        // Neighbors are untouched.
        assert!(!deltas[1].is_valid());
        assert!(!deltas[2].is_valid());
    }

    #[test]
    fn test_centered_star_is_satisfied() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::origin(), 1.0).unwrap();
        for (x, y) in [(1.0, 0.0), (-1.0, 0.0), (0.0, 1.0), (0.0, -1.0)] {
            system.add_particle(Point3::new(x, y, 0.0), 1.0).unwrap();
        }

        let mut constraint = Smooth::new([vec![0, 1, 2, 3, 4]], Weight::ONE);
        constraint.initialize(&system).unwrap();
        constraint.calculate(&system);

        assert_relative_eq!(constraint.energy().linear, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_small_stars_contribute_nothing() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::origin(), 1.0).unwrap();
        system.add_particle(Point3::new(1.0, 0.0, 0.0), 1.0).unwrap();

        let mut constraint = Smooth::new([vec![0, 1]], Weight::ONE);
        constraint.initialize(&system).unwrap();
        constraint.calculate(&system);

        assert!(constraint.batch.deltas().iter().all(|d| !d.is_valid()));
    }
}
