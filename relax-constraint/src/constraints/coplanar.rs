//! Coplanarity constraints.

use relax_core::fit::fit_plane;
use relax_core::{Constraint, DeltaAccumulator, Energy, ParticleSystem};
use relax_types::{ConfigError, Weight};

use crate::element::{Delta, ElementBatch};

/// Pulls each element's particles onto their best-fit plane.
///
/// The plane is refit on every calculate pass; corrections are the
/// projections onto it. Groups with fewer than 3 points, or with collinear
/// or coincident points (no defined plane), contribute nothing.
#[derive(Debug)]
pub struct Coplanar {
    batch: ElementBatch,
}

impl Coplanar {
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

impl Constraint for Coplanar {
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
            let Some(plane) = fit_plane(&points) else {
                return;
            };

            let weight = element.weight().value();
            for (local, point) in points.iter().enumerate() {
                deltas[local] = Delta::new(plane.project(point) - point, weight);
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

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::Point3;

    #[test]
    fn test_tetrahedron_flattens_toward_plane() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::new(0.0, 0.0, 1.0), 1.0).unwrap();
        system.add_particle(Point3::new(1.0, 0.0, -1.0), 1.0).unwrap();
        system.add_particle(Point3::new(0.0, 1.0, 1.0), 1.0).unwrap();
        system.add_particle(Point3::new(1.0, 1.0, -1.0), 1.0).unwrap();

        let mut constraint = Coplanar::new([vec![0, 1, 2, 3]], Weight::ONE);
        constraint.initialize(&system).unwrap();
        constraint.calculate(&system);

        let deltas = constraint.batch.deltas();
        assert!(deltas.iter().all(Delta::is_valid));
        // Corrections are pure plane rejections, so they cancel in sum.
        let net: nalgebra::Vector3<f64> = deltas.iter().map(|d| d.correction).sum();
        assert_relative_eq!(net.norm(), 0.0, epsilon = 1e-9);
        assert!(constraint.energy().linear > 0.0);
    }

    #[test]
    fn test_flat_quad_is_satisfied() {
        let mut system = ParticleSystem::new();
        for (x, y) in [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)] {
            system.add_particle(Point3::new(x, y, 2.0), 1.0).unwrap();
        }

        let mut constraint = Coplanar::new([vec![0, 1, 2, 3]], Weight::ONE);
        constraint.initialize(&system).unwrap();
        constraint.calculate(&system);

        assert_relative_eq!(constraint.energy().linear, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_degenerate_groups_contribute_nothing() {
        let mut system = ParticleSystem::new();
        for i in 0..3 {
            system
                .add_particle(Point3::new(f64::from(i), 0.0, 0.0), 1.0)
                .unwrap();
        }

        // Two points are too few; three collinear points define no plane.
        let mut constraint = Coplanar::new([vec![0, 1], vec![0, 1, 2]], Weight::ONE);
        constraint.initialize(&system).unwrap();
        constraint.calculate(&system);

        assert!(constraint.batch.deltas().iter().all(|d| !d.is_valid()));
        assert_eq!(constraint.energy().linear, 0.0);
    }
}
