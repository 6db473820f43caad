//! Rigid shape matching.

use nalgebra::{Matrix3, Point3, Vector3, SVD};

use relax_core::{Constraint, DeltaAccumulator, Energy, ParticleSystem};
use relax_types::{ConfigError, Weight};

use crate::element::{Delta, ElementBatch};

/// Threshold (relative to the largest singular value) below which a
/// covariance direction is treated as collapsed.
const RANK_EPS: f64 = 1e-9;

/// Pulls each element's particles toward a rigidly transformed copy of
/// their rest configuration.
///
/// At every calculate pass the mass-weighted cross-covariance between
/// current and rest positions is polar-decomposed (via SVD, with a
/// determinant flip so the result is a proper rotation, never a
/// reflection). Each particle's correction is the gap between its current
/// position and `R · (rest - rest_centroid) + current_centroid`.
///
/// Groups whose covariance has rank below 2 - collinear or coincident
/// configurations, where the matching rotation is ambiguous - contribute
/// nothing, as do groups consisting only of fixed particles.
#[derive(Debug)]
pub struct MatchRigid {
    batch: ElementBatch,
    rest: Vec<Point3<f64>>,
}

impl MatchRigid {
    /// Create from rigid clusters, one element per cluster. Rest positions
    /// are captured from the particle store at initialize time.
    #[must_use]
    pub fn new<G: AsRef<[usize]>>(clusters: impl IntoIterator<Item = G>, weight: Weight) -> Self {
        Self {
            batch: ElementBatch::from_groups(clusters, weight),
            rest: Vec::new(),
        }
    }

    /// Enable chunked parallel evaluation of the clusters.
    #[must_use]
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.batch.set_parallel(parallel);
        self
    }

    /// Extract the best rigid rotation from a cross-covariance matrix.
    ///
    /// Returns `None` when the covariance rank is below 2, where the
    /// rotation is not uniquely determined.
    fn polar_rotation(covariance: &Matrix3<f64>) -> Option<Matrix3<f64>> {
        let svd = SVD::new(*covariance, true, true);
        let mut u = svd.u?;
        let v_t = svd.v_t?;
        let singular = svd.singular_values;

        let largest = singular.iter().fold(0.0_f64, |a, &b| a.max(b));
        if largest <= 0.0 {
            return None;
        }
        let rank = singular.iter().filter(|&&s| s > largest * RANK_EPS).count();
        if rank < 2 {
            return None;
        }

        let mut rotation = u * v_t;
        if rotation.determinant() < 0.0 {
            // Flip the direction of least confidence to stay in SO(3).
            let weakest = (0..3)
                .min_by(|&a, &b| {
                    singular[a]
                        .partial_cmp(&singular[b])
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .unwrap_or(2);
            let flipped = u.column(weakest) * -1.0;
            u.set_column(weakest, &flipped);
            rotation = u * v_t;
        }
        Some(rotation)
    }
}

impl Constraint for MatchRigid {
    fn initialize(&mut self, system: &ParticleSystem) -> Result<(), ConfigError> {
        self.batch.validate(system)?;
        let positions = system.positions();
        self.rest = self
            .batch
            .indices()
            .iter()
            .map(|&i| positions[i].current)
            .collect();
        Ok(())
    }

    fn calculate(&mut self, system: &ParticleSystem) {
        let positions = system.positions();
        let rest = &self.rest;

        self.batch.calculate_each(|_, element, indices, deltas| {
            if indices.len() < 2 || rest.len() < element.range().end {
                return;
            }
            let rest = &rest[element.range()];

            // Fixed particles carry no mass here: they cannot be moved, so
            // they should not steer the fit either.
            let masses: Vec<f64> = indices
                .iter()
                .map(|&i| {
                    let w = positions[i].inverse_mass;
                    if w > 0.0 {
                        1.0 / w
                    } else {
                        0.0
                    }
                })
                .collect();
            let total_mass: f64 = masses.iter().sum();
            if total_mass <= 0.0 {
                return;
            }

            let current_centroid: Vector3<f64> = indices
                .iter()
                .zip(&masses)
                .map(|(&i, &m)| positions[i].current.coords * m)
                .sum::<Vector3<f64>>()
                / total_mass;
            let rest_centroid: Vector3<f64> = rest
                .iter()
                .zip(&masses)
                .map(|(p, &m)| p.coords * m)
                .sum::<Vector3<f64>>()
                / total_mass;

            let mut covariance = Matrix3::zeros();
            for ((&i, rest_point), &m) in indices.iter().zip(rest).zip(&masses) {
                let current_offset = positions[i].current.coords - current_centroid;
                let rest_offset = rest_point.coords - rest_centroid;
                covariance += (current_offset * rest_offset.transpose()) * m;
            }

            let Some(rotation) = Self::polar_rotation(&covariance) else {
                return;
            };

            let weight = element.weight().value();
            for ((local, &i), rest_point) in indices.iter().enumerate().zip(rest) {
                let target = current_centroid + rotation * (rest_point.coords - rest_centroid);
                deltas[local] = Delta::new(target - positions[i].current.coords, weight);
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
    use nalgebra::UnitQuaternion;

    fn l_shape() -> Vec<Point3<f64>> {
        vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
            Point3::new(2.0, 1.0, 0.0),
            Point3::new(0.0, 0.0, 1.0),
        ]
    }

    fn system_with(points: &[Point3<f64>]) -> ParticleSystem {
        let mut system = ParticleSystem::new();
        for &p in points {
            system.add_particle(p, 1.0).unwrap();
        }
        system
    }

    #[test]
    fn test_rigid_motion_has_zero_energy() {
        let points = l_shape();
        let mut system = system_with(&points);

        let mut constraint = MatchRigid::new([vec![0, 1, 2, 3]], Weight::ONE);
        constraint.initialize(&system).unwrap();

        // Rotate and translate the whole cluster rigidly.
        let rotation = UnitQuaternion::from_euler_angles(0.3, -0.2, 0.9);
        let translation = Vector3::new(5.0, -1.0, 2.0);
        for (record, p) in system.positions_mut().iter_mut().zip(&points) {
            record.current = Point3::from(rotation * p.coords + translation);
        }

        constraint.calculate(&system);
        assert_relative_eq!(constraint.energy().linear, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_deformation_is_corrected_toward_rigid_pose() {
        let points = l_shape();
        let mut system = system_with(&points);

        let mut constraint = MatchRigid::new([vec![0, 1, 2, 3]], Weight::ONE);
        constraint.initialize(&system).unwrap();

        // Stretch one particle away from its rest place.
        system.positions_mut()[1].current = Point3::new(3.0, 0.0, 0.0);
        constraint.calculate(&system);

        let deltas = constraint.batch.deltas();
        assert!(deltas.iter().all(Delta::is_valid));
        // The stretched particle is pulled back toward the cluster.
        assert!(deltas[1].correction.x < 0.0);
        // Mass-weighted corrections of a shape match sum to zero.
        let net: Vector3<f64> = deltas.iter().map(|d| d.correction).sum();
        assert_relative_eq!(net.norm(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_collinear_cluster_contributes_nothing() {
        let points = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ];
        let mut system = system_with(&points);

        let mut constraint = MatchRigid::new([vec![0, 1, 2]], Weight::ONE);
        constraint.initialize(&system).unwrap();

        system.positions_mut()[2].current = Point3::new(4.0, 0.0, 0.0);
        constraint.calculate(&system);

        assert!(constraint.batch.deltas().iter().all(|d| !d.is_valid()));
    }

    #[test]
    fn test_all_fixed_cluster_contributes_nothing() {
        let mut system = ParticleSystem::new();
        for p in l_shape() {
            system.add_fixed_particle(p);
        }

        let mut constraint = MatchRigid::new([vec![0, 1, 2, 3]], Weight::ONE);
        constraint.initialize(&system).unwrap();
        constraint.calculate(&system);

        assert!(constraint.batch.deltas().iter().all(|d| !d.is_valid()));
    }
}
