//! Sphere-sphere collision separation.

use hashbrown::HashMap;
use smallvec::SmallVec;

use relax_core::{Constraint, DeltaAccumulator, Energy, ParticleSystem};
use relax_types::{ConfigError, Weight};

use crate::element::Delta;

/// Pushes overlapping equal-radius spheres apart.
///
/// Every referenced particle carries a sphere of the shared radius; any two
/// whose centers come closer than one diameter are separated along their
/// center line, with the split in inverse proportion to their masses. Pair
/// finding runs over a uniform hash grid with diameter-sized cells, so only
/// the 27 neighboring cells of each particle are tested.
///
/// A particle overlapping several others accumulates all of its pushes
/// inside this constraint's own buffer; the combined push then blends with
/// other constraints through the shared accumulator like any other
/// correction. Exactly coincident centers have no separation direction and
/// are skipped.
#[derive(Debug)]
pub struct SphereCollide {
    indices: Vec<usize>,
    radius: f64,
    weight: Weight,
    deltas: Vec<Delta>,
}

impl SphereCollide {
    /// Create from the colliding particle set and the shared sphere radius.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidLength`] for a non-positive or
    /// non-finite radius.
    pub fn new(indices: Vec<usize>, radius: f64, weight: Weight) -> Result<Self, ConfigError> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(ConfigError::invalid_length("radius", radius));
        }
        let deltas = vec![Delta::ZERO; indices.len()];
        Ok(Self {
            indices,
            radius,
            weight,
            deltas,
        })
    }

    /// The shared collision radius.
    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    fn cell_of(point: &nalgebra::Point3<f64>, cell_size: f64) -> (i64, i64, i64) {
        (
            (point.x / cell_size).floor() as i64,
            (point.y / cell_size).floor() as i64,
            (point.z / cell_size).floor() as i64,
        )
    }
}

impl Constraint for SphereCollide {
    fn initialize(&mut self, system: &ParticleSystem) -> Result<(), ConfigError> {
        system.check_indices(&self.indices)
    }

    fn calculate(&mut self, system: &ParticleSystem) {
        self.deltas.fill(Delta::ZERO);

        let positions = system.positions();
        let diameter = 2.0 * self.radius;
        let diameter_squared = diameter * diameter;

        // Bucket by diameter-sized cells; overlapping pairs can only span
        // adjacent cells.
        let mut grid: HashMap<(i64, i64, i64), SmallVec<[u32; 8]>> =
            HashMap::with_capacity(self.indices.len());
        for (local, &index) in self.indices.iter().enumerate() {
            let cell = Self::cell_of(&positions[index].current, diameter);
            grid.entry(cell).or_default().push(local as u32);
        }

        let weight = self.weight.value();
        for (local_a, &index_a) in self.indices.iter().enumerate() {
            let a = positions[index_a].current;
            let cell = Self::cell_of(&a, diameter);

            for dx in -1..=1 {
                for dy in -1..=1 {
                    for dz in -1..=1 {
                        let neighbor = (cell.0 + dx, cell.1 + dy, cell.2 + dz);
                        let Some(bucket) = grid.get(&neighbor) else {
                            continue;
                        };
                        for &local_b in bucket {
                            let local_b = local_b as usize;
                            if local_b <= local_a {
                                continue;
                            }
                            let index_b = self.indices[local_b];
                            let b = positions[index_b].current;

                            let separation = b - a;
                            let distance_squared = separation.norm_squared();
                            if distance_squared >= diameter_squared {
                                continue;
                            }
                            let distance = distance_squared.sqrt();
                            if distance < 1e-12 {
                                // Coincident centers: no separation direction.
                                continue;
                            }

                            let w_a = positions[index_a].inverse_mass;
                            let w_b = positions[index_b].inverse_mass;
                            let w_sum = w_a + w_b;
                            if w_sum <= 0.0 {
                                continue;
                            }

                            let push = separation * ((diameter - distance) / distance);
                            self.deltas[local_a] = Delta::new(
                                self.deltas[local_a].correction - push * (w_a / w_sum),
                                weight,
                            );
                            self.deltas[local_b] = Delta::new(
                                self.deltas[local_b].correction + push * (w_b / w_sum),
                                weight,
                            );
                        }
                    }
                }
            }
        }
    }

    fn apply(&self, _system: &mut ParticleSystem, accumulator: &mut DeltaAccumulator) {
        for (&index, delta) in self.indices.iter().zip(&self.deltas) {
            if delta.is_valid() {
                accumulator.add(index, delta.correction, delta.weight);
            }
        }
    }

    fn energy(&self) -> Energy {
        let linear = self
            .deltas
            .iter()
            .filter(|d| d.is_valid())
            .map(|d| d.correction.norm())
            .sum();
        Energy::new(linear, 0.0)
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
    fn test_invalid_radius_rejected() {
        assert!(SphereCollide::new(vec![0, 1], 0.0, Weight::ONE).is_err());
        assert!(SphereCollide::new(vec![0, 1], -1.0, Weight::ONE).is_err());
    }

    #[test]
    fn test_overlapping_pair_separates_symmetrically() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::origin(), 1.0).unwrap();
        system.add_particle(Point3::new(1.0, 0.0, 0.0), 1.0).unwrap();

        // Radius 1 means rest separation 2; current separation is 1.
        let mut constraint = SphereCollide::new(vec![0, 1], 1.0, Weight::ONE).unwrap();
        constraint.initialize(&system).unwrap();
        constraint.calculate(&system);

        assert_relative_eq!(constraint.deltas[0].correction.x, -0.5, epsilon = 1e-12);
        assert_relative_eq!(constraint.deltas[1].correction.x, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_separated_pair_contributes_nothing() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::origin(), 1.0).unwrap();
        system.add_particle(Point3::new(5.0, 0.0, 0.0), 1.0).unwrap();

        let mut constraint = SphereCollide::new(vec![0, 1], 1.0, Weight::ONE).unwrap();
        constraint.initialize(&system).unwrap();
        constraint.calculate(&system);

        assert!(constraint.deltas.iter().all(|d| !d.is_valid()));
        assert_eq!(constraint.energy().linear, 0.0);
    }

    #[test]
    fn test_fixed_particle_takes_no_push() {
        let mut system = ParticleSystem::new();
        system.add_fixed_particle(Point3::origin());
        system.add_particle(Point3::new(1.0, 0.0, 0.0), 1.0).unwrap();

        let mut constraint = SphereCollide::new(vec![0, 1], 1.0, Weight::ONE).unwrap();
        constraint.initialize(&system).unwrap();
        constraint.calculate(&system);

        assert_eq!(constraint.deltas[0].correction.norm(), 0.0);
        assert_relative_eq!(constraint.deltas[1].correction.x, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_coincident_centers_are_skipped() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::origin(), 1.0).unwrap();
        system.add_particle(Point3::origin(), 1.0).unwrap();

        let mut constraint = SphereCollide::new(vec![0, 1], 1.0, Weight::ONE).unwrap();
        constraint.initialize(&system).unwrap();
        constraint.calculate(&system);

        assert!(constraint.deltas.iter().all(|d| !d.is_valid()));
    }

    #[test]
    fn test_chain_of_overlaps_accumulates_pushes() {
        let mut system = ParticleSystem::new();
        for i in 0..3 {
            system
                .add_particle(Point3::new(f64::from(i) * 1.5, 0.0, 0.0), 1.0)
                .unwrap();
        }

        let mut constraint = SphereCollide::new(vec![0, 1, 2], 1.0, Weight::ONE).unwrap();
        constraint.initialize(&system).unwrap();
        constraint.calculate(&system);

        // The middle particle is pushed equally from both sides: net zero,
        // while the outer particles move outward.
        assert_relative_eq!(constraint.deltas[1].correction.x, 0.0, epsilon = 1e-12);
        assert!(constraint.deltas[0].correction.x < 0.0);
        assert!(constraint.deltas[2].correction.x > 0.0);
    }
}
