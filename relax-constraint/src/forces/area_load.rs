//! Loads distributed over triangles: fixed-direction area loads and
//! normal-following pressure.

use nalgebra::Vector3;

use relax_core::{Constraint, DeltaAccumulator, Energy, ParticleSystem};
use relax_types::{ConfigError, Weight};

/// Applies a fixed-direction force per unit area over each triangle, split
/// evenly among its three vertices.
///
/// Tracks the current triangle areas, so stretching a membrane increases
/// the total load it carries. Degenerate (zero-area) triangles carry no
/// load.
#[derive(Debug)]
pub struct AreaLoad {
    indices: Vec<usize>,
    load: Vector3<f64>,
    weight: Weight,
    forces: Vec<Vector3<f64>>,
}

impl AreaLoad {
    /// Create from triangles (index triples) and a force per unit area.
    #[must_use]
    pub fn new(triangles: Vec<[usize; 3]>, load: Vector3<f64>, weight: Weight) -> Self {
        let indices: Vec<usize> = triangles.iter().flatten().copied().collect();
        let forces = vec![Vector3::zeros(); indices.len()];
        Self {
            indices,
            load,
            weight,
            forces,
        }
    }
}

impl Constraint for AreaLoad {
    fn initialize(&mut self, system: &ParticleSystem) -> Result<(), ConfigError> {
        system.check_indices(&self.indices)
    }

    fn calculate(&mut self, system: &ParticleSystem) {
        let positions = system.positions();
        for (triangle, forces) in self
            .indices
            .chunks_exact(3)
            .zip(self.forces.chunks_exact_mut(3))
        {
            let p0 = positions[triangle[0]].current;
            let edge1 = positions[triangle[1]].current - p0;
            let edge2 = positions[triangle[2]].current - p0;
            let area = edge1.cross(&edge2).norm() * 0.5;

            let share = self.load * (area / 3.0 * self.weight.value());
            forces[0] = share;
            forces[1] = share;
            forces[2] = share;
        }
    }

    fn apply(&self, system: &mut ParticleSystem, _accumulator: &mut DeltaAccumulator) {
        for (&index, &force) in self.indices.iter().zip(&self.forces) {
            if system.inverse_mass(index) > 0.0 {
                system.add_force(index, force);
            }
        }
    }

    fn energy(&self) -> Energy {
        Energy::new(self.forces.iter().map(|force| force.norm()).sum(), 0.0)
    }

    fn particles(&self) -> &[usize] {
        &self.indices
    }
}

/// Applies pressure along each triangle's own normal, split evenly among
/// its vertices.
///
/// The per-triangle force is `pressure · area · n̂`, computed as half the
/// edge cross product so no normalization (and no zero-area guard) is
/// needed: a degenerate triangle simply produces zero force. Positive
/// pressure pushes along the winding-order normal, negative sucks.
#[derive(Debug)]
pub struct Pressure {
    indices: Vec<usize>,
    pressure: f64,
    weight: Weight,
    forces: Vec<Vector3<f64>>,
}

impl Pressure {
    /// Create from triangles (index triples) and a pressure (force per unit
    /// area).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidConfig`] for a non-finite pressure.
    pub fn new(
        triangles: Vec<[usize; 3]>,
        pressure: f64,
        weight: Weight,
    ) -> Result<Self, ConfigError> {
        if !pressure.is_finite() {
            return Err(ConfigError::invalid_config(format!(
                "pressure must be finite, got {pressure}"
            )));
        }
        let indices: Vec<usize> = triangles.iter().flatten().copied().collect();
        let forces = vec![Vector3::zeros(); indices.len()];
        Ok(Self {
            indices,
            pressure,
            weight,
            forces,
        })
    }
}

impl Constraint for Pressure {
    fn initialize(&mut self, system: &ParticleSystem) -> Result<(), ConfigError> {
        system.check_indices(&self.indices)
    }

    fn calculate(&mut self, system: &ParticleSystem) {
        let positions = system.positions();
        for (triangle, forces) in self
            .indices
            .chunks_exact(3)
            .zip(self.forces.chunks_exact_mut(3))
        {
            let p0 = positions[triangle[0]].current;
            let edge1 = positions[triangle[1]].current - p0;
            let edge2 = positions[triangle[2]].current - p0;
            // Area-weighted normal: |cross|/2 is the area, direction is n̂.
            let area_normal = edge1.cross(&edge2) * 0.5;

            let share = area_normal * (self.pressure / 3.0 * self.weight.value());
            forces[0] = share;
            forces[1] = share;
            forces[2] = share;
        }
    }

    fn apply(&self, system: &mut ParticleSystem, _accumulator: &mut DeltaAccumulator) {
        for (&index, &force) in self.indices.iter().zip(&self.forces) {
            if system.inverse_mass(index) > 0.0 {
                system.add_force(index, force);
            }
        }
    }

    fn energy(&self) -> Energy {
        Energy::new(self.forces.iter().map(|force| force.norm()).sum(), 0.0)
    }

    fn particles(&self) -> &[usize] {
        &self.indices
    }
}
