//! Loads distributed along edges.

use nalgebra::Vector3;

use relax_core::{Constraint, DeltaAccumulator, Energy, ParticleSystem};
use relax_types::{ConfigError, Weight};

/// Applies a force per unit length along each edge, split evenly between
/// the edge's endpoints.
///
/// The load tracks the current edge lengths: as an edge stretches it
/// carries proportionally more total force, the way a cable carries more
/// self-weight per sagging span.
#[derive(Debug)]
pub struct LinearLoad {
    indices: Vec<usize>,
    load: Vector3<f64>,
    weight: Weight,
    forces: Vec<Vector3<f64>>,
}

impl LinearLoad {
    /// Create from edges (index pairs) and a force per unit length.
    #[must_use]
    pub fn new(edges: Vec<[usize; 2]>, load: Vector3<f64>, weight: Weight) -> Self {
        let indices: Vec<usize> = edges.iter().flatten().copied().collect();
        let forces = vec![Vector3::zeros(); indices.len()];
        Self {
            indices,
            load,
            weight,
            forces,
        }
    }
}

impl Constraint for LinearLoad {
    fn initialize(&mut self, system: &ParticleSystem) -> Result<(), ConfigError> {
        system.check_indices(&self.indices)
    }

    fn calculate(&mut self, system: &ParticleSystem) {
        let positions = system.positions();
        for (pair, forces) in self.indices.chunks_exact(2).zip(self.forces.chunks_exact_mut(2)) {
            let length = (positions[pair[1]].current - positions[pair[0]].current).norm();
            let half = self.load * (0.5 * length * self.weight.value());
            forces[0] = half;
            forces[1] = half;
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
