//! Forces sampled from vector fields.

use nalgebra::{Point3, Vector3};

use relax_core::{Constraint, DeltaAccumulator, Energy, ParticleSystem};
use relax_types::{ConfigError, Weight};

/// A pure vector-valued function of position.
///
/// The seam for externally supplied fields (wind, flow, magnetic pull,
/// grid-sampled data): the forces below only ever evaluate it pointwise.
/// Any `Fn(&Point3) -> Vector3` closure qualifies.
pub trait VectorField: Send + Sync {
    /// Field value at `position`.
    fn value_at(&self, position: &Point3<f64>) -> Vector3<f64>;
}

impl<F> VectorField for F
where
    F: Fn(&Point3<f64>) -> Vector3<f64> + Send + Sync,
{
    fn value_at(&self, position: &Point3<f64>) -> Vector3<f64> {
        self(position)
    }
}

/// Applies the sampled field value directly as a force on each particle.
pub struct ForceField {
    indices: Vec<usize>,
    field: Box<dyn VectorField>,
    weight: Weight,
    forces: Vec<Vector3<f64>>,
}

impl ForceField {
    /// Create from the affected particles and the sampled field.
    #[must_use]
    pub fn new(indices: Vec<usize>, field: Box<dyn VectorField>, weight: Weight) -> Self {
        let forces = vec![Vector3::zeros(); indices.len()];
        Self {
            indices,
            field,
            weight,
            forces,
        }
    }
}

impl std::fmt::Debug for ForceField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForceField")
            .field("particles", &self.indices.len())
            .finish_non_exhaustive()
    }
}

impl Constraint for ForceField {
    fn initialize(&mut self, system: &ParticleSystem) -> Result<(), ConfigError> {
        system.check_indices(&self.indices)
    }

    fn calculate(&mut self, system: &ParticleSystem) {
        let positions = system.positions();
        for (&index, force) in self.indices.iter().zip(&mut self.forces) {
            let record = &positions[index];
            *force = if record.inverse_mass > 0.0 {
                self.field.value_at(&record.current) * self.weight.value()
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

/// Applies the sampled field value as an acceleration: the resulting force
/// is scaled by each particle's mass, so all masses fall alike.
pub struct AccelerationField {
    indices: Vec<usize>,
    field: Box<dyn VectorField>,
    weight: Weight,
    forces: Vec<Vector3<f64>>,
}

impl AccelerationField {
    /// Create from the affected particles and the sampled field.
    #[must_use]
    pub fn new(indices: Vec<usize>, field: Box<dyn VectorField>, weight: Weight) -> Self {
        let forces = vec![Vector3::zeros(); indices.len()];
        Self {
            indices,
            field,
            weight,
            forces,
        }
    }
}

impl std::fmt::Debug for AccelerationField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccelerationField")
            .field("particles", &self.indices.len())
            .finish_non_exhaustive()
    }
}

impl Constraint for AccelerationField {
    fn initialize(&mut self, system: &ParticleSystem) -> Result<(), ConfigError> {
        system.check_indices(&self.indices)
    }

    fn calculate(&mut self, system: &ParticleSystem) {
        let positions = system.positions();
        for (&index, force) in self.indices.iter().zip(&mut self.forces) {
            let record = &positions[index];
            *force = if record.inverse_mass > 0.0 {
                self.field.value_at(&record.current) * (record.mass * self.weight.value())
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
