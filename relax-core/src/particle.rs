//! Particle state records and the store that owns them.
//!
//! The store is the single owner of all per-particle state. Constraints and
//! forces reference particles by index only; during a step they read the
//! store concurrently and contribute corrections through their own buffers,
//! never by writing particle state directly.

use nalgebra::{Point3, UnitQuaternion, Vector3};

use relax_types::{next_system_id, ConfigError, Particle, ParticleFlags, SystemId};

/// Mutable per-particle translational record.
///
/// Allocated once for the lifetime of the simulation. `current` is mutated
/// only by the integration step; `force_sum` is mutated by every active
/// force during a step and cleared at step start.
#[derive(Debug, Clone, Copy)]
pub struct ParticlePosition {
    /// Current position.
    pub current: Point3<f64>,
    /// Current velocity.
    pub velocity: Vector3<f64>,
    /// Mass in kg (`f64::INFINITY` for fixed particles).
    pub mass: f64,
    /// Inverse mass (0 for fixed/immovable particles). Always `>= 0`.
    pub inverse_mass: f64,
    /// Accumulated force for the current step.
    pub force_sum: Vector3<f64>,
    /// State flags.
    pub flags: ParticleFlags,
}

impl ParticlePosition {
    /// Create a movable particle record.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMass`] if `mass` is non-positive or
    /// non-finite.
    pub fn new(position: Point3<f64>, mass: f64) -> Result<Self, ConfigError> {
        if !(mass.is_finite() && mass > 0.0) {
            return Err(ConfigError::InvalidMass { value: mass });
        }
        Ok(Self {
            current: position,
            velocity: Vector3::zeros(),
            mass,
            inverse_mass: 1.0 / mass,
            force_sum: Vector3::zeros(),
            flags: ParticleFlags::empty(),
        })
    }

    /// Create a fixed (immovable) particle record.
    #[must_use]
    pub fn fixed(position: Point3<f64>) -> Self {
        Self {
            current: position,
            velocity: Vector3::zeros(),
            mass: f64::INFINITY,
            inverse_mass: 0.0,
            force_sum: Vector3::zeros(),
            flags: ParticleFlags::FIXED,
        }
    }

    /// Check whether this particle is fixed.
    #[must_use]
    pub fn is_fixed(&self) -> bool {
        self.inverse_mass == 0.0
    }

    /// Kinetic energy of this particle; zero for fixed particles.
    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        if self.inverse_mass > 0.0 {
            0.5 * self.velocity.norm_squared() / self.inverse_mass
        } else {
            0.0
        }
    }
}

/// Mutable per-particle rotational record, analogous to [`ParticlePosition`].
#[derive(Debug, Clone, Copy)]
pub struct ParticleRotation {
    /// Current orientation.
    pub current: UnitQuaternion<f64>,
    /// Current angular velocity (axis-angle rate).
    pub angular_velocity: Vector3<f64>,
    /// Inverse moment of inertia (0 for rotation-fixed particles).
    pub inverse_inertia: f64,
    /// Accumulated torque for the current step.
    pub torque_sum: Vector3<f64>,
}

impl ParticleRotation {
    /// Create a rotatable record.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidInertia`] if `inertia` is non-positive
    /// or non-finite.
    pub fn new(rotation: UnitQuaternion<f64>, inertia: f64) -> Result<Self, ConfigError> {
        if !(inertia.is_finite() && inertia > 0.0) {
            return Err(ConfigError::InvalidInertia { value: inertia });
        }
        Ok(Self {
            current: rotation,
            angular_velocity: Vector3::zeros(),
            inverse_inertia: 1.0 / inertia,
            torque_sum: Vector3::zeros(),
        })
    }

    /// Create a rotation-fixed record.
    #[must_use]
    pub fn fixed(rotation: UnitQuaternion<f64>) -> Self {
        Self {
            current: rotation,
            angular_velocity: Vector3::zeros(),
            inverse_inertia: 0.0,
            torque_sum: Vector3::zeros(),
        }
    }
}

/// The particle store: indexed, mutable access to all particle records.
///
/// Beyond index bounds there is no validation here - constraints are always
/// constructed and initialized against a specific store, and index
/// violations are structural wiring bugs reported at initialize time.
#[derive(Debug)]
pub struct ParticleSystem {
    id: SystemId,
    positions: Vec<ParticlePosition>,
    rotations: Vec<ParticleRotation>,
}

impl Default for ParticleSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl ParticleSystem {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: next_system_id(),
            positions: Vec::new(),
            rotations: Vec::new(),
        }
    }

    /// Create an empty store with reserved capacity.
    #[must_use]
    pub fn with_capacity(positions: usize) -> Self {
        Self {
            id: next_system_id(),
            positions: Vec::with_capacity(positions),
            rotations: Vec::new(),
        }
    }

    /// Unique identity of this store.
    #[must_use]
    pub fn id(&self) -> SystemId {
        self.id
    }

    /// Add a movable particle; returns its handle.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidMass`] for a non-positive or non-finite
    /// mass.
    pub fn add_particle(&mut self, position: Point3<f64>, mass: f64) -> Result<Particle, ConfigError> {
        let record = ParticlePosition::new(position, mass)?;
        self.positions.push(record);
        Ok(Particle::position_only(self.positions.len() - 1))
    }

    /// Add a fixed (immovable) particle; returns its handle.
    pub fn add_fixed_particle(&mut self, position: Point3<f64>) -> Particle {
        self.positions.push(ParticlePosition::fixed(position));
        Particle::position_only(self.positions.len() - 1)
    }

    /// Add an oriented particle carrying both position and rotation state.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an invalid mass or inertia.
    pub fn add_oriented_particle(
        &mut self,
        position: Point3<f64>,
        mass: f64,
        rotation: UnitQuaternion<f64>,
        inertia: f64,
    ) -> Result<Particle, ConfigError> {
        let pos_record = ParticlePosition::new(position, mass)?;
        let rot_record = ParticleRotation::new(rotation, inertia)?;
        self.positions.push(pos_record);
        self.rotations.push(rot_record);
        Ok(Particle::oriented(
            self.positions.len() - 1,
            self.rotations.len() - 1,
        ))
    }

    /// Number of position records.
    #[must_use]
    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of rotation records.
    #[must_use]
    pub fn rotation_count(&self) -> usize {
        self.rotations.len()
    }

    /// All position records.
    #[must_use]
    pub fn positions(&self) -> &[ParticlePosition] {
        &self.positions
    }

    /// Mutable access to all position records.
    pub fn positions_mut(&mut self) -> &mut [ParticlePosition] {
        &mut self.positions
    }

    /// All rotation records.
    #[must_use]
    pub fn rotations(&self) -> &[ParticleRotation] {
        &self.rotations
    }

    /// Mutable access to all rotation records.
    pub fn rotations_mut(&mut self) -> &mut [ParticleRotation] {
        &mut self.rotations
    }

    /// Inverse mass of position record `index`.
    #[must_use]
    pub fn inverse_mass(&self, index: usize) -> f64 {
        self.positions[index].inverse_mass
    }

    /// Fix a particle in place (zero its inverse mass).
    pub fn fix_particle(&mut self, index: usize) {
        if let Some(p) = self.positions.get_mut(index) {
            p.inverse_mass = 0.0;
            p.velocity = Vector3::zeros();
            p.flags.insert(ParticleFlags::FIXED);
        }
    }

    /// Release a fixed particle, restoring the inverse of its stored mass.
    pub fn free_particle(&mut self, index: usize) {
        if let Some(p) = self.positions.get_mut(index) {
            if p.mass.is_finite() && p.mass > 0.0 {
                p.inverse_mass = 1.0 / p.mass;
                p.flags.remove(ParticleFlags::FIXED);
            }
        }
    }

    /// Add to a particle's force accumulator.
    pub fn add_force(&mut self, index: usize, force: Vector3<f64>) {
        self.positions[index].force_sum += force;
    }

    /// Add to a particle's torque accumulator.
    pub fn add_torque(&mut self, rotation_index: usize, torque: Vector3<f64>) {
        self.rotations[rotation_index].torque_sum += torque;
    }

    /// Zero all force and torque accumulators. Called at step start.
    pub fn clear_force_sums(&mut self) {
        for p in &mut self.positions {
            p.force_sum = Vector3::zeros();
        }
        for r in &mut self.rotations {
            r.torque_sum = Vector3::zeros();
        }
    }

    /// Validate that a set of position indices belongs to this store.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IndexOutOfBounds`] for the first offending
    /// index.
    pub fn check_indices(&self, indices: &[usize]) -> Result<(), ConfigError> {
        let count = self.positions.len();
        for &index in indices {
            if index >= count {
                return Err(ConfigError::index_out_of_bounds(index, count));
            }
        }
        Ok(())
    }

    /// Validate that a set of rotation indices belongs to this store.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::IndexOutOfBounds`] for the first offending
    /// index.
    pub fn check_rotation_indices(&self, indices: &[usize]) -> Result<(), ConfigError> {
        let count = self.rotations.len();
        for &index in indices {
            if index >= count {
                return Err(ConfigError::index_out_of_bounds(index, count));
            }
        }
        Ok(())
    }

    /// Total kinetic energy over all particles.
    #[must_use]
    pub fn kinetic_energy(&self) -> f64 {
        self.positions.iter().map(ParticlePosition::kinetic_energy).sum()
    }

    /// Check all particle state for `NaN`/`Inf`.
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.positions.iter().all(|p| {
            p.current.coords.iter().all(|c| c.is_finite())
                && p.velocity.iter().all(|c| c.is_finite())
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_add_particles() {
        let mut system = ParticleSystem::new();
        let a = system.add_particle(Point3::new(1.0, 2.0, 3.0), 2.0).unwrap();
        let b = system.add_fixed_particle(Point3::origin());

        assert_eq!(system.position_count(), 2);
        assert_eq!(a.position, 0);
        assert_eq!(b.position, 1);
        assert_relative_eq!(system.inverse_mass(0), 0.5, epsilon = 1e-12);
        assert_eq!(system.inverse_mass(1), 0.0);
        assert!(system.positions()[1].is_fixed());
    }

    #[test]
    fn test_invalid_mass_rejected() {
        let mut system = ParticleSystem::new();
        assert!(system.add_particle(Point3::origin(), 0.0).is_err());
        assert!(system.add_particle(Point3::origin(), -1.0).is_err());
        assert!(system.add_particle(Point3::origin(), f64::NAN).is_err());
        assert_eq!(system.position_count(), 0);
    }

    #[test]
    fn test_oriented_particle() {
        let mut system = ParticleSystem::new();
        let p = system
            .add_oriented_particle(Point3::origin(), 1.0, UnitQuaternion::identity(), 0.1)
            .unwrap();

        assert!(p.is_oriented());
        assert_eq!(system.rotation_count(), 1);
        assert_relative_eq!(system.rotations()[0].inverse_inertia, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn test_force_accumulation_and_clear() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::origin(), 1.0).unwrap();

        system.add_force(0, Vector3::new(1.0, 0.0, 0.0));
        system.add_force(0, Vector3::new(0.0, 2.0, 0.0));
        assert_eq!(system.positions()[0].force_sum, Vector3::new(1.0, 2.0, 0.0));

        system.clear_force_sums();
        assert_eq!(system.positions()[0].force_sum, Vector3::zeros());
    }

    #[test]
    fn test_fix_and_free() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::origin(), 4.0).unwrap();

        system.fix_particle(0);
        assert!(system.positions()[0].is_fixed());

        system.free_particle(0);
        assert!(!system.positions()[0].is_fixed());
        assert_relative_eq!(system.inverse_mass(0), 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_check_indices() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::origin(), 1.0).unwrap();
        system.add_particle(Point3::origin(), 1.0).unwrap();

        assert!(system.check_indices(&[0, 1]).is_ok());
        let err = system.check_indices(&[0, 2]).unwrap_err();
        assert!(err.is_wiring_error());
    }

    #[test]
    fn test_kinetic_energy() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::origin(), 2.0).unwrap();
        system.positions_mut()[0].velocity = Vector3::new(3.0, 0.0, 0.0);

        // 0.5 * 2 * 9
        assert_relative_eq!(system.kinetic_energy(), 9.0, epsilon = 1e-12);
    }
}
