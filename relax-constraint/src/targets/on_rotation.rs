//! Orientation constraints toward fixed rotations.

use relax_core::{Constraint, DeltaAccumulator, Energy, ParticleSystem};
use relax_types::{ConfigError, RotationTarget, UnitQuaternion, Weight};

use crate::element::Delta;

/// Pulls each mapped oriented particle toward its target rotation.
///
/// Corrections are axis-angle vectors (the rotation carrying the current
/// orientation onto the target) and accumulate through the angular side of
/// the delta accumulator, blending with other rotation constraints the same
/// way position corrections blend.
#[derive(Debug)]
pub struct OnRotation {
    rotation_indices: Vec<usize>,
    target_indices: Vec<usize>,
    targets: Vec<RotationTarget>,
    deltas: Vec<Delta>,
}

impl OnRotation {
    /// Map rotation slot `rotation_indices[k]` to
    /// `targets[target_indices[k]]`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for mismatched arrays or a target index
    /// outside `targets`.
    pub fn new(
        rotation_indices: Vec<usize>,
        target_indices: Vec<usize>,
        targets: Vec<RotationTarget>,
    ) -> Result<Self, ConfigError> {
        if rotation_indices.len() != target_indices.len() {
            return Err(ConfigError::mismatched_arrays(
                rotation_indices.len(),
                target_indices.len(),
                "target indices",
            ));
        }
        for &target_index in &target_indices {
            if target_index >= targets.len() {
                return Err(ConfigError::index_out_of_bounds(
                    target_index,
                    targets.len(),
                ));
            }
        }
        let deltas = vec![Delta::ZERO; rotation_indices.len()];
        Ok(Self {
            rotation_indices,
            target_indices,
            targets,
            deltas,
        })
    }

    /// Hold one rotation slot at one target orientation.
    #[must_use]
    pub fn anchor(rotation_index: usize, target: UnitQuaternion<f64>, weight: Weight) -> Self {
        Self {
            rotation_indices: vec![rotation_index],
            target_indices: vec![0],
            targets: vec![RotationTarget::new(target, weight)],
            deltas: vec![Delta::ZERO],
        }
    }
}

impl Constraint for OnRotation {
    fn initialize(&mut self, system: &ParticleSystem) -> Result<(), ConfigError> {
        system.check_rotation_indices(&self.rotation_indices)
    }

    fn calculate(&mut self, system: &ParticleSystem) {
        let rotations = system.rotations();
        for ((&rotation_index, &target_index), delta) in self
            .rotation_indices
            .iter()
            .zip(&self.target_indices)
            .zip(&mut self.deltas)
        {
            let target = &self.targets[target_index];
            let current = rotations[rotation_index].current;
            let axis_angle = (target.shape * current.inverse()).scaled_axis();
            *delta = Delta::new(axis_angle, target.weight.value());
        }
    }

    fn apply(&self, _system: &mut ParticleSystem, accumulator: &mut DeltaAccumulator) {
        for (&rotation_index, delta) in self.rotation_indices.iter().zip(&self.deltas) {
            if delta.is_valid() {
                accumulator.add_angular(rotation_index, delta.correction, delta.weight);
            }
        }
    }

    fn energy(&self) -> Energy {
        let angular = self
            .deltas
            .iter()
            .filter(|d| d.is_valid())
            .map(|d| d.correction.norm())
            .sum();
        Energy::new(0.0, angular)
    }

    fn particles(&self) -> &[usize] {
        // Touches rotation slots only.
        &[]
    }
}
