//! The weighted delta accumulator.
//!
//! Many constraints may correct the same particle in one step. Rather than
//! letting them fight by summing raw corrections, every contribution is a
//! `(correction, weight)` pair and the accumulator resolves each particle to
//! the weighted average `Σ(correction·weight) / Σweight`. Constraints stay
//! ignorant of each other; a particle touched by many constraints gets a
//! blended correction instead of a runaway sum.
//!
//! The accumulator is step-scoped shared state: the solver resets it before
//! any constraint runs and threads it `&mut` through the serialized apply
//! phase, so concurrent writes cannot occur by construction.

use nalgebra::Vector3;

use crate::particle::ParticleSystem;

/// Per-particle running sums of weighted corrections.
///
/// Linear buffers are keyed by position index; angular buffers (axis-angle
/// corrections) by rotation index.
#[derive(Debug, Default)]
pub struct DeltaAccumulator {
    linear_sum: Vec<Vector3<f64>>,
    linear_weight: Vec<f64>,
    angular_sum: Vec<Vector3<f64>>,
    angular_weight: Vec<f64>,
}

impl DeltaAccumulator {
    /// Create an empty accumulator; size it with [`Self::reset`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resize to match `system` and zero every buffer.
    ///
    /// Must be called at the start of every step, before any constraint
    /// applies its deltas.
    pub fn reset(&mut self, system: &ParticleSystem) {
        self.reset_with(system.position_count(), system.rotation_count());
    }

    /// Resize to explicit counts and zero every buffer.
    pub fn reset_with(&mut self, positions: usize, rotations: usize) {
        self.linear_sum.clear();
        self.linear_sum.resize(positions, Vector3::zeros());
        self.linear_weight.clear();
        self.linear_weight.resize(positions, 0.0);
        self.angular_sum.clear();
        self.angular_sum.resize(rotations, Vector3::zeros());
        self.angular_weight.clear();
        self.angular_weight.resize(rotations, 0.0);
    }

    /// Number of position slots currently tracked.
    #[must_use]
    pub fn position_count(&self) -> usize {
        self.linear_sum.len()
    }

    /// Number of rotation slots currently tracked.
    #[must_use]
    pub fn rotation_count(&self) -> usize {
        self.angular_sum.len()
    }

    /// Add a weighted position correction for `index`.
    ///
    /// Weights are validated non-negative before they reach the accumulator
    /// (constraints construct them as [`relax_types::Weight`]); a negative
    /// weight here is a programming error upstream.
    pub fn add(&mut self, index: usize, correction: Vector3<f64>, weight: f64) {
        debug_assert!(weight >= 0.0, "negative weight reached the accumulator");
        self.linear_sum[index] += correction * weight;
        self.linear_weight[index] += weight;
    }

    /// Add a weighted axis-angle rotation correction for `rotation_index`.
    pub fn add_angular(&mut self, rotation_index: usize, axis_angle: Vector3<f64>, weight: f64) {
        debug_assert!(weight >= 0.0, "negative weight reached the accumulator");
        self.angular_sum[rotation_index] += axis_angle * weight;
        self.angular_weight[rotation_index] += weight;
    }

    /// Resolve the blended position correction for `index`.
    ///
    /// Returns `Σ(correction·weight) / Σweight`, or zero if nothing touched
    /// this particle.
    #[must_use]
    pub fn resolve(&self, index: usize) -> Vector3<f64> {
        let weight = self.linear_weight[index];
        if weight > 0.0 {
            self.linear_sum[index] / weight
        } else {
            Vector3::zeros()
        }
    }

    /// Resolve the blended axis-angle rotation correction for
    /// `rotation_index`; zero if nothing touched it.
    #[must_use]
    pub fn resolve_angular(&self, rotation_index: usize) -> Vector3<f64> {
        let weight = self.angular_weight[rotation_index];
        if weight > 0.0 {
            self.angular_sum[rotation_index] / weight
        } else {
            Vector3::zeros()
        }
    }

    /// Total weight contributed to position `index` this step.
    #[must_use]
    pub fn weight_sum(&self, index: usize) -> f64 {
        self.linear_weight[index]
    }
}
