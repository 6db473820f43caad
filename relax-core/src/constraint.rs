//! The polymorphic constraint/force contract.
//!
//! Every constraint and force implements one capability trait with a
//! two-phase per-step lifecycle:
//!
//! ```text
//! initialize  (once, after any topology change: cache rest quantities)
//! per step:
//!   calculate (reads shared particle state, writes own delta buffer;
//!              safe to run in parallel across constraints)
//!   apply     (pushes deltas into the shared accumulator, or adds
//!              forces/torques to the particle sums; serialized)
//! ```
//!
//! `calculate` must not mutate particle state and must not touch another
//! constraint's state - that single rule is what makes the calculate phase
//! embarrassingly parallel. The apply phase takes the accumulator `&mut`,
//! so the type system enforces its serialization.
//!
//! Geometric corrections blend through the weighted accumulator; physical
//! forces superpose, so force types bypass the accumulator and add straight
//! into the per-particle force/torque sums. One trait covers both; the two
//! disciplines differ only in what `apply` writes to.

use crate::accumulator::DeltaAccumulator;
use crate::particle::ParticleSystem;

use relax_types::ConfigError;

/// Outstanding correction magnitude reported after `calculate`.
///
/// Purely derived from the last computed deltas: a satisfied constraint
/// reports exactly zero. The solver sums these for convergence/termination
/// diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Energy {
    /// Summed magnitude of position corrections.
    pub linear: f64,
    /// Summed magnitude of rotation corrections (axis-angle radians).
    pub angular: f64,
}

impl Energy {
    /// No outstanding correction.
    pub const ZERO: Self = Self {
        linear: 0.0,
        angular: 0.0,
    };

    /// Create an energy value.
    #[must_use]
    pub const fn new(linear: f64, angular: f64) -> Self {
        Self { linear, angular }
    }

    /// Combined magnitude.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.linear + self.angular
    }
}

impl std::ops::Add for Energy {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self {
            linear: self.linear + rhs.linear,
            angular: self.angular + rhs.angular,
        }
    }
}

impl std::ops::AddAssign for Energy {
    fn add_assign(&mut self, rhs: Self) {
        self.linear += rhs.linear;
        self.angular += rhs.angular;
    }
}

impl std::iter::Sum for Energy {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, std::ops::Add::add)
    }
}

/// A constraint or force acting on particles of one store.
///
/// Implementations own their particle-index arrays and transient delta
/// buffers; they never own particles. Degenerate runtime geometry (groups
/// with too few distinct points, zero-length separations, singular fits)
/// must zero the affected deltas and continue - group sizes are data-driven
/// and one bad group must not abort a step.
pub trait Constraint: Send + Sync {
    /// One-time setup after construction or any index/topology change:
    /// validate indices against the store and cache rest quantities.
    ///
    /// The default implementation does nothing.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for structural wiring bugs (indices outside
    /// the store); these are fatal to setup, unlike degenerate geometry.
    fn initialize(&mut self, system: &ParticleSystem) -> Result<(), ConfigError> {
        let _ = system;
        Ok(())
    }

    /// Compute this step's correction deltas from current particle state.
    ///
    /// Pure read of the store, pure write of `self`'s own buffers.
    fn calculate(&mut self, system: &ParticleSystem);

    /// Contribute the computed deltas: weighted corrections into the
    /// accumulator, or forces/torques into the store's sums.
    fn apply(&self, system: &mut ParticleSystem, accumulator: &mut DeltaAccumulator);

    /// Outstanding correction magnitude from the last [`Self::calculate`].
    fn energy(&self) -> Energy;

    /// Position indices this constraint references (diagnostics and
    /// scheduling; need not be deduplicated).
    fn particles(&self) -> &[usize];

    /// Whether `calculate` may partition its own elements across workers.
    fn is_parallel(&self) -> bool {
        false
    }
}
