//! Particle handles and flags.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// An immutable handle identifying a particle's slots in the owning store.
///
/// Constraints reference particles only through handles/indices, never by
/// owning the records: the store owns all particle state, and many
/// constraints may reference the same particle.
///
/// Every particle has a position slot; only oriented particles (those that
/// carry a rotation for rigid-match and rotation-target constraints) have a
/// rotation slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Particle {
    /// Index into the store's position records.
    pub position: usize,
    /// Index into the store's rotation records, if this particle is oriented.
    pub rotation: Option<usize>,
}

impl Particle {
    /// Create a handle for a position-only particle.
    #[must_use]
    pub const fn position_only(position: usize) -> Self {
        Self {
            position,
            rotation: None,
        }
    }

    /// Create a handle for an oriented particle.
    #[must_use]
    pub const fn oriented(position: usize, rotation: usize) -> Self {
        Self {
            position,
            rotation: Some(rotation),
        }
    }

    /// Check whether this particle carries rotation state.
    #[must_use]
    pub const fn is_oriented(&self) -> bool {
        self.rotation.is_some()
    }
}

bitflags::bitflags! {
    /// Flags for particle state and behavior.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
    pub struct ParticleFlags: u32 {
        /// Particle is fixed (infinite mass, immovable).
        const FIXED = 0b0000_0001;
        /// Particle lies on a boundary of the structure it belongs to.
        const BOUNDARY = 0b0000_0010;
    }
}

/// Unique identifier for a particle store.
///
/// Used to detect structural wiring bugs where a constraint built against
/// one store is evaluated against another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SystemId(pub u64);

impl SystemId {
    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for SystemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "System({})", self.0)
    }
}

/// Thread-safe generator for [`SystemId`]s.
pub struct SystemIdGenerator {
    next_id: std::sync::atomic::AtomicU64,
}

impl Default for SystemIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemIdGenerator {
    /// Create a new generator starting at 0.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_id: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Generate the next unique ID.
    pub fn next(&self) -> SystemId {
        SystemId(
            self.next_id
                .fetch_add(1, std::sync::atomic::Ordering::Relaxed),
        )
    }
}

static ID_GENERATOR: SystemIdGenerator = SystemIdGenerator::new();

/// Generate a new unique particle-store ID.
pub fn next_system_id() -> SystemId {
    ID_GENERATOR.next()
}
