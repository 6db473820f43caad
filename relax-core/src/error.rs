//! Error types for solver operations.

use thiserror::Error;

/// Errors that can occur while driving a relaxation step.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SolveError {
    /// Invalid timestep.
    #[error("invalid timestep: {0} (must be positive and finite)")]
    InvalidTimestep(f64),

    /// A constraint was bound against a different particle store.
    #[error("constraint setup failed: {0}")]
    Setup(#[from] relax_types::ConfigError),

    /// Simulation diverged (`NaN` or `Inf` detected in particle state).
    #[error("relaxation diverged: {reason}")]
    Diverged {
        /// Description of what went wrong.
        reason: String,
    },
}

impl SolveError {
    /// Create a diverged error.
    #[must_use]
    pub fn diverged(reason: impl Into<String>) -> Self {
        Self::Diverged {
            reason: reason.into(),
        }
    }

    /// Check if this is a divergence error.
    #[must_use]
    pub fn is_diverged(&self) -> bool {
        matches!(self, Self::Diverged { .. })
    }
}

/// Result type for solver operations.
pub type Result<T> = std::result::Result<T, SolveError>;
