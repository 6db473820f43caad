//! Validated influence weights.

use crate::error::ConfigError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A non-negative, finite influence weight.
///
/// Weights express the relative influence of a constraint (or of one element
/// or target within a constraint) when several corrections are blended for
/// the same particle. Validation happens once, at construction; downstream
/// code can rely on every `Weight` being usable without re-checking.
///
/// A zero weight is valid and means "contributes nothing".
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "f64", into = "f64"))]
pub struct Weight(f64);

impl Weight {
    /// Zero influence.
    pub const ZERO: Self = Self(0.0);

    /// Unit influence, the default for most constraints.
    pub const ONE: Self = Self(1.0);

    /// Create a weight, rejecting negative and non-finite values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidWeight`] if `value` is negative, `NaN`,
    /// or infinite.
    pub fn new(value: f64) -> Result<Self, ConfigError> {
        if value.is_finite() && value >= 0.0 {
            Ok(Self(value))
        } else {
            Err(ConfigError::invalid_weight(value))
        }
    }

    /// Get the raw value.
    #[must_use]
    pub const fn value(self) -> f64 {
        self.0
    }

    /// Check whether this weight contributes anything.
    #[must_use]
    pub fn is_zero(self) -> bool {
        self.0 == 0.0
    }
}

impl Default for Weight {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<f64> for Weight {
    type Error = ConfigError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Weight> for f64 {
    fn from(weight: Weight) -> Self {
        weight.0
    }
}

impl std::fmt::Display for Weight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
