//! Core data types for position-based relaxation.
//!
//! This crate provides the foundational types shared across the relaxation
//! stack:
//!
//! - [`Particle`] - Handle identifying a particle's position/rotation slots
//! - [`Weight`] - Validated non-negative influence weight
//! - [`Plane`], [`Sphere`], [`Circle3`], [`Line3`], [`Bounds`] - Geometric
//!   primitives used as fit results and correction targets
//! - [`ConfigError`] - Eagerly-raised configuration errors
//!
//! # Design Philosophy
//!
//! These types are **pure data**. They have no solver logic, no particle
//! state, no parallelism. They're the common language between:
//!
//! - The particle store and solver driver (`relax-core`)
//! - The constraint and force library (`relax-constraint`)
//! - Host applications wiring particles to constraints
//!
//! # Validation
//!
//! Anything that can be wrong by construction is rejected here, at
//! construction: negative weights, negative radii, mismatched parallel
//! arrays. Degenerate *runtime* geometry (a zero-length separation, a
//! rank-deficient fit) is deliberately not an error at this layer - the
//! constraint library absorbs those case by case.
//!
//! # Example
//!
//! ```
//! use relax_types::{Particle, Plane, Weight};
//! use nalgebra::{Point3, Vector3};
//!
//! let anchor = Particle::position_only(0);
//! assert!(!anchor.is_oriented());
//!
//! let weight = Weight::new(2.0)?;
//! assert_eq!(weight.value(), 2.0);
//!
//! let ground = Plane::from_point_normal(Point3::origin(), Vector3::z())
//!     .expect("non-zero normal");
//! assert_eq!(ground.signed_distance(&Point3::new(0.0, 0.0, 3.0)), 3.0);
//! # Ok::<(), relax_types::ConfigError>(())
//! ```

#![doc(html_root_url = "https://docs.rs/relax-types/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod error;
mod geometry;
mod particle;
mod weight;

pub use error::ConfigError;
pub use geometry::{Bounds, Circle3, Line3, Plane, RotationTarget, Sphere, Target};
pub use particle::{next_system_id, Particle, ParticleFlags, SystemId, SystemIdGenerator};
pub use weight::Weight;

// Re-export math types for convenience
pub use nalgebra::{Point3, Unit, UnitQuaternion, Vector3};

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_weight_roundtrip() {
        let w = Weight::new(0.5).unwrap();
        assert_eq!(f64::from(w), 0.5);
    }

    #[test]
    fn test_target_pairing() {
        let target = Target::new(
            Sphere::new(Point3::origin(), 1.0).unwrap(),
            Weight::new(3.0).unwrap(),
        );
        assert_eq!(target.shape.radius, 1.0);
        assert_eq!(target.weight.value(), 3.0);
    }
}
