//! Position-based relaxation core.
//!
//! This crate provides the shared machinery every constraint and force in
//! the relaxation stack builds on:
//!
//! - [`ParticleSystem`] - The store owning all per-particle state
//! - [`DeltaAccumulator`] - Weighted blending of concurrent corrections
//! - [`Constraint`] - The polymorphic calculate/apply/energy contract
//! - [`Solver`] - The step driver (forces, prediction, projection loop)
//! - [`fit`] - Closed-form/least-squares line, plane, circle, sphere fits
//! - [`parallel`] - Fork-join helpers for chunked delta evaluation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Solver                               │
//! │  Per substep: forces → predict → iterate(calculate ∥,       │
//! │  apply serial, integrate blended deltas) → damp velocities  │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    DeltaAccumulator                          │
//! │  Per particle: Σ(correction·weight), Σweight → blended Δ    │
//! └─────────────────────────┬───────────────────────────────────┘
//!                           │
//!                           ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     ParticleSystem                           │
//! │  Positions, rotations, inverse masses, force/torque sums    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Concurrency Contract
//!
//! The calculate phase is read-shared: many constraints read the store, each
//! writes only its own delta buffer, so the solver fans calculate out across
//! rayon workers with no synchronization. The apply phase mutates the shared
//! accumulator and is serialized - safety comes from phase separation, not
//! locks.
//!
//! # Quick Start
//!
//! ```
//! use relax_core::{ParticleSystem, Solver, SolverConfig};
//! use nalgebra::Point3;
//!
//! let mut system = ParticleSystem::new();
//! let anchor = system.add_fixed_particle(Point3::origin());
//! let tip = system.add_particle(Point3::new(1.0, 0.0, 0.0), 0.1)?;
//! assert!(system.positions()[anchor.position].is_fixed());
//! assert!(!system.positions()[tip.position].is_fixed());
//!
//! let mut solver = Solver::new(SolverConfig::form_finding());
//! // Constraints and forces come from the `relax-constraint` crate.
//! let stats = solver.step(&mut system, &mut [], &mut [], 1.0 / 60.0)?;
//! assert!(stats.converged);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![doc(html_root_url = "https://docs.rs/relax-core/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod accumulator;
mod constraint;
mod error;
pub mod fit;
pub mod parallel;
mod particle;
mod solver;

pub use accumulator::DeltaAccumulator;
pub use constraint::{Constraint, Energy};
pub use error::{Result, SolveError};
pub use particle::{ParticlePosition, ParticleRotation, ParticleSystem};
pub use solver::{Solver, SolverConfig, SolverStats};

// Re-export the shared data types for convenience
pub use relax_types::{
    Bounds, Circle3, ConfigError, Line3, Particle, ParticleFlags, Plane, Sphere, SystemId, Target,
    Weight,
};
