//! Constraint and force library for position-based relaxation.
//!
//! This crate provides the concrete constraint types that drive a
//! [`relax_core::Solver`]. Every type implements the
//! [`Constraint`](relax_core::Constraint) contract - `initialize` /
//! `calculate` / `apply` / `energy` - and falls into one of two
//! accumulation disciplines:
//!
//! - **Geometric constraints** compute position (or rotation) corrections
//!   that blend through the weighted delta accumulator. Several constraints
//!   touching one particle average by weight instead of fighting.
//! - **Forces** add straight into the per-particle force/torque sums:
//!   physical loads superpose.
//!
//! # Constraint Types
//!
//! Batched group constraints (many independent [`Element`]s per instance):
//!
//! - [`Distance`] - Springs toward per-pair rest lengths
//! - [`EqualLength`] - Equalize polyline segment lengths
//! - [`Colinear`], [`Coplanar`], [`Cocircular`], [`Cospherical`] -
//!   Rejections onto refit lines, planes, circles, spheres
//! - [`Smooth`] - Laplacian smoothing toward neighbor centroids
//! - [`MatchRigid`] - Shape matching via polar decomposition
//! - [`SphereCollide`] - Sphere-sphere separation over a hash grid
//!
//! Target constraints (parallel particle/target index arrays):
//!
//! - [`OnPosition`], [`OnPlane`], [`OnSphere`], [`InsideBounds`]
//! - [`OnGeometry`] - Host geometry through the [`ClosestPoint`] trait
//! - [`OnRotation`] - Orientation targets, corrected as axis-angle
//!
//! Forces:
//!
//! - [`GravityLoad`], [`LinearLoad`], [`AreaLoad`], [`Pressure`]
//! - [`ForceField`], [`AccelerationField`] - Sampled [`VectorField`]s
//!
//! # Degenerate Geometry
//!
//! Group sizes are data-driven, so degenerate input is a recognized runtime
//! condition, not an error: a group with too few distinct points, a
//! rank-deficient fit, a zero-length separation each zero their deltas for
//! the step and the simulation continues. Configuration mistakes - negative
//! weights, negative radii, mismatched arrays, indices outside the store -
//! are rejected eagerly at construction or `initialize` time instead.
//!
//! # Example
//!
//! ```
//! use nalgebra::{Point3, Vector3};
//! use relax_constraint::{Distance, GravityLoad};
//! use relax_core::{Constraint, ParticleSystem, Solver, SolverConfig};
//! use relax_types::Weight;
//!
//! // A two-segment hanging chain.
//! let mut system = ParticleSystem::new();
//! system.add_fixed_particle(Point3::new(0.0, 0.0, 1.0));
//! system.add_particle(Point3::new(1.0, 0.0, 1.0), 0.1)?;
//! system.add_particle(Point3::new(2.0, 0.0, 1.0), 0.1)?;
//!
//! let mut constraints: Vec<Box<dyn Constraint>> = vec![Box::new(Distance::new(
//!     vec![[0, 1], [1, 2]],
//!     Weight::new(10.0)?,
//! ))];
//! let mut forces: Vec<Box<dyn Constraint>> =
//!     vec![Box::new(GravityLoad::earth(vec![1, 2]))];
//!
//! let mut solver = Solver::new(SolverConfig::form_finding());
//! solver.initialize(&system, &mut constraints, &mut forces)?;
//! for _ in 0..100 {
//!     solver.step(&mut system, &mut constraints, &mut forces, 1.0 / 60.0)?;
//! }
//!
//! // The free end sags under gravity.
//! assert!(system.positions()[2].current.z < 1.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![doc(html_root_url = "https://docs.rs/relax-constraint/0.1.0")]
#![deny(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![warn(missing_docs)]
#![allow(clippy::missing_const_for_fn)]

mod collide;
mod constraints;
mod element;
mod forces;
mod targets;

pub use collide::SphereCollide;
pub use constraints::{
    Cocircular, Colinear, Coplanar, Cospherical, Distance, EqualLength, MatchRigid, Smooth,
};
pub use element::{Delta, Element, ElementBatch};
pub use forces::{
    AccelerationField, AreaLoad, ForceField, GravityLoad, LinearLoad, Pressure, VectorField,
};
pub use targets::{
    ClosestPoint, InsideBounds, OnGeometry, OnPlane, OnPosition, OnRotation, OnSphere,
    SurfacePoint,
};

// Re-export the contract types constraint consumers need
pub use relax_core::{Constraint, DeltaAccumulator, Energy, ParticleSystem};
pub use relax_types::{Bounds, Circle3, ConfigError, Line3, Plane, Sphere, Target, Weight};

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_constraints_are_object_safe() {
        let mut system = ParticleSystem::new();
        system.add_particle(Point3::origin(), 1.0).unwrap();
        system.add_particle(Point3::new(1.0, 0.0, 0.0), 1.0).unwrap();

        let mut constraints: Vec<Box<dyn Constraint>> = vec![
            Box::new(Distance::new(vec![[0, 1]], Weight::ONE)),
            Box::new(OnPosition::anchor(0, Point3::origin(), Weight::ONE)),
            Box::new(GravityLoad::earth(vec![0, 1])),
        ];

        for constraint in &mut constraints {
            constraint.initialize(&system).unwrap();
            constraint.calculate(&system);
        }
    }
}
