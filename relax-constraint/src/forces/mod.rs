//! Forces: additive contributions to the per-particle force/torque sums.
//!
//! Forces follow a different accumulation discipline than geometric
//! constraints: physical influences from several sources superpose, so
//! their `apply` adds straight into the store's force sums and bypasses the
//! weighted-average accumulator entirely. The solver evaluates them once
//! per substep, before position prediction.

mod area_load;
mod field;
mod gravity;
mod linear_load;

pub use area_load::{AreaLoad, Pressure};
pub use field::{AccelerationField, ForceField, VectorField};
pub use gravity::GravityLoad;
pub use linear_load::LinearLoad;
