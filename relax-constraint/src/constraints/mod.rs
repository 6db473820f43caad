//! Geometric constraints: corrections that blend through the weighted
//! accumulator.

mod cocircular;
mod colinear;
mod coplanar;
mod cospherical;
mod distance;
mod equal_length;
mod match_rigid;
mod smooth;

pub use cocircular::Cocircular;
pub use colinear::Colinear;
pub use coplanar::Coplanar;
pub use cospherical::Cospherical;
pub use distance::Distance;
pub use equal_length::EqualLength;
pub use match_rigid::MatchRigid;
pub use smooth::Smooth;
