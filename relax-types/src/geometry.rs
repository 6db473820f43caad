//! Geometric primitives used as fit results and correction targets.
//!
//! These are pure data plus the single query each consumer needs: a
//! closest-point (or projection) lookup. Fitting primitives to point sets
//! lives in `relax-core`; this module only describes the primitives
//! themselves.

use nalgebra::{Point3, Unit, UnitQuaternion, Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::weight::Weight;

/// An infinite plane through `origin` with unit `normal`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Plane {
    /// A point on the plane.
    pub origin: Point3<f64>,
    /// Unit normal.
    pub normal: Unit<Vector3<f64>>,
}

impl Plane {
    /// Create a plane from a point and a (not necessarily unit) normal.
    ///
    /// Returns `None` if the normal has (near-)zero length.
    #[must_use]
    pub fn from_point_normal(origin: Point3<f64>, normal: Vector3<f64>) -> Option<Self> {
        Unit::try_new(normal, 1e-12).map(|normal| Self { origin, normal })
    }

    /// Signed distance from `point` to the plane, positive on the normal side.
    #[must_use]
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        (point - self.origin).dot(&self.normal)
    }

    /// Orthogonal projection of `point` onto the plane.
    #[must_use]
    pub fn project(&self, point: &Point3<f64>) -> Point3<f64> {
        point - self.normal.as_ref() * self.signed_distance(point)
    }
}

/// A sphere with `center` and `radius`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Sphere {
    /// Center of the sphere.
    pub center: Point3<f64>,
    /// Radius, non-negative.
    pub radius: f64,
}

impl Sphere {
    /// Create a sphere, rejecting a negative or non-finite radius.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidLength`] for a negative or non-finite
    /// radius.
    pub fn new(center: Point3<f64>, radius: f64) -> Result<Self, ConfigError> {
        if radius.is_finite() && radius >= 0.0 {
            Ok(Self { center, radius })
        } else {
            Err(ConfigError::invalid_length("radius", radius))
        }
    }

    /// Closest point on the sphere surface to `point`.
    ///
    /// Returns `None` when `point` coincides with the center, where the
    /// closest point is not unique.
    #[must_use]
    pub fn closest_point(&self, point: &Point3<f64>) -> Option<Point3<f64>> {
        let radial = point - self.center;
        Unit::try_new(radial, 1e-12).map(|dir| self.center + dir.as_ref() * self.radius)
    }
}

/// A circle embedded in 3-space: center, plane normal, radius.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Circle3 {
    /// Center of the circle.
    pub center: Point3<f64>,
    /// Unit normal of the circle's plane.
    pub normal: Unit<Vector3<f64>>,
    /// Radius, non-negative.
    pub radius: f64,
}

impl Circle3 {
    /// Closest point on the circle to `point`.
    ///
    /// Returns `None` when `point` lies on the circle's axis, where every
    /// circle point is equidistant.
    #[must_use]
    pub fn closest_point(&self, point: &Point3<f64>) -> Option<Point3<f64>> {
        let offset = point - self.center;
        let in_plane = offset - self.normal.as_ref() * offset.dot(&self.normal);
        Unit::try_new(in_plane, 1e-12).map(|dir| self.center + dir.as_ref() * self.radius)
    }
}

/// An infinite line through `origin` with unit `direction`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Line3 {
    /// A point on the line.
    pub origin: Point3<f64>,
    /// Unit direction.
    pub direction: Unit<Vector3<f64>>,
}

impl Line3 {
    /// Orthogonal projection of `point` onto the line.
    #[must_use]
    pub fn project(&self, point: &Point3<f64>) -> Point3<f64> {
        let along = (point - self.origin).dot(&self.direction);
        self.origin + self.direction.as_ref() * along
    }
}

/// An axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Bounds {
    /// Minimum corner.
    pub min: Point3<f64>,
    /// Maximum corner.
    pub max: Point3<f64>,
}

impl Bounds {
    /// Create bounds from two corners, normalizing per-axis ordering.
    #[must_use]
    pub fn new(a: Point3<f64>, b: Point3<f64>) -> Self {
        Self {
            min: Point3::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: Point3::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Smallest bounds containing all `points`; `None` for an empty set.
    #[must_use]
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3<f64>>) -> Option<Self> {
        let mut iter = points.into_iter();
        let first = *iter.next()?;
        let mut bounds = Self {
            min: first,
            max: first,
        };
        for p in iter {
            bounds.min.x = bounds.min.x.min(p.x);
            bounds.min.y = bounds.min.y.min(p.y);
            bounds.min.z = bounds.min.z.min(p.z);
            bounds.max.x = bounds.max.x.max(p.x);
            bounds.max.y = bounds.max.y.max(p.y);
            bounds.max.z = bounds.max.z.max(p.z);
        }
        Some(bounds)
    }

    /// Check whether `point` lies inside (or on the surface of) the bounds.
    #[must_use]
    pub fn contains(&self, point: &Point3<f64>) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Clamp `point` into the bounds (identity for interior points).
    #[must_use]
    pub fn clamp(&self, point: &Point3<f64>) -> Point3<f64> {
        Point3::new(
            point.x.clamp(self.min.x, self.max.x),
            point.y.clamp(self.min.y, self.max.y),
            point.z.clamp(self.min.z, self.max.z),
        )
    }
}

/// A target shape paired with its own influence weight.
///
/// Target constraints map many particles to many independent targets; each
/// target carries the weight its corrections are blended with.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Target<T> {
    /// The target shape or value.
    pub shape: T,
    /// Influence weight for corrections toward this target.
    pub weight: Weight,
}

impl<T> Target<T> {
    /// Create a target with the given weight.
    #[must_use]
    pub const fn new(shape: T, weight: Weight) -> Self {
        Self { shape, weight }
    }
}

/// A fixed orientation target.
pub type RotationTarget = Target<UnitQuaternion<f64>>;
