//! Target constraints: corrections toward fixed or host-supplied geometry.
//!
//! One target constraint instance maps many particles to many independent
//! targets through a parallel `target_indices` array; each target carries
//! its own blend weight. Host geometry (curves, surfaces, meshes) plugs in
//! through the [`ClosestPoint`] trait, which is the single query shape the
//! constraints need.

mod inside_bounds;
mod on_geometry;
mod on_plane;
mod on_position;
mod on_rotation;
mod on_sphere;

pub use inside_bounds::InsideBounds;
pub use on_geometry::OnGeometry;
pub use on_plane::OnPlane;
pub use on_position::OnPosition;
pub use on_rotation::OnRotation;
pub use on_sphere::OnSphere;

use nalgebra::{Point3, Vector3};

use relax_core::{DeltaAccumulator, Energy, ParticleSystem};
use relax_types::{Circle3, ConfigError, Line3, Plane, Sphere, Target};

use crate::element::Delta;

/// A closest-point query result on host geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfacePoint {
    /// The closest point on the target.
    pub point: Point3<f64>,
    /// Unit normal (surfaces) or tangent (curves) at that point.
    pub direction: Vector3<f64>,
}

/// Closest-point queries against opaque host geometry.
///
/// Implementors return `None` where the closest point is not unique (e.g.
/// the center of a sphere); the querying constraint then skips that
/// particle for the step.
pub trait ClosestPoint: Send + Sync {
    /// Closest point on the target to `point`, with the local direction.
    fn closest_point(&self, point: &Point3<f64>) -> Option<SurfacePoint>;
}

impl ClosestPoint for Plane {
    fn closest_point(&self, point: &Point3<f64>) -> Option<SurfacePoint> {
        Some(SurfacePoint {
            point: self.project(point),
            direction: self.normal.into_inner(),
        })
    }
}

impl ClosestPoint for Sphere {
    fn closest_point(&self, point: &Point3<f64>) -> Option<SurfacePoint> {
        let closest = Sphere::closest_point(self, point)?;
        Some(SurfacePoint {
            point: closest,
            direction: (point - self.center).normalize(),
        })
    }
}

impl ClosestPoint for Line3 {
    fn closest_point(&self, point: &Point3<f64>) -> Option<SurfacePoint> {
        Some(SurfacePoint {
            point: self.project(point),
            direction: self.direction.into_inner(),
        })
    }
}

impl ClosestPoint for Circle3 {
    fn closest_point(&self, point: &Point3<f64>) -> Option<SurfacePoint> {
        let closest = Circle3::closest_point(self, point)?;
        let radial = closest - self.center;
        Some(SurfacePoint {
            point: closest,
            direction: self.normal.cross(&radial).normalize(),
        })
    }
}

/// Shared plumbing for position-target constraints: the particle indices,
/// the parallel target-index array, the targets, and the delta buffer.
#[derive(Debug)]
pub(crate) struct TargetMap<T> {
    indices: Vec<usize>,
    target_indices: Vec<usize>,
    targets: Vec<Target<T>>,
    deltas: Vec<Delta>,
}

impl<T> TargetMap<T> {
    /// Create a map pairing `indices[k]` with `targets[target_indices[k]]`.
    pub fn new(
        indices: Vec<usize>,
        target_indices: Vec<usize>,
        targets: Vec<Target<T>>,
    ) -> Result<Self, ConfigError> {
        if indices.len() != target_indices.len() {
            return Err(ConfigError::mismatched_arrays(
                indices.len(),
                target_indices.len(),
                "target indices",
            ));
        }
        for &target_index in &target_indices {
            if target_index >= targets.len() {
                return Err(ConfigError::index_out_of_bounds(
                    target_index,
                    targets.len(),
                ));
            }
        }
        let deltas = vec![Delta::ZERO; indices.len()];
        Ok(Self {
            indices,
            target_indices,
            targets,
            deltas,
        })
    }

    /// Create a map where every particle shares one target.
    pub fn uniform(indices: Vec<usize>, target: Target<T>) -> Self {
        let target_indices = vec![0; indices.len()];
        let deltas = vec![Delta::ZERO; indices.len()];
        Self {
            indices,
            target_indices,
            targets: vec![target],
            deltas,
        }
    }

    pub fn validate(&self, system: &ParticleSystem) -> Result<(), ConfigError> {
        system.check_indices(&self.indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn deltas(&self) -> &[Delta] {
        &self.deltas
    }

    /// Recompute every delta with `correction(position, shape)`; a `None`
    /// correction marks that pair "no contribution" for the step.
    pub fn calculate_with<F>(&mut self, system: &ParticleSystem, correction: F)
    where
        F: Fn(&Point3<f64>, &T) -> Option<Vector3<f64>>,
    {
        let positions = system.positions();
        for ((&index, &target_index), delta) in self
            .indices
            .iter()
            .zip(&self.target_indices)
            .zip(&mut self.deltas)
        {
            let target = &self.targets[target_index];
            *delta = match correction(&positions[index].current, &target.shape) {
                Some(correction) => Delta::new(correction, target.weight.value()),
                None => Delta::ZERO,
            };
        }
    }

    pub fn apply(&self, accumulator: &mut DeltaAccumulator) {
        for (&index, delta) in self.indices.iter().zip(&self.deltas) {
            if delta.is_valid() {
                accumulator.add(index, delta.correction, delta.weight);
            }
        }
    }

    pub fn energy(&self) -> Energy {
        let linear = self
            .deltas
            .iter()
            .filter(|d| d.is_valid())
            .map(|d| d.correction.norm())
            .sum();
        Energy::new(linear, 0.0)
    }
}
