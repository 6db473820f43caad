//! Closed-form and least-squares primitive fitting.
//!
//! Every fit is tolerance-free from the caller's perspective: it either
//! produces a primitive or reports `None` for rank-deficient input
//! (too few points, coincident points, collinear input to a plane fit,
//! coplanar input to a sphere fit). Callers treat `None` as a recognized
//! degenerate case and contribute nothing, never as an error.
//!
//! Line and plane fits are total-least-squares via the eigendecomposition of
//! the point covariance; sphere and circle fits solve the algebraic
//! least-squares normal equations.

use nalgebra::{Matrix3, Matrix4, Point3, Unit, Vector3, Vector4};

use relax_types::{Circle3, Line3, Plane, Sphere};

/// Relative eigenvalue threshold below which a covariance direction is
/// treated as collapsed.
const RANK_EPS: f64 = 1e-9;

/// Absolute floor for the dominant eigenvalue; below this every point is
/// coincident.
const SCALE_EPS: f64 = 1e-18;

fn centroid(points: &[Point3<f64>]) -> Point3<f64> {
    let sum: Vector3<f64> = points.iter().map(|p| p.coords).sum();
    Point3::from(sum / points.len() as f64)
}

/// Covariance of `points` about `center`, plus eigen-decomposition with
/// eigenvalues sorted ascending.
fn sorted_eigen(points: &[Point3<f64>], center: &Point3<f64>) -> ([f64; 3], [Vector3<f64>; 3]) {
    let mut cov = Matrix3::zeros();
    for p in points {
        let d = p - center;
        cov += d * d.transpose();
    }

    let eig = cov.symmetric_eigen();
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| {
        eig.eigenvalues[a]
            .partial_cmp(&eig.eigenvalues[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    (
        [
            eig.eigenvalues[order[0]],
            eig.eigenvalues[order[1]],
            eig.eigenvalues[order[2]],
        ],
        [
            eig.eigenvectors.column(order[0]).into_owned(),
            eig.eigenvectors.column(order[1]).into_owned(),
            eig.eigenvectors.column(order[2]).into_owned(),
        ],
    )
}

/// Fit a total-least-squares line through `points`.
///
/// Requires at least 2 distinct points; returns `None` when all points
/// coincide.
#[must_use]
pub fn fit_line(points: &[Point3<f64>]) -> Option<Line3> {
    if points.len() < 2 {
        return None;
    }
    let center = centroid(points);
    let (values, vectors) = sorted_eigen(points, &center);

    if values[2] < SCALE_EPS {
        return None;
    }
    let direction = Unit::try_new(vectors[2], 1e-12)?;
    Some(Line3 {
        origin: center,
        direction,
    })
}

/// Fit a total-least-squares plane through `points`.
///
/// Requires at least 3 points spanning two directions; returns `None` for
/// coincident or collinear input.
#[must_use]
pub fn fit_plane(points: &[Point3<f64>]) -> Option<Plane> {
    if points.len() < 3 {
        return None;
    }
    let center = centroid(points);
    let (values, vectors) = sorted_eigen(points, &center);

    if values[2] < SCALE_EPS || values[1] < values[2] * RANK_EPS {
        return None;
    }
    let normal = Unit::try_new(vectors[0], 1e-12)?;
    Some(Plane {
        origin: center,
        normal,
    })
}

/// Fit a sphere to `points` by algebraic least squares.
///
/// Requires at least 4 points spanning three directions; returns `None` for
/// coplanar (or lower-rank) input, where the algebraic system is singular.
#[must_use]
pub fn fit_sphere(points: &[Point3<f64>]) -> Option<Sphere> {
    if points.len() < 4 {
        return None;
    }
    let center = centroid(points);
    let (values, _) = sorted_eigen(points, &center);
    if values[2] < SCALE_EPS || values[0] < values[2] * RANK_EPS {
        return None;
    }

    // |p|^2 = 2 c·p + d with d = r^2 - |c|^2, solved in normal-equation form.
    // Positions are taken relative to the centroid for conditioning.
    let mut m = Matrix4::zeros();
    let mut rhs = Vector4::zeros();
    for p in points {
        let d = p - center;
        let row = Vector4::new(2.0 * d.x, 2.0 * d.y, 2.0 * d.z, 1.0);
        m += row * row.transpose();
        rhs += row * d.norm_squared();
    }

    let solution = m.lu().solve(&rhs)?;
    if !solution.iter().all(|v| v.is_finite()) {
        return None;
    }

    let local_center = Vector3::new(solution.x, solution.y, solution.z);
    let radius_squared = solution.w + local_center.norm_squared();
    if !(radius_squared.is_finite() && radius_squared > 0.0) {
        return None;
    }

    Some(Sphere {
        center: center + local_center,
        radius: radius_squared.sqrt(),
    })
}

/// An orthonormal basis for the plane orthogonal to `normal`.
fn plane_basis(normal: &Unit<Vector3<f64>>) -> (Vector3<f64>, Vector3<f64>) {
    // Seed with the world axis least aligned with the normal.
    let seed = if normal.x.abs() <= normal.y.abs() && normal.x.abs() <= normal.z.abs() {
        Vector3::x()
    } else if normal.y.abs() <= normal.z.abs() {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let u = normal.cross(&seed).normalize();
    let v = normal.cross(&u);
    (u, v)
}

/// Fit a circle to `points`: best-fit plane, then an algebraic circle fit of
/// the in-plane projections.
///
/// Requires at least 3 points spanning two directions; returns `None` when
/// the plane fit fails or the projected points are collinear.
#[must_use]
pub fn fit_circle(points: &[Point3<f64>]) -> Option<Circle3> {
    if points.len() < 3 {
        return None;
    }
    let plane = fit_plane(points)?;
    let (u_axis, v_axis) = plane_basis(&plane.normal);

    // Algebraic fit in plane coordinates: u^2 + v^2 = 2 a u + 2 b v + e.
    let mut m = Matrix3::zeros();
    let mut rhs = Vector3::zeros();
    for p in points {
        let offset = p - plane.origin;
        let u = offset.dot(&u_axis);
        let v = offset.dot(&v_axis);
        let row = Vector3::new(2.0 * u, 2.0 * v, 1.0);
        m += row * row.transpose();
        rhs += row * (u * u + v * v);
    }

    let solution = m.lu().solve(&rhs)?;
    if !solution.iter().all(|c| c.is_finite()) {
        return None;
    }

    let radius_squared = solution.z + solution.x * solution.x + solution.y * solution.y;
    if !(radius_squared.is_finite() && radius_squared > 0.0) {
        return None;
    }

    Some(Circle3 {
        center: plane.origin + u_axis * solution.x + v_axis * solution.y,
        normal: plane.normal,
        radius: radius_squared.sqrt(),
    })
}
