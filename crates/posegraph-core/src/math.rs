//! Mathematical type definitions shared across the workspace.

use nalgebra::{Isometry3, Matrix3, Matrix6, Vector3, Vector6};

/// Scalar type used throughout the library (currently `f64`).
pub type Real = f64;

/// 3D vector with [`Real`] components.
pub type Vec3 = Vector3<Real>;
/// 6D vector with [`Real`] components; tangent vectors are `[rho, theta]`.
pub type Vec6 = Vector6<Real>;
/// 3×3 matrix with [`Real`] entries.
pub type Mat3 = Matrix3<Real>;
/// 6×6 matrix with [`Real`] entries (information matrices, Jacobians).
pub type Mat6 = Matrix6<Real>;
/// 3D rigid transform (SE(3)) using [`Real`].
pub type Iso3 = Isometry3<Real>;

/// Skew-symmetric (cross-product) matrix of a 3D vector.
///
/// For `v = [x, y, z]` returns the matrix `M` such that `M * w == v.cross(w)`.
#[inline]
pub fn skew(v: &Vec3) -> Mat3 {
    Mat3::new(0.0, -v.z, v.y, v.z, 0.0, -v.x, -v.y, v.x, 0.0)
}
