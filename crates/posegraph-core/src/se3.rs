//! SE(3) tangent-space algebra.
//!
//! Closed-form exponential and logarithm maps between rigid transforms
//! ([`Iso3`]) and their 6D tangent vectors, plus the adjoint and the inverse
//! right Jacobian needed for analytic constraint linearization.
//!
//! Conventions follow the manif library: tangent vectors are
//! `[rho, theta]` with the translational part first, and increments are
//! applied on the right, `retract(T, xi) = T * exp(xi)`.

use crate::math::{skew, Iso3, Mat3, Mat6, Real, Vec3, Vec6};
use nalgebra::{Translation3, UnitQuaternion};

/// Below this rotation angle the series limits replace the closed forms.
const SMALL_ANGLE: Real = 1e-12;

/// Translational part of a tangent vector.
#[inline]
pub fn rho(xi: &Vec6) -> Vec3 {
    xi.fixed_rows::<3>(0).into_owned()
}

/// Rotational part of a tangent vector.
#[inline]
pub fn theta(xi: &Vec6) -> Vec3 {
    xi.fixed_rows::<3>(3).into_owned()
}

/// Build a tangent vector from translational and rotational parts.
#[inline]
pub fn tangent(rho: Vec3, theta: Vec3) -> Vec6 {
    let mut xi = Vec6::zeros();
    xi.fixed_rows_mut::<3>(0).copy_from(&rho);
    xi.fixed_rows_mut::<3>(3).copy_from(&theta);
    xi
}

/// Exponential map: tangent vector to group element.
pub fn exp(xi: &Vec6) -> Iso3 {
    let rho = rho(xi);
    let theta = theta(xi);
    let angle = theta.norm();

    let rotation = if angle < SMALL_ANGLE {
        UnitQuaternion::identity()
    } else {
        UnitQuaternion::from_scaled_axis(theta)
    };

    let translation = if angle < SMALL_ANGLE {
        rho
    } else {
        so3_left_jacobian(&theta) * rho
    };

    Iso3::from_parts(Translation3::from(translation), rotation)
}

/// Logarithm map: group element to tangent vector.
///
/// Inverse of [`exp`]: `log(exp(xi)) == xi` up to floating-point precision
/// for rotations below pi.
pub fn log(pose: &Iso3) -> Vec6 {
    let theta = pose.rotation.scaled_axis();
    let angle = theta.norm();
    let t = pose.translation.vector;

    let rho = if angle < SMALL_ANGLE {
        t
    } else {
        so3_left_jacobian_inv(&theta) * t
    };

    tangent(rho, theta)
}

/// Manifold update: compose `pose` with the exponential of a small increment.
///
/// The rotation stays a unit quaternion by construction, so callers never
/// renormalize.
#[inline]
pub fn retract(pose: &Iso3, delta: &Vec6) -> Iso3 {
    pose * exp(delta)
}

/// Adjoint representation of a group element.
///
/// Satisfies `exp(adjoint(T) * xi) == T * exp(xi) * T^-1`.
pub fn adjoint(pose: &Iso3) -> Mat6 {
    let r = pose.rotation.to_rotation_matrix().into_inner();
    let t = pose.translation.vector;

    let mut adj = Mat6::zeros();
    adj.fixed_view_mut::<3, 3>(0, 0).copy_from(&r);
    adj.fixed_view_mut::<3, 3>(3, 3).copy_from(&r);
    adj.fixed_view_mut::<3, 3>(0, 3).copy_from(&(skew(&t) * r));
    adj
}

/// Inverse left Jacobian of the SE(3) exponential at `xi`.
pub fn left_jacobian_inv(xi: &Vec6) -> Mat6 {
    let rho = rho(xi);
    let theta = theta(xi);
    let angle = theta.norm();

    if angle < SMALL_ANGLE {
        // First-order limit: I - ad(xi) / 2.
        return Mat6::identity() - 0.5 * small_adjoint(xi);
    }

    let a_inv = so3_left_jacobian_inv(&theta);
    let q = se3_q(&rho, &theta);

    let mut jac = Mat6::zeros();
    jac.fixed_view_mut::<3, 3>(0, 0).copy_from(&a_inv);
    jac.fixed_view_mut::<3, 3>(3, 3).copy_from(&a_inv);
    jac.fixed_view_mut::<3, 3>(0, 3)
        .copy_from(&(-a_inv * q * a_inv));
    jac
}

/// Inverse right Jacobian of the SE(3) exponential at `xi`.
///
/// First-order relation behind analytic edge Jacobians:
/// `log(exp(xi) * exp(delta)) ~= xi + right_jacobian_inv(xi) * delta`.
#[inline]
pub fn right_jacobian_inv(xi: &Vec6) -> Mat6 {
    left_jacobian_inv(&-xi)
}

/// Adjoint of the Lie algebra element `xi` ("small" adjoint).
fn small_adjoint(xi: &Vec6) -> Mat6 {
    let rho_skew = skew(&rho(xi));
    let theta_skew = skew(&theta(xi));

    let mut ad = Mat6::zeros();
    ad.fixed_view_mut::<3, 3>(0, 0).copy_from(&theta_skew);
    ad.fixed_view_mut::<3, 3>(3, 3).copy_from(&theta_skew);
    ad.fixed_view_mut::<3, 3>(0, 3).copy_from(&rho_skew);
    ad
}

/// Left Jacobian of the SO(3) exponential.
fn so3_left_jacobian(theta: &Vec3) -> Mat3 {
    let angle = theta.norm();
    let k = skew(theta);
    let angle2 = angle * angle;

    Mat3::identity()
        + ((1.0 - angle.cos()) / angle2) * k
        + ((angle - angle.sin()) / (angle2 * angle)) * k * k
}

/// Inverse left Jacobian of the SO(3) exponential.
fn so3_left_jacobian_inv(theta: &Vec3) -> Mat3 {
    let angle = theta.norm();
    let k = skew(theta);
    let coeff = 1.0 / (angle * angle) - (1.0 + angle.cos()) / (2.0 * angle * angle.sin());

    Mat3::identity() - 0.5 * k + coeff * k * k
}

/// The `Q` block coupling translation and rotation in the SE(3) left Jacobian.
fn se3_q(rho: &Vec3, theta: &Vec3) -> Mat3 {
    let angle = theta.norm();
    let angle2 = angle * angle;
    let angle4 = angle2 * angle2;
    let (sin, cos) = angle.sin_cos();

    let rx = skew(rho);
    let tx = skew(theta);

    let c2 = (angle - sin) / (angle2 * angle);
    let c3 = (1.0 - 0.5 * angle2 - cos) / angle4;
    let c4 = 0.5 * (c3 - 3.0 * (angle - sin - angle2 * angle / 6.0) / (angle4 * angle));

    0.5 * rx + c2 * (tx * rx + rx * tx + tx * rx * tx)
        - c3 * (tx * tx * rx + rx * tx * tx - 3.0 * tx * rx * tx)
        - c4 * (tx * rx * tx * tx + tx * tx * rx * tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_tangent(rng: &mut StdRng, trans: Real, rot: Real) -> Vec6 {
        tangent(
            Vec3::new(
                rng.random_range(-trans..trans),
                rng.random_range(-trans..trans),
                rng.random_range(-trans..trans),
            ),
            Vec3::new(
                rng.random_range(-rot..rot),
                rng.random_range(-rot..rot),
                rng.random_range(-rot..rot),
            ),
        )
    }

    #[test]
    fn exp_of_zero_is_identity() {
        let pose = exp(&Vec6::zeros());
        assert_relative_eq!(pose.translation.vector.norm(), 0.0, epsilon = 1e-15);
        assert_relative_eq!(pose.rotation.angle(), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn log_exp_round_trip() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let xi = random_tangent(&mut rng, 2.0, 1.5);
            let recovered = log(&exp(&xi));
            assert_relative_eq!(xi, recovered, epsilon = 1e-10);
        }
    }

    #[test]
    fn log_exp_round_trip_small_angles() {
        let xi = tangent(Vec3::new(1e-8, 2e-8, 3e-8), Vec3::new(1e-9, 2e-9, 3e-9));
        let recovered = log(&exp(&xi));
        assert_relative_eq!(xi, recovered, epsilon = 1e-15);
    }

    #[test]
    fn retract_recovers_applied_delta() {
        let mut rng = StdRng::seed_from_u64(11);
        let pose = exp(&random_tangent(&mut rng, 1.0, 1.0));
        let delta = random_tangent(&mut rng, 0.1, 0.1);

        let updated = retract(&pose, &delta);
        let recovered = log(&(pose.inverse() * updated));
        assert_relative_eq!(delta, recovered, epsilon = 1e-10);
    }

    #[test]
    fn retract_keeps_rotation_normalized() {
        let mut pose = Iso3::identity();
        let delta = tangent(Vec3::new(0.1, 0.0, 0.0), Vec3::new(0.0, 0.02, 0.01));
        for _ in 0..1000 {
            pose = retract(&pose, &delta);
        }
        assert_relative_eq!(pose.rotation.quaternion().norm(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn adjoint_commutes_exp() {
        let mut rng = StdRng::seed_from_u64(3);
        let pose = exp(&random_tangent(&mut rng, 1.0, 1.2));
        let xi = random_tangent(&mut rng, 0.3, 0.3);

        let lhs = exp(&(adjoint(&pose) * xi));
        let rhs = pose * exp(&xi) * pose.inverse();
        assert_relative_eq!(
            log(&(lhs.inverse() * rhs)).norm(),
            0.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn right_jacobian_inv_matches_finite_differences() {
        let mut rng = StdRng::seed_from_u64(19);
        let xi = random_tangent(&mut rng, 0.8, 0.6);
        let jac = right_jacobian_inv(&xi);

        let eps = 1e-6;
        let base = exp(&xi);
        for col in 0..6 {
            let mut delta = Vec6::zeros();
            delta[col] = eps;
            let perturbed = log(&(base * exp(&delta)));
            let fd = (perturbed - xi) / eps;
            for row in 0..6 {
                assert_relative_eq!(jac[(row, col)], fd[row], epsilon = 1e-5);
            }
        }
    }

    #[test]
    fn left_and_right_jacobians_agree_at_zero() {
        let xi = Vec6::zeros();
        assert_relative_eq!(left_jacobian_inv(&xi), Mat6::identity(), epsilon = 1e-15);
        assert_relative_eq!(right_jacobian_inv(&xi), Mat6::identity(), epsilon = 1e-15);
    }
}
