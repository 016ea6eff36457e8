//! Deterministic synthetic trajectories for tests and demos.
//!
//! The noise helpers here avoid `thread_rng` and do not depend on the
//! internal algorithm of `rand` RNGs. This keeps synthetic graphs stable
//! across versions and platforms.

use crate::math::{Iso3, Real, Vec3, Vec6};
use crate::se3;
use nalgebra::{Translation3, UnitQuaternion};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Poses spaced evenly along a circle in the XY plane, heading tangent to it.
///
/// The first pose sits at `(radius, 0, 0)` looking along +Y. Useful for loop
/// closure scenarios: the trajectory returns to its start after `n` steps.
pub fn circle_trajectory(n: usize, radius: Real) -> Vec<Iso3> {
    (0..n)
        .map(|i| {
            let phi = TAU * (i as Real) / (n as Real);
            let position = Vec3::new(radius * phi.cos(), radius * phi.sin(), 0.0);
            let heading = UnitQuaternion::from_scaled_axis(Vec3::z() * (phi + TAU / 4.0));
            Iso3::from_parts(Translation3::from(position), heading)
        })
        .collect()
}

/// Poses along a straight line on the X axis with `step` spacing.
pub fn line_trajectory(n: usize, step: Real) -> Vec<Iso3> {
    (0..n)
        .map(|i| Iso3::translation(step * i as Real, 0.0, 0.0))
        .collect()
}

/// Exact relative pose of `b` expressed in the frame of `a`.
#[inline]
pub fn relative_pose(a: &Iso3, b: &Iso3) -> Iso3 {
    a.inverse() * b
}

/// Integrate a chain of relative measurements starting from `start`.
///
/// This is the odometry-style initial guess a front end would supply.
pub fn integrate_odometry(start: &Iso3, measurements: &[Iso3]) -> Vec<Iso3> {
    let mut poses = Vec::with_capacity(measurements.len() + 1);
    let mut current = *start;
    poses.push(current);
    for m in measurements {
        current *= m;
        poses.push(current);
    }
    poses
}

/// Deterministic uniform noise on SE(3) tangent vectors.
///
/// Samples are uniform in `[-max_abs, +max_abs]` per axis, keyed by an index
/// so the same `(seed, index)` always produces the same perturbation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TangentNoise {
    /// Base seed controlling the pseudo-random sequence.
    pub seed: u64,
    /// Maximum absolute per-axis translational noise (meters).
    pub max_abs_trans: Real,
    /// Maximum absolute per-axis rotational noise (radians).
    pub max_abs_rot: Real,
}

impl Default for TangentNoise {
    fn default() -> Self {
        Self {
            seed: 0,
            max_abs_trans: 0.0,
            max_abs_rot: 0.0,
        }
    }
}

impl TangentNoise {
    /// Sample the deterministic tangent perturbation for a given index.
    pub fn sample(&self, index: usize) -> Vec6 {
        let mut xi = Vec6::zeros();
        if self.max_abs_trans == 0.0 && self.max_abs_rot == 0.0 {
            return xi;
        }

        let key = mix_key(self.seed, index);
        for axis in 0..6 {
            let max_abs = if axis < 3 {
                self.max_abs_trans
            } else {
                self.max_abs_rot
            };
            let u = u64_to_unit_f64(splitmix64(key ^ AXIS_SALTS[axis]));
            xi[axis] = (u - 0.5) * 2.0 * max_abs.abs();
        }
        xi
    }

    /// Apply deterministic noise to a pose via the manifold retract.
    pub fn apply(&self, index: usize, pose: &Iso3) -> Iso3 {
        se3::retract(pose, &self.sample(index))
    }
}

const AXIS_SALTS: [u64; 6] = [
    0x94D0_49BB_1331_11EB,
    0xBF58_476D_1CE4_E5B9,
    0x9E37_79B9_7F4A_7C15,
    0xD6E8_FEB8_6659_FD93,
    0xFF51_AFD7_ED55_8CCD,
    0xC4CE_B9FE_1A85_EC53,
];

#[inline]
fn mix_key(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

#[inline]
fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

#[inline]
fn u64_to_unit_f64(x: u64) -> f64 {
    // Take the top 53 bits for a uniform double in [0, 1).
    (x >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}
