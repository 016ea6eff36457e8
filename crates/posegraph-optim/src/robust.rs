//! Robust loss kernels for iteratively re-weighted least squares (IRLS).

use posegraph_core::Real;
use serde::{Deserialize, Serialize};

/// Robust loss applied to edge residuals between iterations.
///
/// The outer policy (which edges to robustify, and when) belongs to the
/// caller; this type only supplies the loss and its IRLS weight.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub enum RobustKernel {
    /// No robustness, pure L2 (quadratic).
    #[default]
    None,
    /// Huber loss with a given threshold.
    Huber { delta: Real },
    /// Cauchy loss with a scale parameter.
    Cauchy { c: Real },
}

impl RobustKernel {
    /// Return the robust loss `rho(r^2)` and the IRLS weight `w(r)` for a
    /// squared residual.
    ///
    /// Intended use between iterations:
    /// 1. evaluate each edge's squared residual for the current estimates,
    /// 2. compute `w` with this method,
    /// 3. down-weight the edge's information by `w` before relinearizing.
    pub fn rho_and_weight(self, r2: Real) -> (Real, Real) {
        match self {
            RobustKernel::None => (r2, 1.0),
            RobustKernel::Huber { delta } => {
                let r = r2.sqrt();
                if r <= delta {
                    // Quadratic region
                    (r2, 1.0)
                } else {
                    // Linear region
                    (2.0 * delta * r - delta * delta, delta / r)
                }
            }
            RobustKernel::Cauchy { c } => {
                let t = r2 / (c * c);
                (c * c * (1.0 + t).ln(), 1.0 / (1.0 + t))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn huber_matches_l2_inside_threshold() {
        let kernel = RobustKernel::Huber { delta: 1.0 };
        let (rho, w) = kernel.rho_and_weight(0.25);
        assert_relative_eq!(rho, 0.25, epsilon = 1e-12);
        assert_relative_eq!(w, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn huber_is_linear_outside_threshold() {
        let kernel = RobustKernel::Huber { delta: 1.0 };
        let (rho, w) = kernel.rho_and_weight(25.0);
        assert_relative_eq!(rho, 2.0 * 5.0 - 1.0, epsilon = 1e-12);
        assert_relative_eq!(w, 1.0 / 5.0, epsilon = 1e-12);
    }

    #[test]
    fn cauchy_weight_decreases_with_residual() {
        let kernel = RobustKernel::Cauchy { c: 1.0 };
        let (_, w_small) = kernel.rho_and_weight(0.01);
        let (_, w_large) = kernel.rho_and_weight(100.0);
        assert!(w_small > 0.9);
        assert!(w_large < 0.02);
        assert!(w_small > w_large);
    }

    #[test]
    fn none_kernel_is_identity() {
        let (rho, w) = RobustKernel::None.rho_and_weight(3.5);
        assert_eq!(rho, 3.5);
        assert_eq!(w, 1.0);
    }
}
