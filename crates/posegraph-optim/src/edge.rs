//! Relative-pose constraints between two vertices.
//!
//! An edge states that the pose of `to` expressed in the frame of `from`
//! equals `measurement`, weighted by a 6×6 information (inverse-covariance)
//! matrix. Residuals live in the tangent space and Jacobians are analytic,
//! computed through the inverse right Jacobian and the group adjoint rather
//! than finite differences.

use crate::error::GraphError;
use crate::vertex::VertexId;
use posegraph_core::{se3, Iso3, Mat6, Real, Vec6};
use serde::{Deserialize, Serialize};

/// Tolerance for information-matrix symmetry and eigenvalue checks.
const INFORMATION_TOL: Real = 1e-9;

/// A binary between-constraint.
///
/// Immutable once created except for [`Edge::set_weight`], which a robust
/// kernel may use to down-weight the constraint between iterations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    from: VertexId,
    to: VertexId,
    measurement: Iso3,
    information: Mat6,
    weight: Real,
}

impl Edge {
    /// Create a constraint `from -> to` with the measured relative pose.
    ///
    /// Rejects self-loops and information matrices that are asymmetric or
    /// have negative eigenvalues.
    pub fn new(
        from: VertexId,
        to: VertexId,
        measurement: Iso3,
        information: Mat6,
    ) -> Result<Self, GraphError> {
        if from == to {
            return Err(GraphError::SelfLoop(from));
        }
        validate_information(&information)?;
        Ok(Self {
            from,
            to,
            measurement,
            information,
            weight: 1.0,
        })
    }

    /// Constraint with identity information (unit confidence on every axis).
    pub fn with_unit_information(
        from: VertexId,
        to: VertexId,
        measurement: Iso3,
    ) -> Result<Self, GraphError> {
        Self::new(from, to, measurement, Mat6::identity())
    }

    pub fn from_id(&self) -> VertexId {
        self.from
    }

    pub fn to_id(&self) -> VertexId {
        self.to
    }

    pub fn measurement(&self) -> &Iso3 {
        &self.measurement
    }

    pub fn information(&self) -> &Mat6 {
        &self.information
    }

    /// Current robust-kernel weight (1 when unweighted).
    pub fn weight(&self) -> Real {
        self.weight
    }

    /// Down-weight the constraint; negative weights are clamped to zero.
    pub fn set_weight(&mut self, weight: Real) {
        self.weight = weight.max(0.0);
    }

    /// Tangent-space discrepancy between predicted and measured relative pose.
    ///
    /// `log(measurement^-1 * pose_i^-1 * pose_j)`; zero when the estimates
    /// satisfy the constraint exactly.
    pub fn residual(&self, pose_i: &Iso3, pose_j: &Iso3) -> Vec6 {
        se3::log(&(self.measurement.inverse() * pose_i.inverse() * pose_j))
    }

    /// Analytic Jacobians of the residual with respect to tangent-space
    /// perturbations of `pose_i` and `pose_j`.
    ///
    /// Must be re-evaluated at every linearization point.
    pub fn jacobians(&self, pose_i: &Iso3, pose_j: &Iso3) -> (Mat6, Mat6) {
        let residual = self.residual(pose_i, pose_j);
        let jac_j = se3::right_jacobian_inv(&residual);
        let jac_i = -jac_j * se3::adjoint(&(pose_j.inverse() * pose_i));
        (jac_i, jac_j)
    }

    /// Unweighted squared error `r^T * information * r`.
    pub fn error(&self, pose_i: &Iso3, pose_j: &Iso3) -> Real {
        let r = self.residual(pose_i, pose_j);
        (r.transpose() * self.information * r)[0]
    }

    /// Squared error scaled by the robust-kernel weight.
    pub fn weighted_error(&self, pose_i: &Iso3, pose_j: &Iso3) -> Real {
        self.weight * self.error(pose_i, pose_j)
    }
}

/// Diagonal information matrix from per-axis weights.
pub fn diagonal_information(trans_weight: Real, rot_weight: Real) -> Mat6 {
    let mut info = Mat6::zeros();
    for i in 0..3 {
        info[(i, i)] = trans_weight;
        info[(i + 3, i + 3)] = rot_weight;
    }
    info
}

/// Diagonal information matrix from translational/rotational standard deviations.
pub fn information_from_std_dev(sigma_trans: Real, sigma_rot: Real) -> Mat6 {
    diagonal_information(
        1.0 / (sigma_trans * sigma_trans),
        1.0 / (sigma_rot * sigma_rot),
    )
}

fn validate_information(information: &Mat6) -> Result<(), GraphError> {
    if (information - information.transpose()).amax() > INFORMATION_TOL {
        return Err(GraphError::InvalidInformation);
    }
    let eigenvalues = information.symmetric_eigenvalues();
    if eigenvalues.min() < -INFORMATION_TOL {
        return Err(GraphError::InvalidInformation);
    }
    Ok(())
}
