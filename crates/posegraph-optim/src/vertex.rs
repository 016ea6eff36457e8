//! Graph vertices: one pose estimate each, optionally gauge-fixed.

use posegraph_core::{se3, Iso3, Vec6};
use serde::{Deserialize, Serialize};

/// Identifier for a vertex, assigned by the front end.
pub type VertexId = u64;

/// A node in the pose graph holding one pose estimate.
///
/// A fixed vertex is the gauge anchor: the solver applies updates uniformly
/// to every vertex and relies on [`Vertex::apply_update`] being a silent
/// no-op for fixed ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vertex {
    id: VertexId,
    estimate: Iso3,
    fixed: bool,
}

impl Vertex {
    /// Create a new vertex with an initial estimate.
    pub fn new(id: VertexId, estimate: Iso3, fixed: bool) -> Self {
        Self {
            id,
            estimate,
            fixed,
        }
    }

    pub fn id(&self) -> VertexId {
        self.id
    }

    /// Current pose estimate.
    pub fn estimate(&self) -> &Iso3 {
        &self.estimate
    }

    /// Whether this vertex is excluded from optimization.
    pub fn is_fixed(&self) -> bool {
        self.fixed
    }

    /// Retract a tangent-space increment onto the estimate.
    ///
    /// No-op if the vertex is fixed.
    pub fn apply_update(&mut self, delta: &Vec6) {
        if self.fixed {
            return;
        }
        self.estimate = se3::retract(&self.estimate, delta);
    }
}
