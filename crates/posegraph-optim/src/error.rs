//! Error taxonomy for graph construction and solving.

use thiserror::Error;

/// Construction-time errors. The graph is left unmodified when one is
/// returned, so the caller may retry with corrected input.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum GraphError {
    #[error("vertex id {0} already exists in the graph")]
    DuplicateVertex(u64),
    #[error("edge references nonexistent vertex id {0}")]
    DanglingReference(u64),
    #[error("edge connects vertex {0} to itself")]
    SelfLoop(u64),
    #[error("information matrix is not symmetric positive semi-definite")]
    InvalidInformation,
}

/// Solve-time errors. Vertex estimates are never left corrupted: steps are
/// only committed after a successful linear solve, and rejected steps are
/// rolled back before returning.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SolveError {
    #[error("graph has no vertices")]
    EmptyGraph,
    #[error("no vertex is fixed; relative constraints leave the gauge free and the system singular")]
    UnderConstrained,
    #[error("constraint graph splits into {components} connected components")]
    Disconnected { components: usize },
    #[error("normal equations are not positive definite at iteration {iteration}")]
    NotPositiveDefinite { iteration: usize },
}
