//! Damped linear solvers for the normal equations.
//!
//! Both paths solve `(H + lambda*I) * dx = -g` by symmetric positive-definite
//! Cholesky factorization. The dense path is only suitable for small graphs
//! and exists as a scalability baseline; the sparse path exploits the block
//! sparsity of the constraint graph and is the default.

use crate::linearize::NormalEquations;
use nalgebra::{DMatrix, DVector};
use nalgebra_sparse::factorization::CscCholesky;
use nalgebra_sparse::{CooMatrix, CscMatrix};
use posegraph_core::Real;
use serde::{Deserialize, Serialize};

/// Linear solver selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LinearSolverKind {
    /// Dense Cholesky on the fully assembled matrix (small graphs only).
    DenseCholesky,
    /// Sparse Cholesky exploiting the graph's sparsity pattern.
    #[default]
    SparseCholesky,
}

/// Solve the damped system; `None` means the factorization failed because
/// the matrix is not positive definite.
pub(crate) fn solve_damped(
    system: &NormalEquations,
    lambda: Real,
    kind: LinearSolverKind,
) -> Option<DVector<Real>> {
    match kind {
        LinearSolverKind::DenseCholesky => solve_dense(system, lambda),
        LinearSolverKind::SparseCholesky => solve_sparse(system, lambda),
    }
}

fn solve_dense(system: &NormalEquations, lambda: Real) -> Option<DVector<Real>> {
    let dim = 6 * system.num_free;
    let mut hessian = DMatrix::<Real>::zeros(dim, dim);

    for &(row, col, ref block) in &system.blocks {
        let mut view = hessian.fixed_view_mut::<6, 6>(6 * row, 6 * col);
        view += block;
        if row != col {
            let transposed = block.transpose();
            let mut mirror = hessian.fixed_view_mut::<6, 6>(6 * col, 6 * row);
            mirror += transposed;
        }
    }
    for d in 0..dim {
        hessian[(d, d)] += lambda;
    }

    let rhs = -&system.gradient;
    let cholesky = hessian.cholesky()?;
    Some(cholesky.solve(&rhs))
}

fn solve_sparse(system: &NormalEquations, lambda: Real) -> Option<DVector<Real>> {
    let dim = 6 * system.num_free;
    let mut triplets = CooMatrix::<Real>::new(dim, dim);

    // Duplicate entries are summed on conversion, so blocks from different
    // edges can be pushed independently.
    for &(brow, bcol, ref block) in &system.blocks {
        for r in 0..6 {
            for c in 0..6 {
                let value = block[(r, c)];
                if value != 0.0 {
                    triplets.push(6 * brow + r, 6 * bcol + c, value);
                    if brow != bcol {
                        triplets.push(6 * bcol + c, 6 * brow + r, value);
                    }
                }
            }
        }
    }
    if lambda > 0.0 {
        for d in 0..dim {
            triplets.push(d, d, lambda);
        }
    }

    let csc = CscMatrix::from(&triplets);
    let cholesky = CscCholesky::factor(&csc).ok()?;

    let rhs = DMatrix::from_column_slice(dim, 1, (-&system.gradient).as_slice());
    let solution = cholesky.solve(&rhs);
    Some(DVector::from_column_slice(solution.as_slice()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Edge;
    use crate::graph::PoseGraph;
    use crate::linearize::{linearize, Ordering};
    use approx::assert_relative_eq;
    use posegraph_core::Iso3;

    fn sample_system() -> NormalEquations {
        let mut graph = PoseGraph::new();
        graph.add_vertex(0, Iso3::identity(), true).unwrap();
        graph
            .add_vertex(1, Iso3::translation(0.7, -0.2, 0.1), false)
            .unwrap();
        graph
            .add_vertex(2, Iso3::translation(1.6, 0.3, -0.1), false)
            .unwrap();
        graph
            .add_edge(
                Edge::with_unit_information(0, 1, Iso3::translation(1.0, 0.0, 0.0)).unwrap(),
            )
            .unwrap();
        graph
            .add_edge(
                Edge::with_unit_information(1, 2, Iso3::translation(1.0, 0.0, 0.0)).unwrap(),
            )
            .unwrap();
        let ordering = Ordering::new(&graph);
        linearize(&graph, &ordering)
    }

    #[test]
    fn dense_and_sparse_paths_agree() {
        let system = sample_system();
        for &lambda in &[0.0, 1e-4, 1.0] {
            let dense = solve_dense(&system, lambda).unwrap();
            let sparse = solve_sparse(&system, lambda).unwrap();
            assert_relative_eq!(dense, sparse, epsilon = 1e-9);
        }
    }

    #[test]
    fn singular_system_is_reported_not_solved() {
        // One free vertex with no constraints at all: zero Hessian block.
        let mut graph = PoseGraph::new();
        graph.add_vertex(0, Iso3::identity(), false).unwrap();
        let ordering = Ordering::new(&graph);
        let system = linearize(&graph, &ordering);

        assert!(solve_dense(&system, 0.0).is_none());
        assert!(solve_sparse(&system, 0.0).is_none());
    }

    #[test]
    fn damping_regularizes_a_singular_system() {
        let mut graph = PoseGraph::new();
        graph.add_vertex(0, Iso3::identity(), false).unwrap();
        let ordering = Ordering::new(&graph);
        let system = linearize(&graph, &ordering);

        // With lambda > 0 the damped matrix is positive definite again.
        let solution = solve_dense(&system, 1e-3).unwrap();
        assert_relative_eq!(solution.norm(), 0.0, epsilon = 1e-12);
    }
}
