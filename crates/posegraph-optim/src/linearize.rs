//! Normal-equation assembly from edge residuals and Jacobians.
//!
//! Each edge contributes `J^T W J` blocks to the Hessian approximation and
//! `J^T W r` terms to the gradient, with `W` the weighted information matrix.
//! Accumulation is additive and order-independent across edges; the parallel
//! path therefore folds per-thread partial accumulators and merges them,
//! never writing to a shared accumulator.

use crate::graph::PoseGraph;
use nalgebra::DVector;
use posegraph_core::{Mat6, Real};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Column layout of the reduced linear system.
///
/// Every free vertex owns one 6-wide block column; fixed vertices have no
/// column at all, which removes the gauge freedom from the system.
pub(crate) struct Ordering {
    slots: Vec<Option<usize>>,
    num_free: usize,
}

impl Ordering {
    pub fn new(graph: &PoseGraph) -> Self {
        let mut slots = Vec::with_capacity(graph.num_vertices());
        let mut num_free = 0;
        for vertex in graph.vertices() {
            if vertex.is_fixed() {
                slots.push(None);
            } else {
                slots.push(Some(num_free));
                num_free += 1;
            }
        }
        Self { slots, num_free }
    }

    /// Block slot of the vertex at `vertex_index`, `None` if fixed.
    pub fn slot(&self, vertex_index: usize) -> Option<usize> {
        self.slots[vertex_index]
    }

    pub fn num_free(&self) -> usize {
        self.num_free
    }
}

/// Accumulated normal equations `H * dx = -g` in block-triplet form.
///
/// Blocks are stored for the upper triangle only (`row <= col`); the
/// symmetric mirror is implied. Rebuilt from scratch at every iteration.
pub(crate) struct NormalEquations {
    pub num_free: usize,
    pub blocks: Vec<(usize, usize, Mat6)>,
    pub gradient: DVector<Real>,
}

impl NormalEquations {
    fn empty(num_free: usize) -> Self {
        Self {
            num_free,
            blocks: Vec::new(),
            gradient: DVector::zeros(6 * num_free),
        }
    }

    #[cfg(feature = "parallel")]
    fn merge(mut self, mut other: Self) -> Self {
        self.blocks.append(&mut other.blocks);
        self.gradient += other.gradient;
        self
    }

    fn accumulate(&mut self, graph: &PoseGraph, ordering: &Ordering, edge: &crate::edge::Edge) {
        let (idx_i, idx_j) = graph.endpoint_indices(edge);
        let pose_i = graph.vertices()[idx_i].estimate();
        let pose_j = graph.vertices()[idx_j].estimate();

        let residual = edge.residual(pose_i, pose_j);
        let (jac_i, jac_j) = edge.jacobians(pose_i, pose_j);
        let weighted_info = edge.weight() * edge.information();

        let slot_i = ordering.slot(idx_i);
        let slot_j = ordering.slot(idx_j);

        if let Some(si) = slot_i {
            let jt_w = jac_i.transpose() * weighted_info;
            self.push_block(si, si, jt_w * jac_i);
            self.add_gradient(si, &(jt_w * residual));
            if let Some(sj) = slot_j {
                self.push_block(si, sj, jt_w * jac_j);
            }
        }
        if let Some(sj) = slot_j {
            let jt_w = jac_j.transpose() * weighted_info;
            self.push_block(sj, sj, jt_w * jac_j);
            self.add_gradient(sj, &(jt_w * residual));
        }
    }

    fn push_block(&mut self, row: usize, col: usize, block: Mat6) {
        if row <= col {
            self.blocks.push((row, col, block));
        } else {
            self.blocks.push((col, row, block.transpose()));
        }
    }

    fn add_gradient(&mut self, slot: usize, contribution: &nalgebra::Vector6<Real>) {
        let mut segment = self.gradient.fixed_rows_mut::<6>(6 * slot);
        segment += contribution;
    }
}

/// Linearize all edges at the current estimates.
#[cfg(feature = "parallel")]
pub(crate) fn linearize(graph: &PoseGraph, ordering: &Ordering) -> NormalEquations {
    graph
        .edges()
        .par_iter()
        .fold(
            || NormalEquations::empty(ordering.num_free()),
            |mut acc, edge| {
                acc.accumulate(graph, ordering, edge);
                acc
            },
        )
        .reduce(
            || NormalEquations::empty(ordering.num_free()),
            NormalEquations::merge,
        )
}

/// Linearize all edges at the current estimates.
#[cfg(not(feature = "parallel"))]
pub(crate) fn linearize(graph: &PoseGraph, ordering: &Ordering) -> NormalEquations {
    let mut acc = NormalEquations::empty(ordering.num_free());
    for edge in graph.edges() {
        acc.accumulate(graph, ordering, edge);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Edge;
    use approx::assert_relative_eq;
    use posegraph_core::Iso3;

    fn two_vertex_graph(fix_first: bool) -> PoseGraph {
        let mut graph = PoseGraph::new();
        graph.add_vertex(0, Iso3::identity(), fix_first).unwrap();
        graph
            .add_vertex(1, Iso3::translation(0.8, 0.1, 0.0), false)
            .unwrap();
        graph
            .add_edge(
                Edge::with_unit_information(0, 1, Iso3::translation(1.0, 0.0, 0.0)).unwrap(),
            )
            .unwrap();
        graph
    }

    #[test]
    fn fixed_vertices_have_no_columns() {
        let graph = two_vertex_graph(true);
        let ordering = Ordering::new(&graph);
        assert_eq!(ordering.num_free(), 1);
        assert_eq!(ordering.slot(0), None);
        assert_eq!(ordering.slot(1), Some(0));
    }

    #[test]
    fn satisfied_constraint_yields_zero_gradient() {
        let mut graph = PoseGraph::new();
        graph.add_vertex(0, Iso3::identity(), true).unwrap();
        graph
            .add_vertex(1, Iso3::translation(1.0, 0.0, 0.0), false)
            .unwrap();
        graph
            .add_edge(
                Edge::with_unit_information(0, 1, Iso3::translation(1.0, 0.0, 0.0)).unwrap(),
            )
            .unwrap();
        let ordering = Ordering::new(&graph);
        let system = linearize(&graph, &ordering);
        assert_relative_eq!(system.gradient.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn gradient_points_toward_residual_reduction() {
        let graph = two_vertex_graph(true);
        let ordering = Ordering::new(&graph);
        let system = linearize(&graph, &ordering);

        // The free vertex sits short of the measured +X offset; the descent
        // direction -g must push it further along +X.
        assert!(system.gradient[0] < 0.0);
        assert!(!system.blocks.is_empty());
    }

    #[test]
    fn both_endpoints_free_produce_cross_block() {
        let graph = two_vertex_graph(false);
        let ordering = Ordering::new(&graph);
        assert_eq!(ordering.num_free(), 2);
        let system = linearize(&graph, &ordering);
        assert!(
            system
                .blocks
                .iter()
                .any(|&(row, col, _)| row == 0 && col == 1),
            "expected an off-diagonal coupling block"
        );
    }
}
