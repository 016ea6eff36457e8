//! The pose graph: vertices, constraints, and consistency invariants.

use crate::edge::Edge;
use crate::error::GraphError;
use crate::robust::RobustKernel;
use crate::vertex::{Vertex, VertexId};
use posegraph_core::{Iso3, Real};
use std::collections::HashMap;

/// Container owning the vertices and constraints of one estimation problem.
///
/// Vertex ids are unique; edges may only reference existing vertices and
/// never connect a vertex to itself. Both invariants are enforced at
/// construction time, so a populated graph is always structurally valid.
#[derive(Debug, Default)]
pub struct PoseGraph {
    vertices: Vec<Vertex>,
    edges: Vec<Edge>,
    index: HashMap<VertexId, usize>,
}

impl PoseGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new pose estimate.
    ///
    /// Fails with [`GraphError::DuplicateVertex`] if the id is taken; the
    /// graph is left unchanged.
    pub fn add_vertex(
        &mut self,
        id: VertexId,
        estimate: Iso3,
        fixed: bool,
    ) -> Result<(), GraphError> {
        if self.index.contains_key(&id) {
            return Err(GraphError::DuplicateVertex(id));
        }
        self.index.insert(id, self.vertices.len());
        self.vertices.push(Vertex::new(id, estimate, fixed));
        Ok(())
    }

    /// Add a constraint between two existing vertices.
    ///
    /// Fails with [`GraphError::DanglingReference`] if either endpoint is
    /// absent; the graph is left unchanged. Self-loops are already rejected
    /// by [`Edge::new`].
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), GraphError> {
        if !self.index.contains_key(&edge.from_id()) {
            return Err(GraphError::DanglingReference(edge.from_id()));
        }
        if !self.index.contains_key(&edge.to_id()) {
            return Err(GraphError::DanglingReference(edge.to_id()));
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Look up a vertex by id.
    pub fn vertex(&self, id: VertexId) -> Option<&Vertex> {
        self.index.get(&id).map(|&idx| &self.vertices[idx])
    }

    /// Position of a vertex in [`PoseGraph::vertices`].
    pub fn vertex_index(&self, id: VertexId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    /// Current pose estimate of a vertex.
    pub fn get_pose(&self, id: VertexId) -> Option<&Iso3> {
        self.vertex(id).map(Vertex::estimate)
    }

    /// All vertices, in insertion order.
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub(crate) fn vertices_mut(&mut self) -> &mut [Vertex] {
        &mut self.vertices
    }

    /// All edges, in insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Number of gauge-fixed vertices.
    pub fn num_fixed(&self) -> usize {
        self.vertices.iter().filter(|v| v.is_fixed()).count()
    }

    /// Sum of all edges' weighted squared errors at the current estimates.
    pub fn total_cost(&self) -> Real {
        self.edges
            .iter()
            .map(|edge| {
                let (pose_i, pose_j) = self.endpoint_poses(edge);
                edge.weighted_error(pose_i, pose_j)
            })
            .sum()
    }

    /// Recompute every edge's IRLS weight from its current residual.
    pub fn apply_robust_kernel(&mut self, kernel: RobustKernel) {
        let errors: Vec<Real> = self
            .edges
            .iter()
            .map(|edge| {
                let (pose_i, pose_j) = self.endpoint_poses(edge);
                edge.error(pose_i, pose_j)
            })
            .collect();
        for (edge, r2) in self.edges.iter_mut().zip(errors) {
            let (_, weight) = kernel.rho_and_weight(r2);
            edge.set_weight(weight);
        }
    }

    /// Whether the undirected constraint graph has a single connected
    /// component.
    ///
    /// A disconnected graph would split the solve into independent,
    /// under-determined subproblems, so this must be checked before
    /// optimizing.
    pub fn is_connected(&self) -> bool {
        self.num_connected_components() <= 1
    }

    /// Number of connected components of the undirected constraint graph.
    pub fn num_connected_components(&self) -> usize {
        let n = self.vertices.len();
        if n == 0 {
            return 0;
        }

        let mut adjacency = vec![Vec::new(); n];
        for edge in &self.edges {
            let i = self.index[&edge.from_id()];
            let j = self.index[&edge.to_id()];
            adjacency[i].push(j);
            adjacency[j].push(i);
        }

        let mut visited = vec![false; n];
        let mut components = 0;
        let mut stack = Vec::new();
        for start in 0..n {
            if visited[start] {
                continue;
            }
            components += 1;
            visited[start] = true;
            stack.push(start);
            while let Some(node) = stack.pop() {
                for &next in &adjacency[node] {
                    if !visited[next] {
                        visited[next] = true;
                        stack.push(next);
                    }
                }
            }
        }
        components
    }

    /// Vertex indices of an edge's endpoints. Valid for any edge stored in
    /// this graph, since both ids were checked at insertion.
    pub(crate) fn endpoint_indices(&self, edge: &Edge) -> (usize, usize) {
        (self.index[&edge.from_id()], self.index[&edge.to_id()])
    }

    fn endpoint_poses(&self, edge: &Edge) -> (&Iso3, &Iso3) {
        let (i, j) = self.endpoint_indices(edge);
        (self.vertices[i].estimate(), self.vertices[j].estimate())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edge::Edge;
    use approx::assert_relative_eq;

    fn chain_graph() -> PoseGraph {
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
        graph
    }

    #[test]
    fn duplicate_vertex_is_rejected() {
        let mut graph = chain_graph();
        let result = graph.add_vertex(1, Iso3::identity(), false);
        assert_eq!(result.unwrap_err(), GraphError::DuplicateVertex(1));
        assert_eq!(graph.num_vertices(), 2);
    }

    #[test]
    fn dangling_edge_leaves_graph_unchanged() {
        let mut graph = chain_graph();
        let edge = Edge::with_unit_information(1, 7, Iso3::identity()).unwrap();
        let result = graph.add_edge(edge);
        assert_eq!(result.unwrap_err(), GraphError::DanglingReference(7));
        assert_eq!(graph.num_vertices(), 2);
        assert_eq!(graph.num_edges(), 1);
    }

    #[test]
    fn satisfied_chain_has_zero_cost() {
        let graph = chain_graph();
        assert_relative_eq!(graph.total_cost(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn cost_grows_with_constraint_violation() {
        let mut graph = chain_graph();
        graph
            .add_edge(
                Edge::with_unit_information(0, 1, Iso3::translation(2.0, 0.0, 0.0)).unwrap(),
            )
            .unwrap();
        assert!(graph.total_cost() > 0.5);
    }

    #[test]
    fn connectivity_over_undirected_edges() {
        let mut graph = chain_graph();
        assert!(graph.is_connected());

        graph
            .add_vertex(2, Iso3::translation(5.0, 0.0, 0.0), false)
            .unwrap();
        assert!(!graph.is_connected());
        assert_eq!(graph.num_connected_components(), 2);

        // Direction does not matter for reachability.
        graph
            .add_edge(
                Edge::with_unit_information(2, 1, Iso3::translation(-4.0, 0.0, 0.0)).unwrap(),
            )
            .unwrap();
        assert!(graph.is_connected());
    }

    #[test]
    fn empty_graph_is_trivially_connected() {
        let graph = PoseGraph::new();
        assert_eq!(graph.num_connected_components(), 0);
        assert!(graph.is_connected());
    }

    #[test]
    fn robust_kernel_downweights_outlier_edge() {
        let mut graph = chain_graph();
        // Grossly inconsistent second constraint between the same vertices.
        graph
            .add_edge(
                Edge::with_unit_information(0, 1, Iso3::translation(10.0, 0.0, 0.0)).unwrap(),
            )
            .unwrap();

        graph.apply_robust_kernel(RobustKernel::Huber { delta: 0.5 });
        let weights: Vec<Real> = graph.edges().iter().map(Edge::weight).collect();
        assert_relative_eq!(weights[0], 1.0, epsilon = 1e-12);
        assert!(weights[1] < 0.1, "outlier weight {}", weights[1]);
    }
}
