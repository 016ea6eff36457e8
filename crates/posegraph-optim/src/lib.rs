//! Pose-graph representation and nonlinear least-squares optimization.
//!
//! A front end registers pose estimates as vertices and relative-pose
//! measurements as edges; [`optimize`] then iteratively linearizes the
//! constraints, solves the sparse normal equations, and retracts the
//! increments onto the manifold until the cost converges.
//!
//! ```
//! use nalgebra::Isometry3;
//! use posegraph_optim::{optimize, Edge, OptimizeOptions, PoseGraph};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut graph = PoseGraph::new();
//! graph.add_vertex(0, Isometry3::identity(), true)?;
//! graph.add_vertex(1, Isometry3::translation(0.9, 0.1, 0.0), false)?;
//! graph.add_edge(Edge::with_unit_information(
//!     0,
//!     1,
//!     Isometry3::translation(1.0, 0.0, 0.0),
//! )?)?;
//!
//! let report = optimize(&mut graph, &OptimizeOptions::default())?;
//! println!("converged to cost {:.3e}", report.final_cost);
//! # Ok(())
//! # }
//! ```

pub mod edge;
pub mod error;
pub mod graph;
pub mod linear;
mod linearize;
pub mod optimizer;
pub mod robust;
pub mod vertex;

pub use edge::{diagonal_information, information_from_std_dev, Edge};
pub use error::{GraphError, SolveError};
pub use graph::PoseGraph;
pub use linear::LinearSolverKind;
pub use optimizer::{optimize, Algorithm, OptimizeOptions, OptimizeReport, TerminationReason};
pub use robust::RobustKernel;
pub use vertex::{Vertex, VertexId};
