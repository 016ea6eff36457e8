//! High-level entry crate for the `pose-graph-rs` backend.
//!
//! Re-exports the core math ([`core`]) and the graph/solver surface
//! ([`optim`]) so applications depend on a single crate.
//!
//! # Typical workflow
//!
//! ```no_run
//! use posegraph::optim::{optimize, Edge, OptimizeOptions, PoseGraph};
//! use posegraph::core::Iso3;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // 1. The front end registers pose estimates and relative measurements.
//! let mut graph = PoseGraph::new();
//! graph.add_vertex(0, Iso3::identity(), true)?;
//! graph.add_vertex(1, Iso3::translation(1.1, 0.0, 0.0), false)?;
//! graph.add_edge(Edge::with_unit_information(
//!     0,
//!     1,
//!     Iso3::translation(1.0, 0.0, 0.0),
//! )?)?;
//!
//! // 2. Solve.
//! let report = optimize(&mut graph, &OptimizeOptions::default())?;
//! println!(
//!     "{:?} after {} iterations, cost {:.3e}",
//!     report.termination, report.iterations, report.final_cost
//! );
//!
//! // 3. Read the refined poses back.
//! let refined = graph.get_pose(1).expect("vertex 1 exists");
//! # let _ = refined;
//! # Ok(())
//! # }
//! ```

/// Core math: type aliases, SE(3) algebra, synthetic data.
pub use posegraph_core as core;
/// Graph representation and nonlinear solver.
pub use posegraph_optim as optim;

pub use posegraph_optim::{
    optimize, Edge, GraphError, OptimizeOptions, OptimizeReport, PoseGraph, SolveError,
    TerminationReason,
};
