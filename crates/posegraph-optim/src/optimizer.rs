//! Iterative nonlinear least-squares solver (Gauss-Newton / Levenberg-Marquardt).
//!
//! Each iteration linearizes every edge at the current estimates, solves the
//! damped normal equations, retracts the increment onto the free vertices,
//! and re-evaluates the total cost. Iterations are strictly sequential; only
//! the per-edge linearization inside one iteration is parallel.
//!
//! A step is committed only after a successful linear solve. Rejected steps
//! are rolled back by retracting the negated increment, which is exact on
//! the group, so estimates are never left corrupted.

use crate::error::SolveError;
use crate::graph::PoseGraph;
use crate::linear::{solve_damped, LinearSolverKind};
use crate::linearize::{linearize, Ordering};
use crate::robust::RobustKernel;
use log::debug;
use nalgebra::DVector;
use posegraph_core::Real;
use serde::{Deserialize, Serialize};

/// Iteration scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Algorithm {
    /// Undamped normal equations. Fast near the optimum, fragile far from it:
    /// a cost increase or an indefinite system terminates the solve.
    GaussNewton,
    /// Adaptively damped trust-region behavior; recovers from failed steps
    /// and indefinite systems by raising the damping term.
    #[default]
    LevenbergMarquardt,
}

/// Solver options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeOptions {
    pub algorithm: Algorithm,
    pub linear_solver: LinearSolverKind,
    /// Maximum number of outer iterations.
    pub max_iterations: usize,
    /// Terminate when the relative cost decrease falls below this value.
    pub cost_tolerance: Real,
    /// Terminate when the increment norm falls below this value.
    pub step_tolerance: Real,
    /// Initial Levenberg-Marquardt damping term.
    pub initial_lambda: Real,
    /// Multiplicative factor for raising/lowering the damping term.
    pub lambda_factor: Real,
    /// Damping ceiling; exceeding it terminates the solve as diverged.
    pub max_lambda: Real,
    /// Robust kernel re-weighting edges before each linearization.
    pub robust_kernel: RobustKernel,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::default(),
            linear_solver: LinearSolverKind::default(),
            max_iterations: 50,
            cost_tolerance: 1e-6,
            step_tolerance: 1e-8,
            initial_lambda: 1e-4,
            lambda_factor: 10.0,
            max_lambda: 1e10,
            robust_kernel: RobustKernel::None,
        }
    }
}

/// Why the solve stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    /// Relative cost decrease or step norm fell below tolerance.
    Converged,
    /// Iteration limit reached before tolerance.
    MaxIterations,
    /// Cost increased under Gauss-Newton, or the damping ceiling was hit.
    Diverged,
}

/// Outcome of a solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeReport {
    pub initial_cost: Real,
    pub final_cost: Real,
    pub iterations: usize,
    pub termination: TerminationReason,
}

/// Relative cost increases below this slack are not treated as divergence.
const DIVERGENCE_SLACK: Real = 1e-9;

/// Optimize the graph in place.
///
/// Preconditions checked before any iteration: the graph is non-empty, at
/// least one vertex is fixed, and the constraint graph is connected.
/// Numerical failures inside an iteration either retry with more damping
/// (Levenberg-Marquardt) or surface as [`SolveError::NotPositiveDefinite`].
pub fn optimize(
    graph: &mut PoseGraph,
    options: &OptimizeOptions,
) -> Result<OptimizeReport, SolveError> {
    if graph.num_vertices() == 0 {
        return Err(SolveError::EmptyGraph);
    }
    if graph.num_fixed() == 0 {
        return Err(SolveError::UnderConstrained);
    }
    let components = graph.num_connected_components();
    if components > 1 {
        return Err(SolveError::Disconnected { components });
    }

    let initial_cost = graph.total_cost();
    let mut current_cost = initial_cost;

    let ordering = Ordering::new(graph);
    if graph.num_edges() == 0 || ordering.num_free() == 0 {
        // Nothing to optimize; the current estimates already are the answer.
        return Ok(OptimizeReport {
            initial_cost,
            final_cost: current_cost,
            iterations: 0,
            termination: TerminationReason::Converged,
        });
    }

    let mut lambda = match options.algorithm {
        Algorithm::GaussNewton => 0.0,
        Algorithm::LevenbergMarquardt => options.initial_lambda,
    };

    for iteration in 1..=options.max_iterations {
        if options.robust_kernel != RobustKernel::None {
            graph.apply_robust_kernel(options.robust_kernel);
            current_cost = graph.total_cost();
        }

        let system = linearize(graph, &ordering);

        // Solve and retract; Levenberg-Marquardt retries the same
        // linearization with a larger damping term until a step is accepted.
        let (step_norm, new_cost) = loop {
            let delta = match solve_damped(&system, lambda, options.linear_solver) {
                Some(delta) => delta,
                None => match options.algorithm {
                    Algorithm::GaussNewton => {
                        return Err(SolveError::NotPositiveDefinite { iteration });
                    }
                    Algorithm::LevenbergMarquardt => {
                        lambda = (lambda * options.lambda_factor).max(options.initial_lambda);
                        if lambda > options.max_lambda {
                            return Err(SolveError::NotPositiveDefinite { iteration });
                        }
                        debug!(
                            "iteration {iteration}: factorization failed, \
                             raising lambda to {lambda:.3e}"
                        );
                        continue;
                    }
                },
            };

            apply_step(graph, &ordering, &delta);
            let new_cost = graph.total_cost();

            let diverging =
                !new_cost.is_finite() || new_cost > current_cost * (1.0 + DIVERGENCE_SLACK);
            if !diverging {
                if options.algorithm == Algorithm::LevenbergMarquardt {
                    lambda = (lambda / options.lambda_factor).max(1e-12);
                }
                break (delta.norm(), new_cost);
            }

            // Reject the step: retracting the negated increment is an exact
            // rollback on the group.
            apply_step(graph, &ordering, &(-&delta));

            match options.algorithm {
                Algorithm::GaussNewton => {
                    return Ok(OptimizeReport {
                        initial_cost,
                        final_cost: current_cost,
                        iterations: iteration,
                        termination: TerminationReason::Diverged,
                    });
                }
                Algorithm::LevenbergMarquardt => {
                    lambda *= options.lambda_factor;
                    if lambda > options.max_lambda {
                        return Ok(OptimizeReport {
                            initial_cost,
                            final_cost: current_cost,
                            iterations: iteration,
                            termination: TerminationReason::Diverged,
                        });
                    }
                    debug!(
                        "iteration {iteration}: cost rose to {new_cost:.6e}, \
                         raising lambda to {lambda:.3e}"
                    );
                }
            }
        };

        let relative_decrease = (current_cost - new_cost) / current_cost.max(Real::EPSILON);
        current_cost = new_cost;

        debug!(
            "iteration {iteration}: cost {current_cost:.6e}, |dx| {step_norm:.3e}, \
             lambda {lambda:.3e}"
        );

        if relative_decrease.abs() < options.cost_tolerance || step_norm < options.step_tolerance {
            return Ok(OptimizeReport {
                initial_cost,
                final_cost: current_cost,
                iterations: iteration,
                termination: TerminationReason::Converged,
            });
        }
    }

    Ok(OptimizeReport {
        initial_cost,
        final_cost: current_cost,
        iterations: options.max_iterations,
        termination: TerminationReason::MaxIterations,
    })
}

/// Retract each free vertex's slice of the increment vector.
fn apply_step(graph: &mut PoseGraph, ordering: &Ordering, delta: &DVector<Real>) {
    for index in 0..graph.num_vertices() {
        if let Some(slot) = ordering.slot(index) {
            let increment = delta.fixed_rows::<6>(6 * slot).into_owned();
            graph.vertices_mut()[index].apply_update(&increment);
        }
    }
}
