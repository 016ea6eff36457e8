//! Loop-closure demo: drifting odometry around a circle, corrected by one
//! closing constraint.
//!
//! Run with `cargo run --example loop_closure`.

use anyhow::Result;
use posegraph::core::synthetic::{circle_trajectory, integrate_odometry, relative_pose, TangentNoise};
use posegraph::core::se3;
use posegraph::optim::{information_from_std_dev, optimize, Edge, OptimizeOptions, PoseGraph};

fn main() -> Result<()> {
    let num_poses = 24;
    let ground_truth = circle_trajectory(num_poses, 5.0);

    // Simulated sensor: noisy relative measurements along the trajectory.
    let noise = TangentNoise {
        seed: 7,
        max_abs_trans: 0.04,
        max_abs_rot: 0.01,
    };
    let information = information_from_std_dev(0.05, 0.02);

    let mut measurements = Vec::new();
    for i in 0..num_poses - 1 {
        let exact = relative_pose(&ground_truth[i], &ground_truth[i + 1]);
        measurements.push(se3::retract(&exact, &noise.sample(i)));
    }

    // Odometry integration drifts; the graph starts from these estimates.
    let initial = integrate_odometry(&ground_truth[0], &measurements);

    let mut graph = PoseGraph::new();
    for (i, pose) in initial.iter().enumerate() {
        graph.add_vertex(i as u64, *pose, i == 0)?;
    }
    for (i, measurement) in measurements.iter().enumerate() {
        graph.add_edge(Edge::new(i as u64, i as u64 + 1, *measurement, information)?)?;
    }

    // Revisiting the start closes the loop.
    let closure = se3::retract(
        &relative_pose(&ground_truth[num_poses - 1], &ground_truth[0]),
        &noise.sample(1000),
    );
    graph.add_edge(Edge::new(num_poses as u64 - 1, 0, closure, information)?)?;

    let end_drift = (initial[num_poses - 1].translation.vector
        - ground_truth[num_poses - 1].translation.vector)
        .norm();
    println!("odometry drift at loop end: {end_drift:.3} m");
    println!("initial cost: {:.4e}", graph.total_cost());

    let report = optimize(&mut graph, &OptimizeOptions::default())?;
    println!(
        "{:?} after {} iterations, final cost {:.4e}",
        report.termination, report.iterations, report.final_cost
    );

    let end_error = (graph
        .get_pose(num_poses as u64 - 1)
        .expect("vertex exists")
        .translation
        .vector
        - ground_truth[num_poses - 1].translation.vector)
        .norm();
    println!("remaining error at loop end: {end_error:.3} m");

    Ok(())
}
