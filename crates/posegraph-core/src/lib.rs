//! Core math primitives for `pose-graph-rs`.
//!
//! This crate contains:
//! - linear algebra type aliases (`Real`, `Vec6`, `Mat6`, `Iso3`, ...),
//! - the SE(3) tangent-space algebra (`exp`, `log`, `retract`, `adjoint`),
//! - deterministic synthetic trajectory helpers for tests and demos.
//!
//! Poses are `nalgebra::Isometry3` values, so the rotation part is a unit
//! quaternion and stays a valid rotation through every update; tangent
//! vectors are ordered `[rho, theta]` (translation first, rotation second).

/// Linear algebra type aliases and helpers.
pub mod math;
/// SE(3) exponential/logarithm maps and Jacobians.
pub mod se3;
/// Deterministic synthetic trajectories and measurement noise.
pub mod synthetic;

pub use math::*;
