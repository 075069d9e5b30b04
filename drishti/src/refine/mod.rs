//! Pose refinement oracle.
//!
//! After a candidate object is rendered at its grid pose, the environment asks
//! a [`RefinementOracle`] to nudge it onto the observed points around it. The
//! oracle sees only point clouds and an initial pose; whether its answer is
//! accepted (in bounds, supported, small enough motion) is decided by the cost
//! evaluator.

mod icp;

pub use icp::{IcpConfig, PlanarIcp};

use nalgebra::Point3;

use crate::core::ContPose;

/// Input to one refinement call.
#[derive(Clone, Copy, Debug)]
pub struct RefinementRequest<'a> {
    /// Unrefined object pose
    pub initial: ContPose,
    /// Rendered surface points of the object at `initial` (world frame)
    pub source: &'a [Point3<f32>],
    /// Observed points around the object (world frame)
    pub target: &'a [Point3<f32>],
    /// Whether yaw may change (false for rotationally symmetric models)
    pub allow_rotation: bool,
}

/// Outcome of one refinement call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RefinementResult {
    /// Adjusted pose (equals the initial pose on failure)
    pub pose: ContPose,
    /// Mean squared correspondence distance (m²); `f32::MAX` if unknown
    pub fitness: f32,
    /// Whether the optimizer converged
    pub converged: bool,
    /// Iterations performed
    pub iterations: u32,
}

impl RefinementResult {
    /// Result that leaves the pose unchanged
    pub fn failed(initial: ContPose, iterations: u32) -> Self {
        Self {
            pose: initial,
            fitness: f32::MAX,
            converged: false,
            iterations,
        }
    }
}

/// Locally aligns an object pose to observed points.
pub trait RefinementOracle: Send + Sync {
    /// Refine `request.initial` so `request.source` moves onto `request.target`.
    fn refine(&self, request: &RefinementRequest<'_>) -> RefinementResult;

    /// Name for logging
    fn name(&self) -> &str;
}
