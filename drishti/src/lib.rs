//! # Drishti
//!
//! Search environment for estimating the poses of several known objects on a
//! support plane from a single depth (and optional color) frame.
//!
//! ## Overview
//!
//! A scene hypothesis is a set of objects at discrete planar poses. Drishti
//! exposes the graph of hypotheses to an external best-first planner:
//!
//! - **States**: partial assignments, interned to dense [`StateId`]s
//! - **Successors**: one more object at every valid grid pose
//! - **Costs**: render the new object, compare against the observed cloud
//! - **Heuristics**: admissible bound on the cost still to pay
//!
//! Edge costs are integers counted in observed points. Every computed
//! rendering, counted set and cost is cached for the life of the scene.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use drishti::{DrishtiConfig, ObjectRecognitionEnv, Observation, PlanarIcp, RaycastRenderer};
//!
//! let config = DrishtiConfig::load_default()?;
//! let models = Arc::new(config.build_model_bank()?);
//! let renderer = Arc::new(RaycastRenderer::new(
//!     config.camera()?,
//!     models.clone(),
//!     config.scene.table_height,
//! ));
//! let refiner = Arc::new(PlanarIcp::new(config.refinement.icp_config()));
//! let observation = Observation::synthesize(renderer.as_ref(), &config.ground_truth(&models)?)?;
//!
//! let mut env = ObjectRecognitionEnv::new(
//!     config.to_env_config(),
//!     models.clone(),
//!     config.scene_model_ids(&models)?,
//!     renderer,
//!     refiner,
//!     observation,
//! )?;
//! let result = env.compute_greedy_poses()?;
//! println!("cost {} for {} objects", result.total_cost, result.objects.len());
//! ```
//!
//! ## Coordinate System
//!
//! World frame with Z up. Objects rest on the plane `z = table_height` and
//! are posed by `(x, y, yaw)`. Depth images are 16-bit millimeters with 0
//! meaning no return.

pub mod config;
pub mod core;
pub mod cost;
pub mod dispatch;
pub mod env;
pub mod error;
pub mod heuristic;
pub mod io;
pub mod model;
pub mod observation;
pub mod refine;
pub mod render;
pub mod state;
pub mod successors;

#[cfg(test)]
mod testing;

pub use config::{ConfigLoadError, DrishtiConfig};
pub use core::{Bounds, Camera, ContPose, DiscPose, Point2D};
pub use cost::{Cost, CostBreakdown, CostConfig, CostEvaluator, RefinementConfig};
pub use dispatch::{DispatchConfig, Dispatcher};
pub use env::{
    EnvConfig, EnvStats, GOAL_STATE_ID, GreedyResult, ObjectRecognitionEnv, SearchEnvironment,
    Successor,
};
pub use error::{Error, Result};
pub use heuristic::{Detection, DetectionHeuristic, GeometricHeuristic, StateHeuristic};
pub use model::{ModelBank, ModelId, ObjectModel};
pub use observation::{CountedSet, Observation, ObservedScene};
pub use refine::{PlanarIcp, RefinementOracle};
pub use render::{RaycastRenderer, RenderOracle, Rendering};
pub use state::{GraphState, ObjectState, StateId};
pub use successors::{PoseGrid, SearchConfig};
