//! Render-and-compare edge costs.
//!
//! An edge adds one object to a parent placement. Its cost counts observed
//! and rendered points that fail to explain each other:
//!
//! - **target**: rendered points of the new object with no observed point
//!   nearby
//! - **source**: observed points newly claimed by the object's inflated
//!   volume with no rendered point nearby
//! - **last level**: observed points nobody claimed, charged on the edge
//!   that places the final object
//! - **occluders**: clutter-mode charge for points hidden by unmodeled
//!   objects
//!
//! Summed along a path to a goal, every observed point is charged at most
//! once by the source and last-level terms.

mod config;
mod evaluator;
mod single_object;
mod terms;
mod types;

pub use config::{CostConfig, RefinementConfig};
pub use evaluator::CostEvaluator;
pub use types::{
    Cost, CostBreakdown, CostComputationInput, CostComputationOutput, CostMode, ObjectVariant,
    Rejection, SingleObjectEntry,
};
