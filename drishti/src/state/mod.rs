//! Search state model and registry.
//!
//! - [`ObjectState`]: one model at one pose (identity = model + grid cell)
//! - [`GraphState`]: partial scene assignment, compared as a set
//! - [`StateRegistry`]: arena that hands out dense [`StateId`]s

mod graph;
mod object;
mod registry;

pub use graph::GraphState;
pub use object::{ObjectState, Placement};
pub use registry::{StateId, StateRegistry};
