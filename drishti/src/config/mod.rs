//! Unified configuration loading for Drishti.
//!
//! Loads all configuration from a single TOML file.

mod defaults;
mod drishti;
mod error;
mod models;
mod observation;
mod scene;

// Re-export main types
pub use drishti::DrishtiConfig;
pub use error::ConfigLoadError;

// Re-export section types
pub use models::{HeuristicsSection, ModelSection, PlacementSettings};
pub use observation::{ObservationSection, OutputSection};
pub use scene::{CameraSettings, SceneSection};
