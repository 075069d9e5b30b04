//! Observation and output configuration sections.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::defaults;
use super::models::PlacementSettings;

/// Observation configuration section
///
/// Either `depth` (a 16-bit PGM in millimeters) or `ground_truth` must be
/// given; with ground truth the observation is rendered from it.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ObservationSection {
    /// Observed depth image
    #[serde(default)]
    pub depth: Option<PathBuf>,

    /// Observed color image (PPM)
    #[serde(default)]
    pub color: Option<PathBuf>,

    /// Placements to synthesize the observation from
    #[serde(default)]
    pub ground_truth: Vec<PlacementSettings>,

    /// Constraint cloud: points that must be enclosed by placed objects
    #[serde(default)]
    pub constraint: Vec<[f32; 3]>,
}

/// Output configuration section
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OutputSection {
    /// Identifier written before each scene's results
    #[serde(default = "defaults::scene_id")]
    pub scene_id: String,

    /// Directory for debug renderings of the result
    #[serde(default)]
    pub debug_dir: Option<PathBuf>,
}

impl Default for OutputSection {
    fn default() -> Self {
        Self {
            scene_id: defaults::scene_id(),
            debug_dir: None,
        }
    }
}
