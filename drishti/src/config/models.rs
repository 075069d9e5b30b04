//! Model and detection configuration sections.

use serde::{Deserialize, Serialize};

use crate::core::{Point2D, Rgb};
use crate::model::{ModelSpec, ObjectModel};

use super::defaults;
use super::error::ConfigLoadError;

/// One `[[models]]` entry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelSection {
    /// Unique model name
    pub name: String,

    /// Footprint outline `[x, y]` in the model frame; overrides width/depth
    #[serde(default)]
    pub outline: Option<Vec<[f32; 2]>>,

    /// Box width along model X
    #[serde(default)]
    pub width: Option<f32>,

    /// Box depth along model Y
    #[serde(default)]
    pub depth: Option<f32>,

    /// Height above the support plane
    pub height: f32,

    /// Rotationally symmetric about Z
    #[serde(default)]
    pub symmetric: bool,

    /// Explicit inflation factor
    #[serde(default)]
    pub inflation_factor: Option<f32>,

    /// Margin used to derive the inflation factor
    #[serde(default = "defaults::inflation_margin")]
    pub inflation_margin: f32,

    /// Surface color
    #[serde(default = "defaults::model_color")]
    pub color: Rgb,

    /// Skip collision checks against this model
    #[serde(default)]
    pub allow_overlap: bool,

    /// Model-specific linear search resolution
    #[serde(default)]
    pub search_resolution: Option<f32>,
}

impl ModelSection {
    /// Build the model.
    pub fn to_model(&self) -> Result<ObjectModel, ConfigLoadError> {
        let outline = match (&self.outline, self.width, self.depth) {
            (Some(points), _, _) => points.iter().map(|&p| Point2D::from(p)).collect(),
            (None, Some(w), Some(d)) => {
                let (hx, hy) = (w / 2.0, d / 2.0);
                vec![
                    Point2D::new(-hx, -hy),
                    Point2D::new(hx, -hy),
                    Point2D::new(hx, hy),
                    Point2D::new(-hx, hy),
                ]
            }
            _ => {
                return Err(ConfigLoadError::Invalid(format!(
                    "model '{}' needs an outline or both width and depth",
                    self.name
                )));
            }
        };
        ObjectModel::new(ModelSpec {
            name: self.name.clone(),
            outline,
            height: self.height,
            symmetric: self.symmetric,
            inflation_factor: self.inflation_factor,
            inflation_margin: self.inflation_margin,
            color: self.color,
            allow_overlap: self.allow_overlap,
            search_resolution: self.search_resolution,
        })
    }
}

/// A named model at a plane pose
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlacementSettings {
    /// Model name
    pub model: String,
    /// X position
    pub x: f32,
    /// Y position
    pub y: f32,
    /// Yaw (radians)
    #[serde(default)]
    pub yaw: f32,
}

/// Heuristic configuration section
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HeuristicsSection {
    /// Precomputed detections; yaw is ignored
    #[serde(default)]
    pub detections: Vec<PlacementSettings>,
}
