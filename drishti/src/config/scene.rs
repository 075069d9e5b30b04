//! Scene configuration section.

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::core::{Bounds, Camera, CameraIntrinsics};

use super::defaults;
use super::error::ConfigLoadError;

/// Scene configuration section
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SceneSection {
    /// Minimum X of object centers
    #[serde(default = "defaults::bound_min")]
    pub x_min: f32,

    /// Maximum X of object centers
    #[serde(default = "defaults::bound_max")]
    pub x_max: f32,

    /// Minimum Y of object centers
    #[serde(default = "defaults::bound_min")]
    pub y_min: f32,

    /// Maximum Y of object centers
    #[serde(default = "defaults::bound_max")]
    pub y_max: f32,

    /// Support plane height
    #[serde(default)]
    pub table_height: f32,

    /// Names of the models present in the scene, in search order
    #[serde(default)]
    pub models: Vec<String>,

    /// Camera
    #[serde(default)]
    pub camera: CameraSettings,
}

impl Default for SceneSection {
    fn default() -> Self {
        Self {
            x_min: defaults::bound_min(),
            x_max: defaults::bound_max(),
            y_min: defaults::bound_min(),
            y_max: defaults::bound_max(),
            table_height: 0.0,
            models: Vec::new(),
            camera: CameraSettings::default(),
        }
    }
}

impl SceneSection {
    /// Placement bounds
    pub fn bounds(&self) -> Bounds {
        Bounds::from_limits(self.x_min, self.x_max, self.y_min, self.y_max)
    }
}

/// Pinhole camera pose and intrinsics
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CameraSettings {
    /// Camera center in the world frame
    #[serde(default = "defaults::camera_position")]
    pub position: [f32; 3],

    /// World point on the optical axis
    #[serde(default = "defaults::camera_target")]
    pub look_at: [f32; 3],

    /// Focal length X (pixels)
    #[serde(default = "defaults::focal_length")]
    pub fx: f32,

    /// Focal length Y (pixels)
    #[serde(default = "defaults::focal_length")]
    pub fy: f32,

    /// Principal point X (pixels)
    #[serde(default = "defaults::principal_x")]
    pub cx: f32,

    /// Principal point Y (pixels)
    #[serde(default = "defaults::principal_y")]
    pub cy: f32,

    /// Image width (pixels)
    #[serde(default = "defaults::image_width")]
    pub width: usize,

    /// Image height (pixels)
    #[serde(default = "defaults::image_height")]
    pub height: usize,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            position: defaults::camera_position(),
            look_at: defaults::camera_target(),
            fx: defaults::focal_length(),
            fy: defaults::focal_length(),
            cx: defaults::principal_x(),
            cy: defaults::principal_y(),
            width: defaults::image_width(),
            height: defaults::image_height(),
        }
    }
}

impl CameraSettings {
    /// Intrinsics
    pub fn intrinsics(&self) -> CameraIntrinsics {
        CameraIntrinsics {
            fx: self.fx,
            fy: self.fy,
            cx: self.cx,
            cy: self.cy,
            width: self.width,
            height: self.height,
        }
    }

    /// Build the posed camera.
    pub fn to_camera(&self) -> Result<Camera, ConfigLoadError> {
        let intrinsics = self.intrinsics();
        if !intrinsics.is_valid() {
            return Err(ConfigLoadError::Invalid(
                "camera focal lengths and image size must be positive".to_string(),
            ));
        }
        let [px, py, pz] = self.position;
        let [tx, ty, tz] = self.look_at;
        Camera::look_at(intrinsics, Point3::new(px, py, pz), Point3::new(tx, ty, tz)).ok_or_else(
            || ConfigLoadError::Invalid("camera position and look_at coincide".to_string()),
        )
    }
}
