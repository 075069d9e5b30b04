//! Pinhole camera model shared by rendering and observation back-projection.
//!
//! Camera frame follows the optical convention: X right, Y down, Z forward.
//! Depth values are distances along the optical axis (camera Z), the way a
//! structured-light depth sensor reports them.
//!
//! Pixel `(u, v)` covers the continuous image square `[u, u+1) × [v, v+1)`;
//! rays and back-projection go through the pixel center.

use nalgebra::{Isometry3, Matrix3, Point3, Rotation3, Translation3, UnitQuaternion, Vector3};

/// Pinhole intrinsics.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraIntrinsics {
    /// Focal length in pixels (X)
    pub fx: f32,
    /// Focal length in pixels (Y)
    pub fy: f32,
    /// Principal point X in pixels
    pub cx: f32,
    /// Principal point Y in pixels
    pub cy: f32,
    /// Image width in pixels
    pub width: usize,
    /// Image height in pixels
    pub height: usize,
}

impl CameraIntrinsics {
    /// Intrinsics are usable when focal lengths are positive and the image is non-empty.
    pub fn is_valid(&self) -> bool {
        self.fx > 0.0
            && self.fy > 0.0
            && self.fx.is_finite()
            && self.fy.is_finite()
            && self.width > 0
            && self.height > 0
    }
}

/// Posed pinhole camera.
#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    /// Intrinsic parameters
    pub intrinsics: CameraIntrinsics,
    /// Camera-to-world transform
    pub pose: Isometry3<f32>,
}

impl Camera {
    /// Create a camera from intrinsics and camera-to-world pose.
    pub fn new(intrinsics: CameraIntrinsics, pose: Isometry3<f32>) -> Self {
        Self { intrinsics, pose }
    }

    /// Build a camera at `position` looking at `target`, with world Z as up.
    ///
    /// Returns `None` when position and target coincide.
    pub fn look_at(
        intrinsics: CameraIntrinsics,
        position: Point3<f32>,
        target: Point3<f32>,
    ) -> Option<Self> {
        let forward = (target - position).try_normalize(1e-6)?;
        // Looking straight down: world X takes the role of up
        let up = if forward.cross(&Vector3::z()).norm() < 1e-6 {
            Vector3::x()
        } else {
            Vector3::z()
        };
        let right = forward.cross(&up).normalize();
        let down = forward.cross(&right);
        let rotation =
            Rotation3::from_matrix_unchecked(Matrix3::from_columns(&[right, down, forward]));
        let pose = Isometry3::from_parts(
            Translation3::from(position.coords),
            UnitQuaternion::from_rotation_matrix(&rotation),
        );
        Some(Self::new(intrinsics, pose))
    }

    /// Image width in pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.intrinsics.width
    }

    /// Image height in pixels.
    #[inline]
    pub fn height(&self) -> usize {
        self.intrinsics.height
    }

    /// Number of pixels.
    #[inline]
    pub fn num_pixels(&self) -> usize {
        self.intrinsics.width * self.intrinsics.height
    }

    /// Camera center in world coordinates.
    #[inline]
    pub fn origin(&self) -> Point3<f32> {
        Point3::from(self.pose.translation.vector)
    }

    /// World-frame ray direction through the center of pixel `(u, v)`.
    ///
    /// The direction is scaled so its camera-frame Z component is 1, so the
    /// ray parameter equals optical depth.
    #[inline]
    pub fn ray_direction(&self, u: usize, v: usize) -> Vector3<f32> {
        let k = &self.intrinsics;
        let local = Vector3::new(
            (u as f32 + 0.5 - k.cx) / k.fx,
            (v as f32 + 0.5 - k.cy) / k.fy,
            1.0,
        );
        self.pose.rotation * local
    }

    /// Back-project pixel `(u, v)` with optical depth `depth` (meters) to world.
    #[inline]
    pub fn back_project(&self, u: usize, v: usize, depth: f32) -> Point3<f32> {
        self.origin() + self.ray_direction(u, v) * depth
    }

    /// Project a world point to continuous image coordinates and optical depth.
    ///
    /// Returns `None` for points at or behind the image plane.
    pub fn project(&self, point: &Point3<f32>) -> Option<(f32, f32, f32)> {
        let local = self.pose.inverse_transform_point(point);
        if local.z <= 1e-6 {
            return None;
        }
        let k = &self.intrinsics;
        Some((
            k.fx * local.x / local.z + k.cx,
            k.fy * local.y / local.z + k.cy,
            local.z,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn test_camera() -> Camera {
        let k = CameraIntrinsics {
            fx: 50.0,
            fy: 50.0,
            cx: 32.0,
            cy: 24.0,
            width: 64,
            height: 48,
        };
        Camera::look_at(k, Point3::new(-1.0, 0.0, 0.5), Point3::new(0.0, 0.0, 0.0)).unwrap()
    }

    #[test]
    fn test_project_back_project_roundtrip() {
        let cam = test_camera();
        let p = cam.back_project(10, 30, 1.2);
        let (u, v, d) = cam.project(&p).unwrap();
        assert_relative_eq!(u, 10.5, epsilon = 1e-3);
        assert_relative_eq!(v, 30.5, epsilon = 1e-3);
        assert_relative_eq!(d, 1.2, epsilon = 1e-4);
    }

    #[test]
    fn test_look_at_target_projects_to_center() {
        let cam = test_camera();
        let (u, v, _) = cam.project(&Point3::new(0.0, 0.0, 0.0)).unwrap();
        assert_relative_eq!(u, 32.0, epsilon = 1e-3);
        assert_relative_eq!(v, 24.0, epsilon = 1e-3);
    }

    #[test]
    fn test_up_is_up_in_image() {
        let cam = test_camera();
        let (_, v_low, _) = cam.project(&Point3::new(0.0, 0.0, 0.0)).unwrap();
        let (_, v_high, _) = cam.project(&Point3::new(0.0, 0.0, 0.2)).unwrap();
        assert!(v_high < v_low, "higher points appear nearer the top row");
    }

    #[test]
    fn test_look_straight_down() {
        let k = test_camera().intrinsics;
        let cam = Camera::look_at(k, Point3::new(0.0, 0.0, 1.0), Point3::new(0.0, 0.0, 0.0));
        assert!(cam.is_some());
        assert!(Camera::look_at(k, Point3::origin(), Point3::origin()).is_none());
    }

    #[test]
    fn test_behind_camera() {
        let cam = test_camera();
        assert!(cam.project(&Point3::new(-2.0, 0.0, 0.5)).is_none());
    }
}
