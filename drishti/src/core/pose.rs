//! Object poses on the support plane.
//!
//! Objects rest on a horizontal support surface, so a full 6-DoF pose reduces
//! to a planar position and a yaw about world Z. The height is implied by the
//! support-plane height (the object's base touches the table).
//!
//! - [`ContPose`]: continuous pose in meters / radians
//! - [`DiscPose`]: integer cell on the search pose grid

use std::fmt;

use serde::{Deserialize, Serialize};

use super::math::{angle_diff, wrap_two_pi};
use super::point::Point2D;

/// Continuous planar pose of an object.
///
/// - Position: (x, y) in meters, world frame
/// - Yaw: radians in [0, 2π), counter-clockwise about world Z
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ContPose {
    /// X position in meters.
    pub x: f32,
    /// Y position in meters.
    pub y: f32,
    /// Yaw in radians [0, 2π).
    pub yaw: f32,
}

impl ContPose {
    /// Create a new pose; yaw is wrapped to [0, 2π).
    #[inline]
    pub fn new(x: f32, y: f32, yaw: f32) -> Self {
        Self {
            x,
            y,
            yaw: wrap_two_pi(yaw),
        }
    }

    /// Position as a point.
    #[inline]
    pub fn position(self) -> Point2D {
        Point2D::new(self.x, self.y)
    }

    /// Transform a point from the object frame to the world frame.
    #[inline]
    pub fn transform_point(self, point: Point2D) -> Point2D {
        let (sin, cos) = self.yaw.sin_cos();
        Point2D {
            x: self.x + point.x * cos - point.y * sin,
            y: self.y + point.x * sin + point.y * cos,
        }
    }

    /// Transform a point from the world frame to the object frame.
    #[inline]
    pub fn inverse_transform_point(self, point: Point2D) -> Point2D {
        let (sin, cos) = self.yaw.sin_cos();
        let dx = point.x - self.x;
        let dy = point.y - self.y;
        Point2D {
            x: dx * cos + dy * sin,
            y: -dx * sin + dy * cos,
        }
    }

    /// Planar distance between the two positions.
    #[inline]
    pub fn distance(self, other: ContPose) -> f32 {
        self.position().distance(other.position())
    }

    /// Absolute yaw difference, handling wrap-around.
    #[inline]
    pub fn yaw_distance(self, other: ContPose) -> f32 {
        angle_diff(self.yaw, other.yaw).abs()
    }

    /// Check approximate equality.
    pub fn approx_eq(self, other: ContPose, pos_tol: f32, yaw_tol: f32) -> bool {
        self.distance(other) <= pos_tol && self.yaw_distance(other) <= yaw_tol
    }
}

impl fmt::Display for ContPose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}, {:.3})", self.x, self.y, self.yaw)
    }
}

/// Integer cell on the pose grid.
///
/// `x`/`y` count linear resolution steps from the scene's minimum corner and
/// `yaw` counts angular resolution steps from zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DiscPose {
    /// Column index
    pub x: i32,
    /// Row index
    pub y: i32,
    /// Yaw index
    pub yaw: i32,
}

impl DiscPose {
    /// Create a new discrete pose
    #[inline]
    pub const fn new(x: i32, y: i32, yaw: i32) -> Self {
        Self { x, y, yaw }
    }
}

impl fmt::Display for DiscPose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}, {}]", self.x, self.y, self.yaw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::{FRAC_PI_2, PI};

    #[test]
    fn test_new_wraps_yaw() {
        let pose = ContPose::new(0.0, 0.0, -FRAC_PI_2);
        assert_relative_eq!(pose.yaw, 1.5 * PI, epsilon = 1e-5);
    }

    #[test]
    fn test_transform_roundtrip() {
        let pose = ContPose::new(1.0, 2.0, 0.7);
        let local = Point2D::new(0.3, -0.2);
        let world = pose.transform_point(local);
        let back = pose.inverse_transform_point(world);
        assert_relative_eq!(back.x, local.x, epsilon = 1e-5);
        assert_relative_eq!(back.y, local.y, epsilon = 1e-5);
    }

    #[test]
    fn test_transform_quarter_turn() {
        let pose = ContPose::new(1.0, 0.0, FRAC_PI_2);
        let world = pose.transform_point(Point2D::new(1.0, 0.0));
        assert_relative_eq!(world.x, 1.0, epsilon = 1e-5);
        assert_relative_eq!(world.y, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_yaw_distance_wraps() {
        let a = ContPose::new(0.0, 0.0, 0.05);
        let b = ContPose::new(0.0, 0.0, 2.0 * PI - 0.05);
        assert_relative_eq!(a.yaw_distance(b), 0.1, epsilon = 1e-4);
        assert!(a.approx_eq(b, 1e-3, 0.11));
    }
}
