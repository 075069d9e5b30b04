//! Axis-aligned scene bounds on the support plane.
//!
//! [`Bounds`] limits where object centers may be placed. The pose grid is laid
//! out from the minimum corner; see [`crate::successors::PoseGrid`].

use serde::{Deserialize, Serialize};

use super::point::Point2D;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    /// Minimum corner (smallest x and y values).
    pub min: Point2D,
    /// Maximum corner (largest x and y values).
    pub max: Point2D,
}

impl Bounds {
    /// Create a new bounding box from min and max corners.
    #[inline]
    pub const fn new(min: Point2D, max: Point2D) -> Self {
        Self { min, max }
    }

    /// Create bounds from explicit limits.
    #[inline]
    pub const fn from_limits(x_min: f32, x_max: f32, y_min: f32, y_max: f32) -> Self {
        Self::new(Point2D::new(x_min, y_min), Point2D::new(x_max, y_max))
    }

    /// Width (X extent).
    #[inline]
    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    /// Height (Y extent).
    #[inline]
    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Bounds are usable when both extents are finite and non-negative.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.min.x.is_finite()
            && self.min.y.is_finite()
            && self.max.x.is_finite()
            && self.max.y.is_finite()
            && self.width() >= 0.0
            && self.height() >= 0.0
    }

    /// Check if a point is inside the bounds (inclusive).
    #[inline]
    pub fn contains(&self, point: Point2D) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self::from_limits(-0.5, 0.5, -0.5, 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contains_is_inclusive() {
        let b = Bounds::from_limits(0.0, 1.0, -1.0, 1.0);
        assert!(b.contains(Point2D::new(1.0, 1.0)));
        assert!(b.contains(Point2D::new(0.0, -1.0)));
        assert!(!b.contains(Point2D::new(1.01, 0.0)));
    }

    #[test]
    fn test_validity() {
        assert!(Bounds::from_limits(0.0, 0.0, 0.0, 0.0).is_valid());
        assert!(!Bounds::from_limits(1.0, 0.0, 0.0, 1.0).is_valid());
        assert!(!Bounds::from_limits(f32::NAN, 1.0, 0.0, 1.0).is_valid());
    }
}
