//! Convex footprint polygons.
//!
//! Object models stand on the support plane as upright prisms; their 2D
//! footprint is kept as a convex polygon in counter-clockwise order in the
//! model frame.

use crate::core::Point2D;

/// Convex polygon, counter-clockwise, no repeated closing vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvexFootprint {
    vertices: Vec<Point2D>,
}

impl ConvexFootprint {
    /// Convex hull of the given points (Andrew's monotone chain).
    ///
    /// Returns `None` when the points do not span a polygon with area.
    pub fn from_points(points: &[Point2D]) -> Option<Self> {
        let mut pts: Vec<Point2D> = points
            .iter()
            .copied()
            .filter(|p| p.x.is_finite() && p.y.is_finite())
            .collect();
        if pts.len() < 3 {
            return None;
        }
        pts.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));
        pts.dedup();

        let turn = |o: Point2D, a: Point2D, b: Point2D| (a - o).cross(b - o);
        let mut hull: Vec<Point2D> = Vec::with_capacity(pts.len() * 2);
        for &p in pts.iter() {
            while hull.len() >= 2 && turn(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0 {
                hull.pop();
            }
            hull.push(p);
        }
        let lower_len = hull.len() + 1;
        for &p in pts.iter().rev().skip(1) {
            while hull.len() >= lower_len
                && turn(hull[hull.len() - 2], hull[hull.len() - 1], p) <= 0.0
            {
                hull.pop();
            }
            hull.push(p);
        }
        hull.pop();

        let footprint = Self { vertices: hull };
        (footprint.vertices.len() >= 3 && footprint.area() > 1e-9).then_some(footprint)
    }

    /// Axis-aligned rectangle centered on the origin.
    pub fn rectangle(width: f32, depth: f32) -> Option<Self> {
        let (hx, hy) = (width / 2.0, depth / 2.0);
        Self::from_points(&[
            Point2D::new(-hx, -hy),
            Point2D::new(hx, -hy),
            Point2D::new(hx, hy),
            Point2D::new(-hx, hy),
        ])
    }

    /// Vertices in counter-clockwise order.
    pub fn vertices(&self) -> &[Point2D] {
        &self.vertices
    }

    /// Edges as (start, end) pairs.
    pub fn edges(&self) -> impl Iterator<Item = (Point2D, Point2D)> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Polygon area.
    pub fn area(&self) -> f32 {
        self.edges().map(|(a, b)| a.cross(b)).sum::<f32>() / 2.0
    }

    /// Point-in-polygon test (boundary counts as inside).
    pub fn contains(&self, point: Point2D) -> bool {
        self.edges().all(|(a, b)| (b - a).cross(point - a) >= -1e-7)
    }

    /// Distance from the origin to the nearest edge line; 0 if the origin is outside.
    pub fn inscribed_radius(&self) -> f32 {
        if !self.contains(Point2D::default()) {
            return 0.0;
        }
        self.edges()
            .map(|(a, b)| {
                let edge = b - a;
                (edge.cross(Point2D::default() - a) / edge.length()).abs()
            })
            .fold(f32::INFINITY, f32::min)
    }

    /// Distance from the origin to the farthest vertex.
    pub fn circumscribed_radius(&self) -> f32 {
        self.vertices
            .iter()
            .map(|v| v.length())
            .fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hull_drops_interior_points() {
        let fp = ConvexFootprint::from_points(&[
            Point2D::new(0.0, 0.0),
            Point2D::new(1.0, 0.0),
            Point2D::new(0.5, 0.2),
            Point2D::new(1.0, 1.0),
            Point2D::new(0.0, 1.0),
        ])
        .unwrap();
        assert_eq!(fp.vertices().len(), 4);
        assert_relative_eq!(fp.area(), 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_rejected() {
        assert!(
            ConvexFootprint::from_points(&[Point2D::new(0.0, 0.0), Point2D::new(1.0, 1.0)])
                .is_none()
        );
        assert!(
            ConvexFootprint::from_points(&[
                Point2D::new(0.0, 0.0),
                Point2D::new(1.0, 1.0),
                Point2D::new(2.0, 2.0),
            ])
            .is_none()
        );
    }

    #[test]
    fn test_rectangle_radii() {
        let fp = ConvexFootprint::rectangle(0.2, 0.1).unwrap();
        assert_relative_eq!(fp.inscribed_radius(), 0.05, epsilon = 1e-6);
        assert_relative_eq!(
            fp.circumscribed_radius(),
            (0.1f32).hypot(0.05),
            epsilon = 1e-6
        );
        assert!(fp.contains(Point2D::new(0.1, 0.05)));
        assert!(!fp.contains(Point2D::new(0.11, 0.0)));
    }
}
