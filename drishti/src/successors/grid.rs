//! Discrete pose grid over the scene bounds.

use std::f32::consts::PI;

use crate::core::{Bounds, ContPose, DiscPose, Point2D, math::TWO_PI};
use crate::model::ObjectModel;

use super::SearchConfig;

/// Regular (x, y, yaw) lattice for one model.
///
/// Cell `(xi, yi, ti)` sits at `min + (xi, yi) · resolution` with yaw
/// `ti · theta_resolution`. Symmetric models get a single yaw.
#[derive(Clone, Debug, PartialEq)]
pub struct PoseGrid {
    origin: Point2D,
    resolution: f32,
    theta_resolution: f32,
    x_steps: i32,
    y_steps: i32,
    yaw_steps: i32,
}

impl PoseGrid {
    /// Create a grid covering `bounds` (inclusive of both edges).
    pub fn new(bounds: Bounds, resolution: f32, theta_resolution: f32, symmetric: bool) -> Self {
        let steps = |extent: f32| ((extent / resolution) + 1e-3).floor() as i32 + 1;
        let yaw_steps = if symmetric {
            1
        } else {
            ((TWO_PI / theta_resolution) - 1e-3).ceil().max(1.0) as i32
        };
        Self {
            origin: bounds.min,
            resolution,
            theta_resolution,
            x_steps: steps(bounds.width()),
            y_steps: steps(bounds.height()),
            yaw_steps,
        }
    }

    /// Grid for a model.
    ///
    /// A model's declared resolution wins when model-specific resolution is
    /// enabled; otherwise adaptive resolution uses the model's inscribed
    /// radius, and the fixed resolution applies last.
    pub fn for_model(bounds: Bounds, search: &SearchConfig, model: &ObjectModel) -> Self {
        let resolution = match model.search_resolution() {
            Some(r) if search.use_model_specific_search_resolution => r,
            _ if search.use_adaptive_resolution && model.inscribed_radius() > 0.0 => {
                model.inscribed_radius()
            }
            _ => search.resolution,
        };
        Self::new(
            bounds,
            resolution,
            search.theta_resolution,
            model.is_symmetric(),
        )
    }

    /// Linear resolution
    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    /// Angular resolution
    pub fn theta_resolution(&self) -> f32 {
        self.theta_resolution
    }

    /// Number of yaw cells
    pub fn yaw_steps(&self) -> i32 {
        self.yaw_steps
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        (self.x_steps * self.y_steps * self.yaw_steps) as usize
    }

    /// Whether the grid has no cells
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Continuous pose of a cell
    pub fn cont(&self, disc: DiscPose) -> ContPose {
        ContPose::new(
            self.origin.x + disc.x as f32 * self.resolution,
            self.origin.y + disc.y as f32 * self.resolution,
            disc.yaw as f32 * self.theta_resolution,
        )
    }

    /// Nearest cell to a continuous pose (not clamped to the grid)
    pub fn disc(&self, pose: ContPose) -> DiscPose {
        let yaw_cell = (pose.yaw / self.theta_resolution).round() as i32;
        DiscPose::new(
            ((pose.x - self.origin.x) / self.resolution).round() as i32,
            ((pose.y - self.origin.y) / self.resolution).round() as i32,
            if self.yaw_steps == 1 { 0 } else { yaw_cell.rem_euclid(self.yaw_steps) },
        )
    }

    /// All cells: x outermost, then y, then yaw.
    pub fn cells(&self) -> impl Iterator<Item = DiscPose> + '_ {
        (0..self.x_steps).flat_map(move |x| {
            (0..self.y_steps)
                .flat_map(move |y| (0..self.yaw_steps).map(move |t| DiscPose::new(x, y, t)))
        })
    }

    /// Cell centers on the plane, ignoring yaw.
    pub fn positions(&self) -> impl Iterator<Item = Point2D> + '_ {
        (0..self.x_steps).flat_map(move |x| {
            (0..self.y_steps).map(move |y| {
                Point2D::new(
                    self.origin.x + x as f32 * self.resolution,
                    self.origin.y + y as f32 * self.resolution,
                )
            })
        })
    }
}

/// Default angular resolution: eight yaw cells.
pub(crate) fn default_theta_resolution() -> f32 {
    PI / 4.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_cell_counts() {
        let grid = PoseGrid::new(
            Bounds::from_limits(0.0, 0.4, -0.2, 0.2),
            0.1,
            FRAC_PI_2,
            false,
        );
        assert_eq!(grid.len(), 5 * 5 * 4);
        let symmetric = PoseGrid::new(
            Bounds::from_limits(0.0, 0.4, -0.2, 0.2),
            0.1,
            FRAC_PI_2,
            true,
        );
        assert_eq!(symmetric.len(), 25);
        assert_eq!(symmetric.yaw_steps(), 1);
    }

    #[test]
    fn test_traversal_order() {
        let grid = PoseGrid::new(Bounds::from_limits(0.0, 0.1, 0.0, 0.1), 0.1, PI, false);
        let cells: Vec<_> = grid.cells().collect();
        assert_eq!(cells[0], DiscPose::new(0, 0, 0));
        assert_eq!(cells[1], DiscPose::new(0, 0, 1));
        assert_eq!(cells[2], DiscPose::new(0, 1, 0));
        assert_eq!(cells.len(), 8);
    }

    #[test]
    fn test_cont_disc_roundtrip() {
        let grid = PoseGrid::new(
            Bounds::from_limits(-0.3, 0.3, -0.3, 0.3),
            0.05,
            PI / 4.0,
            false,
        );
        for disc in grid.cells().step_by(7) {
            assert_eq!(grid.disc(grid.cont(disc)), disc);
        }
        let pose = grid.cont(DiscPose::new(2, 3, 1));
        assert_relative_eq!(pose.x, -0.2, epsilon = 1e-5);
        assert_relative_eq!(pose.y, -0.15, epsilon = 1e-5);
        assert_relative_eq!(pose.yaw, PI / 4.0, epsilon = 1e-5);
    }

    #[test]
    fn test_adaptive_resolution_follows_model_size() {
        let model = ObjectModel::cuboid("crate", 0.1, 0.1, 0.1, [0, 0, 0]).unwrap();
        let bounds = Bounds::from_limits(0.0, 0.4, -0.2, 0.2);
        let mut search = SearchConfig {
            resolution: 0.1,
            ..SearchConfig::default()
        };
        assert_relative_eq!(
            PoseGrid::for_model(bounds, &search, &model).resolution(),
            0.1
        );

        search.use_adaptive_resolution = true;
        let grid = PoseGrid::for_model(bounds, &search, &model);
        assert_relative_eq!(grid.resolution(), 0.05, epsilon = 1e-5);
        assert_eq!(grid.len(), 9 * 9 * 8);
    }
}
