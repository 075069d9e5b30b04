//! Geometric validity of a placement given already-placed objects.

use std::sync::Arc;

use crate::core::{Bounds, Point2D};
use crate::model::ModelBank;
use crate::observation::ObservedScene;
use crate::state::ObjectState;

/// Support and collision checks shared by successor generation and the
/// acceptance test for refined poses.
pub struct PlacementValidator {
    models: Arc<ModelBank>,
    observed: Arc<ObservedScene>,
    bounds: Bounds,
    min_support: usize,
    min_constraint_support: usize,
    footprint_tolerance: f32,
}

impl PlacementValidator {
    /// Create a validator.
    ///
    /// # Arguments
    /// * `min_support` - Required observed points inside the inflated footprint
    /// * `min_constraint_support` - Required constraint points inside the
    ///   inflated footprint, when the observation has a constraint cloud
    /// * `footprint_tolerance` - Fraction of the inscribed radius sum below
    ///   which two centers collide
    pub fn new(
        models: Arc<ModelBank>,
        observed: Arc<ObservedScene>,
        bounds: Bounds,
        min_support: usize,
        min_constraint_support: usize,
        footprint_tolerance: f32,
    ) -> Self {
        Self {
            models,
            observed,
            bounds,
            min_support,
            min_constraint_support,
            footprint_tolerance,
        }
    }

    /// Scene bounds
    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Observed points inside the candidate's inflated footprint that no
    /// placed object's inflated footprint claims.
    pub fn support(&self, placed: &[ObjectState], candidate: &ObjectState) -> usize {
        let model = self.models.model(candidate.model());
        let pose = candidate.cont_pose();
        self.observed
            .points_near(pose.position(), model.inflated_reach())
            .into_iter()
            .filter(|&i| {
                let p = self.observed.point(i).position;
                let xy = Point2D::new(p.x, p.y);
                model.inflated_footprint_contains(pose, xy)
                    && !placed.iter().any(|o| {
                        self.models
                            .model(o.model())
                            .inflated_footprint_contains(o.cont_pose(), xy)
                    })
            })
            .count()
    }

    /// Constraint points inside the candidate's inflated footprint.
    pub fn constraint_support(&self, candidate: &ObjectState) -> usize {
        let model = self.models.model(candidate.model());
        let pose = candidate.cont_pose();
        let constraint = self.observed.constraint();
        self.observed
            .constraint_near(pose.position(), model.inflated_reach())
            .into_iter()
            .filter(|&i| model.inflated_footprint_contains(pose, constraint[i]))
            .count()
    }

    /// Whether the candidate collides with any placed object.
    pub fn collides(&self, placed: &[ObjectState], candidate: &ObjectState) -> bool {
        let model = self.models.model(candidate.model());
        placed.iter().any(|o| {
            let other = self.models.model(o.model());
            if model.allows_overlap() || other.allows_overlap() {
                return false;
            }
            let min_distance =
                self.footprint_tolerance * (model.inscribed_radius() + other.inscribed_radius());
            candidate.cont_pose().distance(o.cont_pose()) < min_distance
        })
    }

    /// Whether the candidate's center lies inside the scene bounds.
    pub fn in_bounds(&self, candidate: &ObjectState) -> bool {
        self.bounds.contains(candidate.cont_pose().position())
    }

    /// Whether the point support is sufficient, counting the constraint
    /// cloud when there is one.
    pub fn is_supported(&self, placed: &[ObjectState], candidate: &ObjectState) -> bool {
        if self.observed.has_constraint()
            && self.constraint_support(candidate) < self.min_constraint_support
        {
            return false;
        }
        self.support(placed, candidate) >= self.min_support
    }

    /// Full validity filter: in bounds, no collision, enough support.
    pub fn is_valid(&self, placed: &[ObjectState], candidate: &ObjectState) -> bool {
        self.in_bounds(candidate)
            && !self.collides(placed, candidate)
            && self.is_supported(placed, candidate)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use nalgebra::Point3;

    use super::PlacementValidator;
    use crate::core::{Bounds, ContPose, DiscPose};
    use crate::cost::CostConfig;
    use crate::observation::{Observation, ObservedScene};
    use crate::render::RenderOracle;
    use crate::state::ObjectState;
    use crate::testing::{BOX_A, BOX_B, Fixture};

    #[test]
    fn test_ground_truth_is_valid() {
        let fx = Fixture::new();
        let validator = fx.validator(&CostConfig::default());
        assert!(validator.is_valid(&[], &fx.truth[0]));
        assert!(validator.is_valid(&fx.truth[..1], &fx.truth[1]));
    }

    #[test]
    fn test_collision_and_bounds() {
        let fx = Fixture::new();
        let validator = fx.validator(&CostConfig::default());
        let stacked = fx.object(BOX_B, 2, 3, 0);
        assert!(validator.collides(&fx.truth[..1], &stacked));
        assert!(!validator.is_valid(&fx.truth[..1], &stacked));

        let outside = ObjectState::new(BOX_A, ContPose::new(0.8, 0.0, 0.0), DiscPose::default());
        assert!(!validator.in_bounds(&outside));
    }

    #[test]
    fn test_claimed_points_do_not_support() {
        let fx = Fixture::new();
        let validator = fx.validator(&CostConfig::default());
        let alone = validator.support(&[], &fx.truth[0]);
        assert!(alone > 0);
        assert_eq!(validator.support(&fx.truth[..1], &fx.truth[0]), 0);
    }

    #[test]
    fn test_constraint_cloud_limits_placements() {
        let fx = Fixture::new();
        // Occupied column under box_a only
        let column: Vec<Point3<f32>> = (0..12)
            .map(|i| {
                let (col, row) = ((i % 3) as f32, (i / 3) as f32);
                Point3::new(0.2 + col * 0.01, 0.1 + row * 0.01, 0.05)
            })
            .collect();
        let observation = Observation::synthesize(fx.renderer.as_ref(), &fx.truth)
            .unwrap()
            .with_constraint(column);
        let crop = Bounds::from_limits(-0.2, 0.6, -0.4, 0.4);
        let observed = ObservedScene::new(observation, fx.renderer.camera(), crop, -0.01, 0.0);
        let validator = PlacementValidator::new(
            Arc::clone(&fx.models),
            Arc::new(observed.unwrap()),
            fx.bounds,
            10,
            10,
            0.8,
        );

        assert_eq!(validator.constraint_support(&fx.truth[0]), 12);
        assert!(validator.is_valid(&[], &fx.truth[0]));
        // box_b has observed support but encloses no constraint point
        assert!(validator.support(&[], &fx.truth[1]) >= 10);
        assert_eq!(validator.constraint_support(&fx.truth[1]), 0);
        assert!(!validator.is_valid(&[], &fx.truth[1]));
    }
}
