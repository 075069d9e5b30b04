//! Target, source, last-level and occluder terms.
//!
//! # Algorithm
//!
//! ```text
//! target     = |{ p in new pixels : rendered point at p has no observed
//!                 neighbor within sensor_resolution (and matching color) }|
//! source     = |{ o newly claimed by the object's inflated volume :
//!                 no composed rendered point within sensor_resolution }|
//! last_level = |{ o still unclaimed }|          (final object only)
//! occluders  = round(clutter_regularizer * (conflicts + target occluders))
//! ```
//!
//! The lazy bound keeps the exact last-level term and a target term that
//! counts only geometric misses, so it never exceeds the full cost.

use std::sync::Arc;

use nalgebra::Point3;

use crate::core::color::color_distance;
use crate::core::{Rgb, compose, depth_to_meters, new_pixels};
use crate::observation::{CountedSet, SpatialIndex};
use crate::render::{RenderedPoint, Rendering, back_project};
use crate::state::{GraphState, ObjectState};

use super::evaluator::{CostEvaluator, Selected};
use super::types::{
    Cost, CostBreakdown, CostComputationInput, CostComputationOutput, CostMode, SingleObjectEntry,
};

/// Classification of one rendered point of the added object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TargetPoint {
    Explained,
    Unexplained,
    Occluded,
}

/// Composed rendering with an index over its back-projected points.
struct ComposedCloud<'a> {
    points: Vec<RenderedPoint>,
    index: SpatialIndex<3>,
    rendering: &'a Rendering,
}

impl<'a> ComposedCloud<'a> {
    fn new(evaluator: &CostEvaluator, rendering: &'a Rendering) -> Self {
        let points = back_project(evaluator.camera(), &rendering.depth);
        let coords: Vec<[f32; 3]> = points
            .iter()
            .map(|p| [p.position.x, p.position.y, p.position.z])
            .collect();
        Self {
            index: SpatialIndex::build(&coords),
            points,
            rendering,
        }
    }
}

impl CostEvaluator {
    /// Exact edge cost with the composed child rendering.
    pub(super) fn full_cost(
        &self,
        input: &CostComputationInput,
        selected: &Selected<'_>,
        conflicts: usize,
        adjusted_state: GraphState,
        entry: Arc<SingleObjectEntry>,
    ) -> CostComputationOutput {
        let parent = &input.parent_rendering;
        let object = &selected.variant.rendering;
        let (depth, color) = compose(&parent.depth, &parent.color, &object.depth, &object.color);
        let composed = Rendering { depth, color };

        let mut target = 0;
        let mut target_occluders = 0;
        for pixel in new_pixels(&parent.depth, &object.depth) {
            match self.classify_target(object, pixel, self.use_color()) {
                TargetPoint::Explained => {}
                TargetPoint::Unexplained => target += 1,
                TargetPoint::Occluded => target_occluders += 1,
            }
        }

        let mut counted = (*input.parent_counted).clone();
        let claimed = self.claim_volume(&selected.variant.object, &mut counted);
        let cloud = ComposedCloud::new(self, &composed);
        let source = claimed
            .iter()
            .filter(|&&i| !self.rendering_explains(&cloud, i))
            .count() as Cost;

        let last_level = if adjusted_state.len() == self.num_objects {
            let remaining: Vec<usize> = (0..counted.universe())
                .filter(|&i| !counted.contains(i))
                .collect();
            for &i in &remaining {
                counted.insert(i);
            }
            remaining.len() as Cost
        } else {
            0
        };

        let occluders = conflicts as u32 + target_occluders;
        let occluder_cost = if self.cost.use_clutter_mode {
            (self.cost.clutter_regularizer * occluders as f32).round() as Cost
        } else {
            0
        };
        let breakdown = CostBreakdown {
            target,
            source,
            last_level,
            occluders,
            occluder_cost,
        };
        log::trace!(
            "{} -> {}: target {} source {} last {} occluders {}",
            input.parent_id,
            input.child_id,
            target,
            source,
            last_level,
            occluders
        );

        CostComputationOutput {
            parent_id: input.parent_id,
            child_id: input.child_id,
            mode: CostMode::Full,
            cost: Some(breakdown.total()),
            rejection: None,
            adjusted: selected.adjusted,
            adjusted_state: Some(adjusted_state),
            rendering: Some(Arc::new(composed)),
            counted: Some(Arc::new(counted)),
            single_object: entry,
            breakdown,
        }
    }

    /// Admissible lower bound on [`CostEvaluator::full_cost`].
    pub(super) fn lazy_cost(
        &self,
        input: &CostComputationInput,
        selected: &Selected<'_>,
        adjusted_state: GraphState,
        entry: Arc<SingleObjectEntry>,
    ) -> CostComputationOutput {
        let parent = &input.parent_rendering;
        let object = &selected.variant.rendering;
        let target = new_pixels(&parent.depth, &object.depth)
            .filter(|&pixel| self.classify_target(object, pixel, false) == TargetPoint::Unexplained)
            .count() as Cost;

        let last_level = if adjusted_state.len() == self.num_objects {
            let mut counted = (*input.parent_counted).clone();
            self.claim_volume(&selected.variant.object, &mut counted);
            counted.remaining() as Cost
        } else {
            0
        };
        let breakdown = CostBreakdown {
            target,
            last_level,
            ..CostBreakdown::default()
        };

        CostComputationOutput {
            parent_id: input.parent_id,
            child_id: input.child_id,
            mode: CostMode::Lazy,
            cost: Some(breakdown.total()),
            rejection: None,
            adjusted: selected.adjusted,
            adjusted_state: Some(adjusted_state),
            rendering: None,
            counted: None,
            single_object: entry,
            breakdown,
        }
    }

    /// Whether color agreement is part of the explanation test.
    fn use_color(&self) -> bool {
        self.cost.use_color_cost && self.observed.has_color()
    }

    fn classify_target(&self, object: &Rendering, pixel: usize, with_color: bool) -> TargetPoint {
        let width = self.camera().width();
        let rendered_m = depth_to_meters(object.depth.get(pixel));
        let position = self
            .camera()
            .back_project(pixel % width, pixel / width, rendered_m);
        let color = with_color.then(|| object.color.get(pixel));
        if self.observed_explains(&position, color) {
            return TargetPoint::Explained;
        }
        if self.cost.use_clutter_mode {
            let observed = self.observed.depth();
            if observed.has_depth(pixel)
                && depth_to_meters(observed.get(pixel)) < rendered_m - self.cost.occlusion_threshold
            {
                return TargetPoint::Occluded;
            }
        }
        TargetPoint::Unexplained
    }

    /// Whether an observed point lies within sensor resolution of `position`
    /// (with a matching color when `color` is given).
    fn observed_explains(&self, position: &Point3<f32>, color: Option<Rgb>) -> bool {
        let query = [position.x, position.y, position.z];
        let radius = self.cost.sensor_resolution;
        let index = self.observed.index();
        match color {
            None => index.has_neighbor_within(&query, radius),
            Some(rgb) => index.within(&query, radius).into_iter().any(|i| {
                color_distance(rgb, self.observed.point(i).color)
                    <= self.cost.color_distance_threshold
            }),
        }
    }

    /// Whether observed point `i` has a composed rendered point nearby.
    fn rendering_explains(&self, cloud: &ComposedCloud<'_>, i: usize) -> bool {
        let observed = self.observed.point(i);
        let query = [observed.position.x, observed.position.y, observed.position.z];
        let radius = self.cost.sensor_resolution;
        if !self.use_color() {
            return cloud.index.has_neighbor_within(&query, radius);
        }
        cloud.index.within(&query, radius).into_iter().any(|j| {
            let rendered = cloud.rendering.color.get(cloud.points[j].pixel);
            color_distance(rendered, observed.color) <= self.cost.color_distance_threshold
        })
    }

    /// Insert the unclaimed observed points inside the object's inflated
    /// volume into `counted`; returns the newly claimed indices.
    fn claim_volume(&self, object: &ObjectState, counted: &mut CountedSet) -> Vec<usize> {
        let model = self.models.model(object.model());
        let pose = object.cont_pose();
        let mut claimed = Vec::new();
        for i in self.observed.points_near(pose.position(), model.inflated_reach()) {
            if counted.contains(i) {
                continue;
            }
            let inside = model.inflated_volume_contains(
                pose,
                self.table_height,
                &self.observed.point(i).position,
            );
            if inside && counted.insert(i) {
                claimed.push(i);
            }
        }
        claimed
    }
}

#[cfg(test)]
mod tests {
    use crate::cost::{CostConfig, RefinementConfig};
    use crate::testing::{BOX_B, Fixture};

    #[test]
    fn test_claim_volume_claims_each_point_once() {
        let fixture = Fixture::new();
        let evaluator =
            fixture.evaluator(CostConfig::default(), RefinementConfig::disabled(), None);
        let mut counted = fixture.empty_counted();

        let first = evaluator.claim_volume(&fixture.truth[0], &mut counted);
        assert!(!first.is_empty());
        assert_eq!(counted.len(), first.len());
        assert!(first.iter().all(|&i| counted.contains(i)));

        assert!(evaluator.claim_volume(&fixture.truth[0], &mut counted).is_empty());
        assert_eq!(counted.len(), first.len());

        // An empty corner of the table claims nothing
        let far = fixture.object(BOX_B, 0, 0, 0);
        assert!(evaluator.claim_volume(&far, &mut counted).is_empty());
    }
}
