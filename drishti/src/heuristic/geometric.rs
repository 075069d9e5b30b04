//! Admissible estimate from the observed points no remaining model can reach.
//!
//! # Algorithm
//!
//! Every observed point that the state has not claimed is either claimed
//! later by an unplaced model (at cost 0 or 1) or charged 1 on the final
//! edge. A model can claim at most `capacity(m)` points, the largest number
//! of observed points inside its inflated circumscribed disc anywhere on its
//! pose grid. Hence
//!
//! ```text
//! h(s) = max(0, uncounted(s) - Σ capacity(m) over unplaced m)
//! ```
//!
//! never exceeds the true remaining cost.

use std::collections::HashMap;

use crate::cost::{Cost, RefinementConfig};
use crate::model::{ModelBank, ModelId};
use crate::observation::{CountedSet, ObservedScene};
use crate::state::GraphState;
use crate::successors::PoseGrid;

use super::StateHeuristic;

/// Unclaimed points beyond the reach of the unplaced models.
pub struct GeometricHeuristic {
    scene_models: Vec<ModelId>,
    capacity: HashMap<ModelId, usize>,
}

impl GeometricHeuristic {
    /// Precompute per-model capacities over their grids.
    ///
    /// # Arguments
    /// * `grids` - Scene models in search order with their pose grids
    /// * `refinement` - Refined poses may move by up to `max_translation`
    pub fn new(
        models: &ModelBank,
        observed: &ObservedScene,
        grids: &[(ModelId, PoseGrid)],
        refinement: &RefinementConfig,
    ) -> Self {
        let slack = if refinement.is_active() {
            refinement.max_translation
        } else {
            0.0
        };
        let mut capacity = HashMap::new();
        for (id, grid) in grids {
            let reach = models.model(*id).inflated_reach() + slack;
            let best = grid
                .positions()
                .map(|p| observed.points_near(p, reach).len())
                .max()
                .unwrap_or(0);
            log::debug!("Capacity of {}: {best} points", models.model(*id).name());
            capacity.insert(*id, best);
        }
        Self {
            scene_models: grids.iter().map(|(id, _)| *id).collect(),
            capacity,
        }
    }

    /// Points model `id` can claim at most
    pub fn capacity(&self, id: ModelId) -> usize {
        self.capacity.get(&id).copied().unwrap_or(0)
    }
}

impl StateHeuristic for GeometricHeuristic {
    fn estimate(&self, state: &GraphState, counted: Option<&CountedSet>) -> Cost {
        if state.len() >= self.scene_models.len() {
            return 0;
        }
        let Some(counted) = counted else {
            return 0;
        };
        let reachable: usize = self
            .scene_models
            .iter()
            .filter(|&&m| !state.contains_model(m))
            .map(|&m| self.capacity(m))
            .sum();
        counted.remaining().saturating_sub(reachable) as Cost
    }

    fn name(&self) -> &str {
        "geometric"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Bounds, ContPose, DiscPose};
    use crate::state::ObjectState;
    use crate::testing::{BOX_A, BOX_B, Fixture};

    #[test]
    fn test_zero_when_models_can_reach_everything() {
        let fixture = Fixture::new();
        let grids = [(BOX_A, fixture.grid.clone()), (BOX_B, fixture.grid.clone())];
        let h = GeometricHeuristic::new(
            &fixture.models,
            &fixture.observed,
            &grids,
            &RefinementConfig::disabled(),
        );
        assert!(h.capacity(BOX_A) > 0);
        let counted = CountedSet::new(fixture.observed.len());
        assert_eq!(h.estimate(&GraphState::new(), Some(&counted)), 0);
        assert_eq!(h.estimate(&GraphState::new(), None), 0);
    }

    #[test]
    fn test_unreachable_points_are_counted() {
        let fixture = Fixture::new();
        // A single-cell grid far from both boxes
        let far = PoseGrid::new(Bounds::from_limits(0.0, 0.0, -0.2, -0.2), 0.1, 1.0, true);
        let grids = [(BOX_A, far.clone()), (BOX_B, far)];
        let h = GeometricHeuristic::new(
            &fixture.models,
            &fixture.observed,
            &grids,
            &RefinementConfig::disabled(),
        );
        let counted = CountedSet::new(fixture.observed.len());
        let root = GraphState::new();
        assert_eq!(
            h.estimate(&root, Some(&counted)),
            fixture.observed.len() as Cost
        );

        let placed = ObjectState::new(BOX_A, ContPose::new(0.0, -0.2, 0.0), DiscPose::default());
        let one = GraphState::from_objects([placed]).unwrap();
        assert_eq!(
            h.estimate(&one, Some(&counted)),
            fixture.observed.len() as Cost
        );

        let full = CountedSet::full(fixture.observed.len());
        assert_eq!(h.estimate(&one, Some(&full)), 0);
    }
}
