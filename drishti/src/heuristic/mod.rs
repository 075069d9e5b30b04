//! Goal heuristics.
//!
//! Slot 0 is always the admissible [`GeometricHeuristic`]. Further slots
//! hold estimates supplied from outside, such as [`DetectionHeuristic`];
//! those need not be admissible. Lookups never mutate anything.

mod detection;
mod geometric;

pub use detection::{Detection, DetectionHeuristic};
pub use geometric::GeometricHeuristic;

use crate::cost::Cost;
use crate::observation::CountedSet;
use crate::state::GraphState;

/// A per-state estimate of the remaining cost to a goal.
pub trait StateHeuristic: Send + Sync {
    /// Estimate for `state`, given the observed points it already accounts
    /// for when known.
    fn estimate(&self, state: &GraphState, counted: Option<&CountedSet>) -> Cost;

    /// Name for logging
    fn name(&self) -> &str;
}

/// Ordered heuristic slots.
pub struct HeuristicAggregator {
    slots: Vec<Box<dyn StateHeuristic>>,
}

impl HeuristicAggregator {
    /// Aggregator whose slot 0 is the geometric heuristic.
    pub fn new(geometric: GeometricHeuristic) -> Self {
        Self {
            slots: vec![Box::new(geometric)],
        }
    }

    /// Append a slot; returns its index.
    pub fn push(&mut self, heuristic: Box<dyn StateHeuristic>) -> usize {
        log::info!("Heuristic slot {}: {}", self.slots.len(), heuristic.name());
        self.slots.push(heuristic);
        self.slots.len() - 1
    }

    /// Number of slots
    pub fn num_heuristics(&self) -> usize {
        self.slots.len()
    }

    /// Value of slot `index`, or `None` for an unknown slot.
    pub fn goal_heuristic(
        &self,
        index: usize,
        state: &GraphState,
        counted: Option<&CountedSet>,
    ) -> Option<Cost> {
        self.slots.get(index).map(|h| h.estimate(state, counted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Point2D;
    use crate::cost::RefinementConfig;
    use crate::testing::{BOX_A, BOX_B, Fixture};

    fn geometric(fixture: &Fixture) -> GeometricHeuristic {
        let grids = [BOX_A, BOX_B].map(|id| (id, fixture.grid.clone()));
        GeometricHeuristic::new(
            &fixture.models,
            &fixture.observed,
            &grids,
            &RefinementConfig::disabled(),
        )
    }

    #[test]
    fn test_slots() {
        let fixture = Fixture::new();
        let mut aggregator = HeuristicAggregator::new(geometric(&fixture));
        assert_eq!(aggregator.num_heuristics(), 1);
        let detections = vec![Detection::new(BOX_A, Point2D::new(0.2, 0.1))];
        let slot = aggregator.push(Box::new(DetectionHeuristic::new(detections, 0.1, 2)));
        assert_eq!(slot, 1);
        assert_eq!(aggregator.num_heuristics(), 2);

        let root = GraphState::new();
        assert_eq!(aggregator.goal_heuristic(1, &root, None), Some(2));
        assert_eq!(aggregator.goal_heuristic(0, &root, None), Some(0));
        assert_eq!(aggregator.goal_heuristic(2, &root, None), None);
    }
}
