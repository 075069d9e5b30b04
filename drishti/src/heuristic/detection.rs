//! Heuristic from externally detected object positions.

use crate::core::Point2D;
use crate::cost::Cost;
use crate::model::ModelId;
use crate::observation::CountedSet;
use crate::state::GraphState;

use super::StateHeuristic;

/// Detected plane position of one model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    /// Detected model
    pub model: ModelId,
    /// Detected position on the plane
    pub position: Point2D,
}

impl Detection {
    /// Create a detection
    pub fn new(model: ModelId, position: Point2D) -> Self {
        Self { model, position }
    }
}

/// Distance of placed objects to their detections in grid steps, plus one
/// per object still to place. Not admissible.
pub struct DetectionHeuristic {
    detections: Vec<Detection>,
    resolution: f32,
    num_objects: usize,
}

impl DetectionHeuristic {
    /// Create from detections; `resolution` converts meters to grid steps.
    pub fn new(detections: Vec<Detection>, resolution: f32, num_objects: usize) -> Self {
        Self {
            detections,
            resolution: resolution.max(f32::EPSILON),
            num_objects,
        }
    }
}

impl StateHeuristic for DetectionHeuristic {
    fn estimate(&self, state: &GraphState, _counted: Option<&CountedSet>) -> Cost {
        let offset: Cost = state
            .objects()
            .iter()
            .filter_map(|o| {
                self.detections
                    .iter()
                    .find(|d| d.model == o.model())
                    .map(|d| {
                        (o.cont_pose().position().distance(d.position) / self.resolution).round()
                            as Cost
                    })
            })
            .sum();
        offset + self.num_objects.saturating_sub(state.len()) as Cost
    }

    fn name(&self) -> &str {
        "detection"
    }
}
