//! Successor generation.
//!
//! A parent with `k` objects placed expands, for every unplaced model in
//! scene order, over that model's [`PoseGrid`]. Candidates failing the
//! [`PlacementValidator`] are dropped. The order depends only on the parent.

mod grid;
mod validity;

pub use grid::PoseGrid;
pub use validity::PlacementValidator;

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::Bounds;
use crate::model::{ModelBank, ModelId};
use crate::state::{GraphState, ObjectState};

/// Pose grid resolution settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Linear resolution (meters)
    #[serde(default = "default_resolution")]
    pub resolution: f32,

    /// Angular resolution (radians)
    #[serde(default = "grid::default_theta_resolution")]
    pub theta_resolution: f32,

    /// Use a model's own resolution when it declares one
    #[serde(default)]
    pub use_model_specific_search_resolution: bool,

    /// Derive each model's linear resolution from its inscribed radius
    #[serde(default)]
    pub use_adaptive_resolution: bool,
}

fn default_resolution() -> f32 {
    0.05
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            resolution: default_resolution(),
            theta_resolution: grid::default_theta_resolution(),
            use_model_specific_search_resolution: false,
            use_adaptive_resolution: false,
        }
    }
}

/// Enumerates valid one-object extensions of a state.
pub struct SuccessorGenerator {
    scene_models: Vec<ModelId>,
    grids: HashMap<ModelId, PoseGrid>,
    validator: Arc<PlacementValidator>,
}

impl SuccessorGenerator {
    /// Create a generator for the models present in the scene.
    pub fn new(
        models: &ModelBank,
        scene_models: Vec<ModelId>,
        bounds: Bounds,
        search: &SearchConfig,
        validator: Arc<PlacementValidator>,
    ) -> Self {
        let grids = scene_models
            .iter()
            .map(|&id| (id, PoseGrid::for_model(bounds, search, models.model(id))))
            .collect();
        Self {
            scene_models,
            grids,
            validator,
        }
    }

    /// Models present in the scene, in search order
    pub fn scene_models(&self) -> &[ModelId] {
        &self.scene_models
    }

    /// Pose grid of a scene model
    pub fn grid(&self, model: ModelId) -> Option<&PoseGrid> {
        self.grids.get(&model)
    }

    /// Valid candidate objects that extend `parent` by one placement.
    pub fn candidates(&self, parent: &GraphState) -> Vec<ObjectState> {
        if parent.len() >= self.scene_models.len() {
            return Vec::new();
        }
        let mut out = Vec::new();
        for &model in &self.scene_models {
            if parent.contains_model(model) {
                continue;
            }
            let Some(grid) = self.grids.get(&model) else {
                continue;
            };
            for disc in grid.cells() {
                let candidate = ObjectState::new(model, grid.cont(disc), disc);
                if self.validator.is_valid(parent.objects(), &candidate) {
                    out.push(candidate);
                }
            }
        }
        log::debug!(
            "{} valid candidates for a parent with {} objects",
            out.len(),
            parent.len()
        );
        out
    }
}
