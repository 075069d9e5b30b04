//! Edge cost evaluation.
//!
//! [`CostEvaluator`] turns a [`CostComputationInput`] into a
//! [`CostComputationOutput`]. It is immutable and shared by every worker of
//! the dispatcher; all state it needs travels in the input.
//!
//! # Pipeline
//!
//! 1. Obtain the single-object entry for the candidate (render, refine,
//!    re-render), from the input or by computing it
//! 2. Pick the variant for this parent: refined unless it collides with the
//!    parent's objects
//! 3. Occlusion check against the parent's composed rendering
//! 4. Target term over the new pixels, source term over newly claimed
//!    observed points, last-level term for the final object

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{Camera, DiscPose, occlusion_conflicts};
use crate::model::{ModelBank, ModelId};
use crate::observation::ObservedScene;
use crate::refine::RefinementOracle;
use crate::render::RenderOracle;
use crate::state::{GraphState, ObjectState};
use crate::successors::PlacementValidator;

use super::config::{CostConfig, RefinementConfig};
use super::types::{
    CostComputationInput, CostComputationOutput, CostMode, ObjectVariant, Rejection,
    SingleObjectEntry,
};

/// Shared, read-only cost model.
pub struct CostEvaluator {
    pub(super) models: Arc<ModelBank>,
    pub(super) observed: Arc<ObservedScene>,
    pub(super) renderer: Arc<dyn RenderOracle>,
    pub(super) refiner: Arc<dyn RefinementOracle>,
    pub(super) validator: Arc<PlacementValidator>,
    pub(super) cost: CostConfig,
    pub(super) refinement: RefinementConfig,
    pub(super) table_height: f32,
    pub(super) num_objects: usize,
    pub(super) batch_size: Option<usize>,
}

/// Variant of the added object chosen for one parent.
pub(super) struct Selected<'a> {
    pub variant: &'a ObjectVariant,
    pub adjusted: bool,
}

impl CostEvaluator {
    /// Create an evaluator.
    ///
    /// # Arguments
    /// * `num_objects` - Number of objects in the scene (goal depth)
    /// * `batch_size` - Render single-object entries in batches of this size
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        models: Arc<ModelBank>,
        observed: Arc<ObservedScene>,
        renderer: Arc<dyn RenderOracle>,
        refiner: Arc<dyn RefinementOracle>,
        validator: Arc<PlacementValidator>,
        cost: CostConfig,
        refinement: RefinementConfig,
        table_height: f32,
        num_objects: usize,
        batch_size: Option<usize>,
    ) -> Self {
        Self {
            models,
            observed,
            renderer,
            refiner,
            validator,
            cost,
            refinement,
            table_height,
            num_objects,
            batch_size: batch_size.filter(|&b| b > 0),
        }
    }

    /// Scene camera
    pub fn camera(&self) -> &Camera {
        self.renderer.camera()
    }

    /// Observed scene
    pub fn observed(&self) -> &ObservedScene {
        &self.observed
    }

    /// Number of objects at goal depth
    pub fn num_objects(&self) -> usize {
        self.num_objects
    }

    /// Evaluate one edge on its own.
    pub fn evaluate(&self, input: &CostComputationInput, mode: CostMode) -> CostComputationOutput {
        let entry = match &input.single_object {
            Some(entry) => Arc::clone(entry),
            None => Arc::new(self.single_object_entry(input.candidate)),
        };
        self.evaluate_with(input, mode, entry)
    }

    /// Evaluate a shard of edges, computing missing single-object entries
    /// once per placement (batched when configured).
    pub fn evaluate_shard(
        &self,
        inputs: &[&CostComputationInput],
        mode: CostMode,
    ) -> Vec<CostComputationOutput> {
        let mut entries: HashMap<(ModelId, DiscPose), Arc<SingleObjectEntry>> = HashMap::new();
        let mut missing: Vec<ObjectState> = Vec::new();
        for input in inputs {
            let key = input.candidate.key();
            match &input.single_object {
                Some(entry) => {
                    entries.entry(key).or_insert_with(|| Arc::clone(entry));
                }
                None => {
                    if !entries.contains_key(&key) && !missing.iter().any(|m| m.key() == key) {
                        missing.push(input.candidate);
                    }
                }
            }
        }

        let computed = match self.batch_size {
            Some(size) => self.single_object_entries_batched(&missing, size),
            None => missing.iter().map(|&c| self.single_object_entry(c)).collect(),
        };
        for entry in computed {
            entries.insert(entry.object.key(), Arc::new(entry));
        }

        inputs
            .iter()
            .map(|input| {
                let key = input.candidate.key();
                let entry = match entries.get(&key) {
                    Some(entry) => Arc::clone(entry),
                    None => Arc::new(SingleObjectEntry::render_failure(input.candidate)),
                };
                self.evaluate_with(input, mode, entry)
            })
            .collect()
    }

    /// Pick the refined variant unless it collides with the parent's objects.
    pub(super) fn select<'a>(
        &self,
        entry: &'a SingleObjectEntry,
        parent: &GraphState,
    ) -> Option<Selected<'a>> {
        if let Some(refined) = &entry.adjusted {
            if !self.validator.collides(parent.objects(), &refined.object) {
                return Some(Selected {
                    variant: refined,
                    adjusted: true,
                });
            }
        }
        entry.unadjusted.as_ref().map(|variant| Selected {
            variant,
            adjusted: false,
        })
    }

    fn evaluate_with(
        &self,
        input: &CostComputationInput,
        mode: CostMode,
        entry: Arc<SingleObjectEntry>,
    ) -> CostComputationOutput {
        if input.parent_state.contains_model(input.candidate.model()) {
            return CostComputationOutput::rejected(input, mode, Rejection::InvalidExtension, entry);
        }
        let Some(selected) = self.select(&entry, &input.parent_state) else {
            log::trace!("{}: no rendering for {}", input.child_id, input.candidate);
            return CostComputationOutput::rejected(input, mode, Rejection::RenderFailure, entry);
        };
        if !selected.variant.rendering.matches(self.camera())
            || !input.parent_rendering.matches(self.camera())
        {
            log::warn!("{}: rendering has wrong shape", input.child_id);
            return CostComputationOutput::rejected(input, mode, Rejection::RenderFailure, entry);
        }
        if self.cost.use_color_cost
            && self.observed.has_color()
            && selected.variant.histogram_score < self.cost.min_histogram_score
        {
            return CostComputationOutput::rejected(input, mode, Rejection::ColorHistogram, entry);
        }

        let conflicts = occlusion_conflicts(
            &input.parent_rendering.depth,
            &selected.variant.rendering.depth,
        );
        if !conflicts.is_empty() && !self.cost.use_clutter_mode {
            log::trace!(
                "{}: occludes {} parent pixels",
                input.child_id,
                conflicts.len()
            );
            return CostComputationOutput::rejected(input, mode, Rejection::Occlusion, entry);
        }

        let Some(adjusted_state) = input.parent_state.with_object(selected.variant.object) else {
            return CostComputationOutput::rejected(input, mode, Rejection::InvalidExtension, entry);
        };

        match mode {
            CostMode::Full => self.full_cost(
                input,
                &selected,
                conflicts.len(),
                adjusted_state,
                Arc::clone(&entry),
            ),
            CostMode::Lazy => self.lazy_cost(input, &selected, adjusted_state, Arc::clone(&entry)),
        }
    }
}
