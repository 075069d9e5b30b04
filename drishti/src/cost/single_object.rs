//! Single-object entries: render, refine and re-render one placement.
//!
//! Entries depend only on the placement, never on a parent, so they are
//! cached by single-object state and shared by every parent that tries the
//! same model at the same cell.

use nalgebra::Point3;

use crate::core::color::ColorHistogram;
use crate::error::Result;
use crate::refine::{RefinementRequest, RefinementResult};
use crate::render::{RenderedPoint, Rendering, back_project};
use crate::state::ObjectState;

use super::evaluator::CostEvaluator;
use super::types::{ObjectVariant, SingleObjectEntry};

/// Refined poses closer than this to the grid pose are not re-rendered.
const MIN_REFINEMENT_MOTION: f32 = 1e-4;

impl CostEvaluator {
    /// Compute the entry for one placement with single-state rendering.
    pub fn single_object_entry(&self, candidate: ObjectState) -> SingleObjectEntry {
        let rendering = match self.renderer.render(std::slice::from_ref(&candidate)) {
            Ok(rendering) => rendering,
            Err(e) => {
                log::warn!("Render of {candidate} failed: {e}");
                return SingleObjectEntry::render_failure(candidate);
            }
        };
        let points = back_project(self.camera(), &rendering.depth);
        let Some(unadjusted) = self.variant(candidate, rendering) else {
            return SingleObjectEntry::render_failure(candidate);
        };

        let (accepted, refinement) = self.refine_placement(candidate, &points);
        let adjusted = accepted.and_then(|object| {
            let rendering = self.renderer.render(std::slice::from_ref(&object));
            self.adjusted_variant(object, rendering)
        });
        SingleObjectEntry {
            object: candidate,
            unadjusted: Some(unadjusted),
            adjusted,
            refinement,
        }
    }

    /// Compute entries for many placements, rendering `batch_size` at a time.
    ///
    /// Produces the same entries as [`CostEvaluator::single_object_entry`].
    pub fn single_object_entries_batched(
        &self,
        candidates: &[ObjectState],
        batch_size: usize,
    ) -> Vec<SingleObjectEntry> {
        let mut entries = Vec::with_capacity(candidates.len());
        for chunk in candidates.chunks(batch_size.max(1)) {
            let batch = match self.renderer.render_batch(chunk) {
                Ok(batch) => batch,
                Err(e) => {
                    // Per-placement fallback isolates the failing candidate
                    log::warn!("Batched render of {} placements failed: {e}", chunk.len());
                    entries.extend(chunk.iter().map(|&c| self.single_object_entry(c)));
                    continue;
                }
            };

            let mut pending: Vec<(SingleObjectEntry, Option<ObjectState>)> =
                Vec::with_capacity(chunk.len());
            for (i, &candidate) in chunk.iter().enumerate() {
                let (Some(rendering), Some(points)) =
                    (batch.renderings.get(i).cloned(), batch.points_for(i))
                else {
                    log::warn!("Batched render returned no result for {candidate}");
                    pending.push((SingleObjectEntry::render_failure(candidate), None));
                    continue;
                };
                match self.variant(candidate, rendering) {
                    Some(unadjusted) => {
                        let (accepted, refinement) = self.refine_placement(candidate, points);
                        let entry = SingleObjectEntry {
                            object: candidate,
                            unadjusted: Some(unadjusted),
                            adjusted: None,
                            refinement,
                        };
                        pending.push((entry, accepted));
                    }
                    None => pending.push((SingleObjectEntry::render_failure(candidate), None)),
                }
            }

            let refined: Vec<ObjectState> = pending.iter().filter_map(|(_, a)| *a).collect();
            let mut refined_renderings: Vec<Result<Rendering>> =
                match self.renderer.render_batch(&refined) {
                    Ok(batch) => batch.renderings.into_iter().map(Ok).collect(),
                    Err(_) => refined
                        .iter()
                        .map(|o| self.renderer.render(std::slice::from_ref(o)))
                        .collect(),
                };
            refined_renderings.reverse();

            for (mut entry, accepted) in pending {
                if let Some(object) = accepted {
                    if let Some(rendering) = refined_renderings.pop() {
                        entry.adjusted = self.adjusted_variant(object, rendering);
                    }
                }
                entries.push(entry);
            }
        }
        entries
    }

    /// Wrap a usable rendering as a variant.
    fn variant(&self, object: ObjectState, rendering: Rendering) -> Option<ObjectVariant> {
        if !rendering.matches(self.camera()) || rendering.depth.is_blank() {
            log::debug!("Blank or malformed rendering for {object}");
            return None;
        }
        let histogram_score = self.histogram_score(&rendering);
        Some(ObjectVariant {
            object,
            rendering,
            histogram_score,
        })
    }

    fn adjusted_variant(
        &self,
        object: ObjectState,
        rendering: Result<Rendering>,
    ) -> Option<ObjectVariant> {
        match rendering {
            Ok(rendering) => self.variant(object, rendering),
            Err(e) => {
                log::warn!("Render of refined {object} failed, keeping grid pose: {e}");
                None
            }
        }
    }

    /// Run the refinement oracle and decide whether its pose is acceptable.
    fn refine_placement(
        &self,
        candidate: ObjectState,
        rendered: &[RenderedPoint],
    ) -> (Option<ObjectState>, Option<RefinementResult>) {
        if !self.refinement.is_active() {
            return (None, None);
        }
        let model = self.models.model(candidate.model());
        let pose = candidate.cont_pose();
        let source: Vec<Point3<f32>> = rendered.iter().map(|p| p.position).collect();
        let target: Vec<Point3<f32>> = self
            .observed
            .points_near(
                pose.position(),
                model.inflated_reach() + self.refinement.icp_max_correspondence,
            )
            .into_iter()
            .map(|i| self.observed.point(i).position)
            .collect();

        let result = self.refiner.refine(&RefinementRequest {
            initial: pose,
            source: &source,
            target: &target,
            allow_rotation: !model.is_symmetric(),
        });
        let refined = candidate.refined(result.pose);
        let moved = result.pose.distance(pose) > MIN_REFINEMENT_MOTION
            || result.pose.yaw_distance(pose) > MIN_REFINEMENT_MOTION;
        let accepted = result.converged
            && moved
            && result.pose.distance(pose) <= self.refinement.max_translation
            && result.pose.yaw_distance(pose) <= self.refinement.max_rotation
            && self.validator.in_bounds(&refined)
            && self.validator.is_supported(&[], &refined);

        if result.converged && !accepted && moved {
            log::trace!("Refined pose for {candidate} rejected: {}", result.pose);
        }
        (accepted.then_some(refined), Some(result))
    }

    /// Color histogram similarity between a rendering and the observation
    /// at the rendered pixels; 0 without observed color.
    pub(super) fn histogram_score(&self, rendering: &Rendering) -> f32 {
        let Some(observed_color) = self.observed.color() else {
            return 0.0;
        };
        let observed_depth = self.observed.depth();
        let mut rendered = ColorHistogram::new();
        let mut seen = ColorHistogram::new();
        for pixel in rendering.depth.valid_pixels() {
            rendered.add(rendering.color.get(pixel));
            if observed_depth.has_depth(pixel) {
                seen.add(observed_color.get(pixel));
            }
        }
        rendered.similarity(&seen)
    }
}
