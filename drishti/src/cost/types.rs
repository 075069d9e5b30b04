//! Units of cost-computation work and their results.

use std::sync::Arc;

use crate::observation::CountedSet;
use crate::refine::RefinementResult;
use crate::render::Rendering;
use crate::state::{GraphState, ObjectState, StateId};

/// Edge cost in explained-point units.
pub type Cost = u32;

/// Which cost to compute for an edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CostMode {
    /// Exact transition cost with the composed child rendering
    Full,
    /// Admissible lower bound without composing the child
    Lazy,
}

/// Why a candidate edge was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// The render oracle returned an error, a blank or a malformed image
    RenderFailure,
    /// The object would overwrite pixels the parent already accounts for
    Occlusion,
    /// The rendered colors do not resemble the observation
    ColorHistogram,
    /// The child is not a one-object extension of the parent
    InvalidExtension,
}

/// One rendered variant (unrefined or refined) of a single-object placement.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectVariant {
    /// Object with the pose that was rendered
    pub object: ObjectState,
    /// Rendering of the object alone
    pub rendering: Rendering,
    /// Color histogram similarity to the observation, in [0, 1]
    pub histogram_score: f32,
}

/// Cached result of rendering and refining one model at one grid cell.
///
/// Does not depend on any parent, so many parents share it.
#[derive(Clone, Debug, PartialEq)]
pub struct SingleObjectEntry {
    /// Grid placement
    pub object: ObjectState,
    /// Unrefined rendering; `None` when rendering failed
    pub unadjusted: Option<ObjectVariant>,
    /// Refined rendering, when refinement was accepted
    pub adjusted: Option<ObjectVariant>,
    /// Raw oracle result, when refinement ran
    pub refinement: Option<RefinementResult>,
}

impl SingleObjectEntry {
    /// Entry for a placement that could not be rendered.
    pub fn render_failure(object: ObjectState) -> Self {
        Self {
            object,
            unadjusted: None,
            adjusted: None,
            refinement: None,
        }
    }
}

/// Input of one edge evaluation.
#[derive(Clone, Debug)]
pub struct CostComputationInput {
    /// Parent state id
    pub parent_id: StateId,
    /// Child state id
    pub child_id: StateId,
    /// Parent state with refined poses
    pub parent_state: GraphState,
    /// Object added by the edge (grid pose)
    pub candidate: ObjectState,
    /// Parent's composed rendering
    pub parent_rendering: Arc<Rendering>,
    /// Observed points the parent already accounts for
    pub parent_counted: Arc<CountedSet>,
    /// Cached single-object entry for the candidate, if any
    pub single_object: Option<Arc<SingleObjectEntry>>,
}

/// Per-term decomposition of an edge cost.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CostBreakdown {
    /// Rendered points of the new object with no observed support
    pub target: Cost,
    /// Newly claimed observed points not explained by the composed rendering
    pub source: Cost,
    /// Observed points left over once the final object is placed
    pub last_level: Cost,
    /// Points attributed to occluders (clutter mode)
    pub occluders: u32,
    /// Cost charged for occluders
    pub occluder_cost: Cost,
}

impl CostBreakdown {
    /// Total edge cost
    pub fn total(&self) -> Cost {
        self.target + self.source + self.last_level + self.occluder_cost
    }
}

/// Result of one edge evaluation.
#[derive(Clone, Debug)]
pub struct CostComputationOutput {
    /// Parent state id
    pub parent_id: StateId,
    /// Child state id
    pub child_id: StateId,
    /// Mode the output was computed in
    pub mode: CostMode,
    /// Edge cost; `None` when the edge is invalid
    pub cost: Option<Cost>,
    /// Why the edge is invalid
    pub rejection: Option<Rejection>,
    /// Whether the added object uses a refined pose
    pub adjusted: bool,
    /// Child state with refined poses
    pub adjusted_state: Option<GraphState>,
    /// Composed child rendering (full mode only)
    pub rendering: Option<Arc<Rendering>>,
    /// Observed points the child accounts for (full mode only)
    pub counted: Option<Arc<CountedSet>>,
    /// Single-object entry used for the edge
    pub single_object: Arc<SingleObjectEntry>,
    /// Cost terms
    pub breakdown: CostBreakdown,
}

impl CostComputationOutput {
    /// Output for a rejected edge.
    pub fn rejected(
        input: &CostComputationInput,
        mode: CostMode,
        rejection: Rejection,
        single_object: Arc<SingleObjectEntry>,
    ) -> Self {
        Self {
            parent_id: input.parent_id,
            child_id: input.child_id,
            mode,
            cost: None,
            rejection: Some(rejection),
            adjusted: false,
            adjusted_state: None,
            rendering: None,
            counted: None,
            single_object,
            breakdown: CostBreakdown::default(),
        }
    }

    /// Whether the edge is valid
    pub fn is_valid(&self) -> bool {
        self.cost.is_some()
    }
}
