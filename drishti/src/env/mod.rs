//! Object recognition search environment.
//!
//! [`ObjectRecognitionEnv`] exposes the implicit search graph to an outer
//! search driver through [`SearchEnvironment`]. States are partial scene
//! assignments interned in a [`StateRegistry`]; expanding a state generates
//! one-object extensions, evaluates them on the [`Dispatcher`] and memoizes
//! everything in an [`EnvCache`].
//!
//! # State data
//!
//! A state is *materialized* once its adjusted assignment, composed
//! rendering and counted set are known. The root is materialized at
//! construction; every other state is materialized by the first full
//! evaluation of an edge into it. A state reached only through lazy
//! evaluation is materialized on demand through the first parent whose
//! edge into it was found valid.

mod cache;
mod config;
mod greedy;
mod stats;

pub use cache::{EdgeKey, EnvCache, MaterializedState};
pub use config::EnvConfig;
pub use greedy::GreedyResult;
pub use stats::EnvStats;

use std::sync::Arc;

use crate::config::ConfigLoadError;
use crate::core::Bounds;
use crate::cost::{Cost, CostComputationInput, CostComputationOutput, CostEvaluator, CostMode};
use crate::dispatch::Dispatcher;
use crate::error::{Error, Result};
use crate::heuristic::{GeometricHeuristic, HeuristicAggregator, StateHeuristic};
use crate::model::{ModelBank, ModelId};
use crate::observation::{CountedSet, Observation, ObservedScene};
use crate::refine::RefinementOracle;
use crate::render::{RenderOracle, Rendering};
use crate::state::{GraphState, ObjectState, StateId, StateRegistry};
use crate::successors::{PlacementValidator, SuccessorGenerator};

/// Reserved id of the goal; never issued by the registry.
pub const GOAL_STATE_ID: StateId = StateId(u32::MAX);

/// One generated child with its edge cost.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Successor {
    /// Child state
    pub id: StateId,
    /// Edge cost (a lower bound unless `is_true_cost`)
    pub cost: Cost,
    /// Whether `cost` is the exact edge cost
    pub is_true_cost: bool,
}

/// Capabilities an outer graph search needs.
pub trait SearchEnvironment {
    /// Id of the empty assignment
    fn start_state_id(&self) -> StateId;

    /// Id standing for any complete assignment
    fn goal_state_id(&self) -> StateId;

    /// Whether a state places every scene object
    fn is_goal_state(&self, id: StateId) -> bool;

    /// Valid children with exact costs.
    fn get_succs(&mut self, id: StateId) -> Result<Vec<Successor>>;

    /// Valid children with lazy lower bounds, exact where already known.
    fn get_lazy_succs(&mut self, id: StateId) -> Result<Vec<Successor>>;

    /// Exact cost of an edge; `None` when the edge is invalid.
    fn get_true_cost(&mut self, parent: StateId, child: StateId) -> Result<Option<Cost>>;

    /// Number of heuristic slots
    fn num_heuristics(&self) -> usize;

    /// Value of heuristic `index` for a state.
    fn goal_heuristic(&self, index: usize, id: StateId) -> Result<Cost>;
}

/// Multi-object pose estimation as a search over partial assignments.
pub struct ObjectRecognitionEnv {
    config: EnvConfig,
    models: Arc<ModelBank>,
    observed: Arc<ObservedScene>,
    generator: SuccessorGenerator,
    evaluator: Arc<CostEvaluator>,
    dispatcher: Dispatcher,
    heuristics: HeuristicAggregator,
    registry: StateRegistry,
    cache: EnvCache,
    stats: EnvStats,
    start_id: StateId,
}

impl ObjectRecognitionEnv {
    /// Build an environment for one observed scene.
    ///
    /// # Arguments
    /// * `scene_models` - Models present in the scene, in search order
    /// * `observation` - Observed frame; must match the renderer's camera
    ///
    /// # Errors
    /// Configuration errors for invalid bounds or model lists, image errors
    /// for a mismatched observation, I/O errors if workers cannot start.
    pub fn new(
        config: EnvConfig,
        models: Arc<ModelBank>,
        scene_models: Vec<ModelId>,
        renderer: Arc<dyn RenderOracle>,
        refiner: Arc<dyn RefinementOracle>,
        observation: Observation,
    ) -> Result<Self> {
        validate_scene(&config, &models, &scene_models)?;

        let reach = scene_models
            .iter()
            .map(|&id| models.model(id).inflated_reach())
            .fold(0.0_f32, f32::max);
        let bounds = config.bounds;
        let crop = Bounds::from_limits(
            bounds.min.x - reach,
            bounds.max.x + reach,
            bounds.min.y - reach,
            bounds.max.y + reach,
        );
        let mut observed = ObservedScene::new(
            observation,
            renderer.camera(),
            crop,
            config.table_height,
            config.cost.table_clearance,
        )?;
        if config.cost.use_downsampling {
            observed = observed.downsampled(config.cost.downsampling_leaf_size);
        }
        let observed = Arc::new(observed);

        let validator = Arc::new(PlacementValidator::new(
            Arc::clone(&models),
            Arc::clone(&observed),
            bounds,
            config.cost.min_neighbor_points_for_valid_pose,
            config.cost.min_points_for_constraint_cloud,
            config.cost.footprint_tolerance,
        ));
        let generator = SuccessorGenerator::new(
            &models,
            scene_models.clone(),
            bounds,
            &config.search,
            Arc::clone(&validator),
        );
        let evaluator = Arc::new(CostEvaluator::new(
            Arc::clone(&models),
            Arc::clone(&observed),
            Arc::clone(&renderer),
            refiner,
            validator,
            config.cost.clone(),
            config.refinement.clone(),
            config.table_height,
            scene_models.len(),
            config.dispatch.batch_size(),
        ));
        let dispatcher = Dispatcher::new(evaluator.clone(), &config.dispatch)?;

        let grids: Vec<_> = scene_models
            .iter()
            .filter_map(|&id| generator.grid(id).map(|g| (id, g.clone())))
            .collect();
        let heuristics = HeuristicAggregator::new(GeometricHeuristic::new(
            &models,
            &observed,
            &grids,
            &config.refinement,
        ));

        let mut registry = StateRegistry::new();
        let root = GraphState::new();
        let start_id = registry.intern(root.clone());
        let mut cache = EnvCache::new();
        cache.insert_state(
            start_id,
            MaterializedState {
                adjusted: root,
                rendering: Arc::new(Rendering::blank(
                    renderer.camera().width(),
                    renderer.camera().height(),
                )),
                counted: Arc::new(CountedSet::new(observed.len())),
            },
        );

        log::info!(
            "Environment ready: {} objects, {} observed points, renderer {}",
            scene_models.len(),
            observed.len(),
            renderer.name()
        );

        Ok(Self {
            config,
            models,
            observed,
            generator,
            evaluator,
            dispatcher,
            heuristics,
            registry,
            cache,
            stats: EnvStats::default(),
            start_id,
        })
    }

    /// Add a heuristic slot; returns its index.
    pub fn add_heuristic(&mut self, heuristic: Box<dyn StateHeuristic>) -> usize {
        self.heuristics.push(heuristic)
    }

    /// Configuration in use
    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    /// Model bank
    pub fn models(&self) -> &ModelBank {
        &self.models
    }

    /// Observed scene
    pub fn observed(&self) -> &ObservedScene {
        &self.observed
    }

    /// Cost evaluator shared with the workers
    pub fn evaluator(&self) -> &CostEvaluator {
        &self.evaluator
    }

    /// Number of objects in the scene (goal depth)
    pub fn num_objects(&self) -> usize {
        self.generator.scene_models().len()
    }

    /// Counters since construction or the last [`Self::reset`]
    pub fn stats(&self) -> EnvStats {
        self.stats
    }

    /// Clear the counters.
    pub fn reset(&mut self) {
        self.stats = EnvStats::default();
    }

    /// Memo tables
    pub fn cache(&self) -> &EnvCache {
        &self.cache
    }

    /// Number of interned states
    pub fn num_states(&self) -> usize {
        self.registry.len()
    }

    /// Grid-pose state for an id.
    pub fn state(&self, id: StateId) -> Result<&GraphState> {
        self.registry.get(id).ok_or(Error::UnknownState(id))
    }

    /// Id of an interned state, if any
    pub fn state_id(&self, state: &GraphState) -> Option<StateId> {
        self.registry.lookup(state)
    }

    /// Refined-pose state, once the state is materialized
    pub fn adjusted_state(&self, id: StateId) -> Option<&GraphState> {
        self.cache.state(id).map(|s| &s.adjusted)
    }

    /// Composed rendering, once the state is materialized
    pub fn rendering(&self, id: StateId) -> Option<Arc<Rendering>> {
        self.cache.state(id).map(|s| Arc::clone(&s.rendering))
    }

    /// Observed points a state accounts for, once it is materialized
    pub fn counted(&self, id: StateId) -> Option<Arc<CountedSet>> {
        self.cache.state(id).map(|s| Arc::clone(&s.counted))
    }

    /// Objects of a state with refined poses where known.
    pub fn goal_poses(&mut self, id: StateId) -> Result<Vec<ObjectState>> {
        self.materialize(id)?;
        Ok(self
            .adjusted_state(id)
            .map(|s| s.objects().to_vec())
            .unwrap_or_default())
    }

    /// Make sure a state's rendering and counted set are cached.
    fn materialize(&mut self, id: StateId) -> Result<()> {
        if self.cache.is_materialized(id) {
            return Ok(());
        }
        let child = self.state(id)?.clone();
        let parent = self.cache.origin(id).ok_or(Error::UnknownState(id))?;
        self.materialize(parent)?;
        let candidate = self.added_object(parent, &child)?;
        self.evaluate_children(parent, &[(id, candidate)], CostMode::Full)?;
        if self.cache.is_materialized(id) {
            Ok(())
        } else {
            Err(Error::InvalidEdge {
                parent,
                child: id,
                reason: "edge into the state is invalid".to_string(),
            })
        }
    }

    /// The object `child` adds to `parent`.
    fn added_object(&self, parent: StateId, child: &GraphState) -> Result<ObjectState> {
        let parent_state = self.state(parent)?;
        let invalid = |reason: &str| Error::InvalidEdge {
            parent,
            child: self.registry.lookup(child).unwrap_or(GOAL_STATE_ID),
            reason: reason.to_string(),
        };
        if !parent_state.is_extended_by(child) {
            return Err(invalid("child does not extend the parent by one object"));
        }
        child
            .objects()
            .iter()
            .find(|o| !parent_state.contains_model(o.model()))
            .copied()
            .ok_or_else(|| invalid("child adds no object"))
    }

    /// Intern the children generated from a materialized parent.
    fn children_of(&mut self, parent: StateId) -> Result<Vec<(StateId, ObjectState)>> {
        let grid_state = self.state(parent)?.clone();
        let adjusted = self
            .adjusted_state(parent)
            .cloned()
            .ok_or(Error::UnknownState(parent))?;
        let mut children = Vec::new();
        for candidate in self.generator.candidates(&adjusted) {
            let Some(child) = grid_state.with_object(candidate) else {
                continue;
            };
            let id = self.registry.intern(child);
            children.push((id, candidate));
        }
        Ok(children)
    }

    /// Evaluate edges from a materialized parent and absorb the results.
    fn evaluate_children(
        &mut self,
        parent: StateId,
        children: &[(StateId, ObjectState)],
        mode: CostMode,
    ) -> Result<Vec<CostComputationOutput>> {
        if children.is_empty() {
            return Ok(Vec::new());
        }
        let data = self
            .cache
            .state(parent)
            .cloned()
            .ok_or(Error::UnknownState(parent))?;
        let inputs: Vec<CostComputationInput> = children
            .iter()
            .map(|&(child_id, candidate)| CostComputationInput {
                parent_id: parent,
                child_id,
                parent_state: data.adjusted.clone(),
                candidate,
                parent_rendering: Arc::clone(&data.rendering),
                parent_counted: Arc::clone(&data.counted),
                single_object: self.cache.single_object(&candidate.key()),
            })
            .collect();
        let outputs = self.dispatcher.dispatch(inputs, mode)?;
        for output in &outputs {
            self.absorb(output);
        }
        Ok(outputs)
    }

    fn absorb(&mut self, output: &CostComputationOutput) {
        let entry = Arc::clone(&output.single_object);
        let refined = entry.adjusted.is_some();
        if self.cache.insert_single_object(entry) && refined {
            self.stats.refinements_accepted += 1;
        }

        let edge = (output.parent_id, output.child_id);
        match output.mode {
            CostMode::Full => self.stats.scenes_rendered += 1,
            CostMode::Lazy => self.stats.lazy_evaluations += 1,
        }
        let Some(cost) = output.cost else {
            self.cache.insert_invalid(edge);
            return;
        };
        self.cache.insert_origin(output.child_id, output.parent_id);
        match output.mode {
            CostMode::Full => {
                self.stats.scenes_valid += 1;
                self.cache.insert_edge_cost(edge, cost);
                if let (Some(adjusted), Some(rendering), Some(counted)) =
                    (&output.adjusted_state, &output.rendering, &output.counted)
                {
                    self.cache.insert_state(
                        output.child_id,
                        MaterializedState {
                            adjusted: adjusted.clone(),
                            rendering: Arc::clone(rendering),
                            counted: Arc::clone(counted),
                        },
                    );
                }
            }
            CostMode::Lazy => {
                self.cache.insert_lazy_cost(edge, cost);
            }
        }
    }
}

/// Reject configurations the search cannot run on.
fn validate_scene(config: &EnvConfig, models: &ModelBank, scene_models: &[ModelId]) -> Result<()> {
    let invalid = |msg: String| Error::Config(ConfigLoadError::Invalid(msg));
    if !config.bounds.is_valid() {
        return Err(invalid("scene bounds must be finite with min <= max".to_string()));
    }
    if scene_models.is_empty() {
        return Err(invalid("scene must contain at least one model".to_string()));
    }
    for (i, id) in scene_models.iter().enumerate() {
        if models.get(*id).is_none() {
            return Err(invalid(format!("scene model {id} is not in the model bank")));
        }
        if scene_models[..i].contains(id) {
            return Err(invalid(format!("scene model {id} is listed twice")));
        }
    }
    if !(config.search.resolution > 0.0) || !(config.search.theta_resolution > 0.0) {
        return Err(invalid("search resolutions must be positive".to_string()));
    }
    Ok(())
}

impl SearchEnvironment for ObjectRecognitionEnv {
    fn start_state_id(&self) -> StateId {
        self.start_id
    }

    fn goal_state_id(&self) -> StateId {
        GOAL_STATE_ID
    }

    fn is_goal_state(&self, id: StateId) -> bool {
        id == GOAL_STATE_ID
            || self
                .registry
                .get(id)
                .is_some_and(|s| s.len() == self.num_objects())
    }

    fn get_succs(&mut self, id: StateId) -> Result<Vec<Successor>> {
        if id == GOAL_STATE_ID {
            return Ok(Vec::new());
        }
        let depth = self.state(id)?.len();
        if let Some(successors) = self.cache.successors(id) {
            return Ok(successors.to_vec());
        }
        self.stats.expansions += 1;
        if depth >= self.num_objects() {
            self.cache.insert_successors(id, Vec::new());
            return Ok(Vec::new());
        }

        self.materialize(id)?;
        let children = self.children_of(id)?;
        let pending: Vec<(StateId, ObjectState)> = children
            .iter()
            .copied()
            .filter(|&(child, _)| !self.cache.is_evaluated((id, child)))
            .collect();
        self.evaluate_children(id, &pending, CostMode::Full)?;

        let successors: Vec<Successor> = children
            .iter()
            .filter_map(|&(child, _)| {
                self.cache.edge_cost((id, child)).map(|cost| Successor {
                    id: child,
                    cost,
                    is_true_cost: true,
                })
            })
            .collect();
        log::debug!(
            "Expanded {id}: {} candidates, {} valid successors",
            children.len(),
            successors.len()
        );
        self.cache.insert_successors(id, successors.clone());
        Ok(successors)
    }

    fn get_lazy_succs(&mut self, id: StateId) -> Result<Vec<Successor>> {
        if id == GOAL_STATE_ID {
            return Ok(Vec::new());
        }
        let depth = self.state(id)?.len();
        self.stats.expansions += 1;
        if depth >= self.num_objects() {
            return Ok(Vec::new());
        }

        self.materialize(id)?;
        let children = self.children_of(id)?;
        let pending: Vec<(StateId, ObjectState)> = children
            .iter()
            .copied()
            .filter(|&(child, _)| {
                let edge = (id, child);
                !self.cache.is_evaluated(edge) && self.cache.lazy_cost(edge).is_none()
            })
            .collect();
        self.evaluate_children(id, &pending, CostMode::Lazy)?;

        let successors: Vec<Successor> = children
            .iter()
            .filter_map(|&(child, _)| {
                let edge = (id, child);
                if let Some(cost) = self.cache.edge_cost(edge) {
                    return Some(Successor {
                        id: child,
                        cost,
                        is_true_cost: true,
                    });
                }
                if self.cache.is_invalid(edge) {
                    return None;
                }
                self.cache.lazy_cost(edge).map(|cost| Successor {
                    id: child,
                    cost,
                    is_true_cost: false,
                })
            })
            .collect();
        log::debug!(
            "Lazily expanded {id}: {} candidates, {} valid successors",
            children.len(),
            successors.len()
        );
        Ok(successors)
    }

    fn get_true_cost(&mut self, parent: StateId, child: StateId) -> Result<Option<Cost>> {
        let child_state = self.state(child)?.clone();
        self.state(parent)?;
        let edge = (parent, child);
        if let Some(cost) = self.cache.edge_cost(edge) {
            return Ok(Some(cost));
        }
        if self.cache.is_invalid(edge) {
            return Ok(None);
        }
        let candidate = self.added_object(parent, &child_state)?;
        self.materialize(parent)?;
        let outputs = self.evaluate_children(parent, &[(child, candidate)], CostMode::Full)?;
        Ok(outputs.first().and_then(|o| o.cost))
    }

    fn num_heuristics(&self) -> usize {
        self.heuristics.num_heuristics()
    }

    fn goal_heuristic(&self, index: usize, id: StateId) -> Result<Cost> {
        if id == GOAL_STATE_ID {
            return Ok(0);
        }
        let state = match self.adjusted_state(id) {
            Some(adjusted) => adjusted,
            None => self.state(id)?,
        };
        let counted = self.cache.state(id).map(|s| &*s.counted);
        self.heuristics
            .goal_heuristic(index, state, counted)
            .ok_or(Error::UnknownHeuristic(index))
    }
}
