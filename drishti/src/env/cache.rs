//! Write-once memo tables owned by one environment.
//!
//! Every table keeps the first value written for a key; later writes are
//! ignored and reported as such. Nothing is evicted.

use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;

use crate::core::DiscPose;
use crate::cost::{Cost, SingleObjectEntry};
use crate::model::ModelId;
use crate::observation::CountedSet;
use crate::render::Rendering;
use crate::state::{GraphState, StateId};

use super::Successor;

/// Key of a parent-to-child edge.
pub type EdgeKey = (StateId, StateId);

/// Insert unless present; returns whether the value was stored.
fn insert_once<K: Eq + Hash, V>(map: &mut HashMap<K, V>, key: K, value: V) -> bool {
    if map.contains_key(&key) {
        return false;
    }
    map.insert(key, value);
    true
}

/// Everything a fully evaluated state carries.
#[derive(Clone, Debug)]
pub struct MaterializedState {
    /// State with refined poses
    pub adjusted: GraphState,
    /// Composed rendering
    pub rendering: Arc<Rendering>,
    /// Observed points the state accounts for
    pub counted: Arc<CountedSet>,
}

/// Memo tables of one environment.
#[derive(Debug, Default)]
pub struct EnvCache {
    states: HashMap<StateId, MaterializedState>,
    single_object: HashMap<(ModelId, DiscPose), Arc<SingleObjectEntry>>,
    successors: HashMap<StateId, Vec<Successor>>,
    edge_costs: HashMap<EdgeKey, Cost>,
    lazy_costs: HashMap<EdgeKey, Cost>,
    invalid_edges: HashSet<EdgeKey>,
    origins: HashMap<StateId, StateId>,
}

impl EnvCache {
    /// Empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Materialized data of a state
    pub fn state(&self, id: StateId) -> Option<&MaterializedState> {
        self.states.get(&id)
    }

    /// Whether a state has a rendering and counted set
    pub fn is_materialized(&self, id: StateId) -> bool {
        self.states.contains_key(&id)
    }

    /// Store a state's data; the adjusted state, rendering and counted set
    /// are written together so they always belong to the same evaluation.
    pub fn insert_state(&mut self, id: StateId, state: MaterializedState) -> bool {
        insert_once(&mut self.states, id, state)
    }

    /// Cached single-object entry
    pub fn single_object(&self, key: &(ModelId, DiscPose)) -> Option<Arc<SingleObjectEntry>> {
        self.single_object.get(key).cloned()
    }

    /// Store a single-object entry
    pub fn insert_single_object(&mut self, entry: Arc<SingleObjectEntry>) -> bool {
        insert_once(&mut self.single_object, entry.object.key(), entry)
    }

    /// Number of cached single-object entries
    pub fn single_object_count(&self) -> usize {
        self.single_object.len()
    }

    /// Cached successor list
    pub fn successors(&self, id: StateId) -> Option<&[Successor]> {
        self.successors.get(&id).map(Vec::as_slice)
    }

    /// Store a successor list
    pub fn insert_successors(&mut self, id: StateId, successors: Vec<Successor>) -> bool {
        insert_once(&mut self.successors, id, successors)
    }

    /// Exact edge cost
    pub fn edge_cost(&self, edge: EdgeKey) -> Option<Cost> {
        self.edge_costs.get(&edge).copied()
    }

    /// Store an exact edge cost
    pub fn insert_edge_cost(&mut self, edge: EdgeKey, cost: Cost) -> bool {
        insert_once(&mut self.edge_costs, edge, cost)
    }

    /// Lazy lower bound of an edge
    pub fn lazy_cost(&self, edge: EdgeKey) -> Option<Cost> {
        self.lazy_costs.get(&edge).copied()
    }

    /// Store a lazy lower bound
    pub fn insert_lazy_cost(&mut self, edge: EdgeKey, cost: Cost) -> bool {
        insert_once(&mut self.lazy_costs, edge, cost)
    }

    /// Whether an edge was evaluated and found invalid
    pub fn is_invalid(&self, edge: EdgeKey) -> bool {
        self.invalid_edges.contains(&edge)
    }

    /// Record an invalid edge
    pub fn insert_invalid(&mut self, edge: EdgeKey) -> bool {
        self.invalid_edges.insert(edge)
    }

    /// Whether anything is known about an edge
    pub fn is_evaluated(&self, edge: EdgeKey) -> bool {
        self.edge_costs.contains_key(&edge) || self.invalid_edges.contains(&edge)
    }

    /// First parent with a valid edge into a state
    pub fn origin(&self, id: StateId) -> Option<StateId> {
        self.origins.get(&id).copied()
    }

    /// Record a parent with a valid edge into a state
    pub fn insert_origin(&mut self, child: StateId, parent: StateId) -> bool {
        insert_once(&mut self.origins, child, parent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ContPose;
    use crate::state::ObjectState;

    #[test]
    fn test_first_write_wins() {
        let mut cache = EnvCache::new();
        let edge = (StateId::new(0), StateId::new(1));
        assert!(cache.insert_edge_cost(edge, 5));
        assert!(!cache.insert_edge_cost(edge, 7));
        assert_eq!(cache.edge_cost(edge), Some(5));
        assert!(cache.is_evaluated(edge));
        assert!(!cache.is_evaluated((StateId::new(1), StateId::new(0))));
    }

    #[test]
    fn test_single_object_keyed_by_cell() {
        let mut cache = EnvCache::new();
        let object = ObjectState::new(
            ModelId::new(0),
            ContPose::new(0.1, 0.0, 0.0),
            DiscPose::new(1, 0, 0),
        );
        let first = Arc::new(SingleObjectEntry::render_failure(object));
        assert!(cache.insert_single_object(Arc::clone(&first)));

        // Same cell with another continuous pose is the same key
        let moved = object.refined(ContPose::new(0.12, 0.0, 0.0));
        assert!(!cache.insert_single_object(Arc::new(SingleObjectEntry::render_failure(moved))));
        let stored = cache.single_object(&object.key()).unwrap();
        assert!(Arc::ptr_eq(&stored, &first));
        assert_eq!(cache.single_object_count(), 1);
    }
}
