//! State registry: arena of distinct states plus a value-to-index map.
//!
//! [`StateId`] is an index into the arena. Ids are dense, assigned in first-seen
//! order, and never reused within one registry.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::graph::GraphState;

/// Identifier of a distinct [`GraphState`] within one registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateId(pub u32);

impl StateId {
    /// Create a new state ID.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Get the raw ID value.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Arena index.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for StateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "State({})", self.0)
    }
}

/// Deduplicating store of search states.
#[derive(Debug, Default)]
pub struct StateRegistry {
    states: Vec<GraphState>,
    index: HashMap<GraphState, StateId>,
}

impl StateRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id of an equal state, allocating one on first sight.
    pub fn intern(&mut self, state: GraphState) -> StateId {
        if let Some(&id) = self.index.get(&state) {
            return id;
        }
        let id = StateId::new(self.states.len() as u32);
        self.states.push(state.clone());
        self.index.insert(state, id);
        id
    }

    /// Id of an equal state, if it was interned.
    pub fn lookup(&self, state: &GraphState) -> Option<StateId> {
        self.index.get(state).copied()
    }

    /// State for an id, if it was issued by this registry.
    pub fn get(&self, id: StateId) -> Option<&GraphState> {
        self.states.get(id.index())
    }

    /// Number of distinct states
    pub fn len(&self) -> usize {
        self.states.len()
    }

    /// Whether no state was interned
    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}
