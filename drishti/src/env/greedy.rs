//! Greedy planner: repeatedly follow the cheapest successor.

use crate::cost::Cost;
use crate::error::Result;
use crate::state::{ObjectState, StateId};

use super::{ObjectRecognitionEnv, SearchEnvironment, Successor};

/// Outcome of [`ObjectRecognitionEnv::compute_greedy_poses`].
#[derive(Clone, Debug)]
pub struct GreedyResult {
    /// Last state reached
    pub state: StateId,
    /// Its objects with refined poses
    pub objects: Vec<ObjectState>,
    /// Sum of edge costs along the path
    pub total_cost: Cost,
    /// Whether every scene object was placed
    pub complete: bool,
}

impl ObjectRecognitionEnv {
    /// Cheapest valid successor; ties keep generation order.
    pub fn best_successor(&mut self, id: StateId) -> Result<Option<Successor>> {
        let successors = self.get_succs(id)?;
        Ok(successors
            .into_iter()
            .reduce(|best, s| if s.cost < best.cost { s } else { best }))
    }

    /// Follow best successors from the start until the goal level or a dead end.
    pub fn compute_greedy_poses(&mut self) -> Result<GreedyResult> {
        let mut current = self.start_state_id();
        let mut total_cost: Cost = 0;
        while !self.is_goal_state(current) {
            let Some(next) = self.best_successor(current)? else {
                log::warn!("Greedy planner stopped at {current}: no valid successor");
                break;
            };
            log::info!("Greedy step {current} -> {} (cost {})", next.id, next.cost);
            total_cost += next.cost;
            current = next.id;
        }
        let objects = self.goal_poses(current)?;
        Ok(GreedyResult {
            state: current,
            complete: objects.len() == self.num_objects(),
            objects,
            total_cost,
        })
    }
}
