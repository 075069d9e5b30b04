//! Worker rank: evaluates its shard of every dispatched batch.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};

use crate::cost::{CostComputationInput, CostComputationOutput, CostMode};

use super::ShardEvaluator;

/// Message from the coordinator to a worker.
pub(super) enum Job {
    Shard {
        round: u64,
        inputs: Arc<Vec<CostComputationInput>>,
        mode: CostMode,
    },
    Shutdown,
}

/// A worker's answer for one round.
pub(super) struct Report {
    pub rank: usize,
    pub round: u64,
    pub result: Result<Vec<(usize, CostComputationOutput)>, String>,
}

/// Evaluate the items of `inputs` assigned to `rank` out of `ranks`.
///
/// Returns `(input index, output)` pairs; a panic in the evaluator is turned
/// into an error message.
pub(super) fn run_shard(
    evaluator: &dyn ShardEvaluator,
    inputs: &[CostComputationInput],
    rank: usize,
    ranks: usize,
    mode: CostMode,
) -> Result<Vec<(usize, CostComputationOutput)>, String> {
    let indices: Vec<usize> = (rank..inputs.len()).step_by(ranks).collect();
    if indices.is_empty() {
        return Ok(Vec::new());
    }
    let shard: Vec<&CostComputationInput> = indices.iter().map(|&i| &inputs[i]).collect();
    let outputs = panic::catch_unwind(AssertUnwindSafe(|| evaluator.evaluate_shard(&shard, mode)))
        .map_err(panic_message)?;
    if outputs.len() != indices.len() {
        return Err(format!(
            "evaluated {} of {} items",
            outputs.len(),
            indices.len()
        ));
    }
    Ok(indices.into_iter().zip(outputs).collect())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}

/// Worker thread body: serve jobs until shutdown or coordinator hang-up.
pub(super) fn worker_loop(
    rank: usize,
    ranks: usize,
    evaluator: Arc<dyn ShardEvaluator>,
    jobs: Receiver<Job>,
    reports: Sender<Report>,
) {
    log::debug!("Worker {rank} started");
    while let Ok(job) = jobs.recv() {
        match job {
            Job::Shard {
                round,
                inputs,
                mode,
            } => {
                let result = run_shard(evaluator.as_ref(), &inputs, rank, ranks, mode);
                if reports.send(Report { rank, round, result }).is_err() {
                    break;
                }
            }
            Job::Shutdown => break,
        }
    }
    log::debug!("Worker {rank} stopped");
}
