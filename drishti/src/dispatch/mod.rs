//! Parallel dispatch of edge evaluations.
//!
//! A persistent pool of `P` ranks evaluates batches of
//! [`CostComputationInput`]. Rank 0 is the coordinator (the caller's thread);
//! ranks `1..P` are named worker threads created once with the pool.
//!
//! # Protocol
//!
//! ```text
//! coordinator                     worker r (r = 1..P)
//!   send Shard{round, inputs} ──►   evaluate items i with i % P == r
//!   evaluate items i % P == 0
//!   gather P-1 reports   ◄──────    Report{rank, round, outputs}
//!   reorder by input index
//! ```
//!
//! Items are assigned round-robin so the partition depends only on the
//! input order. Reports from an earlier, abandoned round are discarded.

mod config;
mod worker;

pub use config::DispatchConfig;

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};

use crate::cost::{CostComputationInput, CostComputationOutput, CostEvaluator, CostMode};
use crate::error::{Error, Result};

use worker::{Job, Report, run_shard, worker_loop};

/// Something that can evaluate a shard of edges.
pub trait ShardEvaluator: Send + Sync {
    /// Evaluate `inputs` in order; must return one output per input.
    fn evaluate_shard(
        &self,
        inputs: &[&CostComputationInput],
        mode: CostMode,
    ) -> Vec<CostComputationOutput>;
}

impl ShardEvaluator for CostEvaluator {
    fn evaluate_shard(
        &self,
        inputs: &[&CostComputationInput],
        mode: CostMode,
    ) -> Vec<CostComputationOutput> {
        CostEvaluator::evaluate_shard(self, inputs, mode)
    }
}

struct WorkerHandle {
    rank: usize,
    jobs: Sender<Job>,
    thread: Option<JoinHandle<()>>,
}

/// Fixed worker pool with a gather barrier.
pub struct Dispatcher {
    evaluator: Arc<dyn ShardEvaluator>,
    workers: Vec<WorkerHandle>,
    reports: Receiver<Report>,
    barrier_timeout: Duration,
    round: u64,
}

impl Dispatcher {
    /// Spawn `config.ranks() - 1` worker threads.
    pub fn new(evaluator: Arc<dyn ShardEvaluator>, config: &DispatchConfig) -> Result<Self> {
        let ranks = config.ranks();
        let (report_tx, report_rx) = crossbeam_channel::unbounded();
        let mut workers = Vec::with_capacity(ranks - 1);
        for rank in 1..ranks {
            let (job_tx, job_rx) = crossbeam_channel::unbounded();
            let evaluator = Arc::clone(&evaluator);
            let reports = report_tx.clone();
            let thread = thread::Builder::new()
                .name(format!("cost-worker-{rank}"))
                .spawn(move || worker_loop(rank, ranks, evaluator, job_rx, reports))?;
            workers.push(WorkerHandle {
                rank,
                jobs: job_tx,
                thread: Some(thread),
            });
        }
        log::info!("Dispatcher started with {ranks} ranks");
        Ok(Self {
            evaluator,
            workers,
            reports: report_rx,
            barrier_timeout: Duration::from_millis(config.barrier_timeout_ms),
            round: 0,
        })
    }

    /// Number of ranks including the coordinator
    pub fn ranks(&self) -> usize {
        self.workers.len() + 1
    }

    /// Evaluate a batch; outputs are in input order.
    ///
    /// # Errors
    /// [`Error::Coordination`] when any rank fails or misses the barrier.
    pub fn dispatch(
        &mut self,
        inputs: Vec<CostComputationInput>,
        mode: CostMode,
    ) -> Result<Vec<CostComputationOutput>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }
        let count = inputs.len();
        let ranks = self.ranks();
        let start = Instant::now();
        self.round += 1;
        let round = self.round;
        let inputs = Arc::new(inputs);

        // Ranks without items get no job
        let mut pending: Vec<usize> = Vec::new();
        for worker in &self.workers {
            if worker.rank >= count {
                continue;
            }
            let job = Job::Shard {
                round,
                inputs: Arc::clone(&inputs),
                mode,
            };
            worker.jobs.send(job).map_err(|_| Error::Coordination {
                rank: worker.rank,
                reason: "worker is not running".to_string(),
            })?;
            pending.push(worker.rank);
        }

        let mut slots: Vec<Option<CostComputationOutput>> = vec![None; count];
        let own = run_shard(self.evaluator.as_ref(), &inputs, 0, ranks, mode)
            .map_err(|reason| Error::Coordination { rank: 0, reason })?;
        place(&mut slots, own);

        let deadline = start + self.barrier_timeout;
        while !pending.is_empty() {
            let wait = deadline.saturating_duration_since(Instant::now());
            let report = match self.reports.recv_timeout(wait) {
                Ok(report) => report,
                Err(RecvTimeoutError::Timeout) => {
                    return Err(Error::Coordination {
                        rank: pending[0],
                        reason: format!("no report within {} ms", self.barrier_timeout.as_millis()),
                    });
                }
                Err(RecvTimeoutError::Disconnected) => {
                    return Err(Error::Coordination {
                        rank: pending[0],
                        reason: "report channel closed".to_string(),
                    });
                }
            };
            if report.round != round {
                log::debug!("Discarding stale report from worker {}", report.rank);
                continue;
            }
            let outputs = report.result.map_err(|reason| Error::Coordination {
                rank: report.rank,
                reason,
            })?;
            place(&mut slots, outputs);
            pending.retain(|&r| r != report.rank);
        }

        let outputs: Vec<CostComputationOutput> = slots.into_iter().flatten().collect();
        if outputs.len() != count {
            return Err(Error::Coordination {
                rank: 0,
                reason: format!("gathered {} of {count} outputs", outputs.len()),
            });
        }
        log::debug!(
            "Dispatched {count} {mode:?} evaluations over {ranks} ranks in {:.1} ms",
            start.elapsed().as_secs_f64() * 1000.0
        );
        Ok(outputs)
    }
}

fn place(
    slots: &mut [Option<CostComputationOutput>],
    outputs: Vec<(usize, CostComputationOutput)>,
) {
    for (index, output) in outputs {
        if let Some(slot) = slots.get_mut(index) {
            *slot = Some(output);
        }
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        for worker in &self.workers {
            let _ = worker.jobs.send(Job::Shutdown);
        }
        for worker in &mut self.workers {
            if let Some(thread) = worker.thread.take() {
                if thread.join().is_err() {
                    log::warn!("Worker {} exited abnormally", worker.rank);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::{CostConfig, RefinementConfig, Rejection, SingleObjectEntry};
    use crate::observation::CountedSet;
    use crate::render::RenderOracle;
    use crate::state::{GraphState, ObjectState, StateId};
    use crate::testing::{BOX_A, BOX_B, Fixture};

    fn inputs(fixture: &Fixture) -> Vec<CostComputationInput> {
        let parent = GraphState::new();
        let rendering = Arc::new(fixture.renderer.render(&[]).unwrap());
        let counted = Arc::new(CountedSet::new(fixture.observed.len()));
        let mut out = Vec::new();
        for model in [BOX_A, BOX_B] {
            for disc in fixture.grid.cells().step_by(3) {
                out.push(CostComputationInput {
                    parent_id: StateId::new(0),
                    child_id: StateId::new(out.len() as u32 + 1),
                    parent_state: parent.clone(),
                    candidate: ObjectState::new(model, fixture.grid.cont(disc), disc),
                    parent_rendering: Arc::clone(&rendering),
                    parent_counted: Arc::clone(&counted),
                    single_object: None,
                });
            }
        }
        out
    }

    fn dispatcher(fixture: &Fixture, ranks: usize) -> Dispatcher {
        let evaluator = Arc::new(fixture.evaluator(
            CostConfig::default(),
            RefinementConfig::default(),
            None,
        ));
        let config = DispatchConfig {
            num_workers: ranks,
            ..DispatchConfig::default()
        };
        Dispatcher::new(evaluator, &config).unwrap()
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let fixture = Fixture::new();
        let sequential = dispatcher(&fixture, 1)
            .dispatch(inputs(&fixture), CostMode::Full)
            .unwrap();
        let parallel = dispatcher(&fixture, 4)
            .dispatch(inputs(&fixture), CostMode::Full)
            .unwrap();
        assert_eq!(sequential.len(), parallel.len());
        for (s, p) in sequential.iter().zip(&parallel) {
            assert_eq!(s.child_id, p.child_id);
            assert_eq!(s.cost, p.cost);
            assert_eq!(s.rejection, p.rejection);
            assert_eq!(s.breakdown, p.breakdown);
            assert_eq!(s.counted, p.counted);
        }
    }

    #[test]
    fn test_fewer_items_than_ranks() {
        let fixture = Fixture::new();
        let mut pool = dispatcher(&fixture, 8);
        let items: Vec<_> = inputs(&fixture).into_iter().take(3).collect();
        let outputs = pool.dispatch(items, CostMode::Lazy).unwrap();
        let ids: Vec<u32> = outputs.iter().map(|o| o.child_id.value()).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert!(pool.dispatch(Vec::new(), CostMode::Lazy).unwrap().is_empty());
    }

    fn reject_all(inputs: &[&CostComputationInput], mode: CostMode) -> Vec<CostComputationOutput> {
        inputs
            .iter()
            .map(|input| {
                let entry = Arc::new(SingleObjectEntry::render_failure(input.candidate));
                CostComputationOutput::rejected(input, mode, Rejection::RenderFailure, entry)
            })
            .collect()
    }

    fn on_worker_thread() -> bool {
        thread::current()
            .name()
            .is_some_and(|n| n.starts_with("cost-worker"))
    }

    struct Panicking;

    impl ShardEvaluator for Panicking {
        fn evaluate_shard(
            &self,
            inputs: &[&CostComputationInput],
            mode: CostMode,
        ) -> Vec<CostComputationOutput> {
            if on_worker_thread() {
                panic!("renderer lost");
            }
            reject_all(inputs, mode)
        }
    }

    #[test]
    fn test_worker_panic_fails_batch() {
        let fixture = Fixture::new();
        let config = DispatchConfig {
            num_workers: 2,
            ..DispatchConfig::default()
        };
        let mut pool = Dispatcher::new(Arc::new(Panicking), &config).unwrap();
        let items: Vec<_> = inputs(&fixture).into_iter().take(4).collect();
        let err = pool.dispatch(items, CostMode::Full).unwrap_err();
        assert!(matches!(err, Error::Coordination { rank: 1, .. }));
    }

    struct Stalled;

    impl ShardEvaluator for Stalled {
        fn evaluate_shard(
            &self,
            inputs: &[&CostComputationInput],
            mode: CostMode,
        ) -> Vec<CostComputationOutput> {
            if on_worker_thread() {
                thread::sleep(Duration::from_millis(300));
            }
            reject_all(inputs, mode)
        }
    }

    #[test]
    fn test_barrier_timeout() {
        let fixture = Fixture::new();
        let config = DispatchConfig {
            num_workers: 2,
            barrier_timeout_ms: 20,
            ..DispatchConfig::default()
        };
        let mut pool = Dispatcher::new(Arc::new(Stalled), &config).unwrap();
        let items: Vec<_> = inputs(&fixture).into_iter().take(2).collect();
        let err = pool.dispatch(items, CostMode::Full).unwrap_err();
        assert!(matches!(err, Error::Coordination { rank: 1, .. }));

        // The late report of the failed round is discarded
        pool.barrier_timeout = Duration::from_secs(10);
        let items: Vec<_> = inputs(&fixture).into_iter().take(2).collect();
        let outputs = pool.dispatch(items, CostMode::Full).unwrap();
        assert_eq!(outputs[1].child_id, StateId::new(2));
    }
}
