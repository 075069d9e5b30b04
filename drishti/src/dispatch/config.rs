//! Worker pool configuration.

use serde::{Deserialize, Serialize};

/// Parallel dispatch settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Total ranks including the coordinator (1 = evaluate on the caller's
    /// thread only).
    #[serde(default = "default_num_workers")]
    pub num_workers: usize,

    /// Render single-object entries through the batched oracle entry point.
    #[serde(default)]
    pub use_batched_rendering: bool,

    /// Placements per batched render call.
    #[serde(default = "default_batch_size")]
    pub gpu_batch_size: usize,

    /// How long the coordinator waits for all workers to report (ms).
    #[serde(default = "default_barrier_timeout_ms")]
    pub barrier_timeout_ms: u64,
}

fn default_num_workers() -> usize {
    1
}
fn default_batch_size() -> usize {
    64
}
fn default_barrier_timeout_ms() -> u64 {
    60_000
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            num_workers: default_num_workers(),
            use_batched_rendering: false,
            gpu_batch_size: default_batch_size(),
            barrier_timeout_ms: default_barrier_timeout_ms(),
        }
    }
}

impl DispatchConfig {
    /// Number of ranks, never zero.
    pub fn ranks(&self) -> usize {
        self.num_workers.max(1)
    }

    /// Batch size for single-object renders, if batching is enabled.
    pub fn batch_size(&self) -> Option<usize> {
        (self.use_batched_rendering && self.gpu_batch_size > 0).then_some(self.gpu_batch_size)
    }
}
