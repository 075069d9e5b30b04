//! Environment settings assembled from the configuration file sections.

use crate::core::Bounds;
use crate::cost::{CostConfig, RefinementConfig};
use crate::dispatch::DispatchConfig;
use crate::successors::SearchConfig;

/// Everything an [`super::ObjectRecognitionEnv`] needs besides its
/// collaborators.
#[derive(Clone, Debug)]
pub struct EnvConfig {
    /// Region where object centers may be placed
    pub bounds: Bounds,
    /// Height of the support plane (world Z)
    pub table_height: f32,
    /// Pose grid
    pub search: SearchConfig,
    /// Cost terms
    pub cost: CostConfig,
    /// Single-object refinement
    pub refinement: RefinementConfig,
    /// Worker pool
    pub dispatch: DispatchConfig,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            bounds: Bounds::default(),
            table_height: 0.0,
            search: SearchConfig::default(),
            cost: CostConfig::default(),
            refinement: RefinementConfig::default(),
            dispatch: DispatchConfig::default(),
        }
    }
}
