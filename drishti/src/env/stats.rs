//! Run counters.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Counters accumulated by one environment; cleared by
/// [`super::ObjectRecognitionEnv::reset`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvStats {
    /// Edges evaluated with a composed rendering
    pub scenes_rendered: u64,
    /// Fully evaluated edges that were valid
    pub scenes_valid: u64,
    /// Edges evaluated with the lazy bound
    pub lazy_evaluations: u64,
    /// Single-object placements whose refined pose was accepted
    pub refinements_accepted: u64,
    /// States expanded
    pub expansions: u64,
}

impl fmt::Display for EnvStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rendered={} valid={} lazy={} refined={} expansions={}",
            self.scenes_rendered,
            self.scenes_valid,
            self.lazy_evaluations,
            self.refinements_accepted,
            self.expansions
        )
    }
}
