//! Error types for Drishti

use crate::config::ConfigLoadError;
use crate::state::StateId;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Drishti error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigLoadError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Image file could not be decoded or has the wrong shape
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// State id was never issued by this environment's registry
    #[error("Unknown state id: {0}")]
    UnknownState(StateId),

    /// Child is not a one-object extension of the parent
    #[error("Invalid edge {parent} -> {child}: {reason}")]
    InvalidEdge {
        /// Parent state id
        parent: StateId,
        /// Child state id
        child: StateId,
        /// Why the pair is not an edge
        reason: String,
    },

    /// Heuristic slot index out of range
    #[error("Unknown heuristic index: {0}")]
    UnknownHeuristic(usize),

    /// Render oracle could not produce an image
    #[error("Rendering failed: {0}")]
    Render(String),

    /// A worker failed or missed the gather barrier
    #[error("Worker {rank} failed: {reason}")]
    Coordination {
        /// Rank of the failing worker
        rank: usize,
        /// Failure description
        reason: String,
    },
}
