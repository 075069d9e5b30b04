//! Rendering: the oracle interface and a CPU reference implementation.

mod raycast;
mod scratch;
mod traits;

pub use raycast::RaycastRenderer;
pub use scratch::{ScratchBuffers, ScratchLease, ScratchPool};
pub use traits::{BatchRendering, RenderOracle, RenderedPoint, Rendering, back_project};
