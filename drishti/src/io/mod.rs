//! File formats: netpbm images and run result files.

pub mod pnm;
pub mod results;

pub use pnm::{read_color_ppm, read_depth_pgm, write_color_ppm, write_depth_pgm};
pub use results::{StatsRecord, append_poses, append_stats};
