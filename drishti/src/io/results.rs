//! Append-mode result files.
//!
//! Poses file, per scene:
//!
//! ```text
//! <scene id>
//! <x> <y> <z> <yaw>      one line per object
//! ```
//!
//! Stats file, per scene:
//!
//! ```text
//! <scene id>
//! <rendered> <valid> <expansions> <seconds> <cost>
//! ```

use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::Duration;

use crate::cost::Cost;
use crate::env::EnvStats;
use crate::error::Result;
use crate::state::ObjectState;

/// One stats file record.
#[derive(Clone, Copy, Debug)]
pub struct StatsRecord {
    /// Environment counters
    pub stats: EnvStats,
    /// Wall time of the run
    pub elapsed: Duration,
    /// Total path cost
    pub cost: Cost,
}

fn append(path: &Path) -> Result<BufWriter<std::fs::File>> {
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    Ok(BufWriter::new(file))
}

/// Append a scene's object poses. `z` is the support plane height.
pub fn append_poses(
    path: &Path,
    scene_id: &str,
    objects: &[ObjectState],
    table_height: f32,
) -> Result<()> {
    let mut out = append(path)?;
    writeln!(out, "{scene_id}")?;
    for object in objects {
        let pose = object.cont_pose();
        writeln!(out, "{} {} {} {}", pose.x, pose.y, table_height, pose.yaw)?;
    }
    out.flush()?;
    Ok(())
}

/// Append a scene's run statistics.
pub fn append_stats(path: &Path, scene_id: &str, record: &StatsRecord) -> Result<()> {
    let mut out = append(path)?;
    writeln!(out, "{scene_id}")?;
    writeln!(
        out,
        "{} {} {} {:.3} {}",
        record.stats.scenes_rendered,
        record.stats.scenes_valid,
        record.stats.expansions,
        record.elapsed.as_secs_f64(),
        record.cost
    )?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ContPose, DiscPose};
    use crate::model::ModelId;
    use tempfile::tempdir;

    #[test]
    fn test_files_are_appended() {
        let dir = tempdir().unwrap();
        let poses = dir.path().join("poses.txt");
        let object = ObjectState::new(
            ModelId::new(0),
            ContPose::new(0.25, -0.5, 0.0),
            DiscPose::default(),
        );
        append_poses(&poses, "a", &[object], 0.0).unwrap();
        append_poses(&poses, "b", &[], 0.0).unwrap();
        let text = std::fs::read_to_string(&poses).unwrap();
        assert_eq!(text, "a\n0.25 -0.5 0 0\nb\n");

        let stats = dir.path().join("stats.txt");
        let record = StatsRecord {
            stats: EnvStats {
                scenes_rendered: 12,
                scenes_valid: 5,
                expansions: 3,
                ..EnvStats::default()
            },
            elapsed: Duration::from_millis(1500),
            cost: 7,
        };
        append_stats(&stats, "a", &record).unwrap();
        let text = std::fs::read_to_string(&stats).unwrap();
        assert_eq!(text, "a\n12 5 3 1.500 7\n");
    }
}
