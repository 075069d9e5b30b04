//! Drishti - multi-object pose estimation from a depth frame
//!
//! Loads a scene configuration, builds the search environment and runs the
//! greedy planner over it. Poses and run statistics are appended to the
//! output files so several scenes can share them.
//!
//! ```text
//! drishti --config configs/drishti.toml --poses poses.txt --stats stats.txt
//! ```

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;

use drishti::io::{self, StatsRecord};
use drishti::{
    DetectionHeuristic, DrishtiConfig, GreedyResult, ObjectRecognitionEnv, Observation,
    PlanarIcp, RaycastRenderer, Result,
};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scene configuration file
    #[arg(short, long, default_value = "configs/drishti.toml")]
    config: PathBuf,

    /// Poses output file (appended)
    #[arg(short, long, default_value = "poses.txt")]
    poses: PathBuf,

    /// Stats output file (appended)
    #[arg(short, long, default_value = "stats.txt")]
    stats: PathBuf,

    /// Override the number of cost workers
    #[arg(short, long)]
    workers: Option<usize>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {} - {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();

    let args = Args::parse();
    let mut config = DrishtiConfig::load(&args.config)?;
    if let Some(workers) = args.workers {
        config.dispatch.num_workers = workers;
    }

    let models = Arc::new(config.build_model_bank()?);
    let camera = config.camera()?;
    let renderer = Arc::new(RaycastRenderer::new(
        camera,
        models.clone(),
        config.scene.table_height,
    ));
    let refiner = Arc::new(PlanarIcp::new(config.refinement.icp_config()));

    let observation = load_observation(&config, &models, renderer.as_ref())?;
    let scene_models = config.scene_model_ids(&models)?;
    log::info!(
        "Scene '{}': {} objects, {} workers",
        config.output.scene_id,
        scene_models.len(),
        config.dispatch.ranks()
    );

    let mut env = ObjectRecognitionEnv::new(
        config.to_env_config(),
        models.clone(),
        scene_models,
        renderer,
        refiner,
        observation,
    )?;

    let detections = config.detections(&models)?;
    if !detections.is_empty() {
        let slot = env.add_heuristic(Box::new(DetectionHeuristic::new(
            detections,
            config.search.resolution,
            env.num_objects(),
        )));
        log::info!("Detection heuristic registered in slot {slot}");
    }

    let start = Instant::now();
    let result = env.compute_greedy_poses()?;
    let elapsed = start.elapsed();

    log::info!(
        "Greedy search finished in {:.2}s: cost {}, {} of {} objects{}",
        elapsed.as_secs_f64(),
        result.total_cost,
        result.objects.len(),
        env.num_objects(),
        if result.complete { "" } else { " (incomplete)" }
    );
    log::info!("{}", env.stats());

    io::append_poses(
        &args.poses,
        &config.output.scene_id,
        &result.objects,
        config.scene.table_height,
    )?;
    io::append_stats(
        &args.stats,
        &config.output.scene_id,
        &StatsRecord {
            stats: env.stats(),
            elapsed,
            cost: result.total_cost,
        },
    )?;

    if let Some(dir) = &config.output.debug_dir {
        write_debug_images(&env, &result, dir, &config.output.scene_id)?;
    }

    Ok(())
}

/// Read the observed frame, or render it from the configured ground truth.
fn load_observation(
    config: &DrishtiConfig,
    models: &drishti::ModelBank,
    renderer: &RaycastRenderer,
) -> Result<Observation> {
    let observation = match &config.observation.depth {
        Some(depth_path) => {
            let depth = io::read_depth_pgm(depth_path)?;
            let color = match &config.observation.color {
                Some(color_path) => Some(io::read_color_ppm(color_path)?),
                None => None,
            };
            log::info!("Observed depth from {}", depth_path.display());
            Observation::new(depth, color)
        }
        None => {
            let truth = config.ground_truth(models)?;
            log::info!("Synthesizing observation from {} placements", truth.len());
            Observation::synthesize(renderer, &truth)?
        }
    };
    let constraint = config.constraint_points();
    if !constraint.is_empty() {
        log::info!("Constraint cloud with {} points", constraint.len());
    }
    Ok(observation.with_constraint(constraint))
}

fn write_debug_images(
    env: &ObjectRecognitionEnv,
    result: &GreedyResult,
    dir: &Path,
    scene_id: &str,
) -> Result<()> {
    let Some(rendering) = env.rendering(result.state) else {
        log::warn!("No rendering cached for the result state");
        return Ok(());
    };
    std::fs::create_dir_all(dir)?;
    io::write_depth_pgm(&dir.join(format!("{scene_id}_depth.pgm")), &rendering.depth)?;
    io::write_color_ppm(&dir.join(format!("{scene_id}_color.ppm")), &rendering.color)?;
    io::write_depth_pgm(
        &dir.join(format!("{scene_id}_observed.pgm")),
        env.observed().depth(),
    )?;
    log::info!("Debug renderings written to {}", dir.display());
    Ok(())
}
