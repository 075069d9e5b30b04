//! Configuration loading and observed-frame file input.

mod common;

use std::path::Path;

use drishti::io;
use drishti::{ConfigLoadError, DrishtiConfig, Observation, SearchEnvironment};

#[test]
fn test_shipped_config_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/drishti.toml");
    let config = DrishtiConfig::load(&path).unwrap();

    let bank = config.build_model_bank().unwrap();
    assert_eq!(bank.len(), 2);
    assert_eq!(config.scene_model_ids(&bank).unwrap().len(), 2);
    assert_eq!(config.ground_truth(&bank).unwrap().len(), 2);
    assert_eq!(config.dispatch.ranks(), 4);
    assert_eq!(config.output.scene_id, "two_boxes");
    assert!(config.camera().is_ok());
}

#[test]
fn test_load_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = DrishtiConfig::load(&dir.path().join("missing.toml"));
    assert!(matches!(result, Err(ConfigLoadError::Io(_))));
}

#[test]
fn test_load_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("scene.toml");
    std::fs::write(&path, common::SCENE).unwrap();

    let config = DrishtiConfig::load(&path).unwrap();
    assert_eq!(config.search.resolution, 0.1);
    assert!(!config.refinement.enabled);
    assert_eq!(config.models.len(), 2);
}

#[test]
fn test_observation_from_image_files() {
    let config = common::config();
    let scene = common::Scene::new(&config);
    let synthesized = scene.observation();

    let dir = tempfile::tempdir().unwrap();
    let depth_path = dir.path().join("depth.pgm");
    let color_path = dir.path().join("color.ppm");
    io::write_depth_pgm(&depth_path, &synthesized.depth).unwrap();
    io::write_color_ppm(&color_path, synthesized.color.as_ref().unwrap()).unwrap();

    let loaded = Observation::new(
        io::read_depth_pgm(&depth_path).unwrap(),
        Some(io::read_color_ppm(&color_path).unwrap()),
    );
    assert_eq!(loaded, synthesized);

    // An environment built from files prices the root edges identically
    let mut from_files = scene.env(&config, loaded);
    let mut from_truth = scene.env(&config, synthesized);
    let start = from_files.start_state_id();
    assert_eq!(
        from_files.get_succs(start).unwrap(),
        from_truth.get_succs(start).unwrap()
    );
}

#[test]
fn test_mismatched_observation_is_rejected() {
    let config = common::config();
    let scene = common::Scene::new(&config);
    let observation = Observation::new(drishti::core::DepthImage::empty(32, 24), None);
    let result = drishti::ObjectRecognitionEnv::new(
        config.to_env_config(),
        scene.models.clone(),
        config.scene_model_ids(&scene.models).unwrap(),
        scene.renderer.clone(),
        std::sync::Arc::new(drishti::PlanarIcp::new(config.refinement.icp_config())),
        observation,
    );
    assert!(matches!(result, Err(drishti::Error::InvalidImage(_))));
}

#[test]
fn test_downsampling_thins_observed_cloud() {
    let config = common::config();
    let scene = common::Scene::new(&config);
    let full = scene.env(&config, scene.observation());

    let mut thinned = config.clone();
    thinned.cost.use_downsampling = true;
    thinned.cost.downsampling_leaf_size = 0.05;
    let downsampled = scene.env(&thinned, scene.observation());

    assert!(downsampled.observed().len() > 0);
    assert!(downsampled.observed().len() < full.observed().len());
}
