//! Main DrishtiConfig and conversion methods.

use std::path::Path;

use nalgebra::Point3;
use serde::{Deserialize, Serialize};

use crate::core::{Camera, ContPose, Point2D};
use crate::cost::{CostConfig, RefinementConfig};
use crate::dispatch::DispatchConfig;
use crate::env::EnvConfig;
use crate::heuristic::Detection;
use crate::model::{ModelBank, ModelId};
use crate::state::ObjectState;
use crate::successors::{PoseGrid, SearchConfig};

use super::error::ConfigLoadError;
use super::models::{HeuristicsSection, ModelSection, PlacementSettings};
use super::observation::{ObservationSection, OutputSection};
use super::scene::SceneSection;

/// Full Drishti configuration loaded from TOML
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DrishtiConfig {
    /// Scene bounds, support plane, camera and scene models
    #[serde(default)]
    pub scene: SceneSection,

    /// Pose grid
    #[serde(default)]
    pub search: SearchConfig,

    /// Cost terms
    #[serde(default)]
    pub cost: CostConfig,

    /// Single-object refinement
    #[serde(default)]
    pub refinement: RefinementConfig,

    /// Worker pool
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Model bank
    #[serde(default)]
    pub models: Vec<ModelSection>,

    /// Observed frame source
    #[serde(default)]
    pub observation: ObservationSection,

    /// Extra heuristic slots
    #[serde(default)]
    pub heuristics: HeuristicsSection,

    /// Result output
    #[serde(default)]
    pub output: OutputSection,
}

impl DrishtiConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self, ConfigLoadError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigLoadError::Io(e.to_string()))?;
        let config = Self::from_toml(&contents)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load from default config path (configs/drishti.toml)
    pub fn load_default() -> Result<Self, ConfigLoadError> {
        let path = Path::new("configs/drishti.toml");
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML string
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigLoadError> {
        let config: Self =
            toml::from_str(toml_str).map_err(|e| ConfigLoadError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the search cannot run with.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        let invalid = |msg: &str| Err(ConfigLoadError::Invalid(msg.to_string()));
        if !self.scene.bounds().is_valid() {
            return invalid("scene bounds must be finite with min <= max");
        }
        self.scene.camera.to_camera()?;
        if !(self.search.resolution > 0.0 && self.search.theta_resolution > 0.0) {
            return invalid("search resolutions must be positive");
        }
        if !(self.cost.sensor_resolution > 0.0) {
            return invalid("cost.sensor_resolution must be positive");
        }
        if self.cost.use_downsampling && !(self.cost.downsampling_leaf_size > 0.0) {
            return invalid("cost.downsampling_leaf_size must be positive");
        }
        if !(0.0..=1.0).contains(&self.cost.clutter_regularizer) {
            return invalid("cost.clutter_regularizer must be within [0, 1]");
        }
        if self.refinement.max_translation < 0.0 || self.refinement.max_rotation < 0.0 {
            return invalid("refinement motion limits must be non-negative");
        }
        if self.dispatch.barrier_timeout_ms == 0 {
            return invalid("dispatch.barrier_timeout_ms must be positive");
        }
        if self.scene.models.is_empty() {
            return invalid("scene.models must name at least one model");
        }
        if self.observation.depth.is_none() && self.observation.ground_truth.is_empty() {
            return invalid("observation needs a depth image or ground truth placements");
        }
        let bank = self.build_model_bank()?;
        self.scene_model_ids(&bank)?;
        self.ground_truth(&bank)?;
        self.detections(&bank)?;
        Ok(())
    }

    /// Scene camera
    pub fn camera(&self) -> Result<Camera, ConfigLoadError> {
        self.scene.camera.to_camera()
    }

    /// Build the model bank from `[[models]]`.
    pub fn build_model_bank(&self) -> Result<ModelBank, ConfigLoadError> {
        let mut bank = ModelBank::new();
        for section in &self.models {
            bank.add(section.to_model()?)?;
        }
        Ok(bank)
    }

    /// Resolve `scene.models` against a bank.
    pub fn scene_model_ids(&self, bank: &ModelBank) -> Result<Vec<ModelId>, ConfigLoadError> {
        let mut ids = Vec::with_capacity(self.scene.models.len());
        for name in &self.scene.models {
            let id = resolve(bank, name)?;
            if ids.contains(&id) {
                return Err(ConfigLoadError::Invalid(format!(
                    "scene model '{name}' is listed twice"
                )));
            }
            ids.push(id);
        }
        Ok(ids)
    }

    /// Ground-truth placements snapped to their grid cells.
    pub fn ground_truth(&self, bank: &ModelBank) -> Result<Vec<ObjectState>, ConfigLoadError> {
        let bounds = self.scene.bounds();
        self.observation
            .ground_truth
            .iter()
            .map(|p| {
                let id = resolve(bank, &p.model)?;
                let grid = PoseGrid::for_model(bounds, &self.search, bank.model(id));
                let pose = ContPose::new(p.x, p.y, p.yaw);
                Ok(ObjectState::new(id, pose, grid.disc(pose)))
            })
            .collect()
    }

    /// Constraint cloud from `observation.constraint`.
    pub fn constraint_points(&self) -> Vec<Point3<f32>> {
        self.observation
            .constraint
            .iter()
            .map(|&[x, y, z]| Point3::new(x, y, z))
            .collect()
    }

    /// Detections for the detection heuristic.
    pub fn detections(&self, bank: &ModelBank) -> Result<Vec<Detection>, ConfigLoadError> {
        self.heuristics
            .detections
            .iter()
            .map(|d: &PlacementSettings| {
                Ok(Detection::new(resolve(bank, &d.model)?, Point2D::new(d.x, d.y)))
            })
            .collect()
    }

    /// Convert to the environment settings
    pub fn to_env_config(&self) -> EnvConfig {
        EnvConfig {
            bounds: self.scene.bounds(),
            table_height: self.scene.table_height,
            search: self.search.clone(),
            cost: self.cost.clone(),
            refinement: self.refinement.clone(),
            dispatch: self.dispatch.clone(),
        }
    }
}

fn resolve(bank: &ModelBank, name: &str) -> Result<ModelId, ConfigLoadError> {
    bank.id_of(name)
        .ok_or_else(|| ConfigLoadError::Invalid(format!("unknown model '{name}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [scene]
        x_min = 0.0
        x_max = 0.4
        y_min = -0.2
        y_max = 0.2
        models = ["crate"]

        [scene.camera]
        position = [-0.6, 0.0, 0.9]
        look_at = [0.2, 0.0, 0.0]
        width = 64
        height = 48
        fx = 80.0
        fy = 80.0
        cx = 32.0
        cy = 24.0

        [[models]]
        name = "crate"
        width = 0.1
        depth = 0.1
        height = 0.1

        [[observation.ground_truth]]
        model = "crate"
        x = 0.2
        y = 0.1
    "#;

    #[test]
    fn test_minimal_config() {
        let config = DrishtiConfig::from_toml(MINIMAL).unwrap();
        assert_eq!(config.search.resolution, 0.05);
        assert_eq!(config.dispatch.num_workers, 1);
        assert!(config.refinement.enabled);
        let bank = config.build_model_bank().unwrap();
        assert_eq!(
            config.scene_model_ids(&bank).unwrap(),
            vec![ModelId::new(0)]
        );
        let truth = config.ground_truth(&bank).unwrap();
        assert_eq!(truth[0].disc_pose().x, 4);
        assert_eq!(truth[0].disc_pose().y, 6);
        assert_eq!(config.output.scene_id, "scene");
    }

    #[test]
    fn test_observed_cloud_options() {
        let text = MINIMAL.replace(
            "[[models]]",
            "[search]\nuse_adaptive_resolution = true\n\n\
             [cost]\nuse_downsampling = true\ndownsampling_leaf_size = 0.02\n\
             min_points_for_constraint_cloud = 4\n\n\
             [observation]\nconstraint = [[0.2, 0.1, 0.05], [0.21, 0.1, 0.05]]\n\n[[models]]",
        );
        let config = DrishtiConfig::from_toml(&text).unwrap();
        assert!(config.search.use_adaptive_resolution);
        assert!(config.cost.use_downsampling);
        assert_eq!(config.cost.downsampling_leaf_size, 0.02);
        assert_eq!(config.cost.min_points_for_constraint_cloud, 4);
        let constraint = config.constraint_points();
        assert_eq!(constraint.len(), 2);
        assert_eq!(constraint[1], Point3::new(0.21, 0.1, 0.05));

        let bad = text.replace(
            "downsampling_leaf_size = 0.02",
            "downsampling_leaf_size = 0.0",
        );
        assert!(matches!(
            DrishtiConfig::from_toml(&bad),
            Err(ConfigLoadError::Invalid(_))
        ));
    }

    #[test]
    fn test_unknown_scene_model() {
        let text = MINIMAL.replace(r#"models = ["crate"]"#, r#"models = ["barrel"]"#);
        assert!(matches!(
            DrishtiConfig::from_toml(&text),
            Err(ConfigLoadError::Invalid(_))
        ));
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            DrishtiConfig::from_toml("[scene"),
            Err(ConfigLoadError::Parse(_))
        ));
    }

    #[test]
    fn test_inverted_bounds() {
        let text = MINIMAL.replace("x_max = 0.4", "x_max = -0.4");
        assert!(DrishtiConfig::from_toml(&text).is_err());
    }

    #[test]
    fn test_missing_observation() {
        let text = MINIMAL.split("[[observation.ground_truth]]").next().unwrap().to_string();
        assert!(matches!(
            DrishtiConfig::from_toml(&text),
            Err(ConfigLoadError::Invalid(_))
        ));
    }
}
