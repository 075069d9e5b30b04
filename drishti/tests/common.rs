//! Shared two-box tabletop scene for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use drishti::{
    DrishtiConfig, ModelBank, ObjectRecognitionEnv, ObjectState, Observation, PlanarIcp,
    RaycastRenderer,
};

/// Two boxes side by side in front of the camera, on a 0.1 m grid with
/// quarter-turn yaw steps.
pub const SCENE: &str = r#"
[scene]
x_min = 0.0
x_max = 0.4
y_min = -0.2
y_max = 0.2
table_height = 0.0
models = ["box_a", "box_b"]

[scene.camera]
position = [-0.6, 0.0, 0.9]
look_at = [0.2, 0.0, 0.0]
width = 64
height = 48
fx = 80.0
fy = 80.0
cx = 32.0
cy = 24.0

[search]
resolution = 0.1
theta_resolution = 1.5707964

[cost]
table_clearance = 0.0

[refinement]
enabled = false

[[models]]
name = "box_a"
width = 0.1
depth = 0.1
height = 0.1
color = [200, 40, 40]

[[models]]
name = "box_b"
width = 0.08
depth = 0.12
height = 0.08
color = [40, 40, 200]

[[observation.ground_truth]]
model = "box_a"
x = 0.2
y = 0.1

[[observation.ground_truth]]
model = "box_b"
x = 0.2
y = -0.1
"#;

/// Parse the shared scene.
pub fn config() -> DrishtiConfig {
    DrishtiConfig::from_toml(SCENE).expect("scene config should parse")
}

/// Scene config with a different worker count.
pub fn config_with_workers(workers: usize) -> DrishtiConfig {
    let mut config = config();
    config.dispatch.num_workers = workers;
    config
}

pub struct Scene {
    pub models: Arc<ModelBank>,
    pub renderer: Arc<RaycastRenderer>,
    pub truth: Vec<ObjectState>,
}

impl Scene {
    pub fn new(config: &DrishtiConfig) -> Self {
        let models = Arc::new(config.build_model_bank().unwrap());
        let renderer = Arc::new(RaycastRenderer::new(
            config.camera().unwrap(),
            Arc::clone(&models),
            config.scene.table_height,
        ));
        let truth = config.ground_truth(&models).unwrap();
        Self {
            models,
            renderer,
            truth,
        }
    }

    /// Observation rendered from the ground truth.
    pub fn observation(&self) -> Observation {
        Observation::synthesize(self.renderer.as_ref(), &self.truth).unwrap()
    }

    pub fn env(&self, config: &DrishtiConfig, observation: Observation) -> ObjectRecognitionEnv {
        ObjectRecognitionEnv::new(
            config.to_env_config(),
            Arc::clone(&self.models),
            config.scene_model_ids(&self.models).unwrap(),
            self.renderer.clone(),
            Arc::new(PlanarIcp::new(config.refinement.icp_config())),
            observation,
        )
        .unwrap()
    }
}

/// Environment over the synthesized two-box observation.
pub fn build_env(config: &DrishtiConfig) -> ObjectRecognitionEnv {
    let scene = Scene::new(config);
    let observation = scene.observation();
    scene.env(config, observation)
}
