//! Cost model and refinement configuration.

use serde::{Deserialize, Serialize};

use crate::refine::IcpConfig;

/// Configuration for the render-and-compare cost terms.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CostConfig {
    /// Distance within which a rendered and an observed point explain each
    /// other (meters).
    #[serde(default = "default_sensor_resolution")]
    pub sensor_resolution: f32,

    /// Minimum number of unclaimed observed points inside a candidate's
    /// inflated footprint for the placement to be considered.
    #[serde(default = "default_min_neighbor_points")]
    pub min_neighbor_points_for_valid_pose: usize,

    /// When the observation carries a constraint cloud, minimum number of
    /// its points inside a candidate's inflated footprint.
    #[serde(default = "default_min_constraint_points")]
    pub min_points_for_constraint_cloud: usize,

    /// Two placed objects collide when their centers are closer than this
    /// fraction of the sum of their inscribed radii.
    #[serde(default = "default_footprint_tolerance")]
    pub footprint_tolerance: f32,

    /// In clutter mode, an unexplained rendered point whose observed depth
    /// is nearer by more than this is attributed to an occluder (meters).
    #[serde(default = "default_occlusion_threshold")]
    pub occlusion_threshold: f32,

    /// Tolerate occluders instead of charging every unexplained point.
    #[serde(default)]
    pub use_clutter_mode: bool,

    /// Cost per occluder point in clutter mode (0 = free, 1 = same as an
    /// unexplained point).
    #[serde(default = "default_clutter_regularizer")]
    pub clutter_regularizer: f32,

    /// Require color agreement for a point to count as explained.
    #[serde(default)]
    pub use_color_cost: bool,

    /// Maximum CIE76 ΔE between matching rendered and observed colors.
    #[serde(default = "default_color_distance_threshold")]
    pub color_distance_threshold: f32,

    /// With color cost enabled, single-object placements whose color
    /// histogram similarity to the observation is below this are invalid.
    #[serde(default = "default_min_histogram_score")]
    pub min_histogram_score: f32,

    /// Observed points closer than this to the support plane are dropped
    /// (meters).
    #[serde(default = "default_table_clearance")]
    pub table_clearance: f32,

    /// Thin the observed cloud to one point per voxel before costing.
    #[serde(default)]
    pub use_downsampling: bool,

    /// Voxel side for downsampling (meters).
    #[serde(default = "default_downsampling_leaf_size")]
    pub downsampling_leaf_size: f32,
}

fn default_sensor_resolution() -> f32 {
    0.01
}
fn default_min_neighbor_points() -> usize {
    10
}
fn default_min_constraint_points() -> usize {
    10
}
fn default_footprint_tolerance() -> f32 {
    0.8
}
fn default_occlusion_threshold() -> f32 {
    0.02
}
fn default_clutter_regularizer() -> f32 {
    0.5
}
fn default_color_distance_threshold() -> f32 {
    20.0
}
fn default_min_histogram_score() -> f32 {
    0.3
}
fn default_table_clearance() -> f32 {
    0.005
}
fn default_downsampling_leaf_size() -> f32 {
    0.01
}

impl Default for CostConfig {
    fn default() -> Self {
        Self {
            sensor_resolution: default_sensor_resolution(),
            min_neighbor_points_for_valid_pose: default_min_neighbor_points(),
            min_points_for_constraint_cloud: default_min_constraint_points(),
            footprint_tolerance: default_footprint_tolerance(),
            occlusion_threshold: default_occlusion_threshold(),
            use_clutter_mode: false,
            clutter_regularizer: default_clutter_regularizer(),
            use_color_cost: false,
            color_distance_threshold: default_color_distance_threshold(),
            min_histogram_score: default_min_histogram_score(),
            table_clearance: default_table_clearance(),
            use_downsampling: false,
            downsampling_leaf_size: default_downsampling_leaf_size(),
        }
    }
}

/// Configuration for pose refinement of newly placed objects.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RefinementConfig {
    /// Whether refinement runs at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Iteration cap for the refinement oracle.
    #[serde(default = "default_max_icp_iterations")]
    pub max_icp_iterations: u32,

    /// Maximum correspondence distance (meters). Also how far beyond the
    /// object's reach observed points are gathered as the target.
    #[serde(default = "default_icp_max_correspondence")]
    pub icp_max_correspondence: f32,

    /// Translation convergence threshold (meters).
    #[serde(default = "default_translation_epsilon")]
    pub translation_epsilon: f32,

    /// Rotation convergence threshold (radians).
    #[serde(default = "default_rotation_epsilon")]
    pub rotation_epsilon: f32,

    /// Minimum correspondences for a refinement step.
    #[serde(default = "default_min_correspondences")]
    pub min_correspondences: usize,

    /// Refined poses moving farther than this from the grid pose are
    /// rejected (meters).
    #[serde(default = "default_max_translation")]
    pub max_translation: f32,

    /// Refined poses rotating more than this are rejected (radians).
    #[serde(default = "default_max_rotation")]
    pub max_rotation: f32,
}

fn default_true() -> bool {
    true
}
fn default_max_icp_iterations() -> u32 {
    20
}
fn default_icp_max_correspondence() -> f32 {
    0.05
}
fn default_translation_epsilon() -> f32 {
    0.0005
}
fn default_rotation_epsilon() -> f32 {
    0.001
}
fn default_min_correspondences() -> usize {
    10
}
fn default_max_translation() -> f32 {
    0.05
}
fn default_max_rotation() -> f32 {
    0.3
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_icp_iterations: default_max_icp_iterations(),
            icp_max_correspondence: default_icp_max_correspondence(),
            translation_epsilon: default_translation_epsilon(),
            rotation_epsilon: default_rotation_epsilon(),
            min_correspondences: default_min_correspondences(),
            max_translation: default_max_translation(),
            max_rotation: default_max_rotation(),
        }
    }
}

impl RefinementConfig {
    /// Refinement disabled.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Whether refinement should run.
    pub fn is_active(&self) -> bool {
        self.enabled && self.max_icp_iterations > 0
    }

    /// Parameters for the bundled [`crate::refine::PlanarIcp`].
    pub fn icp_config(&self) -> IcpConfig {
        IcpConfig {
            max_iterations: self.max_icp_iterations,
            translation_epsilon: self.translation_epsilon,
            rotation_epsilon: self.rotation_epsilon,
            max_correspondence_distance: self.icp_max_correspondence,
            min_correspondences: self.min_correspondences,
            ..IcpConfig::default()
        }
    }
}
