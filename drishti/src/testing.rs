//! Two-box tabletop scene shared by unit tests.

use std::f32::consts::FRAC_PI_2;
use std::sync::Arc;

use nalgebra::Point3;

use crate::core::{Bounds, Camera, CameraIntrinsics, ContPose, DiscPose};
use crate::cost::{CostConfig, CostEvaluator, RefinementConfig};
use crate::model::{ModelBank, ModelId, ObjectModel};
use crate::observation::{CountedSet, Observation, ObservedScene};
use crate::refine::{PlanarIcp, RefinementOracle};
use crate::render::{RaycastRenderer, RenderOracle};
use crate::state::ObjectState;
use crate::successors::{PlacementValidator, PoseGrid};

pub(crate) const BOX_A: ModelId = ModelId(0);
pub(crate) const BOX_B: ModelId = ModelId(1);

pub(crate) struct Fixture {
    pub models: Arc<ModelBank>,
    pub renderer: Arc<RaycastRenderer>,
    pub observed: Arc<ObservedScene>,
    pub bounds: Bounds,
    pub grid: PoseGrid,
    pub truth: Vec<ObjectState>,
}

pub(crate) fn camera() -> Camera {
    let k = CameraIntrinsics {
        fx: 80.0,
        fy: 80.0,
        cx: 32.0,
        cy: 24.0,
        width: 64,
        height: 48,
    };
    Camera::look_at(k, Point3::new(-0.6, 0.0, 0.9), Point3::new(0.2, 0.0, 0.0)).unwrap()
}

pub(crate) fn models() -> ModelBank {
    let mut bank = ModelBank::new();
    bank.add(ObjectModel::cuboid("box_a", 0.1, 0.1, 0.1, [200, 40, 40]).unwrap())
        .unwrap();
    bank.add(ObjectModel::cuboid("box_b", 0.08, 0.12, 0.08, [40, 40, 200]).unwrap())
        .unwrap();
    bank
}

fn scene_bounds() -> Bounds {
    Bounds::from_limits(0.0, 0.4, -0.2, 0.2)
}

fn grid() -> PoseGrid {
    PoseGrid::new(scene_bounds(), 0.1, FRAC_PI_2, false)
}

impl Fixture {
    pub(crate) fn new() -> Self {
        let grid = grid();
        let a = DiscPose::new(2, 3, 0);
        let b = DiscPose::new(2, 1, 0);
        Self::with_truth(vec![
            ObjectState::new(BOX_A, grid.cont(a), a),
            ObjectState::new(BOX_B, grid.cont(b), b),
        ])
    }

    /// Same scene with box_a standing between grid cells.
    pub(crate) fn off_grid() -> Self {
        let grid = grid();
        let b = DiscPose::new(2, 1, 0);
        Self::with_truth(vec![
            ObjectState::new(
                BOX_A,
                ContPose::new(0.215, 0.11, 0.0),
                DiscPose::new(2, 3, 0),
            ),
            ObjectState::new(BOX_B, grid.cont(b), b),
        ])
    }

    fn with_truth(truth: Vec<ObjectState>) -> Self {
        let models = Arc::new(models());
        let renderer = Arc::new(RaycastRenderer::new(camera(), Arc::clone(&models), 0.0));
        let bounds = scene_bounds();
        let grid = grid();
        let observation = Observation::synthesize(renderer.as_ref(), &truth).unwrap();
        let crop = Bounds::from_limits(-0.2, 0.6, -0.4, 0.4);
        // Synthetic frames carry no table, so keep faces down to the plane
        let observed =
            Arc::new(ObservedScene::new(observation, renderer.camera(), crop, -0.01, 0.0).unwrap());
        Self {
            models,
            renderer,
            observed,
            bounds,
            grid,
            truth,
        }
    }

    pub(crate) fn object(&self, model: ModelId, x: i32, y: i32, yaw: i32) -> ObjectState {
        let disc = DiscPose::new(x, y, yaw);
        ObjectState::new(model, self.grid.cont(disc), disc)
    }

    pub(crate) fn validator(&self, cost: &CostConfig) -> Arc<PlacementValidator> {
        Arc::new(PlacementValidator::new(
            Arc::clone(&self.models),
            Arc::clone(&self.observed),
            self.bounds,
            cost.min_neighbor_points_for_valid_pose,
            cost.min_points_for_constraint_cloud,
            cost.footprint_tolerance,
        ))
    }

    pub(crate) fn evaluator(
        &self,
        cost: CostConfig,
        refinement: RefinementConfig,
        batch_size: Option<usize>,
    ) -> CostEvaluator {
        let refiner = Arc::new(PlanarIcp::new(refinement.icp_config()));
        self.evaluator_with(refiner, cost, refinement, batch_size)
    }

    pub(crate) fn evaluator_with(
        &self,
        refiner: Arc<dyn RefinementOracle>,
        cost: CostConfig,
        refinement: RefinementConfig,
        batch_size: Option<usize>,
    ) -> CostEvaluator {
        let validator = self.validator(&cost);
        CostEvaluator::new(
            Arc::clone(&self.models),
            Arc::clone(&self.observed),
            self.renderer.clone(),
            refiner,
            validator,
            cost,
            refinement,
            0.0,
            self.truth.len(),
            batch_size,
        )
    }

    pub(crate) fn empty_counted(&self) -> CountedSet {
        CountedSet::new(self.observed.len())
    }
}
