//! CPU reference renderer for prism models.
//!
//! Every model is an upright extrusion of its convex footprint from the
//! support plane to the model height. A pixel's ray is clipped against the
//! prism's half-spaces (Cyrus-Beck); the entry parameter is the optical depth
//! because camera rays are scaled to unit camera-frame Z.
//!
//! # Algorithm
//!
//! For each object:
//! 1. Project the prism corners to find the pixel box it can cover
//! 2. For each pixel in the box, transform the ray into the model frame
//! 3. Clip against the top, bottom and side planes
//! 4. Z-buffer the hit into the leased scratch target
//!
//! Batched rendering runs placements data-parallel with rayon; each task
//! leases its own scratch target.

use std::sync::Arc;

use nalgebra::{Point3, Vector3};
use rayon::prelude::*;

use crate::core::{Camera, ColorImage, ContPose, DepthImage, MAX_DEPTH_M, meters_to_depth};
use crate::error::{Error, Result};
use crate::model::{ModelBank, ObjectModel};
use crate::state::ObjectState;

use super::scratch::ScratchPool;
use super::traits::{BatchRendering, RenderOracle, Rendering};

/// Ray-casting renderer over a [`ModelBank`].
pub struct RaycastRenderer {
    camera: Camera,
    models: Arc<ModelBank>,
    table_height: f32,
    pool: ScratchPool,
}

/// Pixel rectangle `[u0, u1) × [v0, v1)`.
struct PixelBox {
    u0: usize,
    u1: usize,
    v0: usize,
    v1: usize,
}

impl RaycastRenderer {
    /// Create a renderer.
    pub fn new(camera: Camera, models: Arc<ModelBank>, table_height: f32) -> Self {
        let pool = ScratchPool::new(camera.num_pixels());
        Self {
            camera,
            models,
            table_height,
            pool,
        }
    }

    /// Pixel box covered by the prism, or the full image if a corner is
    /// behind the camera.
    fn pixel_box(&self, model: &ObjectModel, pose: ContPose) -> PixelBox {
        let (w, h) = (self.camera.width(), self.camera.height());
        let full = PixelBox {
            u0: 0,
            u1: w,
            v0: 0,
            v1: h,
        };
        let (mut u_min, mut u_max) = (f32::INFINITY, f32::NEG_INFINITY);
        let (mut v_min, mut v_max) = (f32::INFINITY, f32::NEG_INFINITY);
        for corner in model.world_footprint(pose) {
            for z in [self.table_height, self.table_height + model.height()] {
                let Some((u, v, _)) = self.camera.project(&Point3::new(corner.x, corner.y, z))
                else {
                    return full;
                };
                u_min = u_min.min(u);
                u_max = u_max.max(u);
                v_min = v_min.min(v);
                v_max = v_max.max(v);
            }
        }
        let clamp = |x: f32, hi: usize| (x.max(0.0) as usize).min(hi);
        PixelBox {
            u0: clamp(u_min.floor() - 1.0, w),
            u1: clamp(u_max.ceil() + 1.0, w),
            v0: clamp(v_min.floor() - 1.0, h),
            v1: clamp(v_max.ceil() + 1.0, h),
        }
    }

    /// Ray entry depth into the prism, if the ray hits it in front of the camera.
    fn intersect(
        &self,
        model: &ObjectModel,
        pose: ContPose,
        origin: &Point3<f32>,
        dir: &Vector3<f32>,
    ) -> Option<f32> {
        let (sin, cos) = pose.yaw.sin_cos();
        // Ray in the model frame (rigid, so the parameter is preserved)
        let dx = origin.x - pose.x;
        let dy = origin.y - pose.y;
        let ox = dx * cos + dy * sin;
        let oy = -dx * sin + dy * cos;
        let rx = dir.x * cos + dir.y * sin;
        let ry = -dir.x * sin + dir.y * cos;

        let mut t_enter = f32::NEG_INFINITY;
        let mut t_exit = f32::INFINITY;
        let mut clip = |denom: f32, num: f32| -> bool {
            // Half-space n·p <= c, with denom = n·dir and num = c - n·origin
            if denom.abs() < 1e-12 {
                return num >= 0.0;
            }
            let t = num / denom;
            if denom < 0.0 {
                t_enter = t_enter.max(t);
            } else {
                t_exit = t_exit.min(t);
            }
            t_enter <= t_exit
        };

        let z_bottom = self.table_height;
        let z_top = self.table_height + model.height();
        if !clip(-dir.z, origin.z - z_bottom) || !clip(dir.z, z_top - origin.z) {
            return None;
        }
        for (a, b) in model.footprint().edges() {
            let (nx, ny) = (b.y - a.y, -(b.x - a.x));
            let c = nx * a.x + ny * a.y;
            if !clip(nx * rx + ny * ry, c - (nx * ox + ny * oy)) {
                return None;
            }
        }
        (t_enter <= t_exit && t_enter > 0.0 && t_enter < MAX_DEPTH_M).then_some(t_enter)
    }
}

impl RenderOracle for RaycastRenderer {
    fn camera(&self) -> &Camera {
        &self.camera
    }

    fn render(&self, objects: &[ObjectState]) -> Result<Rendering> {
        let width = self.camera.width();
        let origin = self.camera.origin();
        let mut target = self.pool.lease();

        for object in objects {
            let model = self
                .models
                .get(object.model())
                .ok_or_else(|| Error::Render(format!("unknown {}", object.model())))?;
            let pose = object.cont_pose();
            let color = model.color();
            let bbox = self.pixel_box(model, pose);
            for v in bbox.v0..bbox.v1 {
                for u in bbox.u0..bbox.u1 {
                    let dir = self.camera.ray_direction(u, v);
                    if let Some(t) = self.intersect(model, pose, &origin, &dir) {
                        let d = meters_to_depth(t);
                        let pixel = v * width + u;
                        if d < target.depth[pixel] {
                            target.depth[pixel] = d;
                            target.color[pixel] = color;
                        }
                    }
                }
            }
        }

        // Copy out before the lease returns the buffers to the pool
        let (w, h) = (self.camera.width(), self.camera.height());
        let depth = DepthImage::from_raw(w, h, target.depth.clone())
            .ok_or_else(|| Error::Render("scratch depth buffer has wrong size".into()))?;
        let color = ColorImage::from_raw(w, h, target.color.clone())
            .ok_or_else(|| Error::Render("scratch color buffer has wrong size".into()))?;
        Ok(Rendering { depth, color })
    }

    fn render_batch(&self, placements: &[ObjectState]) -> Result<BatchRendering> {
        let renderings = placements
            .par_iter()
            .map(|p| self.render(std::slice::from_ref(p)))
            .collect::<Result<Vec<_>>>()?;
        Ok(BatchRendering::from_renderings(&self.camera, renderings))
    }

    fn name(&self) -> &str {
        "raycast"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CameraIntrinsics, DiscPose, NO_DEPTH, depth_to_meters};
    use crate::model::{ModelId, ObjectModel};

    fn renderer() -> RaycastRenderer {
        let mut bank = ModelBank::new();
        bank.add(ObjectModel::cuboid("box", 0.2, 0.2, 0.2, [200, 10, 10]).unwrap())
            .unwrap();
        bank.add(ObjectModel::cuboid("slab", 0.1, 0.3, 0.05, [10, 10, 200]).unwrap())
            .unwrap();
        let k = CameraIntrinsics {
            fx: 40.0,
            fy: 40.0,
            cx: 16.0,
            cy: 16.0,
            width: 32,
            height: 32,
        };
        let camera =
            Camera::look_at(k, Point3::new(0.0, 0.0, 1.0), Point3::new(0.0, 0.0, 0.0)).unwrap();
        RaycastRenderer::new(camera, Arc::new(bank), 0.0)
    }

    fn object(model: u32, x: f32, y: f32) -> ObjectState {
        ObjectState::new(
            ModelId::new(model),
            ContPose::new(x, y, 0.0),
            DiscPose::default(),
        )
    }

    #[test]
    fn test_top_face_depth() {
        let r = renderer();
        let img = r.render(&[object(0, 0.0, 0.0)]).unwrap();
        let center = 16 * 32 + 16;
        assert!((depth_to_meters(img.depth.get(center)) - 0.8).abs() < 2e-3);
        assert_eq!(img.color.get(center), [200, 10, 10]);
        assert_eq!(img.depth.get(0), NO_DEPTH);
    }

    #[test]
    fn test_nearer_object_wins() {
        let r = renderer();
        let img = r.render(&[object(1, 0.0, 0.0), object(0, 0.0, 0.0)]).unwrap();
        let center = 16 * 32 + 16;
        assert_eq!(img.color.get(center), [200, 10, 10]);
    }

    #[test]
    fn test_empty_scene_is_blank() {
        let r = renderer();
        assert!(r.render(&[]).unwrap().depth.is_blank());
    }

    #[test]
    fn test_unknown_model_is_error() {
        let r = renderer();
        assert!(matches!(r.render(&[object(7, 0.0, 0.0)]), Err(Error::Render(_))));
    }

    #[test]
    fn test_batch_matches_single_renders() {
        let r = renderer();
        let placements = [object(0, 0.0, 0.0), object(1, 0.1, -0.1), object(0, 0.2, 0.1)];
        let batch = r.render_batch(&placements).unwrap();
        assert_eq!(batch.renderings.len(), 3);
        for (i, p) in placements.iter().enumerate() {
            let single = r.render(std::slice::from_ref(p)).unwrap();
            assert_eq!(batch.renderings[i], single);
            assert_eq!(batch.points_for(i).unwrap().len(), single.depth.valid_count());
        }
    }
}
