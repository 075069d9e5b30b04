//! Observed scene: the input depth/color frame and the cloud derived from it.
//!
//! The observed depth image is back-projected through the scene camera and
//! cropped to the points that can belong to an object: above the support
//! plane (by a clearance) and inside the crop region on the plane. Costs are
//! counted over this cloud, so its size is the unit of the last-level term.
//! The cloud may be thinned with [`ObservedScene::downsampled`] to one point
//! per voxel.
//!
//! An observation may also carry a *constraint cloud*: points known to be
//! occupied by some object. Its plane projection is indexed separately and
//! used by placement validity, never by the cost terms.

mod counted;
mod spatial;

pub use counted::CountedSet;
pub use spatial::SpatialIndex;

use std::collections::HashMap;

use nalgebra::{Point3, Vector3};

use crate::core::{Bounds, Camera, ColorImage, DepthImage, Point2D, Rgb, depth_to_meters};
use crate::error::{Error, Result};
use crate::render::RenderOracle;
use crate::state::ObjectState;

/// Sentinel in the pixel-to-point map.
const NO_POINT: u32 = u32::MAX;

/// Raw input frame.
#[derive(Clone, Debug, PartialEq)]
pub struct Observation {
    /// Observed depth (millimeters)
    pub depth: DepthImage,
    /// Observed color, if the sensor provides it
    pub color: Option<ColorImage>,
    /// Points that must be enclosed by placed objects (world frame)
    pub constraint: Vec<Point3<f32>>,
}

impl Observation {
    /// Wrap a depth image and optional color image.
    pub fn new(depth: DepthImage, color: Option<ColorImage>) -> Self {
        Self {
            depth,
            color,
            constraint: Vec::new(),
        }
    }

    /// Attach a constraint cloud.
    pub fn with_constraint(mut self, constraint: Vec<Point3<f32>>) -> Self {
        self.constraint = constraint;
        self
    }

    /// Render a ground-truth placement to use as the observation.
    pub fn synthesize(renderer: &dyn RenderOracle, objects: &[ObjectState]) -> Result<Self> {
        let rendering = renderer.render(objects)?;
        Ok(Self::new(rendering.depth, Some(rendering.color)))
    }
}

/// One observed point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ObservedPoint {
    /// World position
    pub position: Point3<f32>,
    /// Linear pixel index in the observed image
    pub pixel: usize,
    /// Observed color (black without a color image)
    pub color: Rgb,
}

/// Observed cloud with spatial indices.
pub struct ObservedScene {
    depth: DepthImage,
    color: Option<ColorImage>,
    points: Vec<ObservedPoint>,
    pixel_to_point: Vec<u32>,
    index: SpatialIndex<3>,
    plane_index: SpatialIndex<2>,
    constraint: Vec<Point2D>,
    constraint_index: SpatialIndex<2>,
}

impl ObservedScene {
    /// Back-project and crop an observation.
    ///
    /// # Arguments
    /// * `observation` - Input frame; must match the camera resolution
    /// * `camera` - Scene camera
    /// * `crop` - Region on the plane that may contain object points
    /// * `table_height` - Support plane height
    /// * `table_clearance` - Points closer than this to the plane are dropped
    pub fn new(
        observation: Observation,
        camera: &Camera,
        crop: Bounds,
        table_height: f32,
        table_clearance: f32,
    ) -> Result<Self> {
        let (width, height) = (camera.width(), camera.height());
        if observation.depth.width() != width || observation.depth.height() != height {
            return Err(Error::InvalidImage(format!(
                "observed depth is {}x{}, camera is {}x{}",
                observation.depth.width(),
                observation.depth.height(),
                width,
                height
            )));
        }
        if let Some(color) = &observation.color {
            if color.width() != width || color.height() != height {
                return Err(Error::InvalidImage(format!(
                    "observed color is {}x{}, camera is {}x{}",
                    color.width(),
                    color.height(),
                    width,
                    height
                )));
            }
        }

        let mut points = Vec::new();
        for pixel in observation.depth.valid_pixels() {
            let (u, v) = (pixel % width, pixel / width);
            let position = camera.back_project(u, v, depth_to_meters(observation.depth.get(pixel)));
            if position.z < table_height + table_clearance
                || !crop.contains(Point2D::new(position.x, position.y))
            {
                continue;
            }
            let color = observation
                .color
                .as_ref()
                .map_or([0, 0, 0], |c| c.get(pixel));
            points.push(ObservedPoint {
                position,
                pixel,
                color,
            });
        }

        log::info!(
            "Observed cloud: {} points from {} valid pixels",
            points.len(),
            observation.depth.valid_count()
        );
        let constraint = observation
            .constraint
            .iter()
            .map(|p| Point2D::new(p.x, p.y))
            .collect();
        Ok(Self::from_points(
            observation.depth,
            observation.color,
            points,
            constraint,
        ))
    }

    fn from_points(
        depth: DepthImage,
        color: Option<ColorImage>,
        points: Vec<ObservedPoint>,
        constraint: Vec<Point2D>,
    ) -> Self {
        let mut pixel_to_point = vec![NO_POINT; depth.width() * depth.height()];
        for (i, p) in points.iter().enumerate() {
            pixel_to_point[p.pixel] = i as u32;
        }
        let coords: Vec<[f32; 3]> = points
            .iter()
            .map(|p| [p.position.x, p.position.y, p.position.z])
            .collect();
        let plane: Vec<[f32; 2]> = points
            .iter()
            .map(|p| [p.position.x, p.position.y])
            .collect();
        let constraint_plane: Vec<[f32; 2]> = constraint.iter().map(|p| [p.x, p.y]).collect();

        Self {
            index: SpatialIndex::build(&coords),
            plane_index: SpatialIndex::build(&plane),
            constraint_index: SpatialIndex::build(&constraint_plane),
            depth,
            color,
            points,
            pixel_to_point,
            constraint,
        }
    }

    /// Keep one point per cubic voxel of side `leaf_size`: the one nearest
    /// the centroid of the voxel's points. Kept points stay in pixel order.
    pub fn downsampled(self, leaf_size: f32) -> Self {
        if !(leaf_size > 0.0) {
            return self;
        }
        let voxel = |p: &Point3<f32>| {
            (
                (p.x / leaf_size).floor() as i32,
                (p.y / leaf_size).floor() as i32,
                (p.z / leaf_size).floor() as i32,
            )
        };

        let mut centroids: HashMap<(i32, i32, i32), (Vector3<f32>, usize)> = HashMap::new();
        for p in &self.points {
            let entry = centroids
                .entry(voxel(&p.position))
                .or_insert((Vector3::zeros(), 0));
            entry.0 += p.position.coords;
            entry.1 += 1;
        }
        let mut nearest: HashMap<(i32, i32, i32), (usize, f32)> = HashMap::new();
        for (i, p) in self.points.iter().enumerate() {
            let key = voxel(&p.position);
            let Some(&(sum, count)) = centroids.get(&key) else {
                continue;
            };
            let centroid = Point3::from(sum / count as f32);
            let d2 = (p.position - centroid).norm_squared();
            let best = nearest.entry(key).or_insert((i, d2));
            if d2 < best.1 {
                *best = (i, d2);
            }
        }

        let mut keep: Vec<usize> = nearest.into_values().map(|(i, _)| i).collect();
        keep.sort_unstable();
        log::info!(
            "Downsampled observed cloud to {} of {} points (leaf {} m)",
            keep.len(),
            self.points.len(),
            leaf_size
        );
        let points = keep.into_iter().map(|i| self.points[i]).collect();
        Self::from_points(self.depth, self.color, points, self.constraint)
    }

    /// Number of observed points
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the cloud is empty
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// All points
    pub fn points(&self) -> &[ObservedPoint] {
        &self.points
    }

    /// Point by index
    pub fn point(&self, index: usize) -> &ObservedPoint {
        &self.points[index]
    }

    /// Cloud index of the point observed at `pixel`, if it survived cropping.
    pub fn point_at_pixel(&self, pixel: usize) -> Option<usize> {
        match self.pixel_to_point.get(pixel) {
            Some(&i) if i != NO_POINT => Some(i as usize),
            _ => None,
        }
    }

    /// Raw observed depth image
    pub fn depth(&self) -> &DepthImage {
        &self.depth
    }

    /// Raw observed color image
    pub fn color(&self) -> Option<&ColorImage> {
        self.color.as_ref()
    }

    /// Whether observed colors are available
    pub fn has_color(&self) -> bool {
        self.color.is_some()
    }

    /// 3D spatial index over the cloud
    pub fn index(&self) -> &SpatialIndex<3> {
        &self.index
    }

    /// Indices of points whose plane projection lies within `radius` of `center`.
    pub fn points_near(&self, center: Point2D, radius: f32) -> Vec<usize> {
        self.plane_index.within(&[center.x, center.y], radius)
    }

    /// Whether a constraint cloud was given
    pub fn has_constraint(&self) -> bool {
        !self.constraint.is_empty()
    }

    /// Projected constraint points
    pub fn constraint(&self) -> &[Point2D] {
        &self.constraint
    }

    /// Indices of projected constraint points within `radius` of `center`.
    pub fn constraint_near(&self, center: Point2D, radius: f32) -> Vec<usize> {
        self.constraint_index.within(&[center.x, center.y], radius)
    }
}
