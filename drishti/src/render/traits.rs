//! Render oracle interface.
//!
//! The search environment never rasterizes geometry itself; it asks a
//! [`RenderOracle`] for depth/color images of posed models. Implementations
//! may be a CPU ray caster, an OpenGL context or a GPU batch renderer.

use std::ops::Range;

use nalgebra::Point3;

use crate::core::{Camera, ColorImage, DepthImage, depth_to_meters};
use crate::error::Result;
use crate::state::ObjectState;

/// Depth and color rendering of a set of posed objects.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Rendering {
    /// Depth in millimeters
    pub depth: DepthImage,
    /// Color
    pub color: ColorImage,
}

impl Rendering {
    /// A rendering with no surfaces
    pub fn blank(width: usize, height: usize) -> Self {
        Self {
            depth: DepthImage::empty(width, height),
            color: ColorImage::empty(width, height),
        }
    }

    /// Whether the rendering matches the camera resolution
    pub fn matches(&self, camera: &Camera) -> bool {
        self.depth.width() == camera.width()
            && self.depth.height() == camera.height()
            && self.color.width() == camera.width()
            && self.color.height() == camera.height()
    }
}

/// A back-projected rendered pixel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderedPoint {
    /// World position
    pub position: Point3<f32>,
    /// Linear pixel index
    pub pixel: usize,
}

/// Back-project every pixel with depth, in ascending pixel order.
pub fn back_project(camera: &Camera, depth: &DepthImage) -> Vec<RenderedPoint> {
    let width = camera.width();
    depth
        .valid_pixels()
        .map(|pixel| RenderedPoint {
            position: camera.back_project(
                pixel % width,
                pixel / width,
                depth_to_meters(depth.get(pixel)),
            ),
            pixel,
        })
        .collect()
}

/// Result of rendering many single-object placements in one call.
#[derive(Clone, Debug)]
pub struct BatchRendering {
    /// One rendering per placement, in request order
    pub renderings: Vec<Rendering>,
    /// Back-projected points of all placements, concatenated
    pub points: Vec<RenderedPoint>,
    /// Range of `points` belonging to each placement
    pub ranges: Vec<Range<usize>>,
}

impl BatchRendering {
    /// Points attributable to placement `i`; `None` if the batch has no
    /// valid range for it.
    pub fn points_for(&self, i: usize) -> Option<&[RenderedPoint]> {
        self.ranges
            .get(i)
            .and_then(|range| self.points.get(range.clone()))
    }

    /// Assemble a batch from individual renderings.
    pub fn from_renderings(camera: &Camera, renderings: Vec<Rendering>) -> Self {
        let mut points = Vec::new();
        let mut ranges = Vec::with_capacity(renderings.len());
        for rendering in &renderings {
            let start = points.len();
            points.extend(back_project(camera, &rendering.depth));
            ranges.push(start..points.len());
        }
        Self {
            renderings,
            points,
            ranges,
        }
    }
}

/// Renders posed object models to depth and color images.
///
/// Implementations must not mutate caller geometry and must produce the same
/// image for the same input regardless of call history.
pub trait RenderOracle: Send + Sync {
    /// Camera the images are rendered from.
    fn camera(&self) -> &Camera;

    /// Render every object in `objects` into one image.
    ///
    /// # Arguments
    /// * `objects` - Posed objects (continuous poses are used)
    ///
    /// # Returns
    /// Composed depth/color rendering, or an error if the oracle failed
    fn render(&self, objects: &[ObjectState]) -> Result<Rendering>;

    /// Render each placement on its own, in one call.
    ///
    /// Semantics are identical to calling [`RenderOracle::render`] once per
    /// placement.
    fn render_batch(&self, placements: &[ObjectState]) -> Result<BatchRendering> {
        let renderings = placements
            .iter()
            .map(|p| self.render(std::slice::from_ref(p)))
            .collect::<Result<Vec<_>>>()?;
        Ok(BatchRendering::from_renderings(self.camera(), renderings))
    }

    /// Name for logging
    fn name(&self) -> &str;
}
