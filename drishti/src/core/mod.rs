//! Core geometry and image types.
//!
//! - [`Point2D`], [`Bounds`]: support-plane geometry
//! - [`ContPose`], [`DiscPose`]: continuous and grid poses of an object
//! - [`Camera`]: pinhole camera shared by rendering and back-projection
//! - [`DepthImage`], [`ColorImage`]: rendered and observed buffers
//! - [`color`]: Lab color distance and histograms

mod bounds;
mod camera;
pub mod color;
mod image;
pub mod math;
mod point;
mod pose;

pub use bounds::Bounds;
pub use camera::{Camera, CameraIntrinsics};
pub use image::{
    ColorImage, DepthImage, MAX_DEPTH_M, NO_DEPTH, Rgb, compose, depth_to_meters, meters_to_depth,
    new_pixels, occlusion_conflicts,
};
pub use point::Point2D;
pub use pose::{ContPose, DiscPose};
