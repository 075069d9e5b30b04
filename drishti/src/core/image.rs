//! Depth and color image buffers and the z-buffer composition rules.
//!
//! Depth is stored as fixed-point millimeters in a `u16`, with [`NO_DEPTH`]
//! marking pixels without a return. Images are row-major, `width × height`.

use serde::{Deserialize, Serialize};

/// Depth value for pixels without a surface.
pub const NO_DEPTH: u16 = u16::MAX;

/// Largest representable depth in meters.
pub const MAX_DEPTH_M: f32 = (NO_DEPTH - 1) as f32 / 1000.0;

/// Convert meters to fixed-point millimeters, saturating below [`NO_DEPTH`].
#[inline]
pub fn meters_to_depth(meters: f32) -> u16 {
    let mm = (meters * 1000.0).round();
    mm.clamp(1.0, (NO_DEPTH - 1) as f32) as u16
}

/// Convert fixed-point millimeters back to meters.
#[inline]
pub fn depth_to_meters(depth: u16) -> f32 {
    depth as f32 / 1000.0
}

/// RGB color.
pub type Rgb = [u8; 3];

/// Single-channel depth image.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepthImage {
    width: usize,
    height: usize,
    data: Vec<u16>,
}

impl DepthImage {
    /// Create an image with every pixel set to [`NO_DEPTH`].
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![NO_DEPTH; width * height],
        }
    }

    /// Wrap existing row-major data.
    ///
    /// Returns `None` when the buffer length does not match the dimensions.
    pub fn from_raw(width: usize, height: usize, data: Vec<u16>) -> Option<Self> {
        (data.len() == width * height).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// Width in pixels
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major pixel data
    #[inline]
    pub fn data(&self) -> &[u16] {
        &self.data
    }

    /// Mutable row-major pixel data
    #[inline]
    pub fn data_mut(&mut self) -> &mut [u16] {
        &mut self.data
    }

    /// Depth at a linear pixel index
    #[inline]
    pub fn get(&self, index: usize) -> u16 {
        self.data[index]
    }

    /// Whether the pixel holds a surface
    #[inline]
    pub fn has_depth(&self, index: usize) -> bool {
        self.data[index] != NO_DEPTH
    }

    /// Number of pixels with a surface
    pub fn valid_count(&self) -> usize {
        self.data.iter().filter(|&&d| d != NO_DEPTH).count()
    }

    /// True when no pixel holds a surface
    pub fn is_blank(&self) -> bool {
        self.data.iter().all(|&d| d == NO_DEPTH)
    }

    /// Whether both images have the same dimensions
    #[inline]
    pub fn same_shape(&self, other: &DepthImage) -> bool {
        self.width == other.width && self.height == other.height
    }

    /// Linear pixel indices that hold a surface
    pub fn valid_pixels(&self) -> impl Iterator<Item = usize> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, d)| **d != NO_DEPTH)
            .map(|(i, _)| i)
    }
}

/// Three-channel color image. Pixels without a surface are black.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorImage {
    width: usize,
    height: usize,
    data: Vec<Rgb>,
}

impl ColorImage {
    /// Create a black image
    pub fn empty(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![[0, 0, 0]; width * height],
        }
    }

    /// Wrap existing row-major data.
    pub fn from_raw(width: usize, height: usize, data: Vec<Rgb>) -> Option<Self> {
        (data.len() == width * height).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// Width in pixels
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major pixel data
    #[inline]
    pub fn data(&self) -> &[Rgb] {
        &self.data
    }

    /// Mutable row-major pixel data
    #[inline]
    pub fn data_mut(&mut self) -> &mut [Rgb] {
        &mut self.data
    }

    /// Color at a linear pixel index
    #[inline]
    pub fn get(&self, index: usize) -> Rgb {
        self.data[index]
    }
}

/// Per-pixel z-buffer merge of `top` into `base`.
///
/// Lower depth wins; ties keep the `base` value. Both images must have the
/// same shape.
pub fn compose(
    base_depth: &DepthImage,
    base_color: &ColorImage,
    top_depth: &DepthImage,
    top_color: &ColorImage,
) -> (DepthImage, ColorImage) {
    debug_assert!(base_depth.same_shape(top_depth));
    let mut depth = base_depth.clone();
    let mut color = base_color.clone();
    for (i, &d) in top_depth.data().iter().enumerate() {
        if d < depth.data[i] {
            depth.data[i] = d;
            color.data[i] = top_color.data[i];
        }
    }
    (depth, color)
}

/// Pixels where `object` would overwrite depth already rendered in `parent`.
///
/// These are pixels the parent has already paid for; the added object renders
/// strictly nearer there.
pub fn occlusion_conflicts(parent: &DepthImage, object: &DepthImage) -> Vec<usize> {
    parent
        .data()
        .iter()
        .zip(object.data())
        .enumerate()
        .filter(|(_, (p, o))| **p != NO_DEPTH && **o < **p)
        .map(|(i, _)| i)
        .collect()
}

/// Pixels the added object contributes to the composed image where the parent
/// had no surface.
pub fn new_pixels<'a>(
    parent: &'a DepthImage,
    object: &'a DepthImage,
) -> impl Iterator<Item = usize> + 'a {
    parent
        .data()
        .iter()
        .zip(object.data())
        .enumerate()
        .filter(|(_, (p, o))| **p == NO_DEPTH && **o != NO_DEPTH)
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn depth(data: &[u16]) -> DepthImage {
        DepthImage::from_raw(data.len(), 1, data.to_vec()).unwrap()
    }

    fn colors(n: usize, c: Rgb) -> ColorImage {
        ColorImage::from_raw(n, 1, vec![c; n]).unwrap()
    }

    #[test]
    fn test_meters_roundtrip() {
        assert_eq!(meters_to_depth(1.2345), 1235);
        assert_eq!(meters_to_depth(0.0), 1);
        assert_eq!(meters_to_depth(1e9), NO_DEPTH - 1);
        assert!((depth_to_meters(1500) - 1.5).abs() < 1e-6);
    }

    #[test]
    fn test_from_raw_rejects_wrong_length() {
        assert!(DepthImage::from_raw(2, 2, vec![0; 3]).is_none());
        assert!(ColorImage::from_raw(2, 2, vec![[0; 3]; 4]).is_some());
    }

    #[test]
    fn test_compose_lower_wins_ties_keep_base() {
        let base = depth(&[1000, NO_DEPTH, 800, 900]);
        let top = depth(&[900, 700, NO_DEPTH, 900]);
        let (d, c) = compose(&base, &colors(4, [1, 1, 1]), &top, &colors(4, [2, 2, 2]));
        assert_eq!(d.data(), &[900, 700, 800, 900]);
        assert_eq!(c.data(), &[[2, 2, 2], [2, 2, 2], [1, 1, 1], [1, 1, 1]]);
    }

    #[test]
    fn test_compose_order_invariant_under_domination() {
        let near = depth(&[500, 600, 700, NO_DEPTH]);
        let far = depth(&[900, 600, NO_DEPTH, NO_DEPTH]);
        let c = colors(4, [0, 0, 0]);
        let (ab, _) = compose(&near, &c, &far, &c);
        let (ba, _) = compose(&far, &c, &near, &c);
        assert_eq!(ab, ba);
    }

    #[test]
    fn test_occlusion_conflicts_and_new_pixels() {
        let parent = depth(&[1000, NO_DEPTH, 800, 900]);
        let object = depth(&[900, 700, 850, NO_DEPTH]);
        assert_eq!(occlusion_conflicts(&parent, &object), vec![0]);
        assert_eq!(new_pixels(&parent, &object).collect::<Vec<_>>(), vec![1]);
    }
}
