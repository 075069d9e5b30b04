//! Color comparison: CIE Lab distance and coarse RGB histograms.

use super::image::Rgb;

/// CIE L*a*b* color (D65 white point).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Lab {
    /// Lightness [0, 100]
    pub l: f32,
    /// Green-red axis
    pub a: f32,
    /// Blue-yellow axis
    pub b: f32,
}

#[inline]
fn srgb_to_linear(c: u8) -> f32 {
    let c = c as f32 / 255.0;
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

#[inline]
fn lab_f(t: f32) -> f32 {
    const DELTA: f32 = 6.0 / 29.0;
    if t > DELTA * DELTA * DELTA {
        t.cbrt()
    } else {
        t / (3.0 * DELTA * DELTA) + 4.0 / 29.0
    }
}

/// Convert an sRGB color to Lab.
pub fn rgb_to_lab(rgb: Rgb) -> Lab {
    let r = srgb_to_linear(rgb[0]);
    let g = srgb_to_linear(rgb[1]);
    let b = srgb_to_linear(rgb[2]);

    let x = (0.412_456_4 * r + 0.357_576_1 * g + 0.180_437_5 * b) / 0.950_47;
    let y = 0.212_672_9 * r + 0.715_152_2 * g + 0.072_175 * b;
    let z = (0.019_333_9 * r + 0.119_192 * g + 0.950_304_1 * b) / 1.088_83;

    let (fx, fy, fz) = (lab_f(x), lab_f(y), lab_f(z));
    Lab {
        l: 116.0 * fy - 16.0,
        a: 500.0 * (fx - fy),
        b: 200.0 * (fy - fz),
    }
}

/// CIE76 color difference (ΔE*ab) between two sRGB colors.
pub fn color_distance(a: Rgb, b: Rgb) -> f32 {
    if a == b {
        return 0.0;
    }
    let (la, lb) = (rgb_to_lab(a), rgb_to_lab(b));
    let dl = la.l - lb.l;
    let da = la.a - lb.a;
    let db = la.b - lb.b;
    (dl * dl + da * da + db * db).sqrt()
}

/// Bins per channel.
const BINS: usize = 4;

/// Coarse RGB histogram (`BINS³` bins).
#[derive(Clone, Debug, PartialEq)]
pub struct ColorHistogram {
    bins: [u32; BINS * BINS * BINS],
    total: u32,
}

impl Default for ColorHistogram {
    fn default() -> Self {
        Self {
            bins: [0; BINS * BINS * BINS],
            total: 0,
        }
    }
}

impl ColorHistogram {
    /// Empty histogram
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one sample
    pub fn add(&mut self, rgb: Rgb) {
        let q = |c: u8| c as usize * BINS / 256;
        let index = (q(rgb[0]) * BINS + q(rgb[1])) * BINS + q(rgb[2]);
        self.bins[index] += 1;
        self.total += 1;
    }

    /// Number of samples
    pub fn total(&self) -> u32 {
        self.total
    }

    /// Bhattacharyya coefficient in [0, 1]; 0 if either histogram is empty.
    pub fn similarity(&self, other: &ColorHistogram) -> f32 {
        if self.total == 0 || other.total == 0 {
            return 0.0;
        }
        let (na, nb) = (self.total as f32, other.total as f32);
        let bc: f32 = self
            .bins
            .iter()
            .zip(other.bins.iter())
            .map(|(&a, &b)| ((a as f32 / na) * (b as f32 / nb)).sqrt())
            .sum();
        bc.min(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lab_reference_values() {
        let white = rgb_to_lab([255, 255, 255]);
        assert_relative_eq!(white.l, 100.0, epsilon = 0.1);
        assert_relative_eq!(white.a, 0.0, epsilon = 0.1);
        let black = rgb_to_lab([0, 0, 0]);
        assert_relative_eq!(black.l, 0.0, epsilon = 0.1);
    }

    #[test]
    fn test_color_distance() {
        assert_eq!(color_distance([10, 20, 30], [10, 20, 30]), 0.0);
        assert!(color_distance([255, 0, 0], [0, 0, 255]) > 100.0);
        assert!(color_distance([200, 40, 40], [205, 42, 40]) < 5.0);
    }

    #[test]
    fn test_histogram_similarity() {
        let mut red = ColorHistogram::new();
        let mut blue = ColorHistogram::new();
        for _ in 0..10 {
            red.add([250, 10, 10]);
            blue.add([10, 10, 250]);
        }
        assert_relative_eq!(red.similarity(&red), 1.0, epsilon = 1e-5);
        assert_eq!(red.similarity(&blue), 0.0);
        assert_eq!(red.similarity(&ColorHistogram::new()), 0.0);
    }
}
