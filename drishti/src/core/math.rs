//! Angle helpers.
//!
//! All angles are in radians, counter-clockwise positive about the world Z axis.

use std::f32::consts::PI;

/// Two times PI (full circle in radians).
pub const TWO_PI: f32 = 2.0 * PI;

/// Normalize angle to [-π, π).
#[inline]
pub fn normalize_angle(angle: f32) -> f32 {
    let mut a = angle % TWO_PI;
    if a >= PI {
        a -= TWO_PI;
    } else if a < -PI {
        a += TWO_PI;
    }
    a
}

/// Wrap angle to [0, 2π), the range used by the yaw grid.
#[inline]
pub fn wrap_two_pi(angle: f32) -> f32 {
    let a = angle.rem_euclid(TWO_PI);
    // rem_euclid can return TWO_PI itself for tiny negative inputs
    if a >= TWO_PI { 0.0 } else { a }
}

/// Signed shortest angular difference from `from` to `to`, in [-π, π).
#[inline]
pub fn angle_diff(from: f32, to: f32) -> f32 {
    normalize_angle(to - from)
}

/// Check if two angles are approximately equal, handling wrap-around.
#[inline]
pub fn angles_approx_equal(a: f32, b: f32, tolerance: f32) -> bool {
    angle_diff(a, b).abs() <= tolerance
}
