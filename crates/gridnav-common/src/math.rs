//! Math utilities for grid navigation

use glam::Vec2;
use std::f32::consts::PI;

/// Square a value (x²)
#[inline]
pub fn sqr<T: std::ops::Mul<Output = T> + Copy>(x: T) -> T {
    x * x
}

/// Linear interpolation between two values
#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

/// Clamps a value to the 0..1 range
#[inline]
pub fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// Converts degrees to radians
#[inline]
pub fn deg_to_rad(deg: f32) -> f32 {
    deg * PI / 180.0
}

/// Converts radians to degrees
#[inline]
pub fn rad_to_deg(rad: f32) -> f32 {
    rad * 180.0 / PI
}

/// Converts a heading angle (radians, counter-clockwise about +Z) to a
/// unit direction vector on the ground plane.
#[inline]
pub fn heading_to_dir(heading: f32) -> Vec2 {
    Vec2::new(heading.sin(), heading.cos())
}

/// Converts a ground-plane direction to a heading angle in radians.
/// A zero direction maps to heading 0.
#[inline]
pub fn dir_to_heading(dir: Vec2) -> f32 {
    if dir.length_squared() < 1e-12 {
        0.0
    } else {
        dir.x.atan2(dir.y)
    }
}

/// Wraps an angle to the (-PI, PI] range
#[inline]
pub fn wrap_angle(mut a: f32) -> f32 {
    while a > PI {
        a -= 2.0 * PI;
    }
    while a <= -PI {
        a += 2.0 * PI;
    }
    a
}

/// Interpolates the height at point `(px, pz)` inside an axis-aligned
/// right triangle with corner heights `h0` at the right-angle vertex,
/// `hx` one unit along x and `hz` one unit along z.
///
/// `px` and `pz` are local coordinates in the 0..1 cell square.
#[inline]
pub fn triangle_height(h0: f32, hx: f32, hz: f32, px: f32, pz: f32) -> f32 {
    h0 + (hx - h0) * px + (hz - h0) * pz
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lerp() {
        assert_eq!(lerp(0.0, 10.0, 0.5), 5.0);
        assert_eq!(lerp(2.0, 4.0, 0.0), 2.0);
        assert_eq!(lerp(2.0, 4.0, 1.0), 4.0);
    }

    #[test]
    fn test_heading_round_trip() {
        for &h in &[0.0, 0.5, -1.2, 3.0, -3.0] {
            let d = heading_to_dir(h);
            let back = dir_to_heading(d);
            assert!((wrap_angle(back - h)).abs() < 1e-5, "heading {h}");
        }
    }

    #[test]
    fn test_dir_to_heading_zero() {
        assert_eq!(dir_to_heading(Vec2::ZERO), 0.0);
    }

    #[test]
    fn test_wrap_angle() {
        assert!((wrap_angle(3.0 * PI) - PI).abs() < 1e-5);
        assert!((wrap_angle(-2.5 * PI) + 0.5 * PI).abs() < 1e-5);
    }

    #[test]
    fn test_triangle_height() {
        // Flat triangle
        assert_eq!(triangle_height(1.0, 1.0, 1.0, 0.3, 0.3), 1.0);
        // Plane rising along x only
        assert!((triangle_height(0.0, 2.0, 0.0, 0.5, 0.25) - 1.0).abs() < 1e-6);
        // Corners reproduce exactly
        assert_eq!(triangle_height(1.0, 3.0, 5.0, 0.0, 0.0), 1.0);
        assert_eq!(triangle_height(1.0, 3.0, 5.0, 1.0, 0.0), 3.0);
        assert_eq!(triangle_height(1.0, 3.0, 5.0, 0.0, 1.0), 5.0);
    }
}
