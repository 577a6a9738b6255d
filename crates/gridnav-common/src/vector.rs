//! 2D vector utilities for grid navigation

use glam::Vec2;

/// Calculates the dot product of two 2D vectors
#[inline]
pub fn dot_2d(a: Vec2, b: Vec2) -> f32 {
    a.x * b.x + a.y * b.y
}

/// Calculates the 2D perp-determinant (z component of the 3D cross product)
#[inline]
pub fn det_2d(a: Vec2, b: Vec2) -> f32 {
    a.x * b.y - a.y * b.x
}

/// Returns true if `p` lies strictly to the left of the directed line a→b
#[inline]
pub fn left_of(a: Vec2, b: Vec2, p: Vec2) -> bool {
    det_2d(b - a, p - a) > 0.0
}

/// Calculates the squared distance between a point and a line segment
pub fn distance_point_segment_squared(p: Vec2, a: Vec2, b: Vec2) -> f32 {
    let ab = b - a;
    let ap = p - a;

    let ab_len_sq = ab.length_squared();
    if ab_len_sq < f32::EPSILON {
        return ap.length_squared();
    }

    let t = (ap.dot(ab) / ab_len_sq).clamp(0.0, 1.0);
    (a + ab * t - p).length_squared()
}

/// Finds the closest point on a line segment to a given point
pub fn closest_point_on_segment(p: Vec2, a: Vec2, b: Vec2) -> Vec2 {
    let ab = b - a;
    let ab_len_sq = ab.length_squared();
    if ab_len_sq < f32::EPSILON {
        return a;
    }

    let t = ((p - a).dot(ab) / ab_len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Intersects the ray `orig + t * dir` with a circle.
///
/// Returns the smallest non-negative ray parameter, or None when the ray
/// misses the circle entirely.
pub fn intersect_ray_circle(orig: Vec2, dir: Vec2, center: Vec2, radius: f32) -> Option<f32> {
    let d = center - orig;
    let a = dir.length_squared();
    if a < f32::EPSILON {
        return None;
    }
    let b = 2.0 * dir.dot(d);
    let c = d.length_squared() - radius * radius;
    let discr = b * b - 4.0 * a * c;

    if discr < 0.0 {
        return None;
    }

    let sqrt_discr = discr.sqrt();
    let t1 = (b - sqrt_discr) / (2.0 * a);
    let t2 = (b + sqrt_discr) / (2.0 * a);

    if t1 >= 0.0 {
        Some(t1)
    } else if t2 >= 0.0 {
        Some(t2)
    } else {
        None
    }
}

/// Intersects a moving circle of `radius` travelling along `dir` from
/// `orig` against the segment p→q. Returns the ray parameter of first
/// contact, or None.
pub fn intersect_ray_segment_circle(
    orig: Vec2,
    dir: Vec2,
    p: Vec2,
    q: Vec2,
    radius: f32,
) -> Option<f32> {
    // Contact with the segment interior: offset the segment toward the ray
    // by the radius along its normal and intersect ray vs line.
    let seg = q - p;
    let seg_len = seg.length();
    if seg_len < f32::EPSILON {
        return intersect_ray_circle(orig, dir, p, radius);
    }
    let n = Vec2::new(-seg.y, seg.x) / seg_len;
    let side = if (orig - p).dot(n) >= 0.0 { 1.0 } else { -1.0 };
    let offset = n * (radius * side);

    let mut best: Option<f32> = None;
    let denom = det_2d(dir, seg);
    if denom.abs() > f32::EPSILON {
        let diff = p + offset - orig;
        let t = det_2d(diff, seg) / denom;
        let s = det_2d(diff, dir) / denom;
        if t >= 0.0 && (0.0..=1.0).contains(&s) {
            best = Some(t);
        }
    }

    // Contact with the segment end caps
    for cap in [p, q] {
        if let Some(t) = intersect_ray_circle(orig, dir, cap, radius) {
            if best.map_or(true, |b| t < b) {
                best = Some(t);
            }
        }
    }

    best
}
