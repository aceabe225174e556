//! Planar geometry helpers over [`glam::Vec2`].

use glam::Vec2;
use std::f32::consts::{PI, TAU};

/// Distances below this are treated as "same point".
pub const COINCIDENT_EPSILON: f32 = 1e-3;

/// Wraps an angle in radians into `[-π, π]`.
#[must_use]
pub fn normalize_angle(angle: f32) -> f32 {
    if !angle.is_finite() {
        return 0.0;
    }
    let wrapped = angle % TAU;
    if wrapped > PI {
        wrapped - TAU
    } else if wrapped < -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Absolute angular difference between two headings, in `[0, π]`.
#[must_use]
pub fn angle_difference(a: f32, b: f32) -> f32 {
    normalize_angle(a - b).abs()
}

/// Heading of a vector in radians (0 = +x, counter-clockwise).
#[must_use]
pub fn heading(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

/// Unit vector for a heading in radians.
#[must_use]
pub fn from_heading(angle: f32) -> Vec2 {
    Vec2::new(angle.cos(), angle.sin())
}

/// Normalized direction from `from` to `to`.
///
/// Returns [`Vec2::ZERO`] when the points are closer than
/// [`COINCIDENT_EPSILON`].
#[must_use]
pub fn direction_between(from: Vec2, to: Vec2) -> Vec2 {
    let delta = to - from;
    let distance = delta.length();
    if distance < COINCIDENT_EPSILON {
        Vec2::ZERO
    } else {
        delta / distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_angle_range() {
        assert!((normalize_angle(3.0 * PI).abs() - PI).abs() < 1e-5);
        assert!((normalize_angle(-3.0 * PI).abs() - PI).abs() < 1e-5);
        assert!((normalize_angle(1.5 * PI) + 0.5 * PI).abs() < 1e-5);
        assert!((normalize_angle(0.5) - 0.5).abs() < 1e-6);
        assert!((normalize_angle(TAU + 0.25) - 0.25).abs() < 1e-5);
        assert_eq!(normalize_angle(f32::NAN), 0.0);
    }

    #[test]
    fn test_angle_difference_wraps() {
        let diff = angle_difference(PI - 0.1, -PI + 0.1);
        assert!((diff - 0.2).abs() < 1e-5);
    }

    #[test]
    fn test_direction_between() {
        let dir = direction_between(Vec2::new(5.0, 5.0), Vec2::new(10.0, 10.0));
        assert!((dir.x - 0.707).abs() < 1e-3);
        assert!((dir.y - 0.707).abs() < 1e-3);

        let same = direction_between(Vec2::new(1.0, 1.0), Vec2::new(1.0, 1.0));
        assert_eq!(same, Vec2::ZERO);
    }

    proptest::proptest! {
        #[test]
        fn prop_normalized_angle_in_range(angle in -100.0f32..100.0) {
            let n = normalize_angle(angle);
            proptest::prop_assert!((-PI - 1e-5..=PI + 1e-5).contains(&n));
            let offset = (n - angle).rem_euclid(TAU);
            proptest::prop_assert!(offset.min(TAU - offset) < 1e-3);
        }
    }

    #[test]
    fn test_heading_round_trip() {
        let v = from_heading(1.2);
        assert!((heading(v) - 1.2).abs() < 1e-5);
    }
}
