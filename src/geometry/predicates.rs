//! Geometric predicates used by the sweep.
//!
//! All predicates are pure functions over [`Point2`]. Signs follow the
//! convention of [`Point2::cross_z`]: a positive value means the second
//! vector lies counter-clockwise of the first.

#![forbid(unsafe_code)]

use crate::core::collections::SmallBuffer;
use crate::geometry::point::Point2;

/// Represents the orientation of an ordered point triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Clockwise turn (cross product < 0)
    NEGATIVE,
    /// Collinear within tolerance (cross product ≈ 0)
    DEGENERATE,
    /// Counter-clockwise turn (cross product > 0)
    POSITIVE,
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NEGATIVE => write!(f, "NEGATIVE"),
            Self::DEGENERATE => write!(f, "DEGENERATE"),
            Self::POSITIVE => write!(f, "POSITIVE"),
        }
    }
}

/// `z` component of `(u, 0) × (v, 0)`.
#[inline]
#[must_use]
pub fn cross_z(u: Point2, v: Point2) -> f64 {
    u.cross_z(v)
}

/// Euclidean distance between two points.
#[inline]
#[must_use]
pub fn distance(p: Point2, q: Point2) -> f64 {
    p.distance(q)
}

/// Orientation of the turn `a → b → c`.
///
/// The determinant is compared against `tolerance` scaled by the lengths of
/// the two edge vectors, so the classification does not depend on the
/// overall scale of the input.
///
/// # Examples
///
/// ```rust
/// use gvd_sweep::geometry::point::Point2;
/// use gvd_sweep::geometry::predicates::{orientation, Orientation};
///
/// let a = Point2::new(0.0, 0.0);
/// let b = Point2::new(1.0, 0.0);
/// assert_eq!(orientation(a, b, Point2::new(1.0, 1.0), 1e-12), Orientation::POSITIVE);
/// assert_eq!(orientation(a, b, Point2::new(2.0, 0.0), 1e-12), Orientation::DEGENERATE);
/// ```
#[must_use]
pub fn orientation(a: Point2, b: Point2, c: Point2, tolerance: f64) -> Orientation {
    let u = b - a;
    let v = c - a;
    let det = u.cross_z(v);
    let scale = u.norm() * v.norm();
    if det.abs() <= tolerance * scale.max(1.0) {
        Orientation::DEGENERATE
    } else if det > 0.0 {
        Orientation::POSITIVE
    } else {
        Orientation::NEGATIVE
    }
}

/// `true` when `p` lies strictly to the right of the directed line
/// `upper → lower`.
///
/// For a segment site stored with its upper endpoint first this is the side
/// a downward walker along the segment would see on their right hand.
#[inline]
#[must_use]
pub fn is_right_of_line(upper: Point2, lower: Point2, p: Point2) -> bool {
    (lower - upper).cross_z(p - upper) < 0.0
}

/// Parameter in `[0, 1]` of the point of segment `a`–`b` closest to `p`.
#[must_use]
pub fn closest_parameter(a: Point2, b: Point2, p: Point2) -> f64 {
    let d = b - a;
    let len2 = d.norm_squared();
    if len2 <= f64::MIN_POSITIVE {
        return 0.0;
    }
    ((p - a).dot(d) / len2).clamp(0.0, 1.0)
}

/// Distance from `p` to the closed segment `a`–`b`.
///
/// ```rust
/// use gvd_sweep::geometry::point::Point2;
/// use gvd_sweep::geometry::predicates::distance_to_segment;
///
/// let a = Point2::new(0.0, 1.0);
/// let b = Point2::new(0.0, -1.0);
/// assert_eq!(distance_to_segment(a, b, Point2::new(2.0, 0.0)), 2.0);
/// assert_eq!(distance_to_segment(a, b, Point2::new(0.0, 4.0)), 3.0);
/// ```
#[must_use]
pub fn distance_to_segment(a: Point2, b: Point2, p: Point2) -> f64 {
    let t = closest_parameter(a, b, p);
    p.distance(a + (b - a) * t)
}

/// Intersections of the circle `(center, radius)` with the closed segment
/// `a`–`b`.
///
/// Endpoints count as intersections (inclusively, within `tolerance`). A
/// tangency, where the supporting line passes at distance `radius ± tolerance`
/// from the centre, yields a single point. Intersections closer together than
/// `tolerance` are reported once.
#[must_use]
pub fn circle_segment_intersections(
    center: Point2,
    radius: f64,
    a: Point2,
    b: Point2,
    tolerance: f64,
) -> SmallBuffer<Point2, 2> {
    let mut hits = SmallBuffer::new();
    let d = b - a;
    let len2 = d.norm_squared();
    if len2 <= f64::MIN_POSITIVE || !radius.is_finite() {
        return hits;
    }
    let len = len2.sqrt();
    let t_tolerance = tolerance / len;
    let in_range = |t: f64| t >= -t_tolerance && t <= 1.0 + t_tolerance;

    // Foot of the perpendicular from the centre onto the supporting line.
    let t_foot = (center - a).dot(d) / len2;
    let foot = a + d * t_foot;
    let h = center.distance(foot);

    if (h - radius).abs() <= tolerance {
        if in_range(t_foot) {
            hits.push(foot);
        }
        return hits;
    }
    if h > radius {
        return hits;
    }

    let half_chord = (radius * radius - h * h).sqrt() / len;
    for t in [t_foot - half_chord, t_foot + half_chord] {
        if !in_range(t) {
            continue;
        }
        let p = a + d * t;
        if hits.iter().all(|q: &Point2| !q.coincides(p, tolerance)) {
            hits.push(p);
        }
    }
    hits
}

// =============================================================================
// TESTS
// =============================================================================
