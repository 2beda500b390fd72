//! Points equidistant from three sites.
//!
//! A site is either a point or a segment. For three points the answer is the
//! circumcentre. As soon as a segment is involved, distance to the segment is
//! measured against its supporting line and the system becomes quadratic, so
//! up to a handful of candidate centres exist. Which of them is the real
//! Voronoi vertex is decided later by the close-event engine; this module only
//! enumerates them.
//!
//! The result is an explicit tagged value ([`Equidistant`]) rather than a
//! bare list so callers match on every shape of answer.

#![forbid(unsafe_code)]

use crate::core::collections::SmallBuffer;
use crate::geometry::point::Point2;
use crate::geometry::predicates::distance_to_segment;
use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Candidate centres closer than this are reported once.
const CANDIDATE_MERGE_TOLERANCE: f64 = 1e-9;

/// Relative threshold below which a linear system is treated as singular.
const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Inline capacity for candidate lists.
pub const MAX_INLINE_CANDIDATES: usize = 6;

// =============================================================================
// SITE SHAPES
// =============================================================================

/// Geometric shape of a site, stripped of any topology.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum SiteShape {
    /// A point site.
    Point(Point2),
    /// A segment site from its upper endpoint `a` to its lower endpoint `b`.
    Segment(Point2, Point2),
}

impl SiteShape {
    /// `true` for point sites.
    #[inline]
    #[must_use]
    pub const fn is_point(&self) -> bool {
        matches!(self, Self::Point(_))
    }

    /// `true` for segment sites.
    #[inline]
    #[must_use]
    pub const fn is_segment(&self) -> bool {
        matches!(self, Self::Segment(..))
    }

    /// Distance from `p` to the site. Segments use the clamped distance to
    /// the closed segment.
    #[must_use]
    pub fn distance_to(&self, p: Point2) -> f64 {
        match *self {
            Self::Point(q) => q.distance(p),
            Self::Segment(a, b) => distance_to_segment(a, b, p),
        }
    }

    /// `true` when `p` is one of the segment's endpoints.
    #[must_use]
    pub fn has_endpoint(&self, p: Point2) -> bool {
        match *self {
            Self::Point(_) => false,
            Self::Segment(a, b) => a == p || b == p,
        }
    }

    /// Supporting line of a segment site.
    #[must_use]
    pub fn line(&self) -> Option<Line> {
        match *self {
            Self::Point(_) => None,
            Self::Segment(a, b) => Line::through(a, b),
        }
    }
}

/// A line in Hessian normal form, `normal · x + offset = 0`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Line {
    /// Unit normal, the direction `b − a` rotated a quarter turn
    /// counter-clockwise.
    pub normal: Point2,
    /// Signed offset.
    pub offset: f64,
}

impl Line {
    /// Line through `a` and `b`, or `None` if they coincide.
    #[must_use]
    pub fn through(a: Point2, b: Point2) -> Option<Self> {
        let normal = (b - a).normalized()?.perp();
        Some(Self {
            normal,
            offset: -normal.dot(a),
        })
    }

    /// Signed distance from `p`; positive on the side `normal` points to.
    #[inline]
    #[must_use]
    pub fn signed_distance(&self, p: Point2) -> f64 {
        self.normal.dot(p) + self.offset
    }
}

// =============================================================================
// RESULT TYPE
// =============================================================================

/// Outcome of an equidistant-point query.
#[derive(Clone, Debug, PartialEq)]
pub enum Equidistant {
    /// No equidistant point exists (collinear points, parallel lines, ...).
    None,
    /// Exactly one equidistant point.
    Unique(Point2),
    /// The single exact solution forced by a point site sitting on the end of
    /// a segment site: the circle must touch the segment at that endpoint.
    Tangent(Point2),
    /// Several candidate centres; the caller has to choose.
    Candidates(SmallBuffer<Point2, MAX_INLINE_CANDIDATES>),
}

impl Equidistant {
    /// Number of points carried by the result.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::None => 0,
            Self::Unique(_) | Self::Tangent(_) => 1,
            Self::Candidates(points) => points.len(),
        }
    }

    /// `true` for [`Equidistant::None`] and empty candidate lists.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All points carried by the result.
    #[must_use]
    pub fn points(&self) -> SmallBuffer<Point2, MAX_INLINE_CANDIDATES> {
        match self {
            Self::None => SmallBuffer::new(),
            Self::Unique(p) | Self::Tangent(p) => std::iter::once(*p).collect(),
            Self::Candidates(points) => points.clone(),
        }
    }

    fn from_candidates(points: SmallBuffer<Point2, MAX_INLINE_CANDIDATES>) -> Self {
        match points.len() {
            0 => Self::None,
            1 => Self::Unique(points[0]),
            _ => Self::Candidates(points),
        }
    }
}

// =============================================================================
// QUERY
// =============================================================================

/// Points equidistant from the three sites `a`, `b` and `c`.
///
/// Argument order does not matter for the set of points returned.
///
/// # Examples
///
/// ```rust
/// use gvd_sweep::geometry::equidistant::{equidistant, Equidistant, SiteShape};
/// use gvd_sweep::geometry::point::Point2;
///
/// let result = equidistant(
///     &SiteShape::Point(Point2::new(0.0, 0.0)),
///     &SiteShape::Point(Point2::new(1.0, 1.0)),
///     &SiteShape::Point(Point2::new(2.0, 0.0)),
/// );
/// assert_eq!(result, Equidistant::Unique(Point2::new(1.0, 0.0)));
/// ```
#[must_use]
pub fn equidistant(a: &SiteShape, b: &SiteShape, c: &SiteShape) -> Equidistant {
    let mut points: SmallBuffer<Point2, 3> = SmallBuffer::new();
    let mut segments: SmallBuffer<(Point2, Point2), 3> = SmallBuffer::new();
    for site in [a, b, c] {
        match *site {
            SiteShape::Point(p) => points.push(p),
            SiteShape::Segment(s0, s1) => segments.push((s0, s1)),
        }
    }

    match (points.as_slice(), segments.as_slice()) {
        ([p, q, r], []) => circumcenter(*p, *q, *r).map_or(Equidistant::None, Equidistant::Unique),
        ([p, q], [s]) => point_point_segment(*p, *q, *s),
        ([p], [s, t]) => point_segment_segment(*p, *s, *t),
        ([], [s, t, u]) => segment_segment_segment(*s, *t, *u),
        _ => Equidistant::None,
    }
}

/// Circumcentre of three points, `None` when they are collinear.
#[must_use]
pub fn circumcenter(a: Point2, b: Point2, c: Point2) -> Option<Point2> {
    let ab = b - a;
    let ac = c - a;
    let det = 2.0 * ab.cross_z(ac);
    if det.abs() <= SINGULAR_TOLERANCE * ab.norm() * ac.norm() || det == 0.0 {
        return None;
    }
    let ab2 = ab.norm_squared();
    let ac2 = ac.norm_squared();
    let ux = ac.y.mul_add(ab2, -(ab.y * ac2)) / det;
    let uy = ab.x.mul_add(ac2, -(ac.x * ab2)) / det;
    let center = a + Point2::new(ux, uy);
    center.is_finite().then_some(center)
}

fn point_point_segment(p: Point2, q: Point2, segment: (Point2, Point2)) -> Equidistant {
    let shape = SiteShape::Segment(segment.0, segment.1);
    let Some(line) = shape.line() else {
        return Equidistant::None;
    };

    match (shape.has_endpoint(p), shape.has_endpoint(q)) {
        (true, true) => return Equidistant::None,
        (true, false) => return endpoint_tangency(p, q, line.normal),
        (false, true) => return endpoint_tangency(q, p, line.normal),
        (false, false) => {}
    }

    // Centre on the perpendicular bisector of p and q: x = m + t u.
    let Some(u) = (q - p).normalized().map(Point2::perp) else {
        return Equidistant::None;
    };
    let m = p.midpoint(q);
    let h = 0.5 * p.distance(q);
    let k0 = line.signed_distance(m);
    let k1 = line.normal.dot(u);

    let mut out = SmallBuffer::new();
    for t in solve_quadratic(k1.mul_add(k1, -1.0), 2.0 * k0 * k1, k0.mul_add(k0, -(h * h))) {
        push_unique(&mut out, m + u * t);
    }
    Equidistant::from_candidates(out)
}

/// The circle touches the segment at `endpoint` and passes through `other`.
fn endpoint_tangency(endpoint: Point2, other: Point2, normal: Point2) -> Equidistant {
    let w = endpoint - other;
    let denom = 2.0 * normal.dot(w);
    if denom.abs() <= SINGULAR_TOLERANCE * w.norm_squared().max(f64::MIN_POSITIVE) {
        return Equidistant::None;
    }
    let t = -w.norm_squared() / denom;
    let center = endpoint + normal * t;
    if center.is_finite() {
        Equidistant::Tangent(center)
    } else {
        Equidistant::None
    }
}

fn point_segment_segment(p: Point2, s: (Point2, Point2), t: (Point2, Point2)) -> Equidistant {
    let first = SiteShape::Segment(s.0, s.1);
    let second = SiteShape::Segment(t.0, t.1);
    let (Some(l1), Some(l2)) = (first.line(), second.line()) else {
        return Equidistant::None;
    };

    match (first.has_endpoint(p), second.has_endpoint(p)) {
        (true, true) => Equidistant::None,
        (true, false) => endpoint_on_normal(p, l1, l2),
        (false, true) => endpoint_on_normal(p, l2, l1),
        (false, false) => {
            if l1.normal.cross_z(l2.normal).abs() <= SINGULAR_TOLERANCE {
                return point_between_parallels(p, l1, l2);
            }
            let n = na::Matrix2::new(l1.normal.x, l1.normal.y, l2.normal.x, l2.normal.y);
            let Some(inverse) = n.try_inverse() else {
                return Equidistant::None;
            };
            let base = inverse * na::Vector2::new(-l1.offset, -l2.offset);
            let u = Point2::new(base.x, base.y);
            let up = u - p;

            let mut out = SmallBuffer::new();
            for (s1, s2) in [(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)] {
                let dir = inverse * na::Vector2::new(s1, s2);
                let v = Point2::new(dir.x, dir.y);
                let roots = solve_quadratic(v.norm_squared() - 1.0, 2.0 * up.dot(v), up.norm_squared());
                for r in roots.into_iter().filter(|r| *r >= 0.0) {
                    push_unique(&mut out, u + v * r);
                }
            }
            Equidistant::from_candidates(out)
        }
    }
}

/// Centres on the mid-parallel of two parallel lines at distance half the gap
/// from `p`.
fn point_between_parallels(p: Point2, l1: Line, l2: Line) -> Equidistant {
    let n = l1.normal;
    let sign = n.dot(l2.normal).signum();
    // Offsets of both lines measured along `n`.
    let (c1, c2) = (l1.offset, sign * l2.offset);
    let radius = 0.5 * (c1 - c2).abs();
    if radius <= SINGULAR_TOLERANCE * c1.abs().max(c2.abs()).max(1.0) {
        return Equidistant::None;
    }
    let w = -0.5 * (c1 + c2);
    let dir = n.perp();
    let across = w - n.dot(p);
    let remaining = radius.mul_add(radius, -(across * across));
    if remaining < 0.0 {
        return Equidistant::None;
    }
    let along = remaining.sqrt();
    let mut out = SmallBuffer::new();
    for s in [dir.dot(p) - along, dir.dot(p) + along] {
        push_unique(&mut out, n * w + dir * s);
    }
    Equidistant::from_candidates(out)
}

/// `p` is an endpoint of the segment on `own`; the centre lies on the normal
/// of `own` through `p` and is as far from `other` as from `p`.
fn endpoint_on_normal(p: Point2, own: Line, other: Line) -> Equidistant {
    let base = other.signed_distance(p);
    let along = other.normal.dot(own.normal);
    let mut out = SmallBuffer::new();
    for sign in [1.0, -1.0] {
        let denom = along - sign;
        if denom.abs() <= SINGULAR_TOLERANCE {
            continue;
        }
        let center = p + own.normal * (-base / denom);
        if center.is_finite() {
            push_unique(&mut out, center);
        }
    }
    match out.len() {
        0 => Equidistant::None,
        1 => Equidistant::Tangent(out[0]),
        _ => Equidistant::Candidates(out),
    }
}

fn segment_segment_segment(
    s: (Point2, Point2),
    t: (Point2, Point2),
    u: (Point2, Point2),
) -> Equidistant {
    let lines = [
        SiteShape::Segment(s.0, s.1).line(),
        SiteShape::Segment(t.0, t.1).line(),
        SiteShape::Segment(u.0, u.1).line(),
    ];
    let [Some(l1), Some(l2), Some(l3)] = lines else {
        return Equidistant::None;
    };

    let mut out = SmallBuffer::new();
    for (s2, s3) in [(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)] {
        #[rustfmt::skip]
        let m = na::Matrix3::new(
            l1.normal.x, l1.normal.y, -1.0,
            l2.normal.x, l2.normal.y, -s2,
            l3.normal.x, l3.normal.y, -s3,
        );
        let rhs = na::Vector3::new(-l1.offset, -l2.offset, -l3.offset);
        let Some(solution) = m.lu().solve(&rhs) else {
            continue;
        };
        let center = Point2::new(solution.x, solution.y);
        if center.is_finite() && solution.z.is_finite() {
            push_unique(&mut out, center);
        }
    }
    Equidistant::from_candidates(out)
}

// =============================================================================
// HELPERS
// =============================================================================

fn push_unique(out: &mut SmallBuffer<Point2, MAX_INLINE_CANDIDATES>, p: Point2) {
    if p.is_finite() && out.iter().all(|q| !q.coincides(p, CANDIDATE_MERGE_TOLERANCE)) {
        out.push(p);
    }
}

/// Real roots of `a t² + b t + c = 0`, degrading to the linear equation when
/// `a` vanishes.
pub(crate) fn solve_quadratic(a: f64, b: f64, c: f64) -> SmallBuffer<f64, 2> {
    let mut roots = SmallBuffer::new();
    let scale = a.abs().max(b.abs()).max(c.abs()).max(f64::MIN_POSITIVE);
    if a.abs() <= SINGULAR_TOLERANCE * scale {
        if b.abs() > SINGULAR_TOLERANCE * scale {
            roots.push(-c / b);
        }
        return roots;
    }
    let disc = b.mul_add(b, -4.0 * a * c);
    if disc < 0.0 {
        // Allow a slightly negative discriminant from rounding: double root.
        if disc.abs() <= SINGULAR_TOLERANCE * b.mul_add(b, (4.0 * a * c).abs()) {
            roots.push(-b / (2.0 * a));
        }
        return roots;
    }
    let sqrt = disc.sqrt();
    // Numerically stable form.
    let q = -0.5 * (b + b.signum() * sqrt);
    let (r0, r1) = if q == 0.0 {
        (0.0, 0.0)
    } else {
        (q / a, c / q)
    };
    if (r0 - r1).abs() <= SINGULAR_TOLERANCE * r0.abs().max(1.0) {
        roots.push(r0);
    } else if r0 < r1 {
        roots.push(r0);
        roots.push(r1);
    } else {
        roots.push(r1);
        roots.push(r0);
    }
    roots
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn pt(x: f64, y: f64) -> SiteShape {
        SiteShape::Point(Point2::new(x, y))
    }

    fn seg(ax: f64, ay: f64, bx: f64, by: f64) -> SiteShape {
        SiteShape::Segment(Point2::new(ax, ay), Point2::new(bx, by))
    }

    fn assert_equidistant(center: Point2, sites: [&SiteShape; 3]) {
        let r = sites[0].distance_to(center);
        for site in sites {
            assert_relative_eq!(site.distance_to(center), r, epsilon = 1e-9);
        }
    }

    #[test]
    fn quadratic_roots_sorted() {
        let roots = solve_quadratic(1.0, -3.0, 2.0);
        assert_eq!(roots.len(), 2);
        assert_relative_eq!(roots[0], 1.0);
        assert_relative_eq!(roots[1], 2.0);
        assert_eq!(solve_quadratic(1.0, 0.0, 1.0).len(), 0);
        let linear = solve_quadratic(0.0, 2.0, -4.0);
        assert_eq!(linear.len(), 1);
        assert_relative_eq!(linear[0], 2.0);
    }

    #[test]
    fn three_points_give_circumcenter() {
        let result = equidistant(&pt(0.0, 2.0), &pt(1.0, 1.0), &pt(2.0, 2.0));
        let Equidistant::Unique(c) = result else {
            panic!("expected a unique point, got {result:?}");
        };
        assert_relative_eq!(c, Point2::new(1.0, 2.0), epsilon = 1e-12);
    }

    #[test]
    fn collinear_points_have_no_center() {
        let result = equidistant(&pt(0.0, 0.0), &pt(1.0, 1.0), &pt(2.0, 2.0));
        assert_eq!(result, Equidistant::None);
        assert!(result.is_empty());
    }

    #[test]
    fn two_points_and_a_segment() {
        let a = pt(-1.0, 2.0);
        let b = pt(1.0, 2.0);
        let s = seg(-500.0, 100.0, 500.0, -100.0);
        let result = equidistant(&a, &b, &s);
        assert!(!result.is_empty());
        for c in result.points() {
            assert_equidistant(c, [&a, &b, &s]);
        }
    }

    #[test]
    fn endpoint_point_is_tangent() {
        let s = seg(0.0, 1.0, 0.0, -1.0);
        let p = pt(0.0, 1.0);
        let q = pt(2.0, 1.0);
        let result = equidistant(&p, &q, &s);
        let Equidistant::Tangent(c) = result else {
            panic!("expected a tangent solution, got {result:?}");
        };
        assert_relative_eq!(c, Point2::new(1.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn both_endpoints_have_no_center() {
        let s = seg(0.0, 1.0, 0.0, -1.0);
        assert_eq!(equidistant(&pt(0.0, 1.0), &pt(0.0, -1.0), &s), Equidistant::None);
    }

    #[test]
    fn endpoint_of_one_segment_facing_another() {
        let p = pt(0.0, 1.0);
        let own = seg(0.0, 1.0, 0.0, -1.0);
        let other = seg(4.0, 3.0, 4.0, -3.0);
        let result = equidistant(&p, &own, &other);
        let Equidistant::Tangent(c) = result else {
            panic!("expected a tangent solution, got {result:?}");
        };
        assert_relative_eq!(c, Point2::new(2.0, 1.0), epsilon = 1e-12);
    }

    #[test]
    fn point_between_two_segments() {
        let p = pt(0.0, 0.0);
        let left = seg(-2.0, 3.0, -2.0, -3.0);
        let right = seg(2.0, 3.0, 2.0, -3.0);
        let result = equidistant(&p, &left, &right);
        assert_eq!(result.len(), 2);
        for c in result.points() {
            assert_equidistant(c, [&p, &left, &right]);
            assert_relative_eq!(c.x, 0.0, epsilon = 1e-12);
            assert_relative_eq!(c.y.abs(), 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn three_segments_incircle() {
        // Incentre and excentres of the triangle cut out by the three lines.
        let s1 = seg(0.0, 4.0, 0.0, -1.0);
        let s2 = seg(5.0, 0.1, -1.0, 0.0);
        let s3 = seg(-1.0, 4.0, 4.0, 1.0);
        let result = equidistant(&s1, &s2, &s3);
        assert!(result.len() >= 1);
        for c in result.points() {
            let lines = [s1.line().unwrap(), s2.line().unwrap(), s3.line().unwrap()];
            let r = lines[0].signed_distance(c).abs();
            for l in lines {
                assert_relative_eq!(l.signed_distance(c).abs(), r, epsilon = 1e-9);
            }
        }
    }
}
