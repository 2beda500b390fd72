//! Arc curves of the beachline and the breakpoints between them.
//!
//! At directrix `y = d` every active site contributes one curve: the locus of
//! points as far from the site as from the directrix.
//!
//! - A point site gives a [`Parabola`]. When the site lies on the directrix
//!   the parabola degenerates into a vertical ray above the site.
//! - A segment site gives a [`Vee`]: the two angle bisectors between the
//!   segment's supporting line and the directrix, meeting at the apex where
//!   the supporting line crosses the directrix. Only the halves above the
//!   directrix are part of the curve, so the result opens upwards.
//!
//! The beachline is the lower envelope of these curves. The breakpoint
//! between a left arc and a right arc is the intersection where the left
//! curve is the lower one just before and the right curve just after.

#![forbid(unsafe_code)]

use crate::core::collections::SmallBuffer;
use crate::geometry::equidistant::{solve_quadratic, Line, SiteShape};
use crate::geometry::point::Point2;

/// Focus-to-directrix distance below which a parabola is treated as the
/// vertical ray above its focus.
pub const DEGENERATE_PARABOLA: f64 = 1e-12;

/// Intersections closer than this along `x` are merged.
pub const CONSOLIDATE_TOLERANCE: f64 = 1e-6;

/// Slack allowed when testing whether an `x` value lies on one ray of a V.
const RAY_DOMAIN_TOLERANCE: f64 = 1e-9;

/// Slack on the segment parameter when testing [`Vee::covers`].
const SLAB_TOLERANCE: f64 = 1e-9;

// =============================================================================
// CURVES
// =============================================================================

/// Parabola with a horizontal directrix below its focus.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Parabola {
    /// The point site.
    pub focus: Point2,
    /// Directrix ordinate.
    pub directrix: f64,
}

impl Parabola {
    /// Creates the parabola of `focus` at the given directrix.
    #[must_use]
    pub const fn new(focus: Point2, directrix: f64) -> Self {
        Self { focus, directrix }
    }

    /// Distance between focus and directrix.
    #[inline]
    #[must_use]
    pub fn p(&self) -> f64 {
        self.focus.y - self.directrix
    }

    /// The focus sits on the directrix.
    #[inline]
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.p() <= DEGENERATE_PARABOLA
    }

    /// Ordinate of the parabola at `x`.
    ///
    /// A degenerate parabola evaluates to `+∞` everywhere except exactly at
    /// the focus abscissa, where it reports the focus.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn eval(&self, x: f64) -> f64 {
        if self.is_degenerate() {
            return if x == self.focus.x { self.focus.y } else { f64::INFINITY };
        }
        let dx = x - self.focus.x;
        dx * dx / (2.0 * self.p()) + 0.5 * (self.focus.y + self.directrix)
    }
}

/// The arc curve of a segment site: two perpendicular rays from `apex`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Vee {
    /// Upper endpoint of the segment.
    pub a: Point2,
    /// Lower endpoint of the segment.
    pub b: Point2,
    /// Supporting line of the segment.
    pub line: Line,
    /// Where the supporting line meets the directrix.
    pub apex: Point2,
    /// Slope of the ray rising to the left of the apex (negative).
    pub left_slope: f64,
    /// Slope of the ray rising to the right of the apex (positive).
    pub right_slope: f64,
}

impl Vee {
    /// Creates the V of segment `a`–`b` at the given directrix.
    ///
    /// Returns `None` for horizontal or zero-length segments, which have no
    /// apex.
    #[must_use]
    pub fn new(a: Point2, b: Point2, directrix: f64) -> Option<Self> {
        let line = Line::through(a, b)?;
        let dy = b.y - a.y;
        if dy.abs() <= f64::EPSILON * a.y.abs().max(b.y.abs()).max(1.0) {
            return None;
        }
        let t = (directrix - a.y) / dy;
        let apex = a + (b - a) * t;
        let n = line.normal;
        let m_plus = n.x / (1.0 - n.y);
        let m_minus = -n.x / (1.0 + n.y);
        if !m_plus.is_finite() || !m_minus.is_finite() || !apex.is_finite() {
            return None;
        }
        Some(Self {
            a,
            b,
            line,
            apex,
            left_slope: m_plus.min(m_minus),
            right_slope: m_plus.max(m_minus),
        })
    }

    /// Ordinate of the V at `x`.
    #[must_use]
    pub fn eval(&self, x: f64) -> f64 {
        let slope = if x >= self.apex.x {
            self.right_slope
        } else {
            self.left_slope
        };
        (x - self.apex.x).mul_add(slope, self.apex.y)
    }

    /// Whether `q` lies in the strip swept by the segment's normals, where
    /// distance to the supporting line equals distance to the segment.
    #[must_use]
    pub fn covers(&self, q: Point2) -> bool {
        let axis = self.b - self.a;
        let t = (q - self.a).dot(axis) / axis.dot(axis);
        (-SLAB_TOLERANCE..=1.0 + SLAB_TOLERANCE).contains(&t)
    }

    /// `(slope, is_left)` pairs for both rays.
    fn rays(&self) -> [(f64, bool); 2] {
        [(self.left_slope, true), (self.right_slope, false)]
    }

    fn on_ray(&self, x: f64, left: bool) -> bool {
        if left {
            x <= self.apex.x + RAY_DOMAIN_TOLERANCE
        } else {
            x >= self.apex.x - RAY_DOMAIN_TOLERANCE
        }
    }
}

/// The curve traced by one arc of the beachline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ArcCurve {
    /// Arc of a point site.
    Parabola(Parabola),
    /// Arc of a segment site.
    Vee(Vee),
}

impl ArcCurve {
    /// Curve of `site` at the given directrix.
    #[must_use]
    pub fn new(site: &SiteShape, directrix: f64) -> Option<Self> {
        match *site {
            SiteShape::Point(p) => Some(Self::Parabola(Parabola::new(p, directrix))),
            SiteShape::Segment(a, b) => Vee::new(a, b, directrix).map(Self::Vee),
        }
    }

    /// Ordinate at `x`.
    #[must_use]
    pub fn eval(&self, x: f64) -> f64 {
        match self {
            Self::Parabola(p) => p.eval(x),
            Self::Vee(v) => v.eval(x),
        }
    }

    /// Abscissa of the lowest point of the curve.
    #[must_use]
    pub fn anchor_x(&self) -> f64 {
        match self {
            Self::Parabola(p) => p.focus.x,
            Self::Vee(v) => v.apex.x,
        }
    }
}

// =============================================================================
// BREAKPOINTS
// =============================================================================

/// Breakpoint between the arc of `left` and the arc of `right` at the given
/// directrix.
///
/// Returns `None` when the curves do not meet.
///
/// # Examples
///
/// ```rust
/// use gvd_sweep::geometry::bisector::intersect_arcs;
/// use gvd_sweep::geometry::equidistant::SiteShape;
/// use gvd_sweep::geometry::point::Point2;
///
/// let left = SiteShape::Point(Point2::new(0.0, 1.0));
/// let right = SiteShape::Point(Point2::new(2.0, 1.0));
/// let breakpoint = intersect_arcs(&left, &right, 0.0).unwrap();
/// assert!((breakpoint.x - 1.0).abs() < 1e-12);
/// ```
#[must_use]
pub fn intersect_arcs(left: &SiteShape, right: &SiteShape, directrix: f64) -> Option<Point2> {
    let l = ArcCurve::new(left, directrix)?;
    let r = ArcCurve::new(right, directrix)?;

    match (&l, &r) {
        (ArcCurve::Parabola(pl), ArcCurve::Parabola(pr)) => parabola_breakpoint(pl, pr),
        (ArcCurve::Parabola(p), ArcCurve::Vee(v)) => {
            if v.a == p.focus || v.b == p.focus {
                endpoint_breakpoint(p.focus, v, directrix, true)
            } else if p.is_degenerate() {
                Some(Point2::new(p.focus.x, v.eval(p.focus.x)))
            } else {
                pick_transition(&l, &r, within_slabs(parabola_vee_crossings(p, v), &[v]))
            }
        }
        (ArcCurve::Vee(v), ArcCurve::Parabola(p)) => {
            if v.a == p.focus || v.b == p.focus {
                endpoint_breakpoint(p.focus, v, directrix, false)
            } else if p.is_degenerate() {
                Some(Point2::new(p.focus.x, v.eval(p.focus.x)))
            } else {
                pick_transition(&l, &r, within_slabs(parabola_vee_crossings(p, v), &[v]))
            }
        }
        (ArcCurve::Vee(vl), ArcCurve::Vee(vr)) => {
            pick_transition(&l, &r, within_slabs(vee_crossings(vl, vr), &[vl, vr]))
        }
    }
}

/// Breakpoint of two parabolas.
///
/// With two crossings the site with the greater ordinate decides the branch:
/// a higher left site yields the smaller root, otherwise the larger one.
fn parabola_breakpoint(left: &Parabola, right: &Parabola) -> Option<Point2> {
    match (left.is_degenerate(), right.is_degenerate()) {
        (true, true) => {
            let x = 0.5 * (left.focus.x + right.focus.x);
            return Some(Point2::new(x, left.focus.y.max(right.focus.y)));
        }
        (true, false) => {
            let x = left.focus.x;
            return Some(Point2::new(x, right.eval(x)));
        }
        (false, true) => {
            let x = right.focus.x;
            return Some(Point2::new(x, left.eval(x)));
        }
        (false, false) => {}
    }

    let (p1, p2) = (left.p(), right.p());
    let (h1, h2) = (left.focus.x, right.focus.x);
    let a = 1.0 / (2.0 * p1) - 1.0 / (2.0 * p2);
    let b = h2 / p2 - h1 / p1;
    let c = h1 * h1 / (2.0 * p1) - h2 * h2 / (2.0 * p2) + 0.5 * (left.focus.y - right.focus.y);
    let roots = solve_quadratic(a, b, c);
    let x = match roots.as_slice() {
        [] => return None,
        [x] => *x,
        [x0, x1, ..] => {
            if left.focus.y > right.focus.y {
                *x0
            } else {
                *x1
            }
        }
    };
    Some(Point2::new(x, left.eval(x)))
}

/// Breakpoint between a point site and a segment it terminates.
///
/// The two regions meet on the segment normal through the shared endpoint,
/// which crosses the endpoint's parabola once on each side of the segment.
/// Below an upper endpoint the V owns the stretch between the two crossings,
/// so a point arc on the left ends at the western one. Past a lower endpoint
/// the roles swap.
#[allow(clippy::float_cmp)]
fn endpoint_breakpoint(
    endpoint: Point2,
    vee: &Vee,
    directrix: f64,
    point_is_left: bool,
) -> Option<Point2> {
    let height = endpoint.y - directrix;
    if height <= 0.0 {
        return Some(endpoint);
    }
    let crossing = |n: Point2| {
        let denom = 1.0 - n.y;
        let q = endpoint + n * (height / denom);
        (denom > f64::EPSILON && q.is_finite()).then_some(q)
    };
    let (west, east) = match (crossing(vee.line.normal), crossing(-vee.line.normal)) {
        (Some(p), Some(q)) if p.x <= q.x => (p, q),
        (Some(p), Some(q)) => (q, p),
        (Some(p), None) | (None, Some(p)) => (p, p),
        (None, None) => return None,
    };
    let lower = endpoint == vee.b;
    Some(if point_is_left != lower { west } else { east })
}

fn parabola_vee_crossings(p: &Parabola, v: &Vee) -> SmallBuffer<f64, 8> {
    let mut xs = SmallBuffer::new();
    let h = p.focus.x;
    let k = 0.5 * (p.focus.y + p.directrix);
    let pp = p.p();
    for (m, left) in v.rays() {
        // u = x − h; u² − 2pm·u + 2p(k − apex.y − m(h − apex.x)) = 0
        let c = 2.0 * pp * (k - v.apex.y - m * (h - v.apex.x));
        for u in solve_quadratic(1.0, -2.0 * pp * m, c) {
            let x = u + h;
            if v.on_ray(x, left) {
                xs.push(x);
            }
        }
    }
    xs
}

fn vee_crossings(l: &Vee, r: &Vee) -> SmallBuffer<f64, 8> {
    let mut xs = SmallBuffer::new();
    for (m1, left1) in l.rays() {
        for (m2, left2) in r.rays() {
            let dm = m1 - m2;
            if dm.abs() <= f64::EPSILON * m1.abs().max(m2.abs()).max(1.0) {
                continue;
            }
            let x = (r.apex.y - l.apex.y + m1 * l.apex.x - m2 * r.apex.x) / dm;
            if x.is_finite() && l.on_ray(x, left1) && r.on_ray(x, left2) {
                xs.push(x);
            }
        }
    }
    xs
}

/// Keeps the crossings that lie within the strip of every V involved.
///
/// A crossing outside a strip measures distance to the supporting line past
/// the segment's end and is not a breakpoint of the segment itself. If
/// nothing survives the unfiltered list is returned.
fn within_slabs(xs: SmallBuffer<f64, 8>, vees: &[&Vee]) -> SmallBuffer<f64, 8> {
    let mut kept = xs.clone();
    kept.retain(|x| vees.iter().all(|v| v.covers(Point2::new(*x, v.eval(*x)))));
    if kept.is_empty() { xs } else { kept }
}

/// Chooses the crossing where the envelope switches from `left` to `right`.
///
/// Crossings are sorted and merged within [`CONSOLIDATE_TOLERANCE`]. Each
/// crossing is judged by sampling both curves in the gaps on either side.
/// Ties go to the crossing nearest the midpoint of the two anchors.
fn pick_transition(left: &ArcCurve, right: &ArcCurve, mut xs: SmallBuffer<f64, 8>) -> Option<Point2> {
    xs.retain(|x| x.is_finite());
    if xs.is_empty() {
        return None;
    }
    xs.sort_by(f64::total_cmp);
    xs.dedup_by(|b, a| (*b - *a).abs() <= CONSOLIDATE_TOLERANCE);

    let span = (xs[xs.len() - 1] - xs[0]).max(1.0);
    let pivot = 0.5 * (left.anchor_x() + right.anchor_x());

    let qualifies = |i: usize| {
        let before = if i == 0 { xs[0] - span } else { 0.5 * (xs[i - 1] + xs[i]) };
        let after = if i + 1 == xs.len() {
            xs[i] + span
        } else {
            0.5 * (xs[i] + xs[i + 1])
        };
        left.eval(before) < right.eval(before) && right.eval(after) < left.eval(after)
    };

    let x = nearest_to(pivot, (0..xs.len()).filter(|&i| qualifies(i)).map(|i| xs[i]))
        .or_else(|| nearest_to(pivot, xs.iter().copied()))?;

    let (yl, yr) = (left.eval(x), right.eval(x));
    let y = match (yl.is_finite(), yr.is_finite()) {
        (true, true) => 0.5 * (yl + yr),
        (true, false) => yl,
        (false, true) => yr,
        (false, false) => return None,
    };
    Some(Point2::new(x, y))
}

fn nearest_to(pivot: f64, xs: impl Iterator<Item = f64>) -> Option<f64> {
    xs.min_by(|a, b| (a - pivot).abs().total_cmp(&(b - pivot).abs()))
}

// =============================================================================
// TESTS
// =============================================================================
