//! Close events: deciding when and where an arc disappears.
//!
//! An arc closes when its two neighbours meet above it, at a point as far
//! from all three sites as from the directrix. For three point sites that
//! point is the circumcentre and the usual orientation rule decides whether
//! the breakpoints converge. Once a segment takes part, [`equidistant`] can
//! return several candidates and each one must pass a chain of gates:
//!
//! 1. **Diff test**: at the candidate's event height both breakpoints of the
//!    arc must coincide ([`diff`], [`choose_close_point`]).
//! 2. **Radius test**: every site of the triple lies at the same distance
//!    from the candidate ([`radius_test`]).
//! 3. **Admissibility**: half-plane and circle tests rule out candidates
//!    that a segment separates from the arc ([`can_close`],
//!    [`circle_test`]).
//!
//! [`evaluate_close`] runs the whole chain and explains its verdict through
//! [`CloseOutcome`]; [`create_close_event`] is the plain `Option` form.
//! Observations along the way go to a [`CandidateObserver`], by default
//! [`TracingObserver`].

#![forbid(unsafe_code)]

use crate::core::beachline::{Beachline, BeachlineError, NodeKey};
use crate::core::site::{SegmentSite, Site, SiteId, SiteSet};
use crate::geometry::bisector::intersect_arcs;
use crate::geometry::equidistant::{Equidistant, equidistant};
use crate::geometry::point::Point2;
use crate::geometry::predicates::{
    Orientation, circle_segment_intersections, is_right_of_line, orientation,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Score given to a candidate whose breakpoints cannot be evaluated.
pub const DIFF_SENTINEL: f64 = 1e10;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised while computing close events.
///
/// A triple that simply does not close is not an error; see
/// [`CloseOutcome::Rejected`].
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CloseEventError {
    /// Every gate passed but no finite radius could be computed.
    #[error("Close event {triple} has no finite radius")]
    UndefinedRadius {
        /// The triple being closed.
        triple: TripleId,
    },
    /// The beachline could not be navigated.
    #[error("Beachline error while computing a close event: {0}")]
    Beachline(#[from] BeachlineError),
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Acceptance rule for candidates next to nearly horizontal segments, where
/// the diff test is unreliable.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShallowSitePolicy {
    /// Accept the best candidate regardless of its diff when an outer
    /// neighbour is shallow.
    pub enabled: bool,
    /// A segment is shallow when `|Δy| <= max_slope * |Δx|`.
    pub max_slope: f64,
}

impl Default for ShallowSitePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_slope: 0.1,
        }
    }
}

impl ShallowSitePolicy {
    /// `true` if the policy applies to `site`.
    #[must_use]
    pub fn is_shallow(&self, site: &Site) -> bool {
        match site {
            Site::Segment(s) if self.enabled => {
                let d = s.b - s.a;
                d.y.abs() <= self.max_slope * d.x.abs()
            }
            _ => false,
        }
    }
}

/// Tolerances of the close-event gates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CloseEventConfig {
    /// Largest breakpoint gap accepted by the diff test.
    pub max_diff: f64,
    /// Allowed spread of site distances in the radius and circle tests.
    pub radius_tolerance: f64,
    /// Multiply [`Self::radius_tolerance`] by `max(1, radius)`. Off by
    /// default.
    #[serde(default)]
    pub scale_radius_tolerance: bool,
    /// Events whose points coincide within this distance are merged.
    pub dedup_tolerance: f64,
    /// Slack when rejecting candidates whose event lies above the directrix.
    pub directrix_margin: f64,
    /// Handling of shallow outer neighbours.
    pub shallow_sites: ShallowSitePolicy,
}

impl Default for CloseEventConfig {
    fn default() -> Self {
        Self {
            max_diff: 1e-2,
            radius_tolerance: 1e-8,
            scale_radius_tolerance: false,
            dedup_tolerance: 1e-5,
            directrix_margin: 1e-13,
            shallow_sites: ShallowSitePolicy::default(),
        }
    }
}

impl CloseEventConfig {
    /// Distance tolerance for a circle of the given radius.
    #[must_use]
    pub fn radius_slack(&self, radius: f64) -> f64 {
        if self.scale_radius_tolerance {
            self.radius_tolerance * radius.max(1.0)
        } else {
            self.radius_tolerance
        }
    }
}

// =============================================================================
// EVENTS
// =============================================================================

/// The sites of a `(left, arc, right)` triple.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TripleId {
    /// Left neighbour.
    pub left: SiteId,
    /// The closing arc.
    pub arc: SiteId,
    /// Right neighbour.
    pub right: SiteId,
}

impl fmt::Display for TripleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.left, self.arc, self.right)
    }
}

/// A scheduled disappearance of an arc.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CloseEvent {
    /// Directrix height at which the event fires: `point.y - radius`.
    pub y: f64,
    /// Where the arc vanishes; becomes a Voronoi vertex.
    pub point: Point2,
    /// Distance from `point` to the sites of the triple.
    pub radius: f64,
    /// Cleared when the event is superseded or cancelled.
    pub live: bool,
    /// The closing arc.
    pub arc: NodeKey,
    /// Its left neighbour when the event was created.
    pub left: NodeKey,
    /// Its right neighbour when the event was created.
    pub right: NodeKey,
    /// Sites of the triple.
    pub triple: TripleId,
}

impl CloseEvent {
    /// Identifier `"<left>-<arc>-<right>"` of the triple.
    #[must_use]
    pub fn id(&self) -> String {
        self.triple.to_string()
    }
}

/// A resolved triple.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TripleSites {
    /// Site ids.
    pub id: TripleId,
    /// Left neighbour.
    pub left: Site,
    /// The closing arc.
    pub arc: Site,
    /// Right neighbour.
    pub right: Site,
}

impl TripleSites {
    /// Looks the three sites up.
    ///
    /// # Errors
    ///
    /// Returns [`BeachlineError::MissingSite`] (wrapped) for an unknown id.
    pub fn resolve(sites: &SiteSet, id: TripleId) -> Result<Self, CloseEventError> {
        let get = |site: SiteId| {
            sites
                .get(site)
                .copied()
                .ok_or(BeachlineError::MissingSite { site })
        };
        Ok(Self {
            id,
            left: get(id.left)?,
            arc: get(id.arc)?,
            right: get(id.right)?,
        })
    }

    /// `(id, site)` pairs in left, arc, right order.
    #[must_use]
    pub const fn entries(&self) -> [(SiteId, &Site); 3] {
        [
            (self.id.left, &self.left),
            (self.id.arc, &self.arc),
            (self.id.right, &self.right),
        ]
    }

    /// `true` if all three are point sites.
    #[must_use]
    pub const fn all_points(&self) -> bool {
        self.left.is_point() && self.arc.is_point() && self.right.is_point()
    }

    /// `true` if all three are segment sites.
    #[must_use]
    pub const fn all_segments(&self) -> bool {
        self.left.is_segment() && self.arc.is_segment() && self.right.is_segment()
    }
}

// =============================================================================
// OUTCOMES AND OBSERVATION
// =============================================================================

/// Why a triple produced no close event.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Rejection {
    /// The arc lacks a neighbour on one side.
    MissingNeighbor,
    /// Three collinear point sites.
    Collinear,
    /// The breakpoints of the arc move apart.
    Diverging,
    /// A segment arc between its own two endpoints.
    SelfClosure,
    /// No point is equidistant from the triple.
    NoCandidates,
    /// The only candidate failed the diff test.
    DiffExceeded {
        /// Its breakpoint gap.
        diff: f64,
    },
    /// Every candidate failed the diff test.
    NoViableCandidate {
        /// The smallest breakpoint gap seen.
        least_diff: f64,
    },
    /// The sites are not all at the same distance from the candidate.
    RadiusMismatch,
    /// The candidate lies on the wrong side of a segment starting at the arc.
    HalfPlane,
    /// A segment arc and its top endpoint arc are on inconsistent sides.
    WrongSide,
    /// A segment crosses the empty circle around the candidate.
    CircleObstructed {
        /// The crossing segment.
        segment: SiteId,
    },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingNeighbor => f.write_str("arc has no neighbour on one side"),
            Self::Collinear => f.write_str("point sites are collinear"),
            Self::Diverging => f.write_str("breakpoints diverge"),
            Self::SelfClosure => f.write_str("segment arc between its own endpoints"),
            Self::NoCandidates => f.write_str("no equidistant point"),
            Self::DiffExceeded { diff } => write!(f, "diff {diff:e} exceeds tolerance"),
            Self::NoViableCandidate { least_diff } => {
                write!(f, "least diff {least_diff:e} exceeds tolerance")
            }
            Self::RadiusMismatch => f.write_str("sites are not equidistant"),
            Self::HalfPlane => f.write_str("candidate on the wrong side of the arc's segment"),
            Self::WrongSide => f.write_str("segment arc on the wrong side of its top endpoint"),
            Self::CircleObstructed { segment } => {
                write!(f, "segment {segment} crosses the empty circle")
            }
        }
    }
}

/// Verdict of [`evaluate_close`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum CloseOutcome {
    /// The arc closes.
    Event(CloseEvent),
    /// The arc shares a pending close with a neighbour; leave its current
    /// event untouched until that one is processed.
    Deferred,
    /// The arc does not close.
    Rejected(Rejection),
}

/// Receives what the gates decide. All methods default to doing nothing.
pub trait CandidateObserver {
    /// A candidate was scored by the diff test.
    fn candidate(&mut self, _triple: TripleId, _point: Point2, _diff: f64) {}
    /// A triple was rejected.
    fn rejected(&mut self, _triple: TripleId, _reason: Rejection) {}
    /// A triple was deferred.
    fn deferred(&mut self, _triple: TripleId) {}
    /// A close event was produced.
    fn accepted(&mut self, _event: &CloseEvent) {}
}

/// Forwards observations to `tracing` at `TRACE` level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl CandidateObserver for TracingObserver {
    fn candidate(&mut self, triple: TripleId, point: Point2, diff: f64) {
        tracing::trace!(%triple, %point, diff, "close candidate scored");
    }

    fn rejected(&mut self, triple: TripleId, reason: Rejection) {
        tracing::trace!(%triple, %reason, "close rejected");
    }

    fn deferred(&mut self, triple: TripleId) {
        tracing::trace!(%triple, "close deferred to a shared pending event");
    }

    fn accepted(&mut self, event: &CloseEvent) {
        tracing::trace!(
            triple = %event.triple,
            point = %event.point,
            y = event.y,
            radius = event.radius,
            "close event created"
        );
    }
}

/// Everything the gates read besides the beachline.
pub struct CloseContext<'a> {
    /// The input sites.
    pub sites: &'a SiteSet,
    /// Gate tolerances.
    pub config: &'a CloseEventConfig,
    observer: Option<&'a mut dyn CandidateObserver>,
    fallback: TracingObserver,
}

impl fmt::Debug for CloseContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CloseContext")
            .field("sites", &self.sites.len())
            .field("config", self.config)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl<'a> CloseContext<'a> {
    /// A context reporting to [`TracingObserver`].
    #[must_use]
    pub const fn new(sites: &'a SiteSet, config: &'a CloseEventConfig) -> Self {
        Self {
            sites,
            config,
            observer: None,
            fallback: TracingObserver,
        }
    }

    /// Reports to `observer` instead.
    #[must_use]
    pub fn with_observer(mut self, observer: &'a mut dyn CandidateObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    fn observer(&mut self) -> &mut (dyn CandidateObserver + 'a) {
        match self.observer.as_mut() {
            Some(observer) => &mut **observer,
            None => &mut self.fallback,
        }
    }

    fn reject(&mut self, triple: TripleId, reason: Rejection) -> CloseOutcome {
        self.observer().rejected(triple, reason);
        CloseOutcome::Rejected(reason)
    }

    fn accept(&mut self, event: CloseEvent) -> CloseOutcome {
        self.observer().accepted(&event);
        CloseOutcome::Event(event)
    }
}

// =============================================================================
// GATES
// =============================================================================

/// Radius of the empty circle around `p`: the smallest site distance when
/// all three sites are segments, otherwise the distance to the first point
/// site in left, arc, right order.
#[must_use]
pub fn close_radius(triple: &TripleSites, p: Point2) -> f64 {
    if triple.all_segments() {
        return triple
            .entries()
            .iter()
            .map(|(_, s)| s.distance_to(p))
            .fold(f64::INFINITY, f64::min);
    }
    triple
        .entries()
        .iter()
        .find(|(_, s)| s.is_point())
        .map_or(f64::NAN, |(_, s)| s.distance_to(p))
}

/// `true` if every site of the triple is within `tolerance` of the same
/// distance from `p`. Three segments always pass.
#[must_use]
pub fn radius_test(triple: &TripleSites, p: Point2, tolerance: f64) -> bool {
    if triple.all_segments() {
        return true;
    }
    let mut radius: Option<f64> = None;
    for (_, site) in triple.entries().iter().filter(|(_, s)| s.is_point()) {
        let d = site.distance_to(p);
        match radius {
            None => radius = Some(d),
            Some(r) if (r - d).abs() > tolerance => return false,
            Some(_) => {}
        }
    }
    let Some(radius) = radius else {
        return true;
    };
    triple
        .entries()
        .iter()
        .filter(|(_, s)| s.is_segment())
        .all(|(_, s)| (s.distance_to(p) - radius).abs() <= tolerance)
}

/// Breakpoint gap of the arc at the height where `p` would close it.
///
/// Returns [`DIFF_SENTINEL`] if that height lies above `directrix` or either
/// breakpoint cannot be evaluated there.
#[must_use]
pub fn diff(triple: &TripleSites, p: Point2, directrix: f64, config: &CloseEventConfig) -> f64 {
    let radius = close_radius(triple, p);
    let y = p.y - radius;
    if !y.is_finite() || y - config.directrix_margin > directrix {
        return DIFF_SENTINEL;
    }
    let (left, arc, right) = (triple.left.shape(), triple.arc.shape(), triple.right.shape());
    let (Some(i0), Some(i1)) = (
        intersect_arcs(&left, &arc, y),
        intersect_arcs(&arc, &right, y),
    ) else {
        return DIFF_SENTINEL;
    };
    let gap = (i0.x - i1.x).abs() + (i0.y - i1.y).abs();
    if gap.is_finite() { gap } else { DIFF_SENTINEL }
}

/// Picks the candidate with the smallest [`diff`].
///
/// # Errors
///
/// Returns [`Rejection::NoCandidates`] for an empty list, or
/// [`Rejection::NoViableCandidate`] if the best diff exceeds
/// [`CloseEventConfig::max_diff`] and neither outer neighbour is shallow.
pub fn choose_close_point(
    triple: &TripleSites,
    candidates: &[Point2],
    directrix: f64,
    ctx: &mut CloseContext<'_>,
) -> Result<Point2, Rejection> {
    let mut best: Option<(Point2, f64)> = None;
    for &p in candidates {
        let d = diff(triple, p, directrix, ctx.config);
        ctx.observer().candidate(triple.id, p, d);
        if best.is_none_or(|(_, least)| d < least) {
            best = Some((p, d));
        }
    }
    let (point, least_diff) = best.ok_or(Rejection::NoCandidates)?;
    let policy = &ctx.config.shallow_sites;
    if policy.is_shallow(&triple.left) || policy.is_shallow(&triple.right) {
        return Ok(point);
    }
    if least_diff > ctx.config.max_diff {
        return Err(Rejection::NoViableCandidate { least_diff });
    }
    Ok(point)
}

/// Fails if some segment attached to the triple crosses the circle of
/// `radius` around `center` in two places.
///
/// Point sites contribute the segments incident to them; segment sites
/// contribute themselves.
///
/// # Errors
///
/// Returns [`Rejection::CircleObstructed`] naming the first crossing segment.
pub fn circle_test(
    triple: &TripleSites,
    center: Point2,
    radius: f64,
    sites: &SiteSet,
    tolerance: f64,
) -> Result<(), Rejection> {
    let crosses = |segment: SiteId| {
        sites.segment(segment).is_some_and(|s| {
            circle_segment_intersections(center, radius, s.a, s.b, tolerance).len() == 2
        })
    };
    for (id, site) in triple.entries() {
        let obstruction = match site {
            Site::Point(_) => sites
                .segments_incident_to(id)
                .iter()
                .copied()
                .find(|s| crosses(*s)),
            Site::Segment(_) => Some(id).filter(|s| crosses(*s)),
        };
        if let Some(segment) = obstruction {
            return Err(Rejection::CircleObstructed { segment });
        }
    }
    Ok(())
}

/// Topological admissibility of closing the arc at `p`.
///
/// - A segment arc flanked by two point arcs, one of them its top endpoint,
///   closes only if the other point lies on the matching side of the
///   segment.
/// - A point arc that is the top endpoint of a neighbouring segment arc
///   closes only on the matching side of that segment's line; it must then
///   also pass [`circle_test`], as must every other point arc.
///
/// # Errors
///
/// Returns the failing [`Rejection`].
pub fn can_close(
    triple: &TripleSites,
    p: Point2,
    sites: &SiteSet,
    tolerance: f64,
) -> Result<(), Rejection> {
    let id = triple.id;
    match triple.arc {
        Site::Segment(seg) => {
            if let (Site::Point(left), Site::Point(right)) = (triple.left, triple.right) {
                let turn = |q: Point2| orientation(seg.b, seg.a, q, 0.0);
                if id.left == seg.upper && turn(right.position) != Orientation::POSITIVE {
                    return Err(Rejection::WrongSide);
                }
                if id.left != seg.upper
                    && id.right == seg.upper
                    && turn(left.position) != Orientation::NEGATIVE
                {
                    return Err(Rejection::WrongSide);
                }
            }
            Ok(())
        }
        Site::Point(point) => {
            let ends = |s: &SegmentSite| s.upper == id.arc || s.lower == id.arc;
            let half_plane = match (triple.left, triple.right) {
                (Site::Segment(s), _) if ends(&s) => Some(is_right_of_line(s.a, s.b, p)),
                (_, Site::Segment(s)) if ends(&s) => Some(!is_right_of_line(s.a, s.b, p)),
                _ => None,
            };
            if half_plane == Some(false) {
                return Err(Rejection::HalfPlane);
            }
            circle_test(triple, p, point.position.distance(p), sites, tolerance)
        }
    }
}

// =============================================================================
// EVALUATION
// =============================================================================

/// Decides whether `arc` closes and where.
///
/// # Errors
///
/// Returns [`CloseEventError::Beachline`] if the arc's neighbourhood cannot
/// be read, or [`CloseEventError::UndefinedRadius`] if an accepted candidate
/// has no finite radius.
pub fn evaluate_close(
    beachline: &Beachline,
    arc: NodeKey,
    directrix: f64,
    ctx: &mut CloseContext<'_>,
) -> Result<CloseOutcome, CloseEventError> {
    let (Some(left), Some(right)) = (beachline.prev_arc(arc)?, beachline.next_arc(arc)?) else {
        return Ok(CloseOutcome::Rejected(Rejection::MissingNeighbor));
    };
    let id = TripleId {
        left: beachline.site_of(left)?,
        arc: beachline.site_of(arc)?,
        right: beachline.site_of(right)?,
    };
    let triple = TripleSites::resolve(ctx.sites, id)?;
    let event = |point: Point2, radius: f64| CloseEvent {
        y: point.y - radius,
        point,
        radius,
        live: true,
        arc,
        left,
        right,
        triple: id,
    };
    let shapes = (triple.left.shape(), triple.arc.shape(), triple.right.shape());
    let candidates = equidistant(&shapes.0, &shapes.1, &shapes.2);

    if triple.all_points() {
        let Equidistant::Unique(center) = candidates else {
            return Ok(ctx.reject(id, Rejection::Collinear));
        };
        let (l, a, r) = (triple.left.top(), triple.arc.top(), triple.right.top());
        if orientation(l, a, r, 0.0) != Orientation::NEGATIVE {
            return Ok(ctx.reject(id, Rejection::Diverging));
        }
        let radius = a.distance(center);
        if !radius.is_finite() {
            return Err(CloseEventError::UndefinedRadius { triple: id });
        }
        return Ok(ctx.accept(event(center.canonical(), radius)));
    }

    if let Site::Segment(seg) = triple.arc {
        let ends = (seg.upper, seg.lower);
        if (id.left, id.right) == ends || (id.right, id.left) == ends {
            return Ok(ctx.reject(id, Rejection::SelfClosure));
        }
        let tolerance = ctx.config.dedup_tolerance;
        if beachline.shares_pending_close(arc, left, tolerance)?
            || beachline.shares_pending_close(arc, right, tolerance)?
        {
            ctx.observer().deferred(id);
            return Ok(CloseOutcome::Deferred);
        }
    }

    let point = match candidates {
        Equidistant::None => return Ok(ctx.reject(id, Rejection::NoCandidates)),
        Equidistant::Unique(p) | Equidistant::Tangent(p) => {
            let d = diff(&triple, p, directrix, ctx.config);
            ctx.observer().candidate(id, p, d);
            if d > ctx.config.max_diff {
                return Ok(ctx.reject(id, Rejection::DiffExceeded { diff: d }));
            }
            p
        }
        Equidistant::Candidates(list) => match choose_close_point(&triple, &list, directrix, ctx) {
            Ok(p) => p,
            Err(reason) => return Ok(ctx.reject(id, reason)),
        },
    }
    .canonical();

    let radius = close_radius(&triple, point);
    let tolerance = ctx.config.radius_slack(radius);
    if !radius_test(&triple, point, tolerance) {
        return Ok(ctx.reject(id, Rejection::RadiusMismatch));
    }
    if !radius.is_finite() {
        return Err(CloseEventError::UndefinedRadius { triple: id });
    }
    if let Err(reason) = can_close(&triple, point, ctx.sites, tolerance) {
        return Ok(ctx.reject(id, reason));
    }
    Ok(ctx.accept(event(point, radius)))
}

/// [`evaluate_close`] reduced to the event, if any.
///
/// # Errors
///
/// Same as [`evaluate_close`].
pub fn create_close_event(
    beachline: &Beachline,
    arc: NodeKey,
    directrix: f64,
    ctx: &mut CloseContext<'_>,
) -> Result<Option<CloseEvent>, CloseEventError> {
    Ok(match evaluate_close(beachline, arc, directrix, ctx)? {
        CloseOutcome::Event(event) => Some(event),
        CloseOutcome::Deferred | CloseOutcome::Rejected(_) => None,
    })
}

/// Adds `event` to `events`, replacing an entry whose point coincides with
/// it within `tolerance`. `None` is ignored.
pub fn add_close_event(events: &mut Vec<CloseEvent>, event: Option<CloseEvent>, tolerance: f64) {
    let Some(event) = event else {
        return;
    };
    match events
        .iter_mut()
        .find(|e| e.point.coincides(event.point, tolerance))
    {
        Some(existing) => *existing = event,
        None => events.push(event),
    }
}

/// Creates the close events of `arcs`, merged by point.
///
/// # Errors
///
/// Same as [`evaluate_close`].
pub fn process_close_events(
    beachline: &Beachline,
    arcs: &[NodeKey],
    directrix: f64,
    ctx: &mut CloseContext<'_>,
) -> Result<Vec<CloseEvent>, CloseEventError> {
    let mut events = Vec::with_capacity(arcs.len());
    for &arc in arcs {
        let event = create_close_event(beachline, arc, directrix, ctx)?;
        add_close_event(&mut events, event, ctx.config.dedup_tolerance);
    }
    Ok(events)
}

// =============================================================================
// TESTS
// =============================================================================
