//! The sweep driver.
//!
//! A horizontal directrix moves from the highest site downwards. Two kinds of
//! event change the beachline:
//!
//! - **Site events**, one per point site. The point arrives together with
//!   every segment whose upper endpoint it is; their arcs enter as one run
//!   `[P, V…, P]` ordered left to right ([`arc_run`]). A point that ends
//!   segments already on the beachline attaches to their arcs instead
//!   ([`arc_fan`]).
//! - **Close events**, produced by [`crate::core::close_event`]. The arc is
//!   removed, a Voronoi vertex recorded, and the two arcs that become
//!   neighbours are examined again.
//!
//! Every structural change re-evaluates the arcs whose triples changed.
//! Superseded close events stay in the queue and are dropped when popped.
//!
//! # Examples
//!
//! ```rust
//! use gvd_sweep::core::site::SiteSet;
//! use gvd_sweep::core::sweep::{compute_diagram, SweepOptions};
//! use gvd_sweep::geometry::point::Point2;
//!
//! let sites = SiteSet::from_points(&[
//!     Point2::new(0.0, 2.0),
//!     Point2::new(-1.0, 0.0),
//!     Point2::new(1.0, 0.0),
//! ])
//! .unwrap();
//! let diagram = compute_diagram(&sites, SweepOptions::default()).unwrap();
//! assert_eq!(diagram.vertices.len(), 1);
//! assert!((diagram.vertices[0].y - 0.75).abs() < 1e-12);
//! ```

#![forbid(unsafe_code)]

use crate::core::beachline::{Beachline, BeachlineError, NodeKey};
use crate::core::close_event::{
    CandidateObserver, CloseContext, CloseEvent, CloseEventConfig, CloseEventError, CloseOutcome,
    add_close_event, evaluate_close,
};
use crate::core::collections::SmallBuffer;
use crate::core::dcel::{Dcel, DcelEdge};
use crate::core::event_queue::{EventQueue, SweepEvent};
use crate::core::site::{SiteError, SiteId, SiteSet};
use crate::geometry::point::Point2;
use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use thiserror::Error;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that abort a sweep.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SweepError {
    /// The input sites were rejected.
    #[error("Invalid sites: {0}")]
    Site(#[from] SiteError),
    /// The beachline lost an invariant.
    #[error("Beachline invariant violated: {0}")]
    Beachline(#[from] BeachlineError),
    /// A close event could not be computed.
    #[error("Close event failure: {0}")]
    CloseEvent(#[from] CloseEventError),
}

// =============================================================================
// OPTIONS
// =============================================================================

/// Sweep configuration.
///
/// ```rust
/// use gvd_sweep::core::sweep::SweepOptionsBuilder;
///
/// let options = SweepOptionsBuilder::default()
///     .stop_at(-1.0)
///     .validate_each_step(true)
///     .build()
///     .unwrap();
/// assert_eq!(options.stop_at, Some(-1.0));
/// assert!((options.event_tolerance - 1e-6).abs() < f64::EPSILON);
/// ```
#[derive(Builder, Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[builder(default)]
pub struct SweepOptions {
    /// Stop before the directrix passes below this height.
    #[builder(setter(strip_option))]
    pub stop_at: Option<f64>,
    /// Close-event gate tolerances.
    pub close_events: CloseEventConfig,
    /// Run [`Beachline::validate`] after every event.
    pub validate_each_step: bool,
    /// New close events more than this above the directrix are discarded;
    /// also the height slack for "site lies on the directrix".
    pub event_tolerance: f64,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            stop_at: None,
            close_events: CloseEventConfig::default(),
            validate_each_step: false,
            event_tolerance: 1e-6,
        }
    }
}

// =============================================================================
// OUTPUT
// =============================================================================

/// Event counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepStats {
    /// Site events handled.
    pub site_events: usize,
    /// Close events that removed an arc.
    pub close_events: usize,
    /// Superseded close events dropped from the queue.
    pub stale_events: usize,
    /// Close events discarded for lying above the directrix.
    pub discarded_events: usize,
}

/// Result of a sweep.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Diagram {
    /// Voronoi vertices in creation order.
    pub vertices: Vec<Point2>,
    /// Every edge started during the sweep; unfinished ones are rays.
    pub edges: Vec<DcelEdge>,
    /// Sites of the arcs left on the beachline, left to right.
    pub beachline: Vec<SiteId>,
    /// Close events still pending when the sweep stopped, highest first.
    pub pending: Vec<CloseEvent>,
    /// Last directrix position.
    pub directrix: f64,
    /// Event counters.
    pub stats: SweepStats,
}

impl Diagram {
    /// Edges with both ends known.
    pub fn finished_edges(&self) -> impl Iterator<Item = &DcelEdge> {
        self.edges.iter().filter(|e| e.is_finished())
    }
}

// =============================================================================
// DRIVER
// =============================================================================

/// Segments starting at point site `site` with the heading of each, sorted
/// left to right.
fn descending(sites: &SiteSet, site: SiteId) -> SmallBuffer<(f64, SiteId), 8> {
    let mut segments: SmallBuffer<(f64, SiteId), 8> = sites
        .segments_starting_at(site)
        .iter()
        .filter_map(|&id| sites.segment(id).map(|s| ((s.b - s.a).heading(), id)))
        .collect();
    segments.sort_by(|a, b| a.0.total_cmp(&b.0));
    segments
}

/// Arcs entering the beachline at point site `site` when no segment arrives
/// there from above: the segments starting there, left to right, wrapped in
/// the point's own arc on both sides.
#[must_use]
pub fn arc_run(sites: &SiteSet, site: SiteId) -> Vec<SiteId> {
    let segments = descending(sites, site);
    if segments.is_empty() {
        return vec![site];
    }
    let mut run = Vec::with_capacity(segments.len() + 2);
    run.push(site);
    run.extend(segments.iter().map(|(_, id)| *id));
    run.push(site);
    run
}

/// Arcs entering at point site `site` inside the angle swept
/// counter-clockwise from heading `from` to heading `to`, both measured at
/// the site towards the segments it ends.
///
/// The segments starting at the site fill the angle in order. The point's
/// own arc takes the one gap between them wider than a half turn, if there
/// is one.
#[must_use]
pub fn arc_fan(sites: &SiteSet, site: SiteId, from: f64, to: f64) -> Vec<SiteId> {
    let segments = descending(sites, site);
    let mut run = Vec::with_capacity(segments.len() + 1);
    let mut previous = from;
    let mut placed = false;
    for &(heading, id) in segments.iter().filter(|(h, _)| from < *h && *h < to) {
        if !placed && heading - previous > PI {
            run.push(site);
            placed = true;
        }
        run.push(id);
        previous = heading;
    }
    if !placed && to - previous > PI {
        run.push(site);
    }
    run
}

/// Incremental sweep over a [`SiteSet`].
pub struct Sweep<'s> {
    sites: &'s SiteSet,
    options: SweepOptions,
    beachline: Beachline,
    dcel: Dcel,
    queue: EventQueue,
    directrix: f64,
    stats: SweepStats,
    observer: Option<Box<dyn CandidateObserver + 's>>,
}

impl<'s> Sweep<'s> {
    /// Queues a site event for every point site.
    #[must_use]
    pub fn new(sites: &'s SiteSet, options: SweepOptions) -> Self {
        let mut queue = EventQueue::new();
        for (site, point) in sites.points() {
            queue.push(SweepEvent::Site {
                site,
                position: point.position,
            });
        }
        Self {
            sites,
            options,
            beachline: Beachline::new(),
            dcel: Dcel::new(),
            queue,
            directrix: f64::INFINITY,
            stats: SweepStats::default(),
            observer: None,
        }
    }

    /// Sends close-event observations to `observer` instead of `tracing`.
    #[must_use]
    pub fn with_observer(mut self, observer: Box<dyn CandidateObserver + 's>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// The current beachline.
    #[must_use]
    pub const fn beachline(&self) -> &Beachline {
        &self.beachline
    }

    /// Edges and vertices produced so far.
    #[must_use]
    pub const fn dcel(&self) -> &Dcel {
        &self.dcel
    }

    /// Current directrix height; `+∞` before the first event.
    #[must_use]
    pub const fn directrix(&self) -> f64 {
        self.directrix
    }

    /// Event counters.
    #[must_use]
    pub const fn stats(&self) -> SweepStats {
        self.stats
    }

    /// The next event, if any.
    #[must_use]
    pub fn peek(&self) -> Option<&SweepEvent> {
        self.queue.peek()
    }

    /// `true` once every event has been handled.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.queue.is_empty()
    }

    /// Handles the next event and returns it, or `None` if the queue is
    /// empty.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError`] if the beachline or the close-event engine
    /// fails; the sweep should not be continued afterwards.
    pub fn step(&mut self) -> Result<Option<SweepEvent>, SweepError> {
        let Some(event) = self.queue.pop() else {
            return Ok(None);
        };
        match event {
            SweepEvent::Site { site, position } => self.handle_site(site, position)?,
            SweepEvent::Close { key, .. } => {
                let Some(close) = self.beachline.take_close_event(key) else {
                    self.stats.stale_events += 1;
                    return Ok(Some(event));
                };
                if close.live {
                    self.handle_close(&close)?;
                } else {
                    self.stats.stale_events += 1;
                    tracing::debug!(triple = %close.triple, y = close.y, "stale close event dropped");
                }
            }
        }
        if self.options.validate_each_step {
            self.beachline.validate(self.directrix, self.sites)?;
        }
        Ok(Some(event))
    }

    /// Handles events until the queue is empty or the next one lies below
    /// [`SweepOptions::stop_at`].
    ///
    /// # Errors
    ///
    /// Same as [`Self::step`].
    pub fn run(&mut self) -> Result<(), SweepError> {
        while let Some(next) = self.queue.peek() {
            if self.options.stop_at.is_some_and(|stop| next.y() < stop) {
                tracing::debug!(y = next.y(), "sweep stopped");
                break;
            }
            self.step()?;
        }
        Ok(())
    }

    /// Snapshot of the output.
    ///
    /// # Errors
    ///
    /// Returns [`SweepError::Beachline`] if the beachline cannot be walked.
    pub fn diagram(&self) -> Result<Diagram, SweepError> {
        let mut pending: Vec<CloseEvent> = self.beachline.live_close_events().copied().collect();
        pending.sort_by(|a, b| b.y.total_cmp(&a.y));
        Ok(Diagram {
            vertices: self.dcel.vertices().to_vec(),
            edges: self.dcel.edges().map(|(_, e)| *e).collect(),
            beachline: self.beachline.arc_sites()?,
            pending,
            directrix: self.directrix,
            stats: self.stats,
        })
    }

    fn advance_to(&mut self, y: f64) {
        self.directrix = self.directrix.min(y);
    }

    fn handle_site(&mut self, site: SiteId, position: Point2) -> Result<(), SweepError> {
        self.advance_to(position.y);
        let ends_segments = self.sites.point(site).is_some_and(|p| p.flipped);
        let joined = if ends_segments {
            self.join_incoming(site, position)?
        } else {
            None
        };
        let touched = match joined {
            Some(touched) => touched,
            None => {
                if ends_segments {
                    tracing::warn!(
                        %site,
                        %position,
                        "no incoming segment arc next to its lower endpoint"
                    );
                }
                self.insert_run(site, position)?
            }
        };
        self.stats.site_events += 1;
        self.refresh(&touched)
    }

    /// Inserts the run of a site that no segment arrives at from above.
    fn insert_run(&mut self, site: SiteId, position: Point2) -> Result<Vec<NodeKey>, SweepError> {
        let run = arc_run(self.sites, site);
        tracing::debug!(%site, %position, arcs = run.len(), "site event");

        let Some(target) = self
            .beachline
            .locate_arc(position.x, self.directrix, self.sites)?
        else {
            return Ok(self.beachline.insert_first(&run, position, &mut self.dcel)?);
        };
        let target_site = self.beachline.site_of(target)?;
        let tolerance = self.options.event_tolerance;
        let on_directrix = self
            .sites
            .point(target_site)
            .is_some_and(|p| (p.position.y - self.directrix).abs() <= tolerance);
        if on_directrix {
            tracing::warn!(
                %site,
                beside = %target_site,
                "site shares the directrix with the arc above it; inserting beside"
            );
            let leaves = self.beachline.insert_beside(
                target,
                &run,
                position,
                self.sites,
                &mut self.dcel,
            )?;
            self.with_outer_neighbours(leaves)
        } else {
            Ok(self.beachline.split_arc(
                target,
                &run,
                position,
                self.directrix,
                self.sites,
                &mut self.dcel,
            )?)
        }
    }

    /// Attaches a lower endpoint to the arcs of the segments it ends.
    ///
    /// With one such arc next to the site, that arc is split around
    /// [`arc_fan`]. With two neighbouring ones, the fan goes between them and
    /// their breakpoint's edge ends at the site. Returns `None` when neither
    /// layout is found.
    fn join_incoming(
        &mut self,
        site: SiteId,
        position: Point2,
    ) -> Result<Option<Vec<NodeKey>>, SweepError> {
        let Some(target) = self
            .beachline
            .locate_arc(position.x, self.directrix, self.sites)?
        else {
            return Ok(None);
        };
        let mut near: SmallBuffer<NodeKey, 4> = SmallBuffer::new();
        near.extend(self.beachline.prev_arc(target)?);
        near.push(target);
        near.extend(self.beachline.next_arc(target)?);

        let mut incoming: SmallBuffer<(NodeKey, f64), 4> = SmallBuffer::new();
        for arc in near {
            let arc_site = self.beachline.site_of(arc)?;
            if let Some(segment) = self.sites.segment(arc_site)
                && segment.lower == site
            {
                incoming.push((arc, (segment.a - position).heading()));
            }
        }

        let touched = match incoming.as_slice() {
            &[(arc, heading)] => {
                let run = arc_fan(self.sites, site, heading, heading + TAU);
                tracing::debug!(
                    %site,
                    %position,
                    arcs = run.len(),
                    "site event ending one segment"
                );
                self.beachline.split_arc(
                    arc,
                    &run,
                    position,
                    self.directrix,
                    self.sites,
                    &mut self.dcel,
                )?
            }
            &[(left, from), (right, to)] if self.beachline.next_arc(left)? == Some(right) => {
                let run = arc_fan(self.sites, site, from, to + TAU);
                tracing::debug!(
                    %site,
                    %position,
                    arcs = run.len(),
                    "site event ending two segments"
                );
                let mut leaves = self.beachline.insert_between(
                    left,
                    right,
                    &run,
                    position,
                    &mut self.dcel,
                )?;
                leaves.push(right);
                leaves
            }
            _ => return Ok(None),
        };
        Ok(Some(touched))
    }

    fn with_outer_neighbours(&self, mut leaves: Vec<NodeKey>) -> Result<Vec<NodeKey>, SweepError> {
        if let Some(&first) = leaves.first()
            && let Some(prev) = self.beachline.prev_arc(first)?
        {
            leaves.insert(0, prev);
        }
        if let Some(&last) = leaves.last()
            && let Some(next) = self.beachline.next_arc(last)?
        {
            leaves.push(next);
        }
        Ok(leaves)
    }

    fn handle_close(&mut self, event: &CloseEvent) -> Result<(), SweepError> {
        self.advance_to(event.y);
        tracing::debug!(
            triple = %event.triple,
            point = %event.point,
            y = event.y,
            "close event"
        );
        self.dcel.add_vertex(event.point);
        let (left, right) = self
            .beachline
            .remove_arc(event.arc, event.point, &mut self.dcel)?;
        self.stats.close_events += 1;
        self.refresh(&[left, right])
    }

    /// Re-evaluates `arcs`. Each one either keeps its pending event
    /// (deferred), gets a new one, or loses it.
    fn refresh(&mut self, arcs: &[NodeKey]) -> Result<(), SweepError> {
        let directrix = self.directrix;
        let config = self.options.close_events;
        let mut ctx = CloseContext::new(self.sites, &config);
        if let Some(observer) = self.observer.as_deref_mut() {
            ctx = ctx.with_observer(observer);
        }

        let mut fresh: Vec<CloseEvent> = Vec::with_capacity(arcs.len());
        let mut deferred: SmallBuffer<NodeKey, 8> = SmallBuffer::new();
        for &arc in arcs {
            match evaluate_close(&self.beachline, arc, directrix, &mut ctx)? {
                CloseOutcome::Event(event) => {
                    add_close_event(&mut fresh, Some(event), config.dedup_tolerance);
                }
                CloseOutcome::Deferred => deferred.push(arc),
                CloseOutcome::Rejected(_) => {}
            }
        }

        for &arc in arcs {
            if !deferred.contains(&arc) {
                self.beachline.cancel_pending_close(arc)?;
            }
        }
        for event in fresh {
            if event.y > directrix + self.options.event_tolerance {
                self.stats.discarded_events += 1;
                tracing::debug!(
                    triple = %event.triple,
                    y = event.y,
                    directrix,
                    "close event above the directrix discarded"
                );
                continue;
            }
            let key = self.beachline.set_pending_close(event.arc, event)?;
            self.queue.push(SweepEvent::Close {
                key,
                y: event.y,
                x: event.point.x,
            });
        }
        Ok(())
    }
}

/// Sweeps `sites` to completion (or to [`SweepOptions::stop_at`]).
///
/// # Errors
///
/// Same as [`Sweep::step`].
pub fn compute_diagram(sites: &SiteSet, options: SweepOptions) -> Result<Diagram, SweepError> {
    let mut sweep = Sweep::new(sites, options);
    sweep.run()?;
    sweep.diagram()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::site::SiteSetBuilder;
    use approx::assert_relative_eq;

    fn three_points() -> SiteSet {
        SiteSet::from_points(&[
            Point2::new(0.0, 2.0),
            Point2::new(-1.0, 0.0),
            Point2::new(1.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn three_points_meet_at_circumcentre() {
        let sites = three_points();
        let options = SweepOptionsBuilder::default()
            .validate_each_step(true)
            .build()
            .unwrap();
        let diagram = compute_diagram(&sites, options).unwrap();

        assert_eq!(diagram.vertices.len(), 1);
        assert_relative_eq!(diagram.vertices[0], Point2::new(0.0, 0.75), epsilon = 1e-12);
        assert_eq!(
            diagram.beachline,
            vec![SiteId(0), SiteId(1), SiteId(2), SiteId(0)]
        );
        assert_eq!(diagram.edges.len(), 5);
        assert_eq!(diagram.finished_edges().count(), 2);
        assert!(diagram.pending.is_empty());
        assert_eq!(diagram.stats.site_events, 3);
        assert_eq!(diagram.stats.close_events, 1);
        assert_relative_eq!(diagram.directrix, -0.5, epsilon = 1e-12);
    }

    #[test]
    fn stop_at_leaves_events_pending() {
        let sites = three_points();
        let options = SweepOptionsBuilder::default().stop_at(-0.25).build().unwrap();
        let diagram = compute_diagram(&sites, options).unwrap();
        assert!(diagram.vertices.is_empty());
        assert_eq!(diagram.pending.len(), 1);
        assert_relative_eq!(diagram.pending[0].y, -0.5, epsilon = 1e-12);
    }

    #[test]
    fn step_reports_each_event() {
        let sites = three_points();
        let mut sweep = Sweep::new(&sites, SweepOptions::default());
        assert!(sweep.directrix().is_infinite());
        let mut kinds = Vec::new();
        while let Some(event) = sweep.step().unwrap() {
            kinds.push(event.is_site());
        }
        assert_eq!(kinds, vec![true, true, true, false]);
        assert!(sweep.is_finished());
        assert_eq!(sweep.dcel().vertices().len(), 1);
    }

    fn quadrilateral() -> (SiteSet, Vec<SiteId>) {
        let mut builder = SiteSetBuilder::new();
        let ids = builder
            .add_polygon(&[
                Point2::new(0.0, 2.0),
                Point2::new(1.0, 0.5),
                Point2::new(0.1, -1.0),
                Point2::new(-1.0, 0.4),
            ])
            .unwrap();
        (builder.build().unwrap(), ids)
    }

    #[test]
    fn run_wraps_segments_in_the_point_arc() {
        let (sites, ids) = quadrilateral();
        let top = ids[0];
        let run = arc_run(&sites, top);
        assert_eq!(run.len(), 4);
        assert_eq!((run[0], run[3]), (top, top));
        let left = sites.segment(run[1]).unwrap();
        let right = sites.segment(run[2]).unwrap();
        assert!(left.b.x < left.a.x);
        assert!(right.b.x > right.a.x);

        let free = SiteSet::from_points(&[Point2::ORIGIN]).unwrap();
        assert_eq!(arc_run(&free, SiteId(0)), vec![SiteId(0)]);
    }

    #[test]
    fn fan_puts_the_point_in_the_reflex_gap() {
        let (sites, ids) = quadrilateral();
        // (1, 0.5) ends the side from the top and starts the side to (0.1, -1).
        let right = ids[1];
        let outgoing = sites.segments_starting_at(right)[0];
        let from = (Point2::new(0.0, 2.0) - Point2::new(1.0, 0.5)).heading();
        assert_eq!(arc_fan(&sites, right, from, from + TAU), vec![outgoing, right]);

        // (-1, 0.4) is reached from the top on its right side.
        let left = ids[3];
        let outgoing = sites.segments_starting_at(left)[0];
        let from = (Point2::new(0.0, 2.0) - Point2::new(-1.0, 0.4)).heading();
        assert_eq!(arc_fan(&sites, left, from, from + TAU), vec![left, outgoing]);

        // The bottom vertex only ends segments.
        let bottom = ids[2];
        let from = (Point2::new(-1.0, 0.4) - Point2::new(0.1, -1.0)).heading();
        let to = (Point2::new(1.0, 0.5) - Point2::new(0.1, -1.0)).heading() + TAU;
        assert_eq!(arc_fan(&sites, bottom, from, to), vec![bottom]);
    }

    #[test]
    fn quadrilateral_sweeps_with_valid_beachline() {
        let (sites, _) = quadrilateral();
        let options = SweepOptionsBuilder::default()
            .validate_each_step(true)
            .build()
            .unwrap();
        let diagram = compute_diagram(&sites, options).unwrap();
        assert_eq!(diagram.stats.site_events, 4);
        assert!(diagram.pending.is_empty());
    }

    #[test]
    fn single_segment_sweeps_without_vertices() {
        let mut builder = SiteSetBuilder::new();
        let (segment, upper, lower) = builder
            .add_free_segment(Point2::new(0.0, 1.0), Point2::new(1.0, -1.0))
            .unwrap();
        let sites = builder.build().unwrap();
        let diagram = compute_diagram(&sites, SweepOptions::default()).unwrap();

        assert!(diagram.vertices.is_empty());
        assert!(diagram.beachline.contains(&segment));
        assert!(diagram.beachline.contains(&upper));
        assert!(diagram.beachline.contains(&lower));
        assert_eq!(diagram.stats.site_events, 2);
    }

    #[test]
    fn diagram_serializes() {
        let sites = three_points();
        let diagram = compute_diagram(&sites, SweepOptions::default()).unwrap();
        let json = serde_json::to_value(&diagram).unwrap();
        assert_eq!(json["vertices"].as_array().unwrap().len(), 1);
        assert_eq!(json["stats"]["close_events"], 1);
    }
}
