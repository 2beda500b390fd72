//! Close-event scenarios on hand-built beachlines.
//!
//! Each test lays out a short arc sequence with
//! [`Beachline::from_arc_sequence`] and asks the close-event engine what the
//! middle arc does.

#![forbid(unsafe_code)]

use approx::assert_relative_eq;
use gvd_sweep::core::beachline::{Beachline, NodeKey};
use gvd_sweep::core::close_event::{
    CandidateObserver, CloseContext, CloseEvent, CloseEventConfig, CloseOutcome, DIFF_SENTINEL,
    Rejection, ShallowSitePolicy, TripleId, TripleSites, add_close_event, can_close,
    choose_close_point, close_radius, create_close_event, diff, evaluate_close,
    process_close_events, radius_test,
};
use gvd_sweep::core::dcel::Dcel;
use gvd_sweep::core::site::{SiteId, SiteSet, SiteSetBuilder};
use gvd_sweep::geometry::equidistant::{Equidistant, equidistant};
use gvd_sweep::geometry::point::Point2;

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

fn points(coords: &[(f64, f64)]) -> SiteSet {
    let pts: Vec<Point2> = coords.iter().map(|&c| Point2::from(c)).collect();
    SiteSet::from_points(&pts).unwrap()
}

fn arcs(ids: &[SiteId]) -> (Beachline, Vec<NodeKey>) {
    let mut dcel = Dcel::new();
    Beachline::from_arc_sequence(ids, Point2::ORIGIN, &mut dcel).unwrap()
}

fn ids(n: usize) -> Vec<SiteId> {
    (0..n).map(SiteId).collect()
}

fn triple(sites: &SiteSet, left: SiteId, arc: SiteId, right: SiteId) -> TripleSites {
    TripleSites::resolve(sites, TripleId { left, arc, right }).unwrap()
}

#[derive(Default)]
struct Counter {
    candidates: Vec<(Point2, f64)>,
    deferred: usize,
    rejected: Vec<Rejection>,
}

impl CandidateObserver for Counter {
    fn candidate(&mut self, _triple: TripleId, point: Point2, diff: f64) {
        self.candidates.push((point, diff));
    }

    fn rejected(&mut self, _triple: TripleId, reason: Rejection) {
        self.rejected.push(reason);
    }

    fn deferred(&mut self, _triple: TripleId) {
        self.deferred += 1;
    }
}

// =============================================================================
// SCENARIO A: THREE POINTS
// =============================================================================

#[test]
fn points_opening_upwards_do_not_close() {
    init_tracing();
    // The middle site sits below its neighbours: the breakpoints move apart.
    let sites = points(&[(0.0, 2.0), (1.0, 1.0), (2.0, 2.0)]);
    let (beachline, keys) = arcs(&ids(3));
    let config = CloseEventConfig::default();
    let mut ctx = CloseContext::new(&sites, &config);

    let event = create_close_event(&beachline, keys[1], 1.0, &mut ctx).unwrap();
    assert!(event.is_none());
}

#[test]
fn points_converging_close_at_circumcentre() {
    init_tracing();
    let sites = points(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0)]);
    let (beachline, keys) = arcs(&ids(3));
    let config = CloseEventConfig::default();
    let mut ctx = CloseContext::new(&sites, &config);

    let event = create_close_event(&beachline, keys[1], 0.0, &mut ctx)
        .unwrap()
        .unwrap();
    assert_relative_eq!(event.point, Point2::new(1.0, 0.0), epsilon = 1e-12);
    assert_relative_eq!(event.radius, 1.0, epsilon = 1e-12);
    assert_relative_eq!(event.y, -1.0, epsilon = 1e-12);
    assert_eq!(event.arc, keys[1]);
    assert_eq!(event.left, keys[0]);
    assert_eq!(event.right, keys[2]);
    assert_eq!(event.id(), "0-1-2");
}

// =============================================================================
// SCENARIO B: COLLINEAR POINTS
// =============================================================================

#[test]
fn collinear_points_have_no_event() {
    init_tracing();
    let sites = points(&[(0.0, 0.0), (1.0, 0.0), (2.0, 0.0)]);
    let (beachline, keys) = arcs(&ids(3));
    let config = CloseEventConfig::default();
    let mut counter = Counter::default();
    let mut ctx = CloseContext::new(&sites, &config).with_observer(&mut counter);

    assert_eq!(
        create_close_event(&beachline, keys[1], -1.0, &mut ctx).unwrap(),
        None
    );
    drop(ctx);
    assert_eq!(counter.rejected, vec![Rejection::Collinear]);
}

// =============================================================================
// SCENARIO C: SEGMENT ARC BETWEEN ITS OWN ENDPOINTS
// =============================================================================

#[test]
fn segment_between_its_endpoints_never_closes() {
    init_tracing();
    let mut builder = SiteSetBuilder::new();
    let (segment, upper, lower) = builder
        .add_free_segment(Point2::new(0.0, 1.0), Point2::new(1.0, -1.0))
        .unwrap();
    let sites = builder.build().unwrap();
    let config = CloseEventConfig::default();

    for order in [[upper, segment, lower], [lower, segment, upper]] {
        let (beachline, keys) = arcs(&order);
        let mut ctx = CloseContext::new(&sites, &config);
        assert_eq!(
            evaluate_close(&beachline, keys[1], -2.0, &mut ctx).unwrap(),
            CloseOutcome::Rejected(Rejection::SelfClosure)
        );
    }
}

#[test]
fn segment_arc_sharing_a_pending_close_is_deferred() {
    init_tracing();
    let mut builder = SiteSetBuilder::new();
    let left = builder.add_point(Point2::new(-3.0, 2.0)).unwrap();
    let (segment, _, _) = builder
        .add_free_segment(Point2::new(0.0, 1.0), Point2::new(0.5, -1.0))
        .unwrap();
    let right = builder.add_point(Point2::new(3.0, 2.5)).unwrap();
    let far = builder.add_point(Point2::new(6.0, 3.0)).unwrap();
    let sites = builder.build().unwrap();
    let (mut beachline, keys) = arcs(&[left, segment, right, far]);

    let shared = Point2::new(1.0, -1.0);
    let pending = |arc: usize, left: usize, right: usize, triple: TripleId| CloseEvent {
        y: -4.0,
        point: shared,
        radius: 3.0,
        live: true,
        arc: keys[arc],
        left: keys[left],
        right: keys[right],
        triple,
    };
    let segment_event = pending(
        1,
        0,
        2,
        TripleId {
            left,
            arc: segment,
            right,
        },
    );
    let right_event = pending(
        2,
        1,
        3,
        TripleId {
            left: segment,
            arc: right,
            right: far,
        },
    );
    beachline.set_pending_close(keys[1], segment_event).unwrap();
    beachline.set_pending_close(keys[2], right_event).unwrap();

    let config = CloseEventConfig::default();
    let mut counter = Counter::default();
    let mut ctx = CloseContext::new(&sites, &config).with_observer(&mut counter);
    assert_eq!(
        evaluate_close(&beachline, keys[1], 0.0, &mut ctx).unwrap(),
        CloseOutcome::Deferred
    );
    drop(ctx);
    assert_eq!(counter.deferred, 1);
    // The existing event is untouched.
    assert_eq!(beachline.pending_close(keys[1]).unwrap(), Some(&segment_event));
}

// =============================================================================
// SCENARIO D: DEDUPLICATION
// =============================================================================

#[test]
fn coincident_events_from_distinct_triples_are_merged() {
    init_tracing();
    // Four cocircular points: triples 0-1-2 and 1-2-3 close at the centre.
    let sites = points(&[(-1.0, 0.0), (-0.6, 0.8), (0.6, 0.8), (1.0, 0.0)]);
    let (beachline, keys) = arcs(&ids(4));
    let config = CloseEventConfig::default();
    let mut ctx = CloseContext::new(&sites, &config);

    let first = create_close_event(&beachline, keys[1], 0.0, &mut ctx)
        .unwrap()
        .unwrap();
    let second = create_close_event(&beachline, keys[2], 0.0, &mut ctx)
        .unwrap()
        .unwrap();
    assert_ne!(first.triple, second.triple);
    assert_relative_eq!(first.point, second.point, epsilon = 1e-12);

    let mut events = Vec::new();
    add_close_event(&mut events, Some(first), config.dedup_tolerance);
    add_close_event(&mut events, Some(second), config.dedup_tolerance);
    assert_eq!(events, vec![second]);

    // Registering the same event again is a replacement, not an addition.
    add_close_event(&mut events, Some(second), config.dedup_tolerance);
    assert_eq!(events.len(), 1);

    let processed = process_close_events(&beachline, &keys, 0.0, &mut ctx).unwrap();
    assert_eq!(processed, events);
}

#[test]
fn distinct_points_are_kept_apart() {
    let sites = points(&[(0.0, 0.0), (1.0, 1.0), (2.0, 0.0), (3.0, 1.0), (4.0, 0.0)]);
    let (beachline, keys) = arcs(&ids(5));
    let config = CloseEventConfig::default();
    let mut ctx = CloseContext::new(&sites, &config);

    let events = process_close_events(&beachline, &keys, 0.0, &mut ctx).unwrap();
    // Arcs 1 and 3 converge; arc 2 sits below its neighbours' chord.
    assert_eq!(events.len(), 2);
    assert_relative_eq!(events[0].point, Point2::new(1.0, 0.0), epsilon = 1e-12);
    assert_relative_eq!(events[1].point, Point2::new(3.0, 0.0), epsilon = 1e-12);
}

// =============================================================================
// SCENARIO E: ADMISSIBILITY GATES
// =============================================================================

#[test]
fn segment_arc_closes_only_towards_the_far_side_of_its_top() {
    init_tracing();
    let mut builder = SiteSetBuilder::new();
    let (segment, upper, _) = builder
        .add_free_segment(Point2::new(0.0, 1.0), Point2::new(1.0, -1.0))
        .unwrap();
    let west = builder.add_point(Point2::new(-2.0, 0.0)).unwrap();
    let east = builder.add_point(Point2::new(3.0, 0.0)).unwrap();
    let sites = builder.build().unwrap();
    let p = Point2::ORIGIN;

    assert_eq!(
        can_close(&triple(&sites, upper, segment, east), p, &sites, 1e-8),
        Err(Rejection::WrongSide)
    );
    assert_eq!(can_close(&triple(&sites, upper, segment, west), p, &sites, 1e-8), Ok(()));

    // The same rule with the top endpoint on the right.
    assert_eq!(
        can_close(&triple(&sites, west, segment, upper), p, &sites, 1e-8),
        Err(Rejection::WrongSide)
    );
    assert_eq!(can_close(&triple(&sites, east, segment, upper), p, &sites, 1e-8), Ok(()));
}

#[test]
fn endpoint_arc_closes_only_on_its_segment_side() {
    init_tracing();
    let mut builder = SiteSetBuilder::new();
    let (segment, upper, lower) = builder
        .add_free_segment(Point2::new(0.0, 1.0), Point2::new(1.0, -1.0))
        .unwrap();
    let far = builder.add_point(Point2::new(3.0, 3.0)).unwrap();
    let sites = builder.build().unwrap();
    let beyond = Point2::new(2.0, 2.0);
    let beside = Point2::new(-1.0, -1.0);

    let top_beside_segment = triple(&sites, segment, upper, far);
    assert_eq!(
        can_close(&top_beside_segment, beyond, &sites, 1e-8),
        Err(Rejection::HalfPlane)
    );
    // The circle through the top endpoint only touches the segment there.
    assert_eq!(can_close(&top_beside_segment, beside, &sites, 1e-8), Ok(()));

    assert_eq!(
        can_close(&triple(&sites, far, upper, segment), beside, &sites, 1e-8),
        Err(Rejection::HalfPlane)
    );
    assert_eq!(
        can_close(&triple(&sites, segment, lower, far), beyond, &sites, 1e-8),
        Err(Rejection::HalfPlane)
    );
}

// =============================================================================
// SCENARIO F: DIFF AND RADIUS GATES
// =============================================================================

fn two_points_and_a_wall() -> (SiteSet, [SiteId; 3]) {
    let mut builder = SiteSetBuilder::new();
    let p = builder.add_point(Point2::new(-2.0, 0.0)).unwrap();
    let (wall, _, _) = builder
        .add_free_segment(Point2::new(3.0, 5.0), Point2::new(3.0, -5.0))
        .unwrap();
    let q = builder.add_point(Point2::new(-1.0, 2.0)).unwrap();
    (builder.build().unwrap(), [p, wall, q])
}

#[test]
fn tangent_circle_already_passed_fails_diff_test() {
    init_tracing();
    let mut builder = SiteSetBuilder::new();
    let (segment, upper, _) = builder
        .add_free_segment(Point2::new(0.0, 1.0), Point2::new(1.0, -1.0))
        .unwrap();
    let west = builder.add_point(Point2::new(-2.0, 0.0)).unwrap();
    let sites = builder.build().unwrap();
    // The circle through both points tangent at the endpoint is centred at
    // (-1, 0.5) and reaches down to about -0.618.
    let (beachline, keys) = arcs(&[upper, segment, west]);
    let config = CloseEventConfig::default();
    let mut counter = Counter::default();
    let mut ctx = CloseContext::new(&sites, &config).with_observer(&mut counter);

    assert_eq!(
        evaluate_close(&beachline, keys[1], -5.0, &mut ctx).unwrap(),
        CloseOutcome::Rejected(Rejection::DiffExceeded { diff: DIFF_SENTINEL })
    );
    drop(ctx);
    assert_eq!(counter.candidates.len(), 1);
    assert_relative_eq!(counter.candidates[0].0, Point2::new(-1.0, 0.5), epsilon = 1e-9);
}

#[test]
fn candidates_all_passed_leave_nothing_viable() {
    init_tracing();
    let (sites, [p, wall, q]) = two_points_and_a_wall();
    let (beachline, keys) = arcs(&[p, wall, q]);
    let config = CloseEventConfig::default();
    let mut counter = Counter::default();
    let mut ctx = CloseContext::new(&sites, &config).with_observer(&mut counter);

    assert_eq!(
        evaluate_close(&beachline, keys[1], -100.0, &mut ctx).unwrap(),
        CloseOutcome::Rejected(Rejection::NoViableCandidate {
            least_diff: DIFF_SENTINEL
        })
    );
    drop(ctx);
    assert_eq!(counter.candidates.len(), 2);
}

#[test]
fn least_diff_candidate_is_chosen() {
    init_tracing();
    let (sites, [p, wall, q]) = two_points_and_a_wall();
    let t = triple(&sites, p, wall, q);
    let shapes = (t.left.shape(), t.arc.shape(), t.right.shape());
    let Equidistant::Candidates(list) = equidistant(&shapes.0, &shapes.1, &shapes.2) else {
        panic!("two circles through both points touch the wall's line");
    };
    assert_eq!(list.len(), 2);

    let config = CloseEventConfig {
        max_diff: f64::MAX,
        ..CloseEventConfig::default()
    };
    let directrix = 0.0;
    let expected = list
        .iter()
        .copied()
        .min_by(|a, b| {
            diff(&t, *a, directrix, &config).total_cmp(&diff(&t, *b, directrix, &config))
        })
        .unwrap();

    let mut counter = Counter::default();
    let mut ctx = CloseContext::new(&sites, &config).with_observer(&mut counter);
    let chosen = choose_close_point(&t, &list, directrix, &mut ctx).unwrap();
    drop(ctx);
    assert_eq!(chosen, expected);
    let seen: Vec<Point2> = counter.candidates.iter().map(|(c, _)| *c).collect();
    assert_eq!(seen, list.to_vec());
}

#[test]
fn shallow_neighbour_accepts_candidate_over_max_diff() {
    init_tracing();
    let mut builder = SiteSetBuilder::new();
    let (flat, _, _) = builder
        .add_free_segment(Point2::new(-6.0, 0.2), Point2::new(-4.0, 0.1))
        .unwrap();
    let p = builder.add_point(Point2::new(-2.0, 0.0)).unwrap();
    let q = builder.add_point(Point2::new(2.0, 1.0)).unwrap();
    let sites = builder.build().unwrap();
    let t = triple(&sites, flat, p, q);
    let candidates = [Point2::new(0.0, 0.0), Point2::new(1.0, 1.0)];

    let config = CloseEventConfig::default();
    let mut ctx = CloseContext::new(&sites, &config);
    assert_eq!(choose_close_point(&t, &candidates, -100.0, &mut ctx), Ok(candidates[0]));

    let strict = CloseEventConfig {
        shallow_sites: ShallowSitePolicy {
            enabled: false,
            ..ShallowSitePolicy::default()
        },
        ..config
    };
    let mut ctx = CloseContext::new(&sites, &strict);
    assert_eq!(
        choose_close_point(&t, &candidates, -100.0, &mut ctx),
        Err(Rejection::NoViableCandidate {
            least_diff: DIFF_SENTINEL
        })
    );
}

#[test]
fn radius_spread_is_absolute_by_default() {
    init_tracing();
    let mut builder = SiteSetBuilder::new();
    let p = builder.add_point(Point2::new(0.0, 0.0)).unwrap();
    let (wall, _, _) = builder
        .add_free_segment(Point2::new(200.0, 500.0), Point2::new(200.0, -500.0))
        .unwrap();
    let q = builder.add_point(Point2::new(0.0, 200.0)).unwrap();
    let sites = builder.build().unwrap();
    let t = triple(&sites, p, wall, q);

    // (75, 100) is exactly 125 from all three sites.
    let config = CloseEventConfig::default();
    assert!(radius_test(&t, Point2::new(75.0, 100.0), config.radius_slack(125.0)));

    // Nudged up, the point distances drift apart by about 1.6e-7.
    let nudged = Point2::new(75.0, 100.0 + 1e-7);
    let radius = close_radius(&t, nudged);
    assert!(!radius_test(&t, nudged, config.radius_slack(radius)));

    let scaled = CloseEventConfig {
        scale_radius_tolerance: true,
        ..config
    };
    assert!(radius_test(&t, nudged, scaled.radius_slack(radius)));
}
