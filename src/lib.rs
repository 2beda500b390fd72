//! # gvd-sweep
//!
//! A sweep-line construction of the generalized Voronoi diagram of point and
//! segment sites, in the style of Fortune's algorithm.
//!
//! A horizontal directrix moves downwards. Point sites contribute parabolic
//! arcs, segment sites contribute V-shaped arcs bounded by the angle
//! bisectors between the segment's supporting line and the directrix. The
//! lower envelope of these arcs, the *beachline*, is kept in an ordered
//! binary tree; an arc disappears at a *close event* where its two
//! neighbours meet, leaving a Voronoi vertex behind.
//!
//! # Features
//!
//! - Point sites, free segments and simple polygons as input
//! - Arena-backed beachline tree with explicit parent links and validation
//! - Close-event engine with diff, radius, half-plane and circle gates, and
//!   pluggable observation of every candidate it considers
//! - Deterministic event ordering and a serializable [`Diagram`](core::sweep::Diagram)
//!
//! # Basic Usage
//!
//! ```rust
//! use gvd_sweep::prelude::*;
//!
//! let sites = SiteSet::from_points(&[
//!     Point2::new(0.0, 0.0),
//!     Point2::new(4.0, 0.5),
//!     Point2::new(1.0, 3.0),
//!     Point2::new(3.0, 2.5),
//! ])
//! .unwrap();
//!
//! let diagram = compute_diagram(&sites, SweepOptions::default()).unwrap();
//!
//! // Four points in convex position: 2n - 2 - h = 2 Voronoi vertices.
//! assert_eq!(diagram.vertices.len(), 2);
//! ```
//!
//! # Segments
//!
//! Segments are added between point sites; the sweep reaches a segment at
//! its upper endpoint and inserts its arc next to that endpoint's arc.
//!
//! ```rust
//! use gvd_sweep::prelude::*;
//!
//! let mut builder = SiteSetBuilder::new();
//! let (segment, _upper, _lower) = builder
//!     .add_free_segment(Point2::new(0.0, 1.0), Point2::new(1.0, -1.0))
//!     .unwrap();
//! let sites = builder.build().unwrap();
//!
//! let diagram = compute_diagram(&sites, SweepOptions::default()).unwrap();
//! assert!(diagram.beachline.contains(&segment));
//! ```

// Allow multiple crate versions due to transitive dependencies
#![allow(clippy::multiple_crate_versions)]
// Forbid unsafe code throughout the entire crate
#![forbid(unsafe_code)]

#[macro_use]
extern crate derive_builder;

/// The `core` module holds the sweep itself: input sites, the beachline
/// tree, the close-event engine, the event queue and the driver tying them
/// together.
pub mod core {
    /// Ordered tree of arcs and breakpoints
    pub mod beachline;
    /// Close-event detection and its gates
    pub mod close_event;
    pub mod collections;
    /// Output edge store
    pub mod dcel;
    pub mod event_queue;
    /// Point and segment sites
    pub mod site;
    /// The sweep driver
    pub mod sweep;

    pub use beachline::*;
    pub use close_event::*;
    pub use dcel::*;
    pub use event_queue::*;
    pub use site::*;
    pub use sweep::*;
}

/// Planar geometry: the `Point2` type, predicates, arc curves and their
/// breakpoints, and points equidistant from three sites.
pub mod geometry {
    /// Parabolic and V-shaped arcs and their intersections
    pub mod bisector;
    /// Points equidistant from three sites
    pub mod equidistant;
    pub mod point;
    pub mod predicates;

    pub use bisector::*;
    pub use equidistant::*;
    pub use point::*;
    pub use predicates::*;
}

/// A prelude module that re-exports commonly used types.
/// This makes it easier to import the most commonly used items from the crate.
pub mod prelude {
    // Re-export from core
    pub use crate::core::{
        beachline::{Beachline, BeachlineError, NodeKey},
        close_event::{
            CandidateObserver, CloseContext, CloseEvent, CloseEventConfig, CloseEventError,
            CloseOutcome, Rejection, ShallowSitePolicy, TracingObserver, TripleId,
            create_close_event, evaluate_close, process_close_events,
        },
        dcel::{Dcel, DcelEdge},
        site::{BoundaryRole, Site, SiteError, SiteId, SiteSet, SiteSetBuilder},
        sweep::{
            Diagram, Sweep, SweepError, SweepOptions, SweepOptionsBuilder, SweepStats,
            compute_diagram,
        },
    };

    // Re-export commonly used collection types from core::collections
    pub use crate::core::collections::{
        FastHashMap, FastHashSet, SmallBuffer, fast_hash_map_with_capacity,
        fast_hash_set_with_capacity,
    };

    // Re-export from geometry
    pub use crate::geometry::{
        bisector::{ArcCurve, Parabola, Vee, intersect_arcs},
        equidistant::{Equidistant, SiteShape, equidistant},
        point::Point2,
        predicates::{Orientation, circle_segment_intersections, is_right_of_line, orientation},
    };
}

/// The function `is_normal` checks that structs implement `auto` traits.
/// Traits are checked at compile time, so this function is only used for
/// testing.
#[must_use]
pub const fn is_normal<T: Sized + Send + Sync + Unpin>() -> bool {
    true
}

// =============================================================================
// TESTS
// =============================================================================
