//! Priority queue of sweep events.
//!
//! The directrix moves downwards, so events pop in order of decreasing `y`.
//! Ties are broken deterministically: site events before close events, then
//! smaller `x` first, then insertion order.

#![forbid(unsafe_code)]

use crate::core::beachline::CloseEventKey;
use crate::core::site::SiteId;
use crate::geometry::point::Point2;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Something the sweep line will reach.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SweepEvent {
    /// A point site, together with the segments starting at it.
    Site {
        /// The point site.
        site: SiteId,
        /// Its position.
        position: Point2,
    },
    /// A close event stored in the beachline.
    Close {
        /// Key of the stored event.
        key: CloseEventKey,
        /// Height at which it fires.
        y: f64,
        /// Abscissa of the Voronoi vertex it creates.
        x: f64,
    },
}

impl SweepEvent {
    /// Height at which the event fires.
    #[must_use]
    pub const fn y(&self) -> f64 {
        match self {
            Self::Site { position, .. } => position.y,
            Self::Close { y, .. } => *y,
        }
    }

    /// Tie-break abscissa.
    #[must_use]
    pub const fn x(&self) -> f64 {
        match self {
            Self::Site { position, .. } => position.x,
            Self::Close { x, .. } => *x,
        }
    }

    /// `true` for site events.
    #[must_use]
    pub const fn is_site(&self) -> bool {
        matches!(self, Self::Site { .. })
    }
}

#[derive(Clone, Copy, Debug)]
struct Queued {
    event: SweepEvent,
    sequence: u64,
}

impl Ord for Queued {
    /// "Greater" pops first from the max-heap.
    fn cmp(&self, other: &Self) -> Ordering {
        self.event
            .y()
            .total_cmp(&other.event.y())
            .then_with(|| self.event.is_site().cmp(&other.event.is_site()))
            .then_with(|| other.event.x().total_cmp(&self.event.x()))
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for Queued {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Queued {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Queued {}

/// Binary-heap event queue.
#[derive(Clone, Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Queued>,
    next_sequence: u64,
}

impl EventQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an event.
    pub fn push(&mut self, event: SweepEvent) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(Queued { event, sequence });
    }

    /// Removes and returns the next event.
    pub fn pop(&mut self) -> Option<SweepEvent> {
        self.heap.pop().map(|q| q.event)
    }

    /// The next event, without removing it.
    #[must_use]
    pub fn peek(&self) -> Option<&SweepEvent> {
        self.heap.peek().map(|q| &q.event)
    }

    /// Number of queued events, stale ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slotmap::SlotMap;

    fn site(id: usize, x: f64, y: f64) -> SweepEvent {
        SweepEvent::Site {
            site: SiteId(id),
            position: Point2::new(x, y),
        }
    }

    #[test]
    fn pops_by_height_then_kind_then_x() {
        let mut keys: SlotMap<CloseEventKey, ()> = SlotMap::with_key();
        let close = SweepEvent::Close {
            key: keys.insert(()),
            y: 1.0,
            x: -5.0,
        };

        let mut queue = EventQueue::new();
        queue.push(site(0, 0.0, 0.0));
        queue.push(close);
        queue.push(site(1, 3.0, 1.0));
        queue.push(site(2, -3.0, 1.0));
        queue.push(site(3, 0.0, 2.0));
        assert_eq!(queue.len(), 5);

        let order: Vec<SweepEvent> = std::iter::from_fn(|| queue.pop()).collect();
        assert_eq!(
            order,
            vec![
                site(3, 0.0, 2.0),
                site(2, -3.0, 1.0),
                site(1, 3.0, 1.0),
                close,
                site(0, 0.0, 0.0),
            ]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn equal_events_pop_in_insertion_order() {
        let mut queue = EventQueue::new();
        queue.push(site(7, 1.0, 1.0));
        queue.push(site(4, 1.0, 1.0));
        assert_eq!(queue.peek(), Some(&site(7, 1.0, 1.0)));
        assert_eq!(queue.pop(), Some(site(7, 1.0, 1.0)));
        assert_eq!(queue.pop(), Some(site(4, 1.0, 1.0)));
        assert_eq!(queue.pop(), None);
    }
}
