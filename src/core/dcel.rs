//! Minimal edge store collecting the output of the sweep.
//!
//! The beachline only ever needs "begin an edge at this vertex" and a stable
//! handle back; close events later end the edge at a Voronoi vertex. Edges
//! that are still open when the sweep finishes are unbounded rays.

#![forbid(unsafe_code)]

use crate::core::site::SiteId;
use crate::geometry::point::Point2;
use serde::{Deserialize, Serialize};
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Handle of an edge in the [`Dcel`].
    pub struct DcelEdgeKey;
}

/// A Voronoi edge under construction or finished.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DcelEdge {
    /// Where the edge starts.
    pub origin: Point2,
    /// Where the edge ends, once a close event has terminated it.
    pub end: Option<Point2>,
    /// The two sites the edge separates, left then right.
    pub sites: Option<(SiteId, SiteId)>,
}

impl DcelEdge {
    /// `true` once the edge has been terminated.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.end.is_some()
    }
}

/// Vertices and edges produced by the sweep.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Dcel {
    vertices: Vec<Point2>,
    edges: SlotMap<DcelEdgeKey, DcelEdge>,
}

impl Dcel {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new edge at `origin`.
    pub fn begin_edge(&mut self, origin: Point2) -> DcelEdgeKey {
        self.edges.insert(DcelEdge {
            origin: origin.canonical(),
            end: None,
            sites: None,
        })
    }

    /// Records the pair of sites an edge separates. Returns `false` for an
    /// unknown key.
    pub fn set_sites(&mut self, key: DcelEdgeKey, left: SiteId, right: SiteId) -> bool {
        self.edges.get_mut(key).map(|e| e.sites = Some((left, right))).is_some()
    }

    /// Terminates an edge at `end`. Returns `false` for an unknown key or an
    /// edge that was already finished.
    pub fn end_edge(&mut self, key: DcelEdgeKey, end: Point2) -> bool {
        match self.edges.get_mut(key) {
            Some(edge) if edge.end.is_none() => {
                edge.end = Some(end.canonical());
                true
            }
            _ => false,
        }
    }

    /// Records a Voronoi vertex and returns its index.
    pub fn add_vertex(&mut self, p: Point2) -> usize {
        self.vertices.push(p.canonical());
        self.vertices.len() - 1
    }

    /// Looks up an edge.
    #[must_use]
    pub fn edge(&self, key: DcelEdgeKey) -> Option<&DcelEdge> {
        self.edges.get(key)
    }

    /// All edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = (DcelEdgeKey, &DcelEdge)> {
        self.edges.iter()
    }

    /// All Voronoi vertices in creation order.
    #[must_use]
    pub fn vertices(&self) -> &[Point2] {
        &self.vertices
    }

    /// Number of edges.
    #[must_use]
    pub fn number_of_edges(&self) -> usize {
        self.edges.len()
    }
}
