//! The beachline: an ordered binary tree of arcs and breakpoints.
//!
//! Leaves are arcs, one per (possibly repeated) site, ordered left to right
//! along the sweep line. Internal nodes are breakpoints; each one owns the
//! Voronoi edge traced by the intersection of the rightmost arc of its left
//! subtree and the leftmost arc of its right subtree.
//!
//! Nodes live in a [`SlotMap`] arena and refer to each other by [`NodeKey`],
//! with parent links stored next to the child links. Every structural
//! operation keeps both directions in sync; [`Beachline::validate`] checks
//! that it did.
//!
//! Pending close events are owned by the beachline as well. An arc points at
//! its live event through [`ArcNode::pending_close`]; replacing or cancelling
//! that event flips the stored event's `live` flag, so a copy already queued
//! by the sweep driver is recognised as stale when it is popped.
//!
//! # Examples
//!
//! ```rust
//! use gvd_sweep::core::beachline::Beachline;
//! use gvd_sweep::core::dcel::Dcel;
//! use gvd_sweep::core::site::SiteId;
//! use gvd_sweep::geometry::point::Point2;
//!
//! let mut dcel = Dcel::new();
//! let (beachline, arcs) = Beachline::from_arc_sequence(
//!     &[SiteId(0), SiteId(1), SiteId(0)],
//!     Point2::new(0.0, 0.0),
//!     &mut dcel,
//! )
//! .unwrap();
//!
//! assert_eq!(arcs.len(), 3);
//! assert_eq!(beachline.prev_arc(arcs[1]).unwrap(), Some(arcs[0]));
//! assert_eq!(beachline.next_arc(arcs[1]).unwrap(), Some(arcs[2]));
//! assert_eq!(dcel.number_of_edges(), 2);
//! ```

#![forbid(unsafe_code)]

use crate::core::close_event::CloseEvent;
use crate::core::dcel::{Dcel, DcelEdgeKey};
use crate::core::site::{SiteId, SiteSet};
use crate::geometry::bisector::{ArcCurve, intersect_arcs};
use crate::geometry::equidistant::SiteShape;
use crate::geometry::point::Point2;
use slotmap::{SlotMap, new_key_type};
use thiserror::Error;

/// Slack allowed between consecutive breakpoints before
/// [`Beachline::validate`] reports them out of order.
pub const ORDER_TOLERANCE: f64 = 1e-6;

new_key_type! {
    /// Key type for accessing nodes of a [`Beachline`].
    pub struct NodeKey;
}

new_key_type! {
    /// Key type for accessing close events owned by a [`Beachline`].
    pub struct CloseEventKey;
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised while navigating or restructuring the beachline.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum BeachlineError {
    /// A key does not refer to a live node.
    #[error("Beachline node {node:?} does not exist")]
    MissingNode {
        /// The dangling key.
        node: NodeKey,
    },
    /// An arc was expected.
    #[error("Beachline node {node:?} is a breakpoint, expected an arc")]
    NotAnArc {
        /// The offending node.
        node: NodeKey,
    },
    /// A breakpoint was expected.
    #[error("Beachline node {node:?} is an arc, expected a breakpoint")]
    NotAnEdge {
        /// The offending node.
        node: NodeKey,
    },
    /// An arc that must have neighbours on both sides does not.
    #[error("Arc {node:?} is not an interior arc")]
    NotInterior {
        /// The offending arc.
        node: NodeKey,
    },
    /// A child's parent link does not point back at the node holding it.
    #[error("Node {child:?} is held by {holder:?} but its parent link says {recorded:?}")]
    BrokenBackReference {
        /// The child.
        child: NodeKey,
        /// The node whose child link points at `child`.
        holder: Option<NodeKey>,
        /// What the child's parent link actually says.
        recorded: Option<NodeKey>,
    },
    /// An arc refers to a site that is not in the site set.
    #[error("Beachline refers to unknown site {site}")]
    MissingSite {
        /// The unknown site.
        site: SiteId,
    },
    /// Two neighbouring arcs have no breakpoint at the given directrix.
    #[error("Arcs of sites {left} and {right} do not intersect at directrix {directrix}")]
    NoBreakpoint {
        /// Left site.
        left: SiteId,
        /// Right site.
        right: SiteId,
        /// The sweep position.
        directrix: f64,
    },
    /// Breakpoints are not sorted left to right.
    #[error("Breakpoint {left_edge} at x={left_x} lies right of {right_edge} at x={right_x}")]
    OrderViolation {
        /// Identifier of the left breakpoint.
        left_edge: String,
        /// Its abscissa.
        left_x: f64,
        /// Identifier of the right breakpoint.
        right_edge: String,
        /// Its abscissa.
        right_x: f64,
    },
    /// An insertion was asked to add no arcs.
    #[error("Cannot insert an empty run of arcs")]
    EmptyRun,
    /// The first insertion was attempted on a non-empty beachline.
    #[error("Beachline already holds arcs")]
    NotEmpty,
    /// Two arcs expected to be neighbours are not.
    #[error("Arcs {left:?} and {right:?} are not adjacent")]
    NotAdjacent {
        /// The arc expected on the left.
        left: NodeKey,
        /// The arc expected on the right.
        right: NodeKey,
    },
}

// =============================================================================
// NODE TYPES
// =============================================================================

/// Which child slot a node occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    /// Left child.
    Left,
    /// Right child.
    Right,
}

/// A leaf: one arc of the beachline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArcNode {
    /// The site generating the arc.
    pub site: SiteId,
    /// The breakpoint holding this leaf, `None` for a lone root arc.
    pub parent: Option<NodeKey>,
    /// The live close event that will remove this arc, if any.
    pub pending_close: Option<CloseEventKey>,
}

/// An internal node: the breakpoint between two neighbouring arcs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeNode {
    /// Left subtree.
    pub left: NodeKey,
    /// Right subtree.
    pub right: NodeKey,
    /// Parent breakpoint, `None` at the root.
    pub parent: Option<NodeKey>,
    /// The Voronoi edge this breakpoint is tracing.
    pub edge: DcelEdgeKey,
}

/// A beachline node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum BeachNode {
    /// A leaf.
    Arc(ArcNode),
    /// An internal node.
    Edge(EdgeNode),
}

impl BeachNode {
    /// The parent link.
    #[must_use]
    pub const fn parent(&self) -> Option<NodeKey> {
        match self {
            Self::Arc(arc) => arc.parent,
            Self::Edge(edge) => edge.parent,
        }
    }

    const fn set_parent(&mut self, parent: Option<NodeKey>) {
        match self {
            Self::Arc(arc) => arc.parent = parent,
            Self::Edge(edge) => edge.parent = parent,
        }
    }
}

// =============================================================================
// BEACHLINE
// =============================================================================

/// Arena-backed beachline tree.
#[derive(Clone, Debug, Default)]
pub struct Beachline {
    nodes: SlotMap<NodeKey, BeachNode>,
    root: Option<NodeKey>,
    close_events: SlotMap<CloseEventKey, CloseEvent>,
}

/// Shape of a site, or [`BeachlineError::MissingSite`].
fn shape_of(sites: &SiteSet, site: SiteId) -> Result<SiteShape, BeachlineError> {
    sites
        .get(site)
        .map(crate::core::site::Site::shape)
        .ok_or(BeachlineError::MissingSite { site })
}

impl Beachline {
    /// Creates an empty beachline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The root node, `None` while no site has been inserted.
    #[must_use]
    pub const fn root(&self) -> Option<NodeKey> {
        self.root
    }

    /// `true` while no arc has been inserted.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Number of arcs currently on the beachline.
    #[must_use]
    pub fn number_of_arcs(&self) -> usize {
        self.nodes
            .values()
            .filter(|n| matches!(n, BeachNode::Arc(_)))
            .count()
    }

    /// Looks up a node.
    ///
    /// # Errors
    ///
    /// Returns [`BeachlineError::MissingNode`] for a dangling key.
    pub fn node(&self, key: NodeKey) -> Result<&BeachNode, BeachlineError> {
        self.nodes
            .get(key)
            .ok_or(BeachlineError::MissingNode { node: key })
    }

    fn node_mut(&mut self, key: NodeKey) -> Result<&mut BeachNode, BeachlineError> {
        self.nodes
            .get_mut(key)
            .ok_or(BeachlineError::MissingNode { node: key })
    }

    /// Looks up an arc.
    ///
    /// # Errors
    ///
    /// Returns [`BeachlineError::MissingNode`] or [`BeachlineError::NotAnArc`].
    pub fn arc(&self, key: NodeKey) -> Result<&ArcNode, BeachlineError> {
        match self.node(key)? {
            BeachNode::Arc(arc) => Ok(arc),
            BeachNode::Edge(_) => Err(BeachlineError::NotAnArc { node: key }),
        }
    }

    fn arc_mut(&mut self, key: NodeKey) -> Result<&mut ArcNode, BeachlineError> {
        match self.node_mut(key)? {
            BeachNode::Arc(arc) => Ok(arc),
            BeachNode::Edge(_) => Err(BeachlineError::NotAnArc { node: key }),
        }
    }

    /// Looks up a breakpoint.
    ///
    /// # Errors
    ///
    /// Returns [`BeachlineError::MissingNode`] or [`BeachlineError::NotAnEdge`].
    pub fn edge_node(&self, key: NodeKey) -> Result<&EdgeNode, BeachlineError> {
        match self.node(key)? {
            BeachNode::Edge(edge) => Ok(edge),
            BeachNode::Arc(_) => Err(BeachlineError::NotAnEdge { node: key }),
        }
    }

    fn edge_node_mut(&mut self, key: NodeKey) -> Result<&mut EdgeNode, BeachlineError> {
        match self.node_mut(key)? {
            BeachNode::Edge(edge) => Ok(edge),
            BeachNode::Arc(_) => Err(BeachlineError::NotAnEdge { node: key }),
        }
    }

    /// The site generating an arc.
    ///
    /// # Errors
    ///
    /// Returns an error if `arc` is not a live arc.
    pub fn site_of(&self, arc: NodeKey) -> Result<SiteId, BeachlineError> {
        self.arc(arc).map(|a| a.site)
    }

    fn set_parent(&mut self, child: NodeKey, parent: Option<NodeKey>) -> Result<(), BeachlineError> {
        self.node_mut(child)?.set_parent(parent);
        Ok(())
    }

    /// The parent of `node` and which of its slots `node` occupies.
    fn slot_of(&self, node: NodeKey) -> Result<Option<(NodeKey, Side)>, BeachlineError> {
        let Some(parent) = self.node(node)?.parent() else {
            return Ok(None);
        };
        let edge = self.edge_node(parent)?;
        if edge.left == node {
            Ok(Some((parent, Side::Left)))
        } else if edge.right == node {
            Ok(Some((parent, Side::Right)))
        } else {
            Err(BeachlineError::BrokenBackReference {
                child: node,
                holder: None,
                recorded: Some(parent),
            })
        }
    }

    // -------------------------------------------------------------------------
    // Navigation
    // -------------------------------------------------------------------------

    /// Nearest ancestor breakpoint left of `node`: the first ancestor whose
    /// right subtree contains it.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent chain is broken.
    pub fn prev_edge(&self, node: NodeKey) -> Result<Option<NodeKey>, BeachlineError> {
        self.ancestor_edge(node, Side::Right)
    }

    /// Nearest ancestor breakpoint right of `node`: the first ancestor whose
    /// left subtree contains it.
    ///
    /// # Errors
    ///
    /// Returns an error if the parent chain is broken.
    pub fn next_edge(&self, node: NodeKey) -> Result<Option<NodeKey>, BeachlineError> {
        self.ancestor_edge(node, Side::Left)
    }

    fn ancestor_edge(&self, node: NodeKey, via: Side) -> Result<Option<NodeKey>, BeachlineError> {
        let mut current = node;
        while let Some((parent, side)) = self.slot_of(current)? {
            if side == via {
                return Ok(Some(parent));
            }
            current = parent;
        }
        Ok(None)
    }

    fn descend(&self, mut node: NodeKey, side: Side) -> Result<NodeKey, BeachlineError> {
        while let BeachNode::Edge(edge) = self.node(node)? {
            node = match side {
                Side::Left => edge.left,
                Side::Right => edge.right,
            };
        }
        Ok(node)
    }

    /// The arc immediately left of `node`.
    ///
    /// For an arc this is the rightmost arc under its previous breakpoint's
    /// left subtree; for a breakpoint it is the rightmost arc of its own left
    /// subtree.
    ///
    /// # Errors
    ///
    /// Returns an error if a link is dangling.
    pub fn prev_arc(&self, node: NodeKey) -> Result<Option<NodeKey>, BeachlineError> {
        let edge = match self.node(node)? {
            BeachNode::Edge(_) => node,
            BeachNode::Arc(_) => match self.prev_edge(node)? {
                Some(edge) => edge,
                None => return Ok(None),
            },
        };
        let left = self.edge_node(edge)?.left;
        self.descend(left, Side::Right).map(Some)
    }

    /// The arc immediately right of `node`. Mirror of [`Self::prev_arc`].
    ///
    /// # Errors
    ///
    /// Returns an error if a link is dangling.
    pub fn next_arc(&self, node: NodeKey) -> Result<Option<NodeKey>, BeachlineError> {
        let edge = match self.node(node)? {
            BeachNode::Edge(_) => node,
            BeachNode::Arc(_) => match self.next_edge(node)? {
                Some(edge) => edge,
                None => return Ok(None),
            },
        };
        let right = self.edge_node(edge)?.right;
        self.descend(right, Side::Left).map(Some)
    }

    /// Sites of the two arcs a breakpoint separates, left then right.
    ///
    /// # Errors
    ///
    /// Returns an error if `edge` is not a breakpoint or a link is dangling.
    pub fn edge_sites(&self, edge: NodeKey) -> Result<(SiteId, SiteId), BeachlineError> {
        self.edge_node(edge)?;
        let left = self.prev_arc(edge)?.ok_or(BeachlineError::NotInterior { node: edge })?;
        let right = self.next_arc(edge)?.ok_or(BeachlineError::NotInterior { node: edge })?;
        Ok((self.site_of(left)?, self.site_of(right)?))
    }

    /// Identifier of a breakpoint, `"<left site>-<right site>"`. It is derived
    /// from the current neighbours and changes when they do.
    ///
    /// # Errors
    ///
    /// Same as [`Self::edge_sites`].
    pub fn edge_id(&self, edge: NodeKey) -> Result<String, BeachlineError> {
        let (left, right) = self.edge_sites(edge)?;
        Ok(format!("{left}-{right}"))
    }

    /// Gives a breakpoint a fresh Voronoi edge starting at `vertex`, labelled
    /// with the sites currently on either side.
    ///
    /// # Errors
    ///
    /// Same as [`Self::edge_sites`].
    pub fn update_edge(
        &mut self,
        edge: NodeKey,
        vertex: Point2,
        dcel: &mut Dcel,
    ) -> Result<DcelEdgeKey, BeachlineError> {
        let (left, right) = self.edge_sites(edge)?;
        let key = dcel.begin_edge(vertex);
        dcel.set_sites(key, left, right);
        self.edge_node_mut(edge)?.edge = key;
        Ok(key)
    }

    /// Current position of a breakpoint, `None` when its arcs do not meet.
    ///
    /// # Errors
    ///
    /// Returns an error if `edge` is not a breakpoint or refers to an unknown
    /// site.
    pub fn intersection(
        &self,
        edge: NodeKey,
        directrix: f64,
        sites: &SiteSet,
    ) -> Result<Option<Point2>, BeachlineError> {
        let (left, right) = self.edge_sites(edge)?;
        let left = shape_of(sites, left)?;
        let right = shape_of(sites, right)?;
        Ok(intersect_arcs(&left, &right, directrix))
    }

    /// Finds the arc above abscissa `x`: descend left while `x` is left of
    /// the breakpoint, right otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`BeachlineError::NoBreakpoint`] if a breakpoint on the search
    /// path cannot be evaluated.
    pub fn locate_arc(
        &self,
        x: f64,
        directrix: f64,
        sites: &SiteSet,
    ) -> Result<Option<NodeKey>, BeachlineError> {
        let Some(mut node) = self.root else {
            return Ok(None);
        };
        while let BeachNode::Edge(edge) = self.node(node)? {
            let Some(at) = self.intersection(node, directrix, sites)? else {
                let (left, right) = self.edge_sites(node)?;
                return Err(BeachlineError::NoBreakpoint {
                    left,
                    right,
                    directrix,
                });
            };
            node = if x < at.x { edge.left } else { edge.right };
        }
        Ok(Some(node))
    }

    // -------------------------------------------------------------------------
    // Structural updates
    // -------------------------------------------------------------------------

    fn new_leaf(&mut self, site: SiteId) -> NodeKey {
        self.nodes.insert(BeachNode::Arc(ArcNode {
            site,
            parent: None,
            pending_close: None,
        }))
    }

    /// Builds a balanced subtree over `leaves`; `origins[i]` is where the
    /// edge between `leaves[i]` and `leaves[i + 1]` starts.
    fn build_subtree(
        &mut self,
        leaves: &[NodeKey],
        origins: &[Point2],
        dcel: &mut Dcel,
    ) -> Result<NodeKey, BeachlineError> {
        match leaves {
            [] => Err(BeachlineError::EmptyRun),
            [leaf] => Ok(*leaf),
            _ => {
                let mid = leaves.len() / 2;
                let left = self.build_subtree(&leaves[..mid], &origins[..mid - 1], dcel)?;
                let right = self.build_subtree(&leaves[mid..], &origins[mid..], dcel)?;
                let key = self.nodes.insert(BeachNode::Edge(EdgeNode {
                    left,
                    right,
                    parent: None,
                    edge: DcelEdgeKey::default(),
                }));
                self.set_parent(left, Some(key))?;
                self.set_parent(right, Some(key))?;
                self.update_edge(key, origins[mid - 1], dcel)?;
                Ok(key)
            }
        }
    }

    /// Puts `replacement` where `target` hangs in the tree.
    fn replace_in_parent(&mut self, target: NodeKey, replacement: NodeKey) -> Result<(), BeachlineError> {
        match self.slot_of(target)? {
            None => {
                self.root = Some(replacement);
                self.set_parent(replacement, None)
            }
            Some((parent, side)) => {
                let edge = self.edge_node_mut(parent)?;
                match side {
                    Side::Left => edge.left = replacement,
                    Side::Right => edge.right = replacement,
                }
                self.set_parent(replacement, Some(parent))
            }
        }
    }

    /// Replaces leaf `target` with a balanced subtree over `sequence`.
    fn replace_arc(
        &mut self,
        target: NodeKey,
        sequence: &[SiteId],
        origins: &[Point2],
        dcel: &mut Dcel,
    ) -> Result<Vec<NodeKey>, BeachlineError> {
        self.cancel_pending_close(target)?;
        let leaves: Vec<NodeKey> = sequence.iter().map(|s| self.new_leaf(*s)).collect();
        let subtree = self.build_subtree(&leaves, origins, dcel)?;
        self.replace_in_parent(target, subtree)?;
        self.nodes.remove(target);
        Ok(leaves)
    }

    /// Inserts the first run of arcs into an empty beachline. Every edge
    /// between them starts at `site`.
    ///
    /// # Errors
    ///
    /// Returns [`BeachlineError::NotEmpty`] or [`BeachlineError::EmptyRun`].
    pub fn insert_first(
        &mut self,
        run: &[SiteId],
        site: Point2,
        dcel: &mut Dcel,
    ) -> Result<Vec<NodeKey>, BeachlineError> {
        if !self.is_empty() {
            return Err(BeachlineError::NotEmpty);
        }
        let leaves: Vec<NodeKey> = run.iter().map(|s| self.new_leaf(*s)).collect();
        let origins = vec![site; run.len().saturating_sub(1)];
        let root = self.build_subtree(&leaves, &origins, dcel)?;
        self.root = Some(root);
        Ok(leaves)
    }

    /// Splits arc `target` around a run of new arcs appearing at `site`.
    ///
    /// The target is replaced by `[A, run..., A]` where `A` is its site. The
    /// two outer edges start on the old arc directly above `site`; the edges
    /// inside the run start at `site` itself. Any close event pending on the
    /// target is cancelled. Returns the new leaves in order.
    ///
    /// # Errors
    ///
    /// Returns an error if `target` is not an arc, its site is unknown, or
    /// `run` is empty.
    pub fn split_arc(
        &mut self,
        target: NodeKey,
        run: &[SiteId],
        site: Point2,
        directrix: f64,
        sites: &SiteSet,
        dcel: &mut Dcel,
    ) -> Result<Vec<NodeKey>, BeachlineError> {
        if run.is_empty() {
            return Err(BeachlineError::EmptyRun);
        }
        let split = self.site_of(target)?;
        let above = ArcCurve::new(&shape_of(sites, split)?, directrix)
            .map(|curve| Point2::new(site.x, curve.eval(site.x)))
            .filter(|p| p.is_finite())
            .unwrap_or(site);

        let mut sequence = Vec::with_capacity(run.len() + 2);
        sequence.push(split);
        sequence.extend_from_slice(run);
        sequence.push(split);

        let mut origins = vec![site; run.len() + 1];
        origins[0] = above;
        origins[run.len()] = above;

        self.replace_arc(target, &sequence, &origins, dcel)
    }

    /// Places a run beside arc `target` instead of splitting it. Used while
    /// the target's site still lies on the directrix, where its parabola is
    /// a vertical ray and cannot be split.
    ///
    /// The edge between the target and the run starts at the midpoint of the
    /// target's site and `site`. Returns the new leaves in order, target's
    /// replacement included.
    ///
    /// # Errors
    ///
    /// Same as [`Self::split_arc`].
    pub fn insert_beside(
        &mut self,
        target: NodeKey,
        run: &[SiteId],
        site: Point2,
        sites: &SiteSet,
        dcel: &mut Dcel,
    ) -> Result<Vec<NodeKey>, BeachlineError> {
        if run.is_empty() {
            return Err(BeachlineError::EmptyRun);
        }
        let existing = self.site_of(target)?;
        let anchor = match shape_of(sites, existing)? {
            SiteShape::Point(p) => p,
            SiteShape::Segment(a, _) => a,
        };
        let between = anchor.midpoint(site);

        let mut sequence = Vec::with_capacity(run.len() + 1);
        let mut origins = vec![site; run.len()];
        if site.x < anchor.x {
            sequence.extend_from_slice(run);
            sequence.push(existing);
            origins[run.len() - 1] = between;
        } else {
            sequence.push(existing);
            sequence.extend_from_slice(run);
            origins[0] = between;
        }
        tracing::debug!(
            site = %site,
            beside = %existing,
            "Run inserted beside an arc still on the directrix"
        );
        self.replace_arc(target, &sequence, &origins, dcel)
    }

    /// Inserts a run between neighbouring arcs `left` and `right` whose
    /// breakpoint has reached `site`.
    ///
    /// The Voronoi edge of that breakpoint ends at `site`, and every edge
    /// around the run starts there. Returns the new leaves in order, the
    /// left arc's replacement first.
    ///
    /// # Errors
    ///
    /// Returns [`BeachlineError::NotAdjacent`] unless `right` directly
    /// follows `left`, or [`BeachlineError::EmptyRun`].
    pub fn insert_between(
        &mut self,
        left: NodeKey,
        right: NodeKey,
        run: &[SiteId],
        site: Point2,
        dcel: &mut Dcel,
    ) -> Result<Vec<NodeKey>, BeachlineError> {
        if run.is_empty() {
            return Err(BeachlineError::EmptyRun);
        }
        if self.next_arc(left)? != Some(right) {
            return Err(BeachlineError::NotAdjacent { left, right });
        }
        let edge = self.next_edge(left)?.ok_or(BeachlineError::NotInterior { node: left })?;
        dcel.end_edge(self.edge_node(edge)?.edge, site);

        let mut sequence = Vec::with_capacity(run.len() + 1);
        sequence.push(self.site_of(left)?);
        sequence.extend_from_slice(run);
        let origins = vec![site; run.len()];
        let leaves = self.replace_arc(left, &sequence, &origins, dcel)?;
        self.update_edge(edge, site, dcel)?;
        Ok(leaves)
    }

    /// Removes arc `arc` at a close event located at `vertex`.
    ///
    /// The Voronoi edges of both adjacent breakpoints end at `vertex`. The
    /// arc's parent breakpoint disappears and its sibling takes its place;
    /// the surviving breakpoint (the previous one when the arc was a left
    /// child, the next one otherwise) starts a new edge at `vertex` between
    /// the arcs that are now adjacent. Returns those two arcs.
    ///
    /// # Errors
    ///
    /// Returns [`BeachlineError::NotInterior`] if the arc lacks a neighbour
    /// on either side, or an error for any broken link.
    pub fn remove_arc(
        &mut self,
        arc: NodeKey,
        vertex: Point2,
        dcel: &mut Dcel,
    ) -> Result<(NodeKey, NodeKey), BeachlineError> {
        let prev = self.prev_edge(arc)?.ok_or(BeachlineError::NotInterior { node: arc })?;
        let next = self.next_edge(arc)?.ok_or(BeachlineError::NotInterior { node: arc })?;
        dcel.end_edge(self.edge_node(prev)?.edge, vertex);
        dcel.end_edge(self.edge_node(next)?.edge, vertex);

        let (parent, side) = self
            .slot_of(arc)?
            .ok_or(BeachlineError::NotInterior { node: arc })?;
        let parent_node = *self.edge_node(parent)?;
        let (sibling, survivor) = match side {
            Side::Left => (parent_node.right, prev),
            Side::Right => (parent_node.left, next),
        };

        self.cancel_pending_close(arc)?;
        self.replace_in_parent(parent, sibling)?;
        self.nodes.remove(arc);
        self.nodes.remove(parent);

        self.update_edge(survivor, vertex, dcel)?;
        let left = self.prev_arc(survivor)?.ok_or(BeachlineError::NotInterior { node: survivor })?;
        let right = self.next_arc(survivor)?.ok_or(BeachlineError::NotInterior { node: survivor })?;
        Ok((left, right))
    }

    /// Builds a beachline whose arcs are `arcs` from left to right, every
    /// edge starting at `origin`. Returns the tree and its leaves in order.
    ///
    /// # Errors
    ///
    /// Returns [`BeachlineError::EmptyRun`] for an empty sequence.
    pub fn from_arc_sequence(
        arcs: &[SiteId],
        origin: Point2,
        dcel: &mut Dcel,
    ) -> Result<(Self, Vec<NodeKey>), BeachlineError> {
        let mut beachline = Self::new();
        let leaves = beachline.insert_first(arcs, origin, dcel)?;
        Ok((beachline, leaves))
    }

    /// All arcs, left to right.
    ///
    /// # Errors
    ///
    /// Returns an error if a child link is dangling.
    pub fn arcs(&self) -> Result<Vec<NodeKey>, BeachlineError> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeKey> = self.root.into_iter().collect();
        while let Some(key) = stack.pop() {
            match self.node(key)? {
                BeachNode::Arc(_) => out.push(key),
                BeachNode::Edge(edge) => {
                    stack.push(edge.right);
                    stack.push(edge.left);
                }
            }
        }
        Ok(out)
    }

    /// Sites of all arcs, left to right.
    ///
    /// # Errors
    ///
    /// Same as [`Self::arcs`].
    pub fn arc_sites(&self) -> Result<Vec<SiteId>, BeachlineError> {
        self.arcs()?.into_iter().map(|a| self.site_of(a)).collect()
    }

    /// Breakpoints, left to right.
    fn edges_in_order(&self) -> Result<Vec<NodeKey>, BeachlineError> {
        let mut out = Vec::new();
        let mut stack: Vec<(NodeKey, bool)> = self.root.into_iter().map(|k| (k, false)).collect();
        while let Some((key, visited)) = stack.pop() {
            if let BeachNode::Edge(edge) = self.node(key)? {
                if visited {
                    out.push(key);
                } else {
                    stack.push((edge.right, false));
                    stack.push((key, true));
                    stack.push((edge.left, false));
                }
            }
        }
        Ok(out)
    }

    /// Checks the structural invariants.
    ///
    /// - the root has no parent and every child links back to its holder;
    /// - every pending close key refers to a stored live event;
    /// - breakpoints that can be evaluated at `directrix` are ordered left
    ///   to right, within [`ORDER_TOLERANCE`] scaled by their magnitude.
    ///
    /// # Errors
    ///
    /// Returns the first violation found.
    pub fn validate(&self, directrix: f64, sites: &SiteSet) -> Result<(), BeachlineError> {
        if let Some(root) = self.root {
            let recorded = self.node(root)?.parent();
            if recorded.is_some() {
                return Err(BeachlineError::BrokenBackReference {
                    child: root,
                    holder: None,
                    recorded,
                });
            }
        }
        for (key, node) in &self.nodes {
            match node {
                BeachNode::Edge(edge) => {
                    for child in [edge.left, edge.right] {
                        let recorded = self.node(child)?.parent();
                        if recorded != Some(key) {
                            return Err(BeachlineError::BrokenBackReference {
                                child,
                                holder: Some(key),
                                recorded,
                            });
                        }
                    }
                }
                BeachNode::Arc(arc) => {
                    if let Some(event) = arc.pending_close
                        && !self.close_events.get(event).is_some_and(|e| e.live)
                    {
                        return Err(BeachlineError::BrokenBackReference {
                            child: key,
                            holder: None,
                            recorded: arc.parent,
                        });
                    }
                }
            }
        }

        let mut previous: Option<(NodeKey, f64)> = None;
        for edge in self.edges_in_order()? {
            let Some(at) = self.intersection(edge, directrix, sites)? else {
                continue;
            };
            if let Some((prev_edge, prev_x)) = previous {
                let slack = ORDER_TOLERANCE * prev_x.abs().max(at.x.abs()).max(1.0);
                if prev_x > at.x + slack {
                    return Err(BeachlineError::OrderViolation {
                        left_edge: self.edge_id(prev_edge)?,
                        left_x: prev_x,
                        right_edge: self.edge_id(edge)?,
                        right_x: at.x,
                    });
                }
            }
            previous = Some((edge, at.x));
        }
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Pending close events
    // -------------------------------------------------------------------------

    /// Stores `event` as the live close event of `arc`, invalidating the one
    /// it replaces.
    ///
    /// # Errors
    ///
    /// Returns an error if `arc` is not a live arc.
    pub fn set_pending_close(
        &mut self,
        arc: NodeKey,
        mut event: CloseEvent,
    ) -> Result<CloseEventKey, BeachlineError> {
        self.cancel_pending_close(arc)?;
        event.live = true;
        let key = self.close_events.insert(event);
        self.arc_mut(arc)?.pending_close = Some(key);
        Ok(key)
    }

    /// Invalidates the close event pending on `arc`. Returns `true` if there
    /// was one.
    ///
    /// # Errors
    ///
    /// Returns an error if `arc` is not a live arc.
    pub fn cancel_pending_close(&mut self, arc: NodeKey) -> Result<bool, BeachlineError> {
        let Some(key) = self.arc_mut(arc)?.pending_close.take() else {
            return Ok(false);
        };
        if let Some(event) = self.close_events.get_mut(key) {
            event.live = false;
        }
        Ok(true)
    }

    /// The live close event pending on `arc`.
    ///
    /// # Errors
    ///
    /// Returns an error if `arc` is not a live arc.
    pub fn pending_close(&self, arc: NodeKey) -> Result<Option<&CloseEvent>, BeachlineError> {
        Ok(self
            .arc(arc)?
            .pending_close
            .and_then(|key| self.close_events.get(key))
            .filter(|e| e.live))
    }

    /// `true` if `a` and `b` both wait on live close events at the same
    /// point, within `tolerance`.
    ///
    /// # Errors
    ///
    /// Returns an error if either key is not a live arc.
    pub fn shares_pending_close(
        &self,
        a: NodeKey,
        b: NodeKey,
        tolerance: f64,
    ) -> Result<bool, BeachlineError> {
        Ok(match (self.pending_close(a)?, self.pending_close(b)?) {
            (Some(ea), Some(eb)) => ea.point.coincides(eb.point, tolerance),
            _ => false,
        })
    }

    /// Looks up a stored close event, live or not.
    #[must_use]
    pub fn close_event(&self, key: CloseEventKey) -> Option<&CloseEvent> {
        self.close_events.get(key)
    }

    /// Removes a stored close event and returns it. If it was still live the
    /// owning arc no longer points at it.
    pub fn take_close_event(&mut self, key: CloseEventKey) -> Option<CloseEvent> {
        let event = self.close_events.remove(key)?;
        if let Ok(arc) = self.arc_mut(event.arc)
            && arc.pending_close == Some(key)
        {
            arc.pending_close = None;
        }
        Some(event)
    }

    /// Live close events still pending, in no particular order.
    pub fn live_close_events(&self) -> impl Iterator<Item = &CloseEvent> {
        self.close_events.values().filter(|e| e.live)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::close_event::TripleId;
    use approx::assert_relative_eq;

    fn points(coords: &[(f64, f64)]) -> SiteSet {
        let pts: Vec<Point2> = coords.iter().map(|&c| Point2::from(c)).collect();
        SiteSet::from_points(&pts).unwrap()
    }

    fn dummy_event(beachline: &Beachline, arc: NodeKey, point: Point2) -> CloseEvent {
        let left = beachline.prev_arc(arc).unwrap().unwrap();
        let right = beachline.next_arc(arc).unwrap().unwrap();
        CloseEvent {
            y: point.y - 1.0,
            point,
            radius: 1.0,
            live: true,
            arc,
            left,
            right,
            triple: TripleId {
                left: beachline.site_of(left).unwrap(),
                arc: beachline.site_of(arc).unwrap(),
                right: beachline.site_of(right).unwrap(),
            },
        }
    }

    #[test]
    fn navigation_over_balanced_sequence() {
        let mut dcel = Dcel::new();
        let ids: Vec<SiteId> = (0..5).map(SiteId).collect();
        let (beachline, arcs) =
            Beachline::from_arc_sequence(&ids, Point2::ORIGIN, &mut dcel).unwrap();

        assert_eq!(beachline.arcs().unwrap(), arcs);
        assert_eq!(beachline.arc_sites().unwrap(), ids);
        assert_eq!(beachline.number_of_arcs(), 5);
        assert_eq!(dcel.number_of_edges(), 4);

        assert_eq!(beachline.prev_arc(arcs[0]).unwrap(), None);
        assert_eq!(beachline.next_arc(arcs[4]).unwrap(), None);
        for w in arcs.windows(2) {
            assert_eq!(beachline.next_arc(w[0]).unwrap(), Some(w[1]));
            assert_eq!(beachline.prev_arc(w[1]).unwrap(), Some(w[0]));
            let edge = beachline.next_edge(w[0]).unwrap().unwrap();
            assert_eq!(beachline.prev_edge(w[1]).unwrap(), Some(edge));
            let left = beachline.site_of(w[0]).unwrap();
            let right = beachline.site_of(w[1]).unwrap();
            assert_eq!(beachline.edge_id(edge).unwrap(), format!("{left}-{right}"));
            let dcel_edge = dcel.edge(beachline.edge_node(edge).unwrap().edge).unwrap();
            assert_eq!(dcel_edge.sites, Some((left, right)));
        }
    }

    #[test]
    fn dangling_keys_are_errors() {
        let mut dcel = Dcel::new();
        let (mut beachline, arcs) =
            Beachline::from_arc_sequence(&[SiteId(0), SiteId(1)], Point2::ORIGIN, &mut dcel)
                .unwrap();
        let root = beachline.root().unwrap();
        assert_eq!(
            beachline.site_of(root),
            Err(BeachlineError::NotAnArc { node: root })
        );
        assert_eq!(
            beachline.edge_node(arcs[0]).err(),
            Some(BeachlineError::NotAnEdge { node: arcs[0] })
        );
        beachline.nodes.remove(arcs[1]);
        assert_eq!(
            beachline.edge_sites(root),
            Err(BeachlineError::MissingNode { node: arcs[1] })
        );
    }

    #[test]
    fn split_and_locate() {
        let sites = points(&[(0.0, 2.0), (1.0, 1.0)]);
        let mut dcel = Dcel::new();
        let mut beachline = Beachline::new();
        let first = beachline
            .insert_first(&[SiteId(0)], Point2::new(0.0, 2.0), &mut dcel)
            .unwrap();
        assert_eq!(beachline.locate_arc(5.0, 1.0, &sites).unwrap(), Some(first[0]));

        let leaves = beachline
            .split_arc(first[0], &[SiteId(1)], Point2::new(1.0, 1.0), 1.0, &sites, &mut dcel)
            .unwrap();
        assert_eq!(leaves.len(), 3);
        assert_eq!(
            beachline.arc_sites().unwrap(),
            vec![SiteId(0), SiteId(1), SiteId(0)]
        );
        assert!(beachline.node(first[0]).is_err());

        // Both new edges start on the old parabola above the new site.
        let root = beachline.root().unwrap();
        let origin = dcel.edge(beachline.edge_node(root).unwrap().edge).unwrap().origin;
        assert_relative_eq!(origin.x, 1.0);
        assert_relative_eq!(origin.y, 2.0);

        beachline.validate(0.5, &sites).unwrap();
        assert_eq!(beachline.locate_arc(1.0, 0.5, &sites).unwrap(), Some(leaves[1]));
        assert_eq!(beachline.locate_arc(-10.0, 0.5, &sites).unwrap(), Some(leaves[0]));
        assert_eq!(beachline.locate_arc(10.0, 0.5, &sites).unwrap(), Some(leaves[2]));
    }

    #[test]
    fn insert_beside_keeps_order() {
        let sites = points(&[(0.0, 0.0), (2.0, 0.0), (-2.0, 0.0)]);
        let mut dcel = Dcel::new();
        let mut beachline = Beachline::new();
        let first = beachline
            .insert_first(&[SiteId(0)], Point2::new(0.0, 0.0), &mut dcel)
            .unwrap();
        let leaves = beachline
            .insert_beside(first[0], &[SiteId(1)], Point2::new(2.0, 0.0), &sites, &mut dcel)
            .unwrap();
        assert_eq!(beachline.arc_sites().unwrap(), vec![SiteId(0), SiteId(1)]);
        let root = beachline.root().unwrap();
        let origin = dcel.edge(beachline.edge_node(root).unwrap().edge).unwrap().origin;
        assert_eq!(origin, Point2::new(1.0, 0.0));

        beachline
            .insert_beside(leaves[0], &[SiteId(2)], Point2::new(-2.0, 0.0), &sites, &mut dcel)
            .unwrap();
        assert_eq!(
            beachline.arc_sites().unwrap(),
            vec![SiteId(2), SiteId(0), SiteId(1)]
        );
        beachline.validate(-1.0, &sites).unwrap();
    }

    #[test]
    fn remove_arc_rewires_neighbours() {
        let mut dcel = Dcel::new();
        let ids: Vec<SiteId> = (0..4).map(SiteId).collect();
        let (mut beachline, arcs) =
            Beachline::from_arc_sequence(&ids, Point2::ORIGIN, &mut dcel).unwrap();
        let vertex = Point2::new(3.0, -1.0);

        let (left, right) = beachline.remove_arc(arcs[2], vertex, &mut dcel).unwrap();
        assert_eq!((left, right), (arcs[1], arcs[3]));
        assert_eq!(
            beachline.arc_sites().unwrap(),
            vec![SiteId(0), SiteId(1), SiteId(3)]
        );
        assert_eq!(dcel.number_of_edges(), 4);
        assert_eq!(
            dcel.edges().filter(|(_, e)| e.end == Some(vertex)).count(),
            2
        );
        let bridging = beachline.next_edge(arcs[1]).unwrap().unwrap();
        assert_eq!(beachline.edge_id(bridging).unwrap(), "1-3");
        let edge = dcel.edge(beachline.edge_node(bridging).unwrap().edge).unwrap();
        assert_eq!(edge.origin, vertex);
        assert!(!edge.is_finished());

        assert_eq!(
            beachline.remove_arc(arcs[0], vertex, &mut dcel),
            Err(BeachlineError::NotInterior { node: arcs[0] })
        );
    }

    #[test]
    fn insert_between_ends_the_shared_edge() {
        let mut dcel = Dcel::new();
        let ids: Vec<SiteId> = (0..3).map(SiteId).collect();
        let (mut beachline, arcs) =
            Beachline::from_arc_sequence(&ids, Point2::ORIGIN, &mut dcel).unwrap();
        let site = Point2::new(2.0, -1.0);
        let old = beachline.edge_node(beachline.next_edge(arcs[1]).unwrap().unwrap()).unwrap().edge;

        let leaves = beachline
            .insert_between(arcs[1], arcs[2], &[SiteId(7)], site, &mut dcel)
            .unwrap();
        assert_eq!(leaves.len(), 2);
        assert_eq!(
            beachline.arc_sites().unwrap(),
            vec![SiteId(0), SiteId(1), SiteId(7), SiteId(2)]
        );
        assert_eq!(dcel.edge(old).unwrap().end, Some(site));
        for arc in [leaves[1], arcs[2]] {
            let edge = beachline.prev_edge(arc).unwrap().unwrap();
            let edge = dcel.edge(beachline.edge_node(edge).unwrap().edge).unwrap();
            assert_eq!(edge.origin, site);
            assert!(!edge.is_finished());
        }
        assert_eq!(
            beachline.edge_id(beachline.prev_edge(arcs[2]).unwrap().unwrap()).unwrap(),
            "7-2"
        );

        assert_eq!(
            beachline.insert_between(arcs[0], arcs[2], &[SiteId(8)], site, &mut dcel),
            Err(BeachlineError::NotAdjacent {
                left: arcs[0],
                right: arcs[2]
            })
        );
    }

    #[test]
    fn pending_close_lifecycle() {
        let mut dcel = Dcel::new();
        let ids: Vec<SiteId> = (0..4).map(SiteId).collect();
        let (mut beachline, arcs) =
            Beachline::from_arc_sequence(&ids, Point2::ORIGIN, &mut dcel).unwrap();

        let p = Point2::new(1.0, 1.0);
        let first = beachline
            .set_pending_close(arcs[1], dummy_event(&beachline, arcs[1], p))
            .unwrap();
        let second = beachline
            .set_pending_close(arcs[1], dummy_event(&beachline, arcs[1], p))
            .unwrap();
        assert!(!beachline.close_event(first).unwrap().live);
        assert!(beachline.pending_close(arcs[1]).unwrap().is_some());

        beachline
            .set_pending_close(arcs[2], dummy_event(&beachline, arcs[2], p + Point2::new(0.0, 1e-7)))
            .unwrap();
        assert!(beachline.shares_pending_close(arcs[1], arcs[2], 1e-5).unwrap());
        assert!(!beachline.shares_pending_close(arcs[1], arcs[0], 1e-5).unwrap());
        beachline.validate(0.0, &points(&[(0.0, 9.0), (1.0, 9.0), (2.0, 9.0), (3.0, 9.0)]))
            .unwrap();

        let taken = beachline.take_close_event(second).unwrap();
        assert!(taken.live);
        assert!(beachline.pending_close(arcs[1]).unwrap().is_none());
        assert_eq!(beachline.live_close_events().count(), 1);

        // Splitting an arc cancels what was pending on it.
        let sites = points(&[(0.0, 9.0), (1.0, 9.0), (2.0, 9.0), (3.0, 9.0), (2.0, 5.0)]);
        beachline
            .split_arc(arcs[2], &[SiteId(4)], Point2::new(2.0, 5.0), 5.0, &sites, &mut dcel)
            .unwrap();
        assert_eq!(beachline.live_close_events().count(), 0);
    }
}
