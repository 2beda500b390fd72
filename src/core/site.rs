//! Input sites: points and segments, with the topology tags the close-event
//! tests rely on.
//!
//! Sites are immutable once a [`SiteSet`] has been built. Identity is the
//! index into the set ([`SiteId`]); segment sites refer to their endpoints by
//! id so that "this point is the end of that segment" is an exact test.
//!
//! # Groups
//!
//! Every site carries a group label. Sites created together (the vertices and
//! sides of one polygon, or the two endpoints of one free segment) share a
//! group; every free point gets a group of its own. Inside one group no two
//! points may share an ordinate, which [`SiteSetBuilder::build`] validates.
//!
//! # Examples
//!
//! ```rust
//! use gvd_sweep::core::site::{BoundaryRole, SiteSetBuilder};
//! use gvd_sweep::geometry::point::Point2;
//!
//! let mut builder = SiteSetBuilder::new();
//! let ids = builder
//!     .add_polygon(&[
//!         Point2::new(0.0, 2.0),
//!         Point2::new(1.0, 0.5),
//!         Point2::new(0.1, -1.0),
//!         Point2::new(-1.0, 0.4),
//!     ])
//!     .unwrap();
//! let sites = builder.build().unwrap();
//!
//! // Four vertices and four sides.
//! assert_eq!(sites.len(), 8);
//! let top = sites.point(ids[0]).unwrap();
//! assert_eq!(top.role, BoundaryRole::Top);
//! assert_eq!(sites.segments_starting_at(ids[0]).len(), 2);
//! ```

#![forbid(unsafe_code)]

use crate::core::collections::{IncidentSegments, SiteToSegmentsMap, fast_hash_map_with_capacity};
use crate::geometry::equidistant::SiteShape;
use crate::geometry::point::Point2;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised while assembling a [`SiteSet`].
#[derive(Clone, Debug, Error, PartialEq)]
pub enum SiteError {
    /// A coordinate is NaN or infinite.
    #[error("Site coordinate is not finite: {position}")]
    NonFiniteCoordinate {
        /// The offending position.
        position: Point2,
    },
    /// A segment connects a point to itself or two coincident points.
    #[error("Segment {upper}-{lower} has zero length")]
    DegenerateSegment {
        /// First endpoint id.
        upper: SiteId,
        /// Second endpoint id.
        lower: SiteId,
    },
    /// A segment is parallel to the sweep directrix.
    #[error("Segment {upper}-{lower} is horizontal at y = {y}")]
    HorizontalSegment {
        /// First endpoint id.
        upper: SiteId,
        /// Second endpoint id.
        lower: SiteId,
        /// The shared ordinate.
        y: f64,
    },
    /// An id does not name a site of the builder.
    #[error("Unknown site id {id}")]
    UnknownSite {
        /// The unknown id.
        id: SiteId,
    },
    /// An id names a segment where a point was required.
    #[error("Site {id} is not a point site")]
    NotAPoint {
        /// The offending id.
        id: SiteId,
    },
    /// Segment endpoints belong to different groups.
    #[error("Segment endpoints {upper} and {lower} belong to different groups")]
    MixedGroups {
        /// First endpoint id.
        upper: SiteId,
        /// Second endpoint id.
        lower: SiteId,
    },
    /// Two points of one group share an ordinate.
    #[error("Points {first} and {second} of group {group} share the ordinate y = {y}")]
    DuplicateOrdinate {
        /// Group label.
        group: u32,
        /// First point id.
        first: SiteId,
        /// Second point id.
        second: SiteId,
        /// The shared ordinate.
        y: f64,
    },
    /// A polygon needs at least three vertices.
    #[error("Polygon has {len} vertices; at least 3 are required")]
    PolygonTooSmall {
        /// Number of vertices supplied.
        len: usize,
    },
}

// =============================================================================
// IDENTIFIERS AND TAGS
// =============================================================================

/// Stable identity of a site: its index in the [`SiteSet`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SiteId(pub usize);

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of a polygon vertex in its polygon's sweep order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BoundaryRole {
    /// Highest vertex; both incident sides start here.
    Top,
    /// Vertex on the chain descending from the left side of the top vertex.
    ChildLeftHull,
    /// Vertex on the chain descending from the right side of the top vertex.
    ChildRightHull,
    /// Lowest vertex; both incident sides end here.
    Closing,
    /// Free point, or a vertex not reached from the top vertex.
    #[default]
    None,
}

impl fmt::Display for BoundaryRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Top => "TOP",
            Self::ChildLeftHull => "CHILD_LEFT_HULL",
            Self::ChildRightHull => "CHILD_RIGHT_HULL",
            Self::Closing => "CLOSING",
            Self::None => "NONE",
        };
        f.write_str(name)
    }
}

// =============================================================================
// SITE TYPES
// =============================================================================

/// A point site.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointSite {
    /// Location.
    pub position: Point2,
    /// Group label.
    pub group: u32,
    /// Topology tag.
    pub role: BoundaryRole,
    /// `true` if this point is the lower endpoint of at least one segment.
    pub flipped: bool,
}

/// A segment site, stored upper endpoint first.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SegmentSite {
    /// Upper endpoint.
    pub a: Point2,
    /// Lower endpoint.
    pub b: Point2,
    /// Point site at `a`.
    pub upper: SiteId,
    /// Point site at `b`.
    pub lower: SiteId,
    /// Group label.
    pub group: u32,
}

/// Any site.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Site {
    /// A point site.
    Point(PointSite),
    /// A segment site.
    Segment(SegmentSite),
}

impl Site {
    /// Geometric shape of the site.
    #[must_use]
    pub const fn shape(&self) -> SiteShape {
        match self {
            Self::Point(p) => SiteShape::Point(p.position),
            Self::Segment(s) => SiteShape::Segment(s.a, s.b),
        }
    }

    /// Group label.
    #[must_use]
    pub const fn group(&self) -> u32 {
        match self {
            Self::Point(p) => p.group,
            Self::Segment(s) => s.group,
        }
    }

    /// `true` for point sites.
    #[must_use]
    pub const fn is_point(&self) -> bool {
        matches!(self, Self::Point(_))
    }

    /// `true` for segment sites.
    #[must_use]
    pub const fn is_segment(&self) -> bool {
        matches!(self, Self::Segment(_))
    }

    /// The point site, if this is one.
    #[must_use]
    pub const fn as_point(&self) -> Option<&PointSite> {
        match self {
            Self::Point(p) => Some(p),
            Self::Segment(_) => None,
        }
    }

    /// The segment site, if this is one.
    #[must_use]
    pub const fn as_segment(&self) -> Option<&SegmentSite> {
        match self {
            Self::Point(_) => None,
            Self::Segment(s) => Some(s),
        }
    }

    /// Highest point of the site; the sweep reaches the site there.
    #[must_use]
    pub const fn top(&self) -> Point2 {
        match self {
            Self::Point(p) => p.position,
            Self::Segment(s) => s.a,
        }
    }

    /// Ordinate of [`Self::top`].
    #[must_use]
    pub const fn top_y(&self) -> f64 {
        self.top().y
    }

    /// Distance from `p` (clamped to the closed segment for segment sites).
    #[must_use]
    pub fn distance_to(&self, p: Point2) -> f64 {
        self.shape().distance_to(p)
    }
}

// =============================================================================
// SITE SET
// =============================================================================

/// Validated, immutable collection of sites.
#[derive(Clone, Debug, Default, Serialize)]
pub struct SiteSet {
    sites: Vec<Site>,
    #[serde(skip)]
    incident: SiteToSegmentsMap,
}

impl SiteSet {
    /// Number of sites (points and segments).
    #[must_use]
    pub fn len(&self) -> usize {
        self.sites.len()
    }

    /// `true` if there are no sites.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    /// Looks up a site.
    #[must_use]
    pub fn get(&self, id: SiteId) -> Option<&Site> {
        self.sites.get(id.0)
    }

    /// Looks up a point site.
    #[must_use]
    pub fn point(&self, id: SiteId) -> Option<&PointSite> {
        self.get(id).and_then(Site::as_point)
    }

    /// Looks up a segment site.
    #[must_use]
    pub fn segment(&self, id: SiteId) -> Option<&SegmentSite> {
        self.get(id).and_then(Site::as_segment)
    }

    /// All sites with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (SiteId, &Site)> {
        self.sites.iter().enumerate().map(|(i, s)| (SiteId(i), s))
    }

    /// All point sites with their ids.
    pub fn points(&self) -> impl Iterator<Item = (SiteId, &PointSite)> {
        self.iter().filter_map(|(id, s)| s.as_point().map(|p| (id, p)))
    }

    /// All segment sites with their ids.
    pub fn segments(&self) -> impl Iterator<Item = (SiteId, &SegmentSite)> {
        self.iter().filter_map(|(id, s)| s.as_segment().map(|seg| (id, seg)))
    }

    /// Segments having the point site `id` as either endpoint.
    #[must_use]
    pub fn segments_incident_to(&self, id: SiteId) -> &[SiteId] {
        self.incident.get(&id).map_or(&[], |segments| segments.as_slice())
    }

    /// Segments whose upper endpoint is the point site `id`.
    #[must_use]
    pub fn segments_starting_at(&self, id: SiteId) -> IncidentSegments {
        self.segments_incident_to(id)
            .iter()
            .copied()
            .filter(|s| self.segment(*s).is_some_and(|seg| seg.upper == id))
            .collect()
    }

    /// Segments whose lower endpoint is the point site `id`.
    #[must_use]
    pub fn segments_ending_at(&self, id: SiteId) -> IncidentSegments {
        self.segments_incident_to(id)
            .iter()
            .copied()
            .filter(|s| self.segment(*s).is_some_and(|seg| seg.lower == id))
            .collect()
    }
}

// =============================================================================
// BUILDER
// =============================================================================

/// Incremental constructor for [`SiteSet`].
#[derive(Clone, Debug, Default)]
pub struct SiteSetBuilder {
    sites: Vec<Site>,
    next_group: u32,
}

impl SiteSetBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_group(&mut self) -> u32 {
        let group = self.next_group;
        self.next_group += 1;
        group
    }

    fn push_point(&mut self, position: Point2, group: u32) -> Result<SiteId, SiteError> {
        if !position.is_finite() {
            return Err(SiteError::NonFiniteCoordinate { position });
        }
        let id = SiteId(self.sites.len());
        self.sites.push(Site::Point(PointSite {
            position,
            group,
            role: BoundaryRole::None,
            flipped: false,
        }));
        Ok(id)
    }

    fn point_mut(&mut self, id: SiteId) -> Result<&mut PointSite, SiteError> {
        match self.sites.get_mut(id.0) {
            Some(Site::Point(p)) => Ok(p),
            Some(Site::Segment(_)) => Err(SiteError::NotAPoint { id }),
            None => Err(SiteError::UnknownSite { id }),
        }
    }

    fn point_ref(&self, id: SiteId) -> Result<&PointSite, SiteError> {
        match self.sites.get(id.0) {
            Some(Site::Point(p)) => Ok(p),
            Some(Site::Segment(_)) => Err(SiteError::NotAPoint { id }),
            None => Err(SiteError::UnknownSite { id }),
        }
    }

    /// Adds a free point in a group of its own.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::NonFiniteCoordinate`] for NaN or infinite input.
    pub fn add_point(&mut self, position: Point2) -> Result<SiteId, SiteError> {
        let group = self.fresh_group();
        self.push_point(position, group)
    }

    /// Adds a segment between two existing point sites of the same group.
    ///
    /// The endpoints are reordered so that the segment's `a` is the upper one.
    ///
    /// # Errors
    ///
    /// Fails if either id is unknown or not a point, the endpoints coincide,
    /// the segment is horizontal, or the endpoints belong to different groups.
    #[allow(clippy::float_cmp)]
    pub fn add_segment(&mut self, p: SiteId, q: SiteId) -> Result<SiteId, SiteError> {
        let first = *self.point_ref(p)?;
        let second = *self.point_ref(q)?;
        if p == q || first.position == second.position {
            return Err(SiteError::DegenerateSegment { upper: p, lower: q });
        }
        if first.position.y == second.position.y {
            return Err(SiteError::HorizontalSegment {
                upper: p,
                lower: q,
                y: first.position.y,
            });
        }
        if first.group != second.group {
            return Err(SiteError::MixedGroups { upper: p, lower: q });
        }
        let ((upper, a), (lower, b)) = if first.position.y > second.position.y {
            ((p, first.position), (q, second.position))
        } else {
            ((q, second.position), (p, first.position))
        };
        let id = SiteId(self.sites.len());
        self.sites.push(Site::Segment(SegmentSite {
            a,
            b,
            upper,
            lower,
            group: first.group,
        }));
        Ok(id)
    }

    /// Adds a free segment together with its two endpoint sites.
    ///
    /// Returns `(segment, upper point, lower point)`.
    ///
    /// # Errors
    ///
    /// Same as [`add_segment`](Self::add_segment), plus non-finite input.
    pub fn add_free_segment(
        &mut self,
        p: Point2,
        q: Point2,
    ) -> Result<(SiteId, SiteId, SiteId), SiteError> {
        let group = self.fresh_group();
        let first = self.push_point(p, group)?;
        let second = self.push_point(q, group)?;
        let segment = self.add_segment(first, second)?;
        let (upper, lower) = if p.y > q.y { (first, second) } else { (second, first) };
        Ok((segment, upper, lower))
    }

    /// Adds a closed polygon: its vertices as point sites and its sides as
    /// segment sites, all in one new group. Vertex roles are assigned from
    /// the polygon's shape.
    ///
    /// Returns the ids of the vertices in input order.
    ///
    /// # Errors
    ///
    /// Fails for fewer than three vertices or for any invalid side.
    pub fn add_polygon(&mut self, vertices: &[Point2]) -> Result<Vec<SiteId>, SiteError> {
        if vertices.len() < 3 {
            return Err(SiteError::PolygonTooSmall { len: vertices.len() });
        }
        let group = self.fresh_group();
        let ids = vertices
            .iter()
            .map(|v| self.push_point(*v, group))
            .collect::<Result<Vec<_>, _>>()?;
        let mut sides = Vec::with_capacity(ids.len());
        for (i, id) in ids.iter().enumerate() {
            let next = ids[(i + 1) % ids.len()];
            sides.push(self.add_segment(*id, next)?);
        }
        self.assign_roles(&ids, &sides)?;
        Ok(ids)
    }

    /// Overrides the role of a point site.
    ///
    /// # Errors
    ///
    /// Fails if `id` is unknown or not a point.
    pub fn set_role(&mut self, id: SiteId, role: BoundaryRole) -> Result<(), SiteError> {
        self.point_mut(id)?.role = role;
        Ok(())
    }

    /// Tags the top and closing vertices, then walks both chains descending
    /// from the top vertex and tags their vertices as left or right hull.
    fn assign_roles(&mut self, vertices: &[SiteId], sides: &[SiteId]) -> Result<(), SiteError> {
        let segments: Vec<SegmentSite> = sides
            .iter()
            .filter_map(|s| self.sites[s.0].as_segment().copied())
            .collect();
        let by_height = |id: &&SiteId| self.point_ref(**id).map_or(f64::NAN, |p| p.position.y);
        let (Some(&top), Some(&bottom)) = (
            vertices.iter().max_by(|a, b| by_height(a).total_cmp(&by_height(b))),
            vertices.iter().min_by(|a, b| by_height(a).total_cmp(&by_height(b))),
        ) else {
            return Ok(());
        };

        let parents: Vec<&SegmentSite> = segments.iter().filter(|s| s.upper == top).collect();
        let [first, second] = parents.as_slice() else {
            tracing::warn!(
                top = %top,
                sides = parents.len(),
                "top vertex does not start exactly two sides; boundary roles left unset"
            );
            return Ok(());
        };
        let apex = self.point_ref(top)?.position;
        let (left, right) = if (first.b - apex).cross_z(second.b - apex) < 0.0 {
            (*second, *first)
        } else {
            (*first, *second)
        };

        self.set_role(top, BoundaryRole::Top)?;
        self.set_role(bottom, BoundaryRole::Closing)?;
        for (start, role) in [
            (left, BoundaryRole::ChildLeftHull),
            (right, BoundaryRole::ChildRightHull),
        ] {
            let mut current = Some(*start);
            while let Some(side) = current {
                let point = self.point_mut(side.lower)?;
                if point.role == BoundaryRole::None {
                    point.role = role;
                }
                current = segments.iter().find(|s| s.upper == side.lower).copied();
            }
        }
        Ok(())
    }

    /// Validates the input and freezes it into a [`SiteSet`].
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::DuplicateOrdinate`] when two points of one group
    /// share an ordinate.
    #[allow(clippy::float_cmp)]
    pub fn build(mut self) -> Result<SiteSet, SiteError> {
        let mut incident = fast_hash_map_with_capacity::<SiteId, IncidentSegments>(self.sites.len());
        let mut lower_ends = Vec::new();
        for (i, site) in self.sites.iter().enumerate() {
            if let Site::Segment(s) = site {
                incident.entry(s.upper).or_default().push(SiteId(i));
                incident.entry(s.lower).or_default().push(SiteId(i));
                lower_ends.push(s.lower);
            }
        }
        for id in lower_ends {
            self.point_mut(id)?.flipped = true;
        }

        let mut by_group: Vec<(u32, f64, SiteId)> = self
            .sites
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_point().map(|p| (p.group, p.position.y, SiteId(i))))
            .collect();
        by_group.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.total_cmp(&b.1)));
        for pair in by_group.windows(2) {
            if pair[0].0 == pair[1].0 && pair[0].1 == pair[1].1 {
                return Err(SiteError::DuplicateOrdinate {
                    group: pair[0].0,
                    first: pair[0].2,
                    second: pair[1].2,
                    y: pair[0].1,
                });
            }
        }

        Ok(SiteSet {
            sites: self.sites,
            incident,
        })
    }
}

impl SiteSet {
    /// Builds a set of free point sites.
    ///
    /// # Errors
    ///
    /// Returns [`SiteError::NonFiniteCoordinate`] for NaN or infinite input.
    ///
    /// ```rust
    /// use gvd_sweep::core::site::SiteSet;
    /// use gvd_sweep::geometry::point::Point2;
    ///
    /// let sites = SiteSet::from_points(&[Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)]).unwrap();
    /// assert_eq!(sites.len(), 2);
    /// ```
    pub fn from_points(points: &[Point2]) -> Result<Self, SiteError> {
        let mut builder = SiteSetBuilder::new();
        for p in points {
            builder.add_point(*p)?;
        }
        builder.build()
    }
}

// =============================================================================
// TESTS
// =============================================================================
