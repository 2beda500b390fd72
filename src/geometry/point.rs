//! Planar points and the handful of vector operations the sweep needs.
//!
//! Every coordinate in the sweep is an `f64`. Points double as vectors: the
//! difference of two points is a [`Point2`] and supports `dot`, `cross_z` and
//! `norm`. The cross product follows the homogeneous 3D convention of the
//! predicates: `cross_z(u, v)` is the `z` component of `(u, 0) × (v, 0)`.

#![forbid(unsafe_code)]

use approx::{AbsDiffEq, RelativeEq};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

// =============================================================================
// POINT STRUCT DEFINITION
// =============================================================================

/// A point (or free vector) in the sweep plane.
///
/// # Examples
///
/// ```rust
/// use gvd_sweep::geometry::point::Point2;
///
/// let a = Point2::new(1.0, 2.0);
/// let b = Point2::new(4.0, 6.0);
/// assert_eq!((b - a).norm(), 5.0);
/// assert_eq!(a.distance(b), 5.0);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point2 {
    /// Abscissa.
    pub x: f64,
    /// Ordinate. The sweep directrix moves towards decreasing `y`.
    pub y: f64,
}

impl Point2 {
    /// Creates a point from its coordinates.
    #[inline]
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// The origin.
    pub const ORIGIN: Self = Self::new(0.0, 0.0);

    /// Dot product with `other`, both read as vectors.
    #[inline]
    #[must_use]
    pub fn dot(self, other: Self) -> f64 {
        self.x.mul_add(other.x, self.y * other.y)
    }

    /// `z` component of the 3D cross product `(self, 0) × (other, 0)`.
    ///
    /// ```rust
    /// use gvd_sweep::geometry::point::Point2;
    ///
    /// let u = Point2::new(1.0, 0.0);
    /// let v = Point2::new(0.0, 1.0);
    /// assert_eq!(u.cross_z(v), 1.0);
    /// assert_eq!(v.cross_z(u), -1.0);
    /// ```
    #[inline]
    #[must_use]
    pub fn cross_z(self, other: Self) -> f64 {
        self.x.mul_add(other.y, -(self.y * other.x))
    }

    /// Euclidean length of the vector.
    #[inline]
    #[must_use]
    pub fn norm(self) -> f64 {
        self.x.hypot(self.y)
    }

    /// Squared Euclidean length of the vector.
    #[inline]
    #[must_use]
    pub fn norm_squared(self) -> f64 {
        self.dot(self)
    }

    /// Euclidean distance between two points.
    #[inline]
    #[must_use]
    pub fn distance(self, other: Self) -> f64 {
        (self - other).norm()
    }

    /// Midpoint of the segment `self`–`other`.
    #[inline]
    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        Self::new(0.5 * (self.x + other.x), 0.5 * (self.y + other.y))
    }

    /// Vector rotated a quarter turn counter-clockwise.
    #[inline]
    #[must_use]
    pub const fn perp(self) -> Self {
        Self::new(-self.y, self.x)
    }

    /// Counter-clockwise angle from the positive `x` axis, in `[0, 2π)`.
    #[inline]
    #[must_use]
    pub fn heading(self) -> f64 {
        self.y.atan2(self.x).rem_euclid(std::f64::consts::TAU)
    }

    /// Unit vector in the same direction, or `None` for a (near) zero vector.
    #[must_use]
    pub fn normalized(self) -> Option<Self> {
        let len = self.norm();
        if len <= f64::EPSILON || !len.is_finite() {
            return None;
        }
        Some(Self::new(self.x / len, self.y / len))
    }

    /// Both coordinates are finite.
    #[inline]
    #[must_use]
    pub const fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Canonical representation of a computed vertex.
    ///
    /// Negative zeros are flushed to positive zero so that identical vertices
    /// print and serialize identically regardless of the arithmetic path that
    /// produced them.
    #[must_use]
    pub fn canonical(self) -> Self {
        // `-0.0 + 0.0 == +0.0`; every other value is unchanged.
        Self::new(self.x + 0.0, self.y + 0.0)
    }

    /// The point lifted to homogeneous 3D coordinates `(x, y, 0)`.
    #[inline]
    #[must_use]
    pub const fn to_vec3(self) -> [f64; 3] {
        [self.x, self.y, 0.0]
    }

    /// Exact-coordinate coincidence within `tolerance` on each axis.
    #[inline]
    #[must_use]
    pub fn coincides(self, other: Self, tolerance: f64) -> bool {
        (self.x - other.x).abs() <= tolerance && (self.y - other.y).abs() <= tolerance
    }
}

// =============================================================================
// ARITHMETIC
// =============================================================================

impl Add for Point2 {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Point2 {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f64> for Point2 {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f64) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

impl Neg for Point2 {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self::new(-self.x, -self.y)
    }
}

impl From<[f64; 2]> for Point2 {
    #[inline]
    fn from([x, y]: [f64; 2]) -> Self {
        Self::new(x, y)
    }
}

impl From<(f64, f64)> for Point2 {
    #[inline]
    fn from((x, y): (f64, f64)) -> Self {
        Self::new(x, y)
    }
}

impl fmt::Display for Point2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

// =============================================================================
// APPROXIMATE EQUALITY
// =============================================================================

impl AbsDiffEq for Point2 {
    type Epsilon = f64;

    fn default_epsilon() -> f64 {
        f64::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: f64) -> bool {
        self.x.abs_diff_eq(&other.x, epsilon) && self.y.abs_diff_eq(&other.y, epsilon)
    }
}

impl RelativeEq for Point2 {
    fn default_max_relative() -> f64 {
        f64::default_max_relative()
    }

    fn relative_eq(&self, other: &Self, epsilon: f64, max_relative: f64) -> bool {
        self.x.relative_eq(&other.x, epsilon, max_relative)
            && self.y.relative_eq(&other.y, epsilon, max_relative)
    }
}

// =============================================================================
// TESTS
// =============================================================================
