//! Collection aliases shared across the sweep.
//!
//! Hash-based lookups use `rustc_hash` (keys are internal ids, never
//! attacker-controlled) and short per-node lists use `smallvec` so the common
//! case stays on the stack.

use rustc_hash::{FxBuildHasher, FxHashMap, FxHashSet, FxHasher};
use smallvec::SmallVec;

use crate::core::site::SiteId;

// =============================================================================
// CORE OPTIMIZED TYPES
// =============================================================================

/// Optimized `HashMap` type for internal mappings.
/// Uses `FastHasher` (`rustc_hash::FxHasher`), which is not DoS-resistant.
///
/// # Examples
///
/// ```rust
/// use gvd_sweep::core::collections::FastHashMap;
///
/// let mut map: FastHashMap<u64, usize> = FastHashMap::default();
/// map.insert(123, 456);
/// ```
pub type FastHashMap<K, V> = FxHashMap<K, V>;

/// Optimized `HashSet` type for internal membership tests.
pub type FastHashSet<T> = FxHashSet<T>;

/// Fast non-cryptographic hasher alias for internal collections.
pub type FastHasher = FxHasher;

/// Build hasher that instantiates [`FastHasher`].
pub type FastBuildHasher = FxBuildHasher;

/// Re-export the Entry enum for `FastHashMap`.
pub use std::collections::hash_map::Entry;

/// Small-optimized Vec that uses stack allocation for small collections.
///
/// # Size Guidelines
///
/// - **N=2**: circle/segment intersections
/// - **N=4**: segments incident to one point site
/// - **N=6**: equidistant candidates
/// - **N=8**: breakpoint candidates, arcs touched by one event
///
/// # Examples
///
/// ```rust
/// use gvd_sweep::core::collections::SmallBuffer;
///
/// let mut buffer: SmallBuffer<i32, 8> = SmallBuffer::new();
/// for i in 0..5 {
///     buffer.push(i);
/// }
/// assert!(!buffer.spilled());
/// ```
pub type SmallBuffer<T, const N: usize> = SmallVec<[T; N]>;

// =============================================================================
// DOMAIN-SPECIFIC TYPES
// =============================================================================

/// Segment sites touching one point site.
pub type IncidentSegments = SmallBuffer<SiteId, 4>;

/// Point site to the segments that end at it.
pub type SiteToSegmentsMap = FastHashMap<SiteId, IncidentSegments>;

// =============================================================================
// HELPERS
// =============================================================================

/// Creates a `FastHashMap` with pre-allocated capacity.
///
/// ```rust
/// use gvd_sweep::core::collections::fast_hash_map_with_capacity;
///
/// let map = fast_hash_map_with_capacity::<u64, usize>(1000);
/// assert!(map.capacity() >= 1000);
/// ```
#[inline]
#[must_use]
pub fn fast_hash_map_with_capacity<K, V>(capacity: usize) -> FastHashMap<K, V> {
    FastHashMap::with_capacity_and_hasher(capacity, FastBuildHasher::default())
}

/// Creates a `FastHashSet` with pre-allocated capacity.
#[inline]
#[must_use]
pub fn fast_hash_set_with_capacity<T>(capacity: usize) -> FastHashSet<T> {
    FastHashSet::with_capacity_and_hasher(capacity, FastBuildHasher::default())
}
