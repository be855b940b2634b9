mod container;
mod fast_rank;
mod fmt;
mod lazy;
mod multiops;
mod statistics;
mod store;
mod util;

// declaration order decides the order of the `impl` blocks in rustdoc
mod cmp;
mod inherent;
mod iter;
mod ops;
#[cfg(feature = "serde")]
mod serde;
mod serialization;

pub use self::fast_rank::FastRankRoaringBitmap;
pub use self::iter::IntoIter;
pub use self::iter::Iter;
pub use self::lazy::LazyUnion;
pub use self::statistics::Statistics;
pub use self::store::{ArrayError, RunError};

pub(crate) use self::store::BITMAP_LENGTH;

/// A compressed set of `u32`, stored with the [Roaring](https://roaringbitmap.org/) scheme.
///
/// Values are grouped by their 16 high bits. Each group lives in its own container which is
/// kept as a sorted array, a plain bitmap or a list of runs, whichever is smallest.
///
/// # Examples
///
/// ```rust
/// use roaring_core::RoaringBitmap;
///
/// let mut rb = RoaringBitmap::new();
/// rb.insert_range(10..20).unwrap();
/// rb.insert(1 << 20);
/// rb.remove(15);
///
/// assert_eq!(rb.len(), 10);
/// assert_eq!(rb.min(), Some(10));
/// assert_eq!(rb.iter().last(), Some(1 << 20));
/// ```
#[derive(PartialEq)]
pub struct RoaringBitmap {
    containers: Vec<container::Container>,
}
