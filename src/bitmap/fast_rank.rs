use std::fmt;
use std::ops::RangeBounds;
use std::sync::OnceLock;

use tracing::trace;

use super::container::Container;
use super::util;
use super::RoaringBitmap;
use crate::RangeError;

/// A [`RoaringBitmap`] that answers [`rank`] and [`select`] by a binary search over the
/// cumulative cardinalities of its containers.
///
/// The cumulative cardinalities are computed by the first `rank` or `select` following a
/// mutation and kept until the next mutation.
///
/// [`rank`]: FastRankRoaringBitmap::rank
/// [`select`]: FastRankRoaringBitmap::select
///
/// # Examples
///
/// ```rust
/// use roaring_core::FastRankRoaringBitmap;
///
/// let mut rb = FastRankRoaringBitmap::new();
/// rb.insert_range(10..20).unwrap();
/// rb.insert(1 << 20);
/// assert!(!rb.is_cached());
///
/// assert_eq!(rb.rank(15), 6);
/// assert_eq!(rb.select(10), Some(1 << 20));
/// assert!(rb.is_cached());
///
/// rb.remove(10);
/// assert!(!rb.is_cached());
/// assert_eq!(rb.rank(15), 5);
/// ```
#[derive(Clone, Default)]
pub struct FastRankRoaringBitmap {
    bitmap: RoaringBitmap,
    cumulative: OnceLock<Vec<u64>>,
}

impl FastRankRoaringBitmap {
    /// Creates an empty bitmap.
    pub fn new() -> FastRankRoaringBitmap {
        FastRankRoaringBitmap::default()
    }

    /// The wrapped bitmap.
    pub fn as_bitmap(&self) -> &RoaringBitmap {
        &self.bitmap
    }

    /// Unwraps the bitmap, dropping the cumulative cardinalities.
    pub fn into_bitmap(self) -> RoaringBitmap {
        self.bitmap
    }

    /// Returns `true` if the cumulative cardinalities are computed.
    pub fn is_cached(&self) -> bool {
        self.cumulative.get().is_some()
    }

    /// Applies `f` to the wrapped bitmap, forgetting the cumulative cardinalities.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::FastRankRoaringBitmap;
    ///
    /// let mut rb = FastRankRoaringBitmap::from_iter([1, 2, 3]);
    /// assert_eq!(rb.rank(3), 3);
    /// rb.update(|bitmap| bitmap.remove_smallest(2));
    /// assert_eq!(rb.rank(3), 1);
    /// ```
    pub fn update<R>(&mut self, f: impl FnOnce(&mut RoaringBitmap) -> R) -> R {
        self.invalidate();
        f(&mut self.bitmap)
    }

    /// Adds a value, see [`RoaringBitmap::insert`].
    pub fn insert(&mut self, value: u32) -> bool {
        self.update(|bitmap| bitmap.insert(value))
    }

    /// Removes a value, see [`RoaringBitmap::remove`].
    pub fn remove(&mut self, value: u32) -> bool {
        self.update(|bitmap| bitmap.remove(value))
    }

    /// Adds a range of values, see [`RoaringBitmap::insert_range`].
    pub fn insert_range<R: RangeBounds<u32>>(&mut self, range: R) -> Result<u64, RangeError> {
        self.update(|bitmap| bitmap.insert_range(range))
    }

    /// Removes a range of values, see [`RoaringBitmap::remove_range`].
    pub fn remove_range<R: RangeBounds<u32>>(&mut self, range: R) -> Result<u64, RangeError> {
        self.update(|bitmap| bitmap.remove_range(range))
    }

    /// Complements a range of values, see [`RoaringBitmap::flip`].
    pub fn flip<R: RangeBounds<u32>>(&mut self, range: R) -> Result<(), RangeError> {
        self.update(|bitmap| bitmap.flip(range))
    }

    /// Appends a value past the maximum, see [`RoaringBitmap::push`].
    pub fn push(&mut self, value: u32) -> bool {
        self.update(|bitmap| bitmap.push(value))
    }

    /// Removes every value.
    pub fn clear(&mut self) {
        self.update(RoaringBitmap::clear)
    }

    /// Returns `true` if this set contains the value.
    pub fn contains(&self, value: u32) -> bool {
        self.bitmap.contains(value)
    }

    /// Returns the number of values in the set.
    pub fn len(&self) -> u64 {
        self.cumulative().last().copied().unwrap_or(0)
    }

    /// Returns `true` if there are no values in the set.
    pub fn is_empty(&self) -> bool {
        self.bitmap.is_empty()
    }

    /// Returns the number of values that are less than or equal to `value`.
    pub fn rank(&self, value: u32) -> u64 {
        let (key, index) = util::split(value);
        let cumulative = self.cumulative();
        match self.bitmap.containers.binary_search_by_key(&key, |c| c.key) {
            Ok(i) => before(cumulative, i) + self.bitmap.containers[i].rank(index),
            Err(i) => before(cumulative, i),
        }
    }

    /// Returns the `n`th value of the set or `None` if `n >= len()`.
    pub fn select(&self, n: u32) -> Option<u32> {
        let n = u64::from(n);
        let cumulative = self.cumulative();
        let i = cumulative.partition_point(|&len| len <= n);
        let container = self.bitmap.containers.get(i)?;
        let index = (n - before(cumulative, i)) as u16;
        container.select(index).map(|index| util::join(container.key, index))
    }

    fn cumulative(&self) -> &[u64] {
        self.cumulative.get_or_init(|| {
            let cumulative: Vec<u64> = self
                .bitmap
                .containers
                .iter()
                .map(Container::len)
                .scan(0, |total, len| {
                    *total += len;
                    Some(*total)
                })
                .collect();
            trace!(containers = cumulative.len(), "computed cumulative cardinalities");
            cumulative
        })
    }

    fn invalidate(&mut self) {
        self.cumulative.take();
    }
}

/// Number of values in the containers before the `i`th one.
fn before(cumulative: &[u64], i: usize) -> u64 {
    match i {
        0 => 0,
        i => cumulative[i - 1],
    }
}

impl From<RoaringBitmap> for FastRankRoaringBitmap {
    fn from(bitmap: RoaringBitmap) -> FastRankRoaringBitmap {
        FastRankRoaringBitmap { bitmap, cumulative: OnceLock::new() }
    }
}

impl From<FastRankRoaringBitmap> for RoaringBitmap {
    fn from(bitmap: FastRankRoaringBitmap) -> RoaringBitmap {
        bitmap.bitmap
    }
}

impl FromIterator<u32> for FastRankRoaringBitmap {
    fn from_iter<I: IntoIterator<Item = u32>>(iterator: I) -> FastRankRoaringBitmap {
        FastRankRoaringBitmap::from(RoaringBitmap::from_iter(iterator))
    }
}

impl Extend<u32> for FastRankRoaringBitmap {
    fn extend<I: IntoIterator<Item = u32>>(&mut self, iterator: I) {
        self.update(|bitmap| bitmap.extend(iterator))
    }
}

impl PartialEq for FastRankRoaringBitmap {
    fn eq(&self, other: &Self) -> bool {
        self.bitmap == other.bitmap
    }
}

impl fmt::Debug for FastRankRoaringBitmap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FastRankRoaringBitmap")
            .field("bitmap", &self.bitmap)
            .field("cached", &self.is_cached())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::FastRankRoaringBitmap;
    use crate::RoaringBitmap;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn agrees_with_the_plain_bitmap(
            bitmap in RoaringBitmap::arbitrary(),
            values in proptest::collection::vec(any::<u32>(), 1..16),
        ) {
            let fast = FastRankRoaringBitmap::from(bitmap.clone());
            for &value in &values {
                prop_assert_eq!(fast.rank(value), bitmap.rank(value));
                prop_assert_eq!(fast.select(value % 200_000), bitmap.select(value % 200_000));
            }
            prop_assert_eq!(fast.len(), bitmap.len());
        }
    }

    #[test]
    fn every_mutation_invalidates() {
        let mut fast = FastRankRoaringBitmap::from_iter(0..100);
        assert!(!fast.is_cached());
        assert_eq!(fast.select(99), Some(99));
        assert!(fast.is_cached());

        fast.insert_range(200..300).unwrap();
        assert!(!fast.is_cached());
        assert_eq!(fast.rank(250), 151);

        fast.remove_range(0..50).unwrap();
        assert_eq!(fast.rank(250), 101);

        fast.flip(0..100).unwrap();
        assert_eq!(fast.rank(99), 50);

        fast.push(1 << 20);
        assert_eq!(fast.select(150), Some(1 << 20));

        fast.extend([5 << 16]);
        assert_eq!(fast.rank(1 << 20), 152);

        fast.clear();
        assert_eq!(fast.rank(u32::MAX), 0);
        assert_eq!(fast.select(0), None);
        assert!(fast.is_empty());
    }

    #[test]
    fn rejected_ranges_leave_the_set_untouched() {
        let mut fast = FastRankRoaringBitmap::from_iter([1, 2, 3]);
        #[allow(clippy::reversed_empty_ranges)]
        let error = fast.insert_range(10..5);
        assert!(error.is_err());
        assert_eq!(fast.len(), 3);
        assert_eq!(fast.into_bitmap(), RoaringBitmap::from([1, 2, 3]));
    }
}
