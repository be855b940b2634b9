use std::ops::BitOrAssign;

use tracing::debug;

use super::container::Container;
use super::store::{BitmapStore, Store, BITMAP_LENGTH};
use super::RoaringBitmap;

/// The running result of a chain of unions that defers cardinalities and representations.
///
/// Every key met more than once becomes a block of bitmap words that later inputs are or-ed into
/// without counting. The cardinality of such a union is unknown until [`LazyUnion::repair`]
/// counts every block and picks the representation of every container, once.
///
/// # Examples
///
/// ```rust
/// use roaring_core::{LazyUnion, RoaringBitmap};
///
/// let a: RoaringBitmap = (0..3000).collect();
/// let b: RoaringBitmap = (2000..6000).collect();
///
/// let mut union = LazyUnion::from(a.clone());
/// assert_eq!(union.len(), Some(3000));
///
/// union |= &b;
/// assert_eq!(union.len(), None);
///
/// assert_eq!(union.repair(), a | b);
/// ```
#[derive(Clone)]
pub struct LazyUnion {
    containers: Vec<LazyContainer>,
    len: Option<u64>,
}

#[derive(Clone)]
struct LazyContainer {
    key: u16,
    store: LazyStore,
}

#[derive(Clone)]
enum LazyStore {
    Exact(Store),
    Words(Box<[u64; BITMAP_LENGTH]>),
}

impl LazyUnion {
    /// Creates an empty union.
    pub fn new() -> LazyUnion {
        LazyUnion { containers: Vec::new(), len: Some(0) }
    }

    /// The cardinality of the union, or `None` while containers were merged without counting.
    pub fn len(&self) -> Option<u64> {
        self.len
    }

    /// Returns `true` if no value was added yet.
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Counts every merged container and gives each the representation it would have after
    /// eager unions.
    pub fn repair(self) -> RoaringBitmap {
        let mut repaired = 0;
        let containers: Vec<Container> = self
            .containers
            .into_iter()
            .map(|LazyContainer { key, store }| match store {
                LazyStore::Exact(store) => Container { key, store },
                LazyStore::Words(words) => {
                    repaired += 1;
                    let mut container =
                        Container { key, store: Store::Bitmap(BitmapStore::from_words(words)) };
                    container.ensure_correct_store();
                    container
                }
            })
            .filter(|container| !container.is_empty())
            .collect();
        debug!(containers = containers.len(), repaired, "repaired lazy union");
        RoaringBitmap { containers }
    }

    /// Or-s `rhs` into the container of `key` without counting, if there is one.
    fn merge(&mut self, key: u16, rhs: &Store) -> bool {
        let Ok(loc) = self.containers.binary_search_by_key(&key, |c| c.key) else {
            return false;
        };
        let lhs = &mut self.containers[loc].store;
        if let LazyStore::Exact(store) = lhs {
            let words = match std::mem::take(store) {
                Store::Bitmap(bits) => bits.into_words(),
                other => other.to_bitmap_store().into_words(),
            };
            *lhs = LazyStore::Words(words);
        }
        if let LazyStore::Words(words) = lhs {
            or_words(words, rhs);
        }
        self.len = None;
        true
    }

    fn insert_exact(&mut self, key: u16, store: Store) {
        if let Some(len) = &mut self.len {
            *len += store.len();
        }
        let loc = match self.containers.binary_search_by_key(&key, |c| c.key) {
            Ok(loc) | Err(loc) => loc,
        };
        self.containers.insert(loc, LazyContainer { key, store: LazyStore::Exact(store) });
    }
}

impl Default for LazyUnion {
    fn default() -> LazyUnion {
        LazyUnion::new()
    }
}

/// Sets the bits of `store` in `words`, leaving the count to [`LazyUnion::repair`].
fn or_words(words: &mut [u64; BITMAP_LENGTH], store: &Store) {
    match store {
        Store::Array(values) => {
            for &value in values.iter() {
                words[usize::from(value) / 64] |= 1u64 << (value % 64);
            }
        }
        Store::Bitmap(bits) => {
            for (word, &other) in words.iter_mut().zip(bits.as_array()) {
                *word |= other;
            }
        }
        Store::Run(runs) => {
            for interval in runs.intervals() {
                let (start, end) = (usize::from(interval.start()), usize::from(interval.end()));
                let (first, last) = (start / 64, end / 64);
                for (k, word) in words.iter_mut().enumerate().take(last + 1).skip(first) {
                    let mut mask = u64::MAX;
                    if k == first {
                        mask &= u64::MAX << (start % 64);
                    }
                    if k == last {
                        mask &= u64::MAX >> (63 - end % 64);
                    }
                    *word |= mask;
                }
            }
        }
    }
}

impl From<RoaringBitmap> for LazyUnion {
    fn from(bitmap: RoaringBitmap) -> LazyUnion {
        let len = Some(bitmap.len());
        let containers = bitmap
            .containers
            .into_iter()
            .map(|Container { key, store }| LazyContainer { key, store: LazyStore::Exact(store) })
            .collect();
        LazyUnion { containers, len }
    }
}

impl BitOrAssign<&RoaringBitmap> for LazyUnion {
    fn bitor_assign(&mut self, rhs: &RoaringBitmap) {
        for container in &rhs.containers {
            if !self.merge(container.key, &container.store) {
                self.insert_exact(container.key, container.store.clone());
            }
        }
    }
}

impl BitOrAssign<RoaringBitmap> for LazyUnion {
    fn bitor_assign(&mut self, rhs: RoaringBitmap) {
        for Container { key, store } in rhs.containers {
            if !self.merge(key, &store) {
                self.insert_exact(key, store);
            }
        }
    }
}

impl<'a> FromIterator<&'a RoaringBitmap> for LazyUnion {
    fn from_iter<I: IntoIterator<Item = &'a RoaringBitmap>>(iterator: I) -> LazyUnion {
        let mut union = LazyUnion::new();
        union.extend(iterator);
        union
    }
}

impl FromIterator<RoaringBitmap> for LazyUnion {
    fn from_iter<I: IntoIterator<Item = RoaringBitmap>>(iterator: I) -> LazyUnion {
        let mut union = LazyUnion::new();
        union.extend(iterator);
        union
    }
}

impl<'a> Extend<&'a RoaringBitmap> for LazyUnion {
    fn extend<I: IntoIterator<Item = &'a RoaringBitmap>>(&mut self, iterator: I) {
        for bitmap in iterator {
            *self |= bitmap;
        }
    }
}

impl Extend<RoaringBitmap> for LazyUnion {
    fn extend<I: IntoIterator<Item = RoaringBitmap>>(&mut self, iterator: I) {
        for bitmap in iterator {
            *self |= bitmap;
        }
    }
}

#[cfg(test)]
mod test {
    use super::LazyUnion;
    use crate::RoaringBitmap;
    use proptest::collection::vec;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn repaired_union_equals_eager_union(
            bitmaps in vec(RoaringBitmap::arbitrary(), 0..6)
        ) {
            let eager = bitmaps.iter().fold(RoaringBitmap::new(), |acc, b| acc | b);
            let lazy: LazyUnion = bitmaps.iter().collect();
            let repaired = lazy.repair();
            prop_assert_eq!(&repaired, &eager);

            let owned: LazyUnion = bitmaps.into_iter().collect();
            prop_assert_eq!(owned.repair(), eager);
        }

        #[test]
        fn repair_picks_the_eager_representation(
            a in RoaringBitmap::arbitrary(),
            b in RoaringBitmap::arbitrary()
        ) {
            let mut a = a;
            let mut b = b;
            a.remove_run_compression();
            b.remove_run_compression();

            let mut lazy = LazyUnion::from(a.clone());
            lazy |= &b;
            let repaired = lazy.repair();
            let eager = &a | &b;
            prop_assert_eq!(repaired.statistics(), eager.statistics());
        }
    }

    #[test]
    fn cardinality_is_known_until_keys_collide() {
        let mut lazy = LazyUnion::new();
        assert_eq!(lazy.len(), Some(0));
        assert!(lazy.is_empty());

        lazy |= RoaringBitmap::from([1, 2, 3]);
        lazy |= &RoaringBitmap::from([1 << 16, 2 << 16]);
        assert_eq!(lazy.len(), Some(5));

        lazy |= RoaringBitmap::from([3, 4]);
        assert_eq!(lazy.len(), None);

        let repaired = lazy.repair();
        assert_eq!(repaired.len(), 6);
        assert_eq!(repaired.iter().collect::<Vec<u32>>(), [1, 2, 3, 4, 1 << 16, 2 << 16]);
    }

    #[test]
    fn runs_are_or_ed_across_words() {
        let mut runs = RoaringBitmap::new();
        runs.insert_range(60..200).unwrap();
        runs.insert_range(65000..65536).unwrap();
        runs.optimize();

        let mut lazy = LazyUnion::from(RoaringBitmap::from([0, 100, 300]));
        lazy |= &runs;

        let expected: RoaringBitmap =
            [0u32, 300].into_iter().chain(60..200).chain(65000..65536).collect();
        assert_eq!(lazy.repair(), expected);
    }
}
