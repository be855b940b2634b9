use std::fmt;
use std::mem;
use std::ops::{
    BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, RangeInclusive, Sub, SubAssign,
};

use tracing::trace;

use super::store::{self, best_non_run_bytes, run_bytes, Store, ARRAY_LIMIT};
use super::util;

/// The values of a [`RoaringBitmap`](crate::RoaringBitmap) sharing the upper 16 bits `key`.
#[derive(PartialEq, Clone)]
pub(crate) struct Container {
    pub key: u16,
    pub store: Store,
}

#[derive(Clone)]
pub(crate) struct Iter<'a> {
    pub key: u16,
    inner: store::Iter<'a>,
}

/// Read-only methods answered by the store alone.
macro_rules! delegate {
    ($($(#[$attr:meta])* fn $name:ident($($arg:ident: $ty:ty),*) -> $ret:ty;)*) => {
        $(
            $(#[$attr])*
            pub fn $name(&self, $($arg: $ty),*) -> $ret {
                self.store.$name($($arg),*)
            }
        )*
    };
}

impl Container {
    pub fn new(key: u16) -> Container {
        Container { key, store: Store::new() }
    }

    pub fn full(key: u16) -> Container {
        Container { key, store: Store::full() }
    }

    pub fn from_range(key: u16, range: RangeInclusive<u16>) -> Container {
        Container { key, store: Store::from_range(range) }
    }

    /// Wraps the result of a store operation, in the representation its cardinality calls for.
    fn settled(key: u16, store: Store) -> Container {
        let mut container = Container { key, store };
        container.ensure_correct_store();
        container
    }

    delegate! {
        fn len() -> u64;
        fn is_empty() -> bool;
        fn is_full() -> bool;
        fn contains(low: u16) -> bool;
        fn contains_range(lows: RangeInclusive<u16>) -> bool;
        fn range_cardinality(lows: RangeInclusive<u16>) -> u64;
        fn min() -> Option<u16>;
        #[inline]
        fn max() -> Option<u16>;
        fn rank(low: u16) -> u64;
        fn select(n: u16) -> Option<u16>;
        fn next_value(low: u16) -> Option<u16>;
        fn previous_value(low: u16) -> Option<u16>;
        fn next_absent_value(low: u16) -> Option<u16>;
        fn previous_absent_value(low: u16) -> Option<u16>;
        /// Size in bytes of the serialized payload.
        fn byte_size() -> u64;
    }

    pub fn is_disjoint(&self, other: &Container) -> bool {
        self.store.is_disjoint(&other.store)
    }

    pub fn is_subset(&self, other: &Container) -> bool {
        self.len() <= other.len() && self.store.is_subset(&other.store)
    }

    pub fn intersection_len(&self, other: &Container) -> u64 {
        self.store.intersection_len(&other.store)
    }

    /// `self ∪ ([0, last] \ other)` for the key of `self`.
    pub fn or_not(&self, other: &Container, last: u16) -> Container {
        Container::settled(self.key, self.store.or_not(&other.store, last))
    }

    pub fn or_not_len(&self, other: &Container, last: u16) -> u64 {
        self.store.or_not_len(&other.store, last)
    }
}

impl Container {
    #[inline]
    pub fn insert(&mut self, low: u16) -> bool {
        let inserted = self.store.insert(low);
        if inserted {
            self.ensure_correct_store();
        }
        inserted
    }

    /// Returns how many values of `lows` were missing.
    pub fn insert_range(&mut self, lows: RangeInclusive<u16>) -> u64 {
        let width = u64::from(lows.end() - lows.start()) + 1;
        if self.is_empty() {
            self.store = Store::from_range(lows);
            return width;
        }

        let added = width - self.store.range_cardinality(lows.clone());
        let len = self.len() + added;
        if len == 1 << 16 {
            self.store = Store::full();
            return added;
        }
        if matches!(self.store, Store::Array(_)) && len > ARRAY_LIMIT {
            self.store = mem::take(&mut self.store).into_bitmap();
        }
        self.store.insert_range(lows);
        self.ensure_correct_store();
        added
    }

    /// Appends `low` if it is bigger than every value of the container.
    pub fn push(&mut self, low: u16) -> bool {
        let pushed = self.store.push(low);
        if pushed {
            self.ensure_correct_store();
        }
        pushed
    }

    /// Appends `low`, known to be bigger than every value of the container.
    pub(crate) fn push_unchecked(&mut self, low: u16) {
        self.store.push_unchecked(low);
        self.ensure_correct_store();
    }

    pub fn remove(&mut self, low: u16) -> bool {
        let removed = self.store.remove(low);
        if removed {
            self.ensure_correct_store();
        }
        removed
    }

    pub fn remove_range(&mut self, lows: RangeInclusive<u16>) -> u64 {
        let removed = self.store.remove_range(lows);
        self.ensure_correct_store();
        removed
    }

    /// Removes the `n` smallest values, `n` must be less than the length.
    pub fn remove_smallest(&mut self, n: u64) {
        self.store.remove_smallest(n);
        self.ensure_correct_store();
    }

    /// Removes the `n` biggest values, `n` must be less than the length.
    pub fn remove_biggest(&mut self, n: u64) {
        self.store.remove_biggest(n);
        self.ensure_correct_store();
    }

    pub fn flip_range(&mut self, lows: RangeInclusive<u16>) {
        self.store.flip_range(lows);
        self.ensure_correct_store();
    }

    /// Replaces the store by an array or a bitmap, depending on the cardinality alone.
    fn settle_without_runs(&mut self) {
        let store = mem::take(&mut self.store);
        self.store =
            if store.len() <= ARRAY_LIMIT { store.into_array() } else { store.into_bitmap() };
    }

    /// Moves arrays past [`ARRAY_LIMIT`] to bitmaps and back, and drops runs once they stop
    /// being the smallest layout. Returns whether the store was replaced.
    pub(crate) fn ensure_correct_store(&mut self) -> bool {
        let len = self.len();
        let fits = match &self.store {
            Store::Array(_) => len <= ARRAY_LIMIT,
            Store::Bitmap(_) => len > ARRAY_LIMIT,
            Store::Run(runs) => run_bytes(runs.run_amount()) < best_non_run_bytes(len),
        };
        if fits {
            return false;
        }

        let from = self.store.kind();
        self.settle_without_runs();
        trace!(key = self.key, from, to = self.store.kind(), len, "converted store");
        true
    }

    /// Switches to or away from runs, whichever serializes smaller.
    pub fn optimize(&mut self) -> bool {
        let as_runs = run_bytes(self.store.count_runs());
        match self.store {
            Store::Run(_) if as_runs < best_non_run_bytes(self.len()) => false,
            Store::Run(_) => self.remove_run_compression(),
            Store::Array(_) | Store::Bitmap(_) if as_runs < self.byte_size() => {
                let from = self.store.kind();
                trace!(key = self.key, from, as_runs, "optimized store to runs");
                self.store = mem::take(&mut self.store).into_run();
                true
            }
            Store::Array(_) | Store::Bitmap(_) => false,
        }
    }

    pub fn remove_run_compression(&mut self) -> bool {
        match self.store {
            Store::Run(_) => {
                self.settle_without_runs();
                true
            }
            Store::Array(_) | Store::Bitmap(_) => false,
        }
    }
}

macro_rules! container_ops {
    ($($Op:ident::$op:ident, $OpAssign:ident::$op_assign:ident;)*) => {$(
        impl $Op<&Container> for &Container {
            type Output = Container;

            fn $op(self, rhs: &Container) -> Container {
                Container::settled(self.key, $Op::$op(&self.store, &rhs.store))
            }
        }

        impl $OpAssign<&Container> for Container {
            fn $op_assign(&mut self, rhs: &Container) {
                $OpAssign::$op_assign(&mut self.store, &rhs.store);
                self.ensure_correct_store();
            }
        }
    )*};
}

container_ops! {
    BitOr::bitor, BitOrAssign::bitor_assign;
    BitAnd::bitand, BitAndAssign::bitand_assign;
    Sub::sub, SubAssign::sub_assign;
    BitXor::bitxor, BitXorAssign::bitxor_assign;
}

/// The store taking an owned right hand side can reuse its allocation.
macro_rules! container_ops_owned {
    ($($OpAssign:ident::$op_assign:ident;)*) => {$(
        impl $OpAssign<Container> for Container {
            fn $op_assign(&mut self, rhs: Container) {
                $OpAssign::$op_assign(&mut self.store, rhs.store);
                self.ensure_correct_store();
            }
        }
    )*};
}

container_ops_owned! {
    BitOrAssign::bitor_assign;
    BitAndAssign::bitand_assign;
    BitXorAssign::bitxor_assign;
}

impl<'a> IntoIterator for &'a Container {
    type Item = u32;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        Iter { key: self.key, inner: self.store.iter() }
    }
}

impl IntoIterator for Container {
    type Item = u32;
    type IntoIter = Iter<'static>;

    fn into_iter(self) -> Iter<'static> {
        Iter { key: self.key, inner: self.store.into_iter() }
    }
}

impl Iter<'_> {
    fn value(&self, low: u16) -> u32 {
        util::join(self.key, low)
    }

    pub(crate) fn peek(&self) -> Option<u32> {
        self.inner.peek().map(|low| self.value(low))
    }

    pub(crate) fn peek_back(&self) -> Option<u32> {
        self.inner.peek_back().map(|low| self.value(low))
    }

    pub(crate) fn advance_to(&mut self, low: u16) {
        self.inner.advance_to(low);
    }

    pub(crate) fn advance_back_to(&mut self, low: u16) {
        self.inner.advance_back_to(low);
    }

    /// Fills `dst` from the front and returns how many values were written.
    pub(crate) fn next_many(&mut self, dst: &mut [u32]) -> usize {
        self.inner.next_many(self.key, dst)
    }
}

impl Iterator for Iter<'_> {
    type Item = u32;

    fn next(&mut self) -> Option<u32> {
        let low = self.inner.next()?;
        Some(self.value(low))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }

    fn count(self) -> usize {
        self.inner.count()
    }

    fn nth(&mut self, n: usize) -> Option<u32> {
        let low = self.inner.nth(n)?;
        Some(self.value(low))
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<u32> {
        let low = self.inner.next_back()?;
        Some(self.value(low))
    }
}

impl ExactSizeIterator for Iter<'_> {}

impl fmt::Debug for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Container<{} {} @ {}>", self.len(), self.store.kind(), self.key)
    }
}
