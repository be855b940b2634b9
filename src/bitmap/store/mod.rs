mod array_store;
mod bitmap_store;
mod interval_store;

use std::cmp::min;
use std::mem;
use std::ops::{
    BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, RangeInclusive, Sub, SubAssign,
};
use std::{slice, vec};

use self::Store::{Array, Bitmap, Run};
use super::util;

pub use self::array_store::{ArrayStore, ARRAY_LIMIT};
pub use self::bitmap_store::{BitmapIter, BitmapStore, BITMAP_LENGTH};
pub use self::interval_store::{Interval, IntervalStore, RunIter};

pub use self::array_store::Error as ArrayError;
pub use self::interval_store::Error as RunError;

pub(crate) use self::array_store::check_sorted;
pub(crate) use self::bitmap_store::popcount;
pub(crate) use self::interval_store::check_runs;

/// Serialized size of a bitmap store.
pub const BITMAP_BYTES: u64 = BITMAP_LENGTH as u64 * 8;

/// Serialized size of an array store holding `len` values.
pub fn array_bytes(len: u64) -> u64 {
    len * 2
}

/// Serialized size of a run store holding `runs` runs.
pub fn run_bytes(runs: u64) -> u64 {
    2 + runs * 4
}

/// Smallest serialized size a non-run store holding `len` values can have.
pub fn best_non_run_bytes(len: u64) -> u64 {
    min(array_bytes(len), BITMAP_BYTES)
}

/// Methods every kind of store implements under the same name.
macro_rules! by_kind {
    (&self; $(
        $(#[$attr:meta])* $vis:vis fn $name:ident($($arg:ident: $ty:ty),*) $(-> $ret:ty)?;
    )*) => {
        $(
            $(#[$attr])*
            $vis fn $name(&self, $($arg: $ty),*) $(-> $ret)? {
                by_kind!(@dispatch self, $name($($arg),*))
            }
        )*
    };
    (&mut self; $(
        $(#[$attr:meta])* $vis:vis fn $name:ident($($arg:ident: $ty:ty),*) $(-> $ret:ty)?;
    )*) => {
        $(
            $(#[$attr])*
            $vis fn $name(&mut self, $($arg: $ty),*) $(-> $ret)? {
                by_kind!(@dispatch self, $name($($arg),*))
            }
        )*
    };
    (@dispatch $store:ident, $name:ident($($arg:ident),*)) => {
        match $store {
            Array(vec) => vec.$name($($arg),*),
            Bitmap(bits) => bits.$name($($arg),*),
            Run(runs) => runs.$name($($arg),*),
        }
    };
}

#[derive(Clone)]
pub enum Store {
    Array(ArrayStore),
    Bitmap(BitmapStore),
    Run(IntervalStore),
}

#[derive(Clone)]
pub enum Iter<'a> {
    Array(slice::Iter<'a, u16>),
    Vec(vec::IntoIter<u16>),
    BitmapBorrowed(BitmapIter<&'a [u64; BITMAP_LENGTH]>),
    BitmapOwned(BitmapIter<Box<[u64; BITMAP_LENGTH]>>),
    RunBorrowed(RunIter<&'a [Interval]>),
    RunOwned(RunIter<Vec<Interval>>),
}

impl Store {
    pub fn new() -> Store {
        Store::Array(ArrayStore::new())
    }

    pub fn with_capacity(capacity: usize) -> Store {
        if capacity <= ARRAY_LIMIT as usize {
            Store::Array(ArrayStore::with_capacity(capacity))
        } else {
            Store::Bitmap(BitmapStore::new())
        }
    }

    pub fn full() -> Store {
        Store::Run(IntervalStore::full())
    }

    /// The cheapest store holding exactly the values of `range`.
    pub fn from_range(range: RangeInclusive<u16>) -> Store {
        let len = u64::from(range.end() - range.start()) + 1;
        if run_bytes(1) < best_non_run_bytes(len) {
            Run(IntervalStore::from_range(range))
        } else {
            let mut array = ArrayStore::with_capacity(len as usize);
            array.insert_range(range);
            Array(array)
        }
    }

    by_kind! {
        &mut self;
        #[inline]
        pub fn insert(index: u16) -> bool;
        pub fn insert_range(range: RangeInclusive<u16>) -> u64;
        /// Appends `index` if it is greater than every value, returns whether it did.
        pub fn push(index: u16) -> bool;
        /// Appends `index`, which the caller guarantees to be greater than every value.
        pub(crate) fn push_unchecked(index: u16);
        pub fn remove(index: u16) -> bool;
        pub fn remove_range(range: RangeInclusive<u16>) -> u64;
        pub fn remove_smallest(n: u64);
        pub fn remove_biggest(n: u64);
    }

    /// Complements the values inside `range`.
    pub fn flip_range(&mut self, range: RangeInclusive<u16>) {
        match self {
            Bitmap(bits) => bits.flip_range(range),
            _ => *self ^= &Run(IntervalStore::from_range(range)),
        }
    }

    /// `self ∪ ([0, last] \ other)`, computed from the gaps of `other` or,
    /// for a bitmap `other`, word by word.
    pub fn or_not(&self, other: &Store, last: u16) -> Store {
        match other {
            Bitmap(bits) => {
                let mut result = self.to_bitmap_store();
                result.or_not_bitmap(bits, last);
                Bitmap(result)
            }
            Array(vec) => self.union_gaps(IntervalStore::gaps_within(
                vec.iter().map(|&v| Interval::new(v, v)),
                last,
            )),
            Run(runs) => {
                self.union_gaps(IntervalStore::gaps_within(runs.intervals().iter().copied(), last))
            }
        }
    }

    fn union_gaps(&self, gaps: IntervalStore) -> Store {
        match self {
            Bitmap(bits) => {
                let mut bits = bits.clone();
                for gap in gaps.intervals() {
                    bits.insert_range(gap.start()..=gap.end());
                }
                Bitmap(bits)
            }
            other => {
                let mut result = Run(gaps);
                result |= other;
                result
            }
        }
    }

    by_kind! {
        &self;
        pub fn contains(index: u16) -> bool;
        pub fn contains_range(range: RangeInclusive<u16>) -> bool;
        pub fn len() -> u64;
        pub fn is_empty() -> bool;
        pub fn min() -> Option<u16>;
        #[inline]
        pub fn max() -> Option<u16>;
        pub fn rank(index: u16) -> u64;
        pub fn select(n: u16) -> Option<u16>;
        pub fn next_value(index: u16) -> Option<u16>;
        pub fn previous_value(index: u16) -> Option<u16>;
        pub fn next_absent_value(index: u16) -> Option<u16>;
        pub fn previous_absent_value(index: u16) -> Option<u16>;
    }

    pub fn range_cardinality(&self, range: RangeInclusive<u16>) -> u64 {
        match self {
            Array(vec) => {
                let interval = Interval::new(*range.start(), *range.end());
                vec.intersection_len_interval(&interval)
            }
            Bitmap(bits) => bits.range_cardinality(range),
            Run(runs) => runs.range_cardinality(range),
        }
    }

    pub fn is_full(&self) -> bool {
        self.len() == 1 << 16
    }

    pub fn is_disjoint(&self, other: &Self) -> bool {
        match (self, other) {
            (Array(vec1), Array(vec2)) => vec1.is_disjoint(vec2),
            (Bitmap(bits1), Bitmap(bits2)) => bits1.is_disjoint(bits2),
            (Array(vec), Bitmap(bits)) | (Bitmap(bits), Array(vec)) => {
                vec.iter().all(|&i| !bits.contains(i))
            }
            (Run(runs1), Run(runs2)) => runs1.is_disjoint(runs2),
            (Run(runs), Array(vec)) | (Array(vec), Run(runs)) => runs.is_disjoint_array(vec),
            (Run(runs), Bitmap(bits)) | (Bitmap(bits), Run(runs)) => runs.is_disjoint_bitmap(bits),
        }
    }

    pub fn is_subset(&self, other: &Self) -> bool {
        if self.len() > other.len() {
            return false;
        }
        match (self, other) {
            (Array(vec1), Array(vec2)) => vec1.is_subset(vec2),
            (Bitmap(bits1), Bitmap(bits2)) => bits1.is_subset(bits2),
            (Array(vec), Bitmap(bits)) => vec.iter().all(|&i| bits.contains(i)),
            (Array(vec), Run(runs)) => runs.intersection_len_array(vec) == vec.len(),
            (Bitmap(bits), Array(vec)) => bits.iter().all(|i| vec.contains(i)),
            (Bitmap(bits), Run(runs)) => runs.intersection_len_bitmap(bits) == bits.len(),
            (Run(runs), _) => {
                runs.intervals().iter().all(|iv| other.contains_range(iv.start()..=iv.end()))
            }
        }
    }

    pub fn intersection_len(&self, other: &Self) -> u64 {
        match (self, other) {
            (Array(vec1), Array(vec2)) => vec1.intersection_len(vec2),
            (Bitmap(bits1), Bitmap(bits2)) => bits1.intersection_len_bitmap(bits2),
            (Array(vec), Bitmap(bits)) | (Bitmap(bits), Array(vec)) => {
                bits.intersection_len_array(vec)
            }
            (Run(runs1), Run(runs2)) => runs1.intersection_len(runs2),
            (Run(runs), Array(vec)) | (Array(vec), Run(runs)) => runs.intersection_len_array(vec),
            (Run(runs), Bitmap(bits)) | (Bitmap(bits), Run(runs)) => {
                runs.intersection_len_bitmap(bits)
            }
        }
    }

    /// Cardinality of `self ∩ other ∩ [0, last]`.
    pub fn intersection_len_until(&self, other: &Self, last: u16) -> u64 {
        if last == u16::MAX {
            return self.intersection_len(other);
        }
        match (self, other) {
            (Array(vec), store) | (store, Array(vec)) => {
                let until = vec.rank(last) as usize;
                vec.as_slice()[..until].iter().filter(|&&v| store.contains(v)).count() as u64
            }
            (Run(runs), store) | (store, Run(runs)) => runs
                .intervals()
                .iter()
                .take_while(|iv| iv.start() <= last)
                .map(|iv| store.range_cardinality(iv.start()..=min(iv.end(), last)))
                .sum(),
            (Bitmap(bits1), Bitmap(bits2)) => bits1.intersection_len_bitmap_until(bits2, last),
        }
    }

    /// Cardinality of `self ∪ ([0, last] \ other)`, without building it.
    pub fn or_not_len(&self, other: &Self, last: u16) -> u64 {
        let window = u64::from(last) + 1;
        self.len() + window - other.rank(last) - self.rank(last)
            + self.intersection_len_until(other, last)
    }

    pub fn count_runs(&self) -> u64 {
        match self {
            Array(vec) => vec.count_runs(),
            Bitmap(bits) => bits.count_runs(),
            Run(runs) => runs.run_amount(),
        }
    }

    /// Size of the serialized payload of this store.
    pub fn byte_size(&self) -> u64 {
        match self {
            Array(vec) => array_bytes(vec.len()),
            Bitmap(_) => BITMAP_BYTES,
            Run(runs) => run_bytes(runs.run_amount()),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Array(_) => "array",
            Bitmap(_) => "bitmap",
            Run(_) => "run",
        }
    }

    pub fn is_run(&self) -> bool {
        matches!(self, Run(_))
    }

    pub(crate) fn to_bitmap_store(&self) -> BitmapStore {
        match self {
            Array(vec) => vec.to_bitmap_store(),
            Bitmap(bits) => bits.clone(),
            Run(runs) => runs.to_bitmap_store(),
        }
    }

    /// Converts to an array, consuming the old store.
    pub(crate) fn into_array(self) -> Store {
        match self {
            Array(_) => self,
            Bitmap(bits) => Array(bits.to_array_store()),
            Run(runs) => Array(runs.to_array_store()),
        }
    }

    /// Converts to a bitmap, consuming the old store.
    pub(crate) fn into_bitmap(self) -> Store {
        match self {
            Bitmap(_) => self,
            other => Bitmap(other.to_bitmap_store()),
        }
    }

    /// Converts to runs, consuming the old store.
    pub(crate) fn into_run(self) -> Store {
        match self {
            Array(vec) => Run(IntervalStore::from_sorted_values(vec.as_slice())),
            Bitmap(bits) => Run(IntervalStore::from_bitmap(&bits)),
            Run(_) => self,
        }
    }

    pub fn iter(&self) -> Iter<'_> {
        match self {
            Array(vec) => Iter::Array(vec.iter()),
            Bitmap(bits) => Iter::BitmapBorrowed(bits.iter()),
            Run(runs) => Iter::RunBorrowed(runs.iter()),
        }
    }
}

impl Default for Store {
    fn default() -> Self {
        Store::new()
    }
}

impl PartialEq for Store {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Array(vec1), Array(vec2)) => vec1 == vec2,
            (Bitmap(bits1), Bitmap(bits2)) => bits1 == bits2,
            (Run(runs1), Run(runs2)) => runs1 == runs2,
            _ => self.len() == other.len() && self.iter().eq(other.iter()),
        }
    }
}

impl BitOr<&Store> for &Store {
    type Output = Store;

    fn bitor(self, rhs: &Store) -> Store {
        match (self, rhs) {
            (Array(vec1), Array(vec2)) if vec1.len() + vec2.len() <= ARRAY_LIMIT => {
                Array(BitOr::bitor(vec1, vec2))
            }
            (Array(_) | Run(_), Bitmap(_)) => {
                let mut lhs = rhs.clone();
                BitOrAssign::bitor_assign(&mut lhs, self);
                lhs
            }
            _ => {
                let mut lhs = self.clone();
                BitOrAssign::bitor_assign(&mut lhs, rhs);
                lhs
            }
        }
    }
}

impl BitOrAssign<Store> for Store {
    fn bitor_assign(&mut self, mut rhs: Store) {
        if matches!(rhs, Bitmap(_)) && !matches!(self, Bitmap(_)) {
            BitOrAssign::bitor_assign(&mut rhs, &*self);
            *self = rhs;
        } else {
            BitOrAssign::bitor_assign(self, &rhs);
        }
    }
}

impl BitOrAssign<&Store> for Store {
    fn bitor_assign(&mut self, rhs: &Store) {
        *self = match (mem::take(self), rhs) {
            (Array(vec1), Array(vec2)) if vec1.len() + vec2.len() <= ARRAY_LIMIT => {
                Array(BitOr::bitor(&vec1, vec2))
            }
            (Array(vec1), Array(vec2)) => {
                let mut bits = vec1.to_bitmap_store();
                BitOrAssign::bitor_assign(&mut bits, vec2);
                Bitmap(bits)
            }
            (Array(vec), Bitmap(bits)) => {
                let mut bits = bits.clone();
                BitOrAssign::bitor_assign(&mut bits, &vec);
                Bitmap(bits)
            }
            (Bitmap(mut bits), Array(vec)) => {
                BitOrAssign::bitor_assign(&mut bits, vec);
                Bitmap(bits)
            }
            (Bitmap(mut bits1), Bitmap(bits2)) => {
                BitOrAssign::bitor_assign(&mut bits1, bits2);
                Bitmap(bits1)
            }
            (Bitmap(mut bits), Run(runs)) => {
                insert_intervals(&mut bits, runs.intervals());
                Bitmap(bits)
            }
            (Run(runs), Bitmap(bits)) => {
                let mut bits = bits.clone();
                insert_intervals(&mut bits, runs.intervals());
                Bitmap(bits)
            }
            (Array(vec), Run(runs)) => {
                Run(runs.union(&IntervalStore::from_sorted_values(vec.as_slice())))
            }
            (Run(runs), Array(vec)) => {
                Run(runs.union(&IntervalStore::from_sorted_values(vec.as_slice())))
            }
            (Run(runs1), Run(runs2)) => Run(runs1.union(runs2)),
        }
    }
}

impl BitAnd<&Store> for &Store {
    type Output = Store;

    fn bitand(self, rhs: &Store) -> Store {
        match (self, rhs) {
            (Array(vec1), Array(vec2)) => Array(BitAnd::bitand(vec1, vec2)),
            (Bitmap(_), Array(_) | Run(_)) => {
                let mut rhs = rhs.clone();
                BitAndAssign::bitand_assign(&mut rhs, self);
                rhs
            }
            _ => {
                let mut lhs = self.clone();
                BitAndAssign::bitand_assign(&mut lhs, rhs);
                lhs
            }
        }
    }
}

impl BitAndAssign<Store> for Store {
    fn bitand_assign(&mut self, mut rhs: Store) {
        if matches!(self, Bitmap(_)) && !matches!(rhs, Bitmap(_)) {
            BitAndAssign::bitand_assign(&mut rhs, &*self);
            *self = rhs;
        } else {
            BitAndAssign::bitand_assign(self, &rhs);
        }
    }
}

impl BitAndAssign<&Store> for Store {
    #[allow(clippy::suspicious_op_assign_impl)]
    fn bitand_assign(&mut self, rhs: &Store) {
        *self = match (mem::take(self), rhs) {
            (Array(mut vec1), Array(vec2)) => {
                BitAndAssign::bitand_assign(&mut vec1, vec2);
                Array(vec1)
            }
            (Array(mut vec), Bitmap(bits)) => {
                BitAndAssign::bitand_assign(&mut vec, bits);
                Array(vec)
            }
            (Bitmap(bits), Array(vec)) => {
                let mut vec = vec.clone();
                BitAndAssign::bitand_assign(&mut vec, &bits);
                Array(vec)
            }
            (Bitmap(mut bits1), Bitmap(bits2)) => {
                BitAndAssign::bitand_assign(&mut bits1, bits2);
                Bitmap(bits1)
            }
            (Array(mut vec), Run(runs)) => {
                vec.retain_intervals(runs.intervals());
                Array(vec)
            }
            (Run(runs), Array(vec)) => {
                let mut vec = vec.clone();
                vec.retain_intervals(runs.intervals());
                Array(vec)
            }
            (Bitmap(mut bits), Run(runs)) => {
                bits.retain_intervals(runs.intervals());
                Bitmap(bits)
            }
            (Run(runs), Bitmap(bits)) if runs.len() <= ARRAY_LIMIT => {
                let kept = runs.iter().filter(|&v| bits.contains(v)).collect();
                Array(ArrayStore::from_vec_unchecked(kept))
            }
            (Run(runs), Bitmap(bits)) => {
                let mut bits = bits.clone();
                bits.retain_intervals(runs.intervals());
                Bitmap(bits)
            }
            (Run(runs1), Run(runs2)) => Run(runs1.intersection(runs2)),
        }
    }
}

impl Sub<&Store> for &Store {
    type Output = Store;

    fn sub(self, rhs: &Store) -> Store {
        match (self, rhs) {
            (Array(vec1), Array(vec2)) => Array(Sub::sub(vec1, vec2)),
            _ => {
                let mut lhs = self.clone();
                SubAssign::sub_assign(&mut lhs, rhs);
                lhs
            }
        }
    }
}

impl SubAssign<&Store> for Store {
    fn sub_assign(&mut self, rhs: &Store) {
        *self = match (mem::take(self), rhs) {
            (Array(mut vec1), Array(vec2)) => {
                SubAssign::sub_assign(&mut vec1, vec2);
                Array(vec1)
            }
            (Array(mut vec), Bitmap(bits)) => {
                SubAssign::sub_assign(&mut vec, bits);
                Array(vec)
            }
            (Array(mut vec), Run(runs)) => {
                vec.remove_intervals(runs.intervals());
                Array(vec)
            }
            (Bitmap(mut bits), Array(vec)) => {
                SubAssign::sub_assign(&mut bits, vec);
                Bitmap(bits)
            }
            (Bitmap(mut bits1), Bitmap(bits2)) => {
                SubAssign::sub_assign(&mut bits1, bits2);
                Bitmap(bits1)
            }
            (Bitmap(mut bits), Run(runs)) => {
                for iv in runs.intervals() {
                    bits.remove_range(iv.start()..=iv.end());
                }
                Bitmap(bits)
            }
            (Run(runs), Array(vec)) => {
                Run(runs.difference(&IntervalStore::from_sorted_values(vec.as_slice())))
            }
            (Run(runs), Bitmap(bits)) if runs.len() <= ARRAY_LIMIT => {
                let kept = runs.iter().filter(|&v| !bits.contains(v)).collect();
                Array(ArrayStore::from_vec_unchecked(kept))
            }
            (Run(runs), Bitmap(bits)) => {
                let mut lhs = runs.to_bitmap_store();
                SubAssign::sub_assign(&mut lhs, bits);
                Bitmap(lhs)
            }
            (Run(runs1), Run(runs2)) => Run(runs1.difference(runs2)),
        }
    }
}

impl BitXor<&Store> for &Store {
    type Output = Store;

    fn bitxor(self, rhs: &Store) -> Store {
        match (self, rhs) {
            (Array(vec1), Array(vec2)) => Array(BitXor::bitxor(vec1, vec2)),
            (Array(_) | Run(_), Bitmap(_)) => {
                let mut lhs = rhs.clone();
                BitXorAssign::bitxor_assign(&mut lhs, self);
                lhs
            }
            _ => {
                let mut lhs = self.clone();
                BitXorAssign::bitxor_assign(&mut lhs, rhs);
                lhs
            }
        }
    }
}

impl BitXorAssign<Store> for Store {
    fn bitxor_assign(&mut self, mut rhs: Store) {
        if matches!(rhs, Bitmap(_)) && !matches!(self, Bitmap(_)) {
            BitXorAssign::bitxor_assign(&mut rhs, &*self);
            *self = rhs;
        } else {
            BitXorAssign::bitxor_assign(self, &rhs);
        }
    }
}

impl BitXorAssign<&Store> for Store {
    fn bitxor_assign(&mut self, rhs: &Store) {
        *self = match (mem::take(self), rhs) {
            (Array(vec1), Array(vec2)) => Array(BitXor::bitxor(&vec1, vec2)),
            (Array(vec), Bitmap(bits)) => {
                let mut bits = bits.clone();
                BitXorAssign::bitxor_assign(&mut bits, &vec);
                Bitmap(bits)
            }
            (Bitmap(mut bits), Array(vec)) => {
                BitXorAssign::bitxor_assign(&mut bits, vec);
                Bitmap(bits)
            }
            (Bitmap(mut bits1), Bitmap(bits2)) => {
                BitXorAssign::bitxor_assign(&mut bits1, bits2);
                Bitmap(bits1)
            }
            (Bitmap(mut bits), Run(runs)) => {
                flip_intervals(&mut bits, runs.intervals());
                Bitmap(bits)
            }
            (Run(runs), Bitmap(bits)) => {
                let mut bits = bits.clone();
                flip_intervals(&mut bits, runs.intervals());
                Bitmap(bits)
            }
            (Array(vec), Run(runs)) => {
                Run(runs.symmetric_difference(&IntervalStore::from_sorted_values(vec.as_slice())))
            }
            (Run(runs), Array(vec)) => {
                Run(runs.symmetric_difference(&IntervalStore::from_sorted_values(vec.as_slice())))
            }
            (Run(runs1), Run(runs2)) => Run(runs1.symmetric_difference(runs2)),
        }
    }
}

fn insert_intervals(bits: &mut BitmapStore, intervals: &[Interval]) {
    for iv in intervals {
        bits.insert_range(iv.start()..=iv.end());
    }
}

fn flip_intervals(bits: &mut BitmapStore, intervals: &[Interval]) {
    for iv in intervals {
        bits.flip_range(iv.start()..=iv.end());
    }
}

impl<'a> IntoIterator for &'a Store {
    type Item = u16;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl IntoIterator for Store {
    type Item = u16;
    type IntoIter = Iter<'static>;

    fn into_iter(self) -> Iter<'static> {
        match self {
            Array(vec) => Iter::Vec(vec.into_iter()),
            Bitmap(bits) => Iter::BitmapOwned(bits.into_iter()),
            Run(runs) => Iter::RunOwned(runs.into_iter()),
        }
    }
}

impl Iter<'_> {
    /// Advance the iterator to the first value greater than or equal to `n`.
    pub(crate) fn advance_to(&mut self, n: u16) {
        match self {
            Iter::Array(inner) => {
                let skip = inner.as_slice().partition_point(|&i| i < n);
                if let Some(nth) = skip.checked_sub(1) {
                    inner.nth(nth);
                }
            }
            Iter::Vec(inner) => {
                let skip = inner.as_slice().partition_point(|&i| i < n);
                if let Some(nth) = skip.checked_sub(1) {
                    inner.nth(nth);
                }
            }
            Iter::BitmapBorrowed(inner) => inner.advance_to(n),
            Iter::BitmapOwned(inner) => inner.advance_to(n),
            Iter::RunBorrowed(inner) => inner.advance_to(n),
            Iter::RunOwned(inner) => inner.advance_to(n),
        }
    }

    /// Advance the back of the iterator to the last value less than or equal to `n`.
    pub(crate) fn advance_back_to(&mut self, n: u16) {
        match self {
            Iter::Array(inner) => {
                let slice = inner.as_slice();
                let skip = slice.len() - slice.partition_point(|&i| i <= n);
                if let Some(nth) = skip.checked_sub(1) {
                    inner.nth_back(nth);
                }
            }
            Iter::Vec(inner) => {
                let slice = inner.as_slice();
                let skip = slice.len() - slice.partition_point(|&i| i <= n);
                if let Some(nth) = skip.checked_sub(1) {
                    inner.nth_back(nth);
                }
            }
            Iter::BitmapBorrowed(inner) => inner.advance_back_to(n),
            Iter::BitmapOwned(inner) => inner.advance_back_to(n),
            Iter::RunBorrowed(inner) => inner.advance_back_to(n),
            Iter::RunOwned(inner) => inner.advance_back_to(n),
        }
    }

    pub(crate) fn peek(&self) -> Option<u16> {
        match self {
            Iter::Array(inner) => inner.as_slice().first().copied(),
            Iter::Vec(inner) => inner.as_slice().first().copied(),
            Iter::BitmapBorrowed(inner) => inner.peek(),
            Iter::BitmapOwned(inner) => inner.peek(),
            Iter::RunBorrowed(inner) => inner.peek(),
            Iter::RunOwned(inner) => inner.peek(),
        }
    }

    pub(crate) fn peek_back(&self) -> Option<u16> {
        match self {
            Iter::Array(inner) => inner.as_slice().last().copied(),
            Iter::Vec(inner) => inner.as_slice().last().copied(),
            Iter::BitmapBorrowed(inner) => inner.peek_back(),
            Iter::BitmapOwned(inner) => inner.peek_back(),
            Iter::RunBorrowed(inner) => inner.peek_back(),
            Iter::RunOwned(inner) => inner.peek_back(),
        }
    }

    /// Writes up to `dst.len()` values, widened with `high`, and returns how many were written.
    pub(crate) fn next_many(&mut self, high: u16, dst: &mut [u32]) -> usize {
        match self {
            Iter::Array(inner) => {
                let n = copy_joined(high, inner.as_slice(), dst);
                advance_by(inner, n);
                n
            }
            Iter::Vec(inner) => {
                let n = copy_joined(high, inner.as_slice(), dst);
                advance_by(inner, n);
                n
            }
            Iter::RunBorrowed(inner) => fill_runs(inner, high, dst),
            Iter::RunOwned(inner) => fill_runs(inner, high, dst),
            Iter::BitmapBorrowed(_) | Iter::BitmapOwned(_) => {
                let mut written = 0;
                for slot in dst.iter_mut() {
                    match self.next() {
                        Some(low) => *slot = util::join(high, low),
                        None => break,
                    }
                    written += 1;
                }
                written
            }
        }
    }
}

fn copy_joined(high: u16, values: &[u16], dst: &mut [u32]) -> usize {
    let n = min(values.len(), dst.len());
    for (slot, &low) in dst.iter_mut().zip(&values[..n]) {
        *slot = util::join(high, low);
    }
    n
}

fn advance_by<I: Iterator>(iter: &mut I, n: usize) {
    if let Some(nth) = n.checked_sub(1) {
        iter.nth(nth);
    }
}

fn fill_runs<I: std::borrow::Borrow<[Interval]>>(
    iter: &mut RunIter<I>,
    high: u16,
    dst: &mut [u32],
) -> usize {
    let mut written = 0;
    while let Some(chunk) = iter.next_chunk(dst.len() - written) {
        for low in chunk {
            dst[written] = util::join(high, low);
            written += 1;
        }
    }
    written
}

impl Iterator for Iter<'_> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        match self {
            Iter::Array(inner) => inner.next().copied(),
            Iter::Vec(inner) => inner.next(),
            Iter::BitmapBorrowed(inner) => inner.next(),
            Iter::BitmapOwned(inner) => inner.next(),
            Iter::RunBorrowed(inner) => inner.next(),
            Iter::RunOwned(inner) => inner.next(),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self {
            Iter::Array(inner) => inner.size_hint(),
            Iter::Vec(inner) => inner.size_hint(),
            Iter::BitmapBorrowed(inner) => inner.size_hint(),
            Iter::BitmapOwned(inner) => inner.size_hint(),
            Iter::RunBorrowed(inner) => inner.size_hint(),
            Iter::RunOwned(inner) => inner.size_hint(),
        }
    }

    fn count(self) -> usize
    where
        Self: Sized,
    {
        self.len()
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        match self {
            Iter::Array(inner) => inner.nth(n).copied(),
            Iter::Vec(inner) => inner.nth(n),
            Iter::BitmapBorrowed(inner) => inner.nth(n),
            Iter::BitmapOwned(inner) => inner.nth(n),
            Iter::RunBorrowed(inner) => inner.nth(n),
            Iter::RunOwned(inner) => inner.nth(n),
        }
    }
}

impl DoubleEndedIterator for Iter<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        match self {
            Iter::Array(inner) => inner.next_back().copied(),
            Iter::Vec(inner) => inner.next_back(),
            Iter::BitmapBorrowed(inner) => inner.next_back(),
            Iter::BitmapOwned(inner) => inner.next_back(),
            Iter::RunBorrowed(inner) => inner.next_back(),
            Iter::RunOwned(inner) => inner.next_back(),
        }
    }
}

impl ExactSizeIterator for Iter<'_> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn stores(values: &[u16]) -> [Store; 3] {
        let array = ArrayStore::from_vec_unchecked(values.to_vec());
        let bitmap = array.to_bitmap_store();
        let runs = IntervalStore::from_sorted_values(values);
        [Array(array), Bitmap(bitmap), Run(runs)]
    }

    fn values(store: &Store) -> Vec<u16> {
        store.iter().collect()
    }

    fn expected(lhs: &[u16], rhs: &[u16], keep: impl Fn(bool, bool) -> bool) -> Vec<u16> {
        (0..=u16::MAX).filter(|v| keep(lhs.contains(v), rhs.contains(v))).collect()
    }

    #[test]
    fn every_pair_agrees() {
        let lhs: Vec<u16> = (0..200).chain(1000..1010).chain([4000, 65535]).collect();
        let rhs: Vec<u16> = (100..300).step_by(3).chain(1005..1020).chain([65535]).collect();

        let or = expected(&lhs, &rhs, |a, b| a || b);
        let and = expected(&lhs, &rhs, |a, b| a && b);
        let sub = expected(&lhs, &rhs, |a, b| a && !b);
        let xor = expected(&lhs, &rhs, |a, b| a ^ b);

        for left in stores(&lhs) {
            for right in stores(&rhs) {
                assert_eq!(values(&(&left | &right)), or);
                assert_eq!(values(&(&left & &right)), and);
                assert_eq!(values(&(&left - &right)), sub);
                assert_eq!(values(&(&left ^ &right)), xor);
                assert_eq!(left.intersection_len(&right), and.len() as u64);
                assert_eq!(left.is_disjoint(&right), and.is_empty());

                let mut owned = left.clone();
                owned |= right.clone();
                assert_eq!(values(&owned), or);
                let mut owned = left.clone();
                owned &= right.clone();
                assert_eq!(values(&owned), and);
                let mut owned = left.clone();
                owned ^= right.clone();
                assert_eq!(values(&owned), xor);
            }
        }
    }

    #[test]
    fn subset_across_representations() {
        let small: Vec<u16> = (10..20).chain([500]).collect();
        let large: Vec<u16> = (0..600).collect();
        for left in stores(&small) {
            for right in stores(&large) {
                assert!(left.is_subset(&right));
                assert!(!right.is_subset(&left));
            }
        }
    }

    #[test]
    fn or_not_within_bound() {
        let lhs = [0, 10];
        let window_end = 6;
        for left in stores(&lhs) {
            let empties =
                [Array(ArrayStore::new()), Bitmap(BitmapStore::new()), Run(IntervalStore::new())];
            for right in empties {
                let result = left.or_not(&right, window_end);
                assert_eq!(values(&result), vec![0, 1, 2, 3, 4, 5, 6, 10]);
                assert_eq!(left.or_not_len(&right, window_end), 8);
            }
        }

        let rhs: Vec<u16> = vec![1, 2, 3, 50, 51];
        let want = expected(&[0, 10, 60], &rhs, |a, b| a || !b);
        let want: Vec<u16> = want.into_iter().filter(|&v| v <= 55 || v == 60).collect();
        for left in stores(&[0, 10, 60]) {
            for right in stores(&rhs) {
                assert_eq!(values(&left.or_not(&right, 55)), want);
                assert_eq!(left.or_not_len(&right, 55), want.len() as u64);
            }
        }
    }

    #[test]
    fn flip_range_matches_xor() {
        for mut store in stores(&[1, 2, 3, 10, 11]) {
            store.flip_range(2..=10);
            assert_eq!(values(&store), vec![1, 4, 5, 6, 7, 8, 9, 11]);
        }
    }

    #[test]
    fn next_many_fills_across_runs() {
        for store in stores(&[1, 2, 3, 7, 8, 100]) {
            let mut iter = store.iter();
            let mut buf = [0u32; 4];
            assert_eq!(iter.next_many(1, &mut buf), 4);
            assert_eq!(buf, [65537, 65538, 65539, 65543]);
            assert_eq!(iter.next_many(1, &mut buf), 2);
            assert_eq!(&buf[..2], &[65544, 65636]);
            assert_eq!(iter.next_many(1, &mut buf), 0);
        }
    }

    #[test]
    fn byte_sizes() {
        assert_eq!(Store::full().byte_size(), 6);
        assert_eq!(Store::from_range(0..=2).byte_size(), 6);
        assert!(!Store::from_range(0..=2).is_run());
        assert!(Store::from_range(0..=3).is_run());
    }
}
