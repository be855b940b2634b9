mod scalar;
mod sink;

use std::cmp::Ordering;
use std::convert::TryFrom;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitXor, RangeInclusive, Sub, SubAssign};

use thiserror::Error;

use self::sink::Count;
use super::bitmap_store::{bit, key, BitmapStore, BITMAP_LENGTH};
use super::interval_store::Interval;

/// Above this cardinality an array is converted to a bitmap.
pub const ARRAY_LIMIT: u64 = 4096;

#[derive(Clone, Eq, PartialEq)]
pub struct ArrayStore {
    vec: Vec<u16>,
}

impl ArrayStore {
    pub fn new() -> ArrayStore {
        ArrayStore { vec: vec![] }
    }

    pub fn with_capacity(capacity: usize) -> ArrayStore {
        ArrayStore { vec: Vec::with_capacity(capacity) }
    }

    /// Creates an array from a vec that must already be sorted and deduplicated.
    ///
    /// Prefer `try_from` whenever these invariants are not guaranteed.
    ///
    /// # Panics
    ///
    /// When debug_assertions are enabled and the invariants are not met.
    #[inline]
    pub fn from_vec_unchecked(vec: Vec<u16>) -> ArrayStore {
        if cfg!(debug_assertions) {
            if let Err(error) = check_sorted(&vec) {
                panic!("invalid array store: {error}");
            }
        }
        ArrayStore { vec }
    }

    /// Wraps values as they are. Operations on an array that is not sorted and deduplicated
    /// give unspecified results, but never panic on that account.
    pub fn from_vec_raw(vec: Vec<u16>) -> ArrayStore {
        ArrayStore { vec }
    }

    pub fn insert(&mut self, index: u16) -> bool {
        match self.vec.binary_search(&index) {
            Ok(_) => false,
            Err(loc) => {
                self.vec.insert(loc, index);
                true
            }
        }
    }

    pub fn insert_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        let (start, end) = (*range.start(), *range.end());
        let (from, to) = self.positions(start, end);

        // Everything between start and end ends up in the set, so the
        // existing values in that window are replaced wholesale.
        let dropped = self.vec.splice(from..to, start..=end).len() as u64;
        u64::from(end - start) + 1 - dropped
    }

    /// Appends `index` if it is greater than every value of the store.
    pub fn push(&mut self, index: u16) -> bool {
        let appends = self.max() < Some(index);
        if appends {
            self.vec.push(index);
        }
        appends
    }

    /// Appends `index`, which the caller guarantees to be greater than every value.
    pub(crate) fn push_unchecked(&mut self, index: u16) {
        debug_assert!(self.max() < Some(index), "{index} does not extend the store");
        self.vec.push(index);
    }

    pub fn remove(&mut self, index: u16) -> bool {
        self.vec.binary_search(&index).map(|loc| self.vec.remove(loc)).is_ok()
    }

    pub fn remove_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        let (from, to) = self.positions(*range.start(), *range.end());
        self.vec.drain(from..to);
        (to - from) as u64
    }

    pub fn remove_smallest(&mut self, n: u64) {
        let n = (n as usize).min(self.vec.len());
        self.vec.drain(..n);
    }

    pub fn remove_biggest(&mut self, n: u64) {
        let n = (n as usize).min(self.vec.len());
        self.vec.truncate(self.vec.len() - n);
    }

    /// Positions in the vec of the first value `>= start` and one past the last value `<= end`.
    fn positions(&self, start: u16, end: u16) -> (usize, usize) {
        let from = self.vec.partition_point(|&v| v < start);
        let to = from + self.vec[from..].partition_point(|&v| v <= end);
        (from, to)
    }

    pub fn contains(&self, index: u16) -> bool {
        self.vec.binary_search(&index).is_ok()
    }

    pub fn contains_range(&self, range: RangeInclusive<u16>) -> bool {
        let (start, end) = (*range.start(), *range.end());
        let (from, to) = self.positions(start, end);
        (to - from) as u64 == u64::from(end - start) + 1
    }

    pub fn is_disjoint(&self, other: &Self) -> bool {
        let (mut i, mut j) = (0, 0);
        while let (Some(a), Some(b)) = (self.vec.get(i), other.vec.get(j)) {
            match a.cmp(b) {
                Ordering::Equal => return false,
                Ordering::Less => i += 1,
                Ordering::Greater => j += 1,
            }
        }
        true
    }

    pub fn is_subset(&self, other: &Self) -> bool {
        if self.len() > other.len() {
            return false;
        }
        let mut rest = other.as_slice();
        for value in &self.vec {
            let skip = rest.partition_point(|v| v < value);
            match rest.get(skip) {
                Some(found) if found == value => rest = &rest[skip + 1..],
                _ => return false,
            }
        }
        true
    }

    pub fn intersection_len(&self, other: &Self) -> u64 {
        let mut count = Count::default();
        scalar::and(self.as_slice(), other.as_slice(), &mut count);
        count.0
    }

    /// Number of values that fall inside `interval`.
    pub fn intersection_len_interval(&self, interval: &Interval) -> u64 {
        let (from, to) = self.positions(interval.start(), interval.end());
        (to - from) as u64
    }

    pub fn to_bitmap_store(&self) -> BitmapStore {
        let mut bits = Box::new([0; BITMAP_LENGTH]);
        for &index in self.iter() {
            bits[key(index)] |= 1 << bit(index);
        }
        BitmapStore::from_unchecked(self.len(), bits)
    }

    /// Number of maximal runs of consecutive values.
    pub fn count_runs(&self) -> u64 {
        let breaks = self.vec.windows(2).filter(|pair| pair[0] + 1 != pair[1]).count() as u64;
        if self.vec.is_empty() {
            0
        } else {
            breaks + 1
        }
    }

    pub fn len(&self) -> u64 {
        self.vec.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.vec.is_empty()
    }

    pub fn min(&self) -> Option<u16> {
        self.vec.first().copied()
    }

    pub fn max(&self) -> Option<u16> {
        self.vec.last().copied()
    }

    pub fn rank(&self, index: u16) -> u64 {
        self.vec.partition_point(|&v| v <= index) as u64
    }

    pub fn select(&self, n: u16) -> Option<u16> {
        self.vec.get(n as usize).copied()
    }

    /// Smallest value `>= index`.
    pub fn next_value(&self, index: u16) -> Option<u16> {
        self.vec.get(self.vec.partition_point(|&v| v < index)).copied()
    }

    /// Largest value `<= index`.
    pub fn previous_value(&self, index: u16) -> Option<u16> {
        self.vec.partition_point(|&v| v <= index).checked_sub(1).map(|at| self.vec[at])
    }

    /// Smallest value `>= index` that is not in the array.
    pub fn next_absent_value(&self, index: u16) -> Option<u16> {
        let from = self.vec.partition_point(|&v| v < index);
        let mut candidate = u32::from(index);
        for &value in &self.vec[from..] {
            if u32::from(value) != candidate {
                break;
            }
            candidate += 1;
        }
        u16::try_from(candidate).ok()
    }

    /// Largest value `<= index` that is not in the array.
    pub fn previous_absent_value(&self, index: u16) -> Option<u16> {
        let to = self.vec.partition_point(|&v| v <= index);
        let mut candidate = i32::from(index);
        for &value in self.vec[..to].iter().rev() {
            if i32::from(value) != candidate {
                break;
            }
            candidate -= 1;
        }
        u16::try_from(candidate).ok()
    }

    /// Keeps only the values that `intervals` contain.
    pub fn retain_intervals(&mut self, intervals: &[Interval]) {
        let mut runs = intervals.iter().peekable();
        self.vec.retain(|&value| {
            while runs.next_if(|run| run.end() < value).is_some() {}
            runs.peek().map_or(false, |run| run.start() <= value)
        });
    }

    /// Drops the values that `intervals` contain.
    pub fn remove_intervals(&mut self, intervals: &[Interval]) {
        let mut runs = intervals.iter().peekable();
        self.vec.retain(|&value| {
            while runs.next_if(|run| run.end() < value).is_some() {}
            runs.peek().map_or(true, |run| run.start() > value)
        });
    }

    pub fn iter(&self) -> std::slice::Iter<u16> {
        self.vec.iter()
    }

    pub fn into_iter(self) -> std::vec::IntoIter<u16> {
        self.vec.into_iter()
    }

    pub fn as_slice(&self) -> &[u16] {
        &self.vec
    }

    pub fn into_vec(self) -> Vec<u16> {
        self.vec
    }
}

impl Default for ArrayStore {
    fn default() -> Self {
        ArrayStore::new()
    }
}

/// Values that cannot form an array store.
#[derive(Debug, Error)]
#[error("{kind} at index: {index}")]
pub struct Error {
    index: usize,
    kind: ErrorKind,
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("duplicate element found")]
    Duplicate,
    #[error("element out of order")]
    OutOfOrder,
}

pub(crate) fn check_sorted(values: &[u16]) -> Result<(), Error> {
    for (i, pair) in values.windows(2).enumerate() {
        match pair[1].cmp(&pair[0]) {
            Ordering::Less => return Err(Error { index: i + 1, kind: ErrorKind::OutOfOrder }),
            Ordering::Equal => return Err(Error { index: i + 1, kind: ErrorKind::Duplicate }),
            Ordering::Greater => (),
        }
    }
    Ok(())
}

impl TryFrom<Vec<u16>> for ArrayStore {
    type Error = Error;

    fn try_from(value: Vec<u16>) -> Result<Self, Self::Error> {
        check_sorted(&value)?;
        Ok(ArrayStore { vec: value })
    }
}

impl BitOr<Self> for &ArrayStore {
    type Output = ArrayStore;

    fn bitor(self, rhs: Self) -> Self::Output {
        let mut vec = Vec::with_capacity(self.vec.len() + rhs.vec.len());
        scalar::or(self.as_slice(), rhs.as_slice(), &mut vec);
        ArrayStore::from_vec_unchecked(vec)
    }
}

impl BitAnd<Self> for &ArrayStore {
    type Output = ArrayStore;

    fn bitand(self, rhs: Self) -> Self::Output {
        let mut vec = Vec::with_capacity(self.vec.len().min(rhs.vec.len()));
        scalar::and(self.as_slice(), rhs.as_slice(), &mut vec);
        ArrayStore::from_vec_unchecked(vec)
    }
}

impl BitAndAssign<&Self> for ArrayStore {
    fn bitand_assign(&mut self, rhs: &Self) {
        *self = &*self & rhs;
    }
}

impl BitAndAssign<&BitmapStore> for ArrayStore {
    fn bitand_assign(&mut self, rhs: &BitmapStore) {
        self.vec.retain(|x| rhs.contains(*x));
    }
}

impl Sub<Self> for &ArrayStore {
    type Output = ArrayStore;

    fn sub(self, rhs: Self) -> Self::Output {
        let mut vec = Vec::with_capacity(self.vec.len());
        scalar::sub(self.as_slice(), rhs.as_slice(), &mut vec);
        ArrayStore::from_vec_unchecked(vec)
    }
}

impl SubAssign<&Self> for ArrayStore {
    fn sub_assign(&mut self, rhs: &Self) {
        *self = &*self - rhs;
    }
}

impl SubAssign<&BitmapStore> for ArrayStore {
    fn sub_assign(&mut self, rhs: &BitmapStore) {
        self.vec.retain(|x| !rhs.contains(*x));
    }
}

impl BitXor<Self> for &ArrayStore {
    type Output = ArrayStore;

    fn bitxor(self, rhs: Self) -> Self::Output {
        let mut vec = Vec::with_capacity(self.vec.len() + rhs.vec.len());
        scalar::xor(self.as_slice(), rhs.as_slice(), &mut vec);
        ArrayStore::from_vec_unchecked(vec)
    }
}
