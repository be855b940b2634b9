use std::borrow::Borrow;
use std::cmp::{max, min};
use std::convert::TryFrom;
use std::ops::RangeInclusive;

use thiserror::Error;

use super::array_store::ArrayStore;
use super::bitmap_store::BitmapStore;

/// A run of consecutive values, both ends included.
#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub struct Interval {
    start: u16,
    end: u16,
}

impl Interval {
    pub fn new(start: u16, end: u16) -> Interval {
        debug_assert!(start <= end, "interval start {start} is after its end {end}");
        Interval { start, end }
    }

    pub fn start(&self) -> u16 {
        self.start
    }

    pub fn end(&self) -> u16 {
        self.end
    }

    pub fn run_len(&self) -> u64 {
        u64::from(self.end - self.start) + 1
    }

    fn overlap_len(&self, start: u16, end: u16) -> u64 {
        let (from, to) = (max(self.start, start), min(self.end, end));
        if from <= to {
            u64::from(to - from) + 1
        } else {
            0
        }
    }
}

/// Sorted, non-overlapping and non-adjacent runs.
#[derive(PartialEq, Eq, Clone, Debug, Default)]
pub struct IntervalStore(Vec<Interval>);

impl IntervalStore {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn full() -> Self {
        Self(vec![Interval::new(0, u16::MAX)])
    }

    pub fn from_range(range: RangeInclusive<u16>) -> Self {
        Self(vec![Interval::new(*range.start(), *range.end())])
    }

    /// Wraps runs that the caller guarantees to be sorted, non-overlapping and non-adjacent.
    ///
    /// # Panics
    ///
    /// When debug_assertions are enabled and the guarantee is broken.
    pub fn from_vec_unchecked(intervals: Vec<Interval>) -> Self {
        if cfg!(debug_assertions) {
            if let Err(error) = check_runs(&intervals) {
                panic!("invalid interval store: {error}");
            }
        }
        Self(intervals)
    }

    /// Wraps runs as they are, in any order.
    pub fn from_vec_raw(intervals: Vec<Interval>) -> Self {
        Self(intervals)
    }

    /// Collapses sorted, deduplicated values into runs.
    pub fn from_sorted_values(values: &[u16]) -> Self {
        let mut intervals: Vec<Interval> = Vec::new();
        for &value in values {
            match intervals.last_mut() {
                Some(last) if u32::from(last.end) + 1 == u32::from(value) => last.end = value,
                _ => intervals.push(Interval::new(value, value)),
            }
        }
        Self(intervals)
    }

    pub fn from_bitmap(bitmap: &BitmapStore) -> Self {
        let mut intervals = Vec::new();
        let mut cursor = bitmap.next_value(0);
        while let Some(start) = cursor {
            match bitmap.next_absent_value(start) {
                Some(absent) => {
                    intervals.push(Interval::new(start, absent - 1));
                    cursor = bitmap.next_value(absent);
                }
                None => {
                    intervals.push(Interval::new(start, u16::MAX));
                    cursor = None;
                }
            }
        }
        Self(intervals)
    }

    /// The runs of `[0, last]` not covered by `runs`, which must be sorted and non-overlapping.
    pub fn gaps_within(runs: impl IntoIterator<Item = Interval>, last: u16) -> Self {
        let mut gaps = Vec::new();
        let mut next = 0u32;
        for run in runs {
            if u32::from(run.start) > u32::from(last) {
                break;
            }
            if u32::from(run.start) > next {
                gaps.push(Interval::new(next as u16, run.start - 1));
            }
            next = max(next, u32::from(run.end) + 1);
        }
        if next <= u32::from(last) {
            gaps.push(Interval::new(next as u16, last));
        }
        Self(gaps)
    }

    pub fn insert(&mut self, index: u16) -> bool {
        self.insert_range(index..=index) == 1
    }

    pub fn insert_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        let (start, end) = (*range.start(), *range.end());
        // runs in [first, last) overlap or touch the new range
        let first = self.0.partition_point(|iv| u32::from(iv.end) + 1 < u32::from(start));
        let last = first
            + self.0[first..].partition_point(|iv| u32::from(iv.start) <= u32::from(end) + 1);

        let merged = Interval::new(start, end);
        if first == last {
            self.0.insert(first, merged);
            return merged.run_len();
        }

        let existing: u64 = self.0[first..last].iter().map(|iv| iv.overlap_len(start, end)).sum();
        let new_start = min(start, self.0[first].start);
        let new_end = max(end, self.0[last - 1].end);
        self.0[first] = Interval::new(new_start, new_end);
        self.0.drain(first + 1..last);
        merged.run_len() - existing
    }

    pub fn push(&mut self, index: u16) -> bool {
        if self.max().map_or(true, |max| max < index) {
            self.push_unchecked(index);
            true
        } else {
            false
        }
    }

    /// Pushes `index` at the end of the store; the caller guarantees `index > self.max()`.
    pub(crate) fn push_unchecked(&mut self, index: u16) {
        match self.0.last_mut() {
            Some(last) if u32::from(last.end) + 1 == u32::from(index) => last.end = index,
            _ => self.0.push(Interval::new(index, index)),
        }
    }

    pub fn remove(&mut self, index: u16) -> bool {
        self.remove_range(index..=index) == 1
    }

    pub fn remove_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        let (start, end) = (*range.start(), *range.end());
        // runs in [first, last) overlap the range
        let first = self.0.partition_point(|iv| iv.end < start);
        let last = first + self.0[first..].partition_point(|iv| iv.start <= end);
        if first == last {
            return 0;
        }

        let removed = self.0[first..last].iter().map(|iv| iv.overlap_len(start, end)).sum();
        let mut kept = Vec::with_capacity(2);
        if self.0[first].start < start {
            kept.push(Interval::new(self.0[first].start, start - 1));
        }
        if self.0[last - 1].end > end {
            kept.push(Interval::new(end + 1, self.0[last - 1].end));
        }
        self.0.splice(first..last, kept);
        removed
    }

    pub fn remove_smallest(&mut self, mut n: u64) {
        let mut drained = 0;
        for iv in self.0.iter_mut() {
            if n == 0 {
                break;
            }
            if iv.run_len() <= n {
                n -= iv.run_len();
                drained += 1;
            } else {
                iv.start += n as u16;
                n = 0;
            }
        }
        self.0.drain(..drained);
    }

    pub fn remove_biggest(&mut self, mut n: u64) {
        let mut kept = self.0.len();
        for iv in self.0.iter_mut().rev() {
            if n == 0 {
                break;
            }
            if iv.run_len() <= n {
                n -= iv.run_len();
                kept -= 1;
            } else {
                iv.end -= n as u16;
                n = 0;
            }
        }
        self.0.truncate(kept);
    }

    pub fn contains(&self, index: u16) -> bool {
        let i = self.0.partition_point(|iv| iv.end < index);
        self.0.get(i).map_or(false, |iv| iv.start <= index)
    }

    pub fn contains_range(&self, range: RangeInclusive<u16>) -> bool {
        let (start, end) = (*range.start(), *range.end());
        let i = self.0.partition_point(|iv| iv.end < start);
        self.0.get(i).map_or(false, |iv| iv.start <= start && end <= iv.end)
    }

    pub fn range_cardinality(&self, range: RangeInclusive<u16>) -> u64 {
        let (start, end) = (*range.start(), *range.end());
        let first = self.0.partition_point(|iv| iv.end < start);
        self.0[first..]
            .iter()
            .take_while(|iv| iv.start <= end)
            .map(|iv| iv.overlap_len(start, end))
            .sum()
    }

    pub fn is_disjoint(&self, other: &Self) -> bool {
        let (mut i, mut j) = (0, 0);
        while let (Some(a), Some(b)) = (self.0.get(i), other.0.get(j)) {
            if a.overlap_len(b.start, b.end) != 0 {
                return false;
            }
            if a.end < b.end {
                i += 1;
            } else {
                j += 1;
            }
        }
        true
    }

    pub fn is_disjoint_array(&self, array: &ArrayStore) -> bool {
        self.0.iter().all(|iv| array.intersection_len_interval(iv) == 0)
    }

    pub fn is_disjoint_bitmap(&self, bitmap: &BitmapStore) -> bool {
        self.0.iter().all(|iv| bitmap.intersection_len_interval(iv) == 0)
    }

    pub fn intersection_len(&self, other: &Self) -> u64 {
        let (mut i, mut j) = (0, 0);
        let mut len = 0;
        while let (Some(a), Some(b)) = (self.0.get(i), other.0.get(j)) {
            len += a.overlap_len(b.start, b.end);
            if a.end < b.end {
                i += 1;
            } else {
                j += 1;
            }
        }
        len
    }

    pub fn intersection_len_array(&self, array: &ArrayStore) -> u64 {
        self.0.iter().map(|iv| array.intersection_len_interval(iv)).sum()
    }

    pub fn intersection_len_bitmap(&self, bitmap: &BitmapStore) -> u64 {
        self.0.iter().map(|iv| bitmap.intersection_len_interval(iv)).sum()
    }

    pub fn union(&self, other: &Self) -> Self {
        let mut merged: Vec<Interval> = Vec::with_capacity(self.0.len() + other.0.len());
        let (mut left, mut right) = (self.0.iter().peekable(), other.0.iter().peekable());
        loop {
            let next = match (left.peek(), right.peek()) {
                (Some(l), Some(r)) if r.start < l.start => right.next(),
                (Some(_), _) => left.next(),
                (None, _) => right.next(),
            };
            let Some(&iv) = next else { break };
            match merged.last_mut() {
                Some(last) if u32::from(last.end) + 1 >= u32::from(iv.start) => {
                    last.end = max(last.end, iv.end)
                }
                _ => merged.push(iv),
            }
        }
        Self(merged)
    }

    pub fn intersection(&self, other: &Self) -> Self {
        let mut out = Vec::new();
        let (mut i, mut j) = (0, 0);
        while let (Some(a), Some(b)) = (self.0.get(i), other.0.get(j)) {
            let (start, end) = (max(a.start, b.start), min(a.end, b.end));
            if start <= end {
                out.push(Interval::new(start, end));
            }
            if a.end < b.end {
                i += 1;
            } else {
                j += 1;
            }
        }
        Self(out)
    }

    pub fn difference(&self, other: &Self) -> Self {
        let mut out = Vec::with_capacity(self.0.len());
        let mut j = 0;
        for iv in &self.0 {
            let (mut start, end) = (u32::from(iv.start), u32::from(iv.end));
            while other.0.get(j).map_or(false, |b| u32::from(b.end) < start) {
                j += 1;
            }
            for b in other.0[j..].iter().take_while(|b| u32::from(b.start) <= end) {
                if u32::from(b.start) > start {
                    out.push(Interval::new(start as u16, b.start - 1));
                }
                start = u32::from(b.end) + 1;
                if start > end {
                    break;
                }
            }
            if start <= end {
                out.push(Interval::new(start as u16, end as u16));
            }
        }
        Self(out)
    }

    pub fn symmetric_difference(&self, other: &Self) -> Self {
        self.union(other).difference(&self.intersection(other))
    }

    pub fn len(&self) -> u64 {
        self.0.iter().map(Interval::run_len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.0.first() == Some(&Interval::new(0, u16::MAX))
    }

    /// Number of runs.
    pub fn run_amount(&self) -> u64 {
        self.0.len() as u64
    }

    pub fn min(&self) -> Option<u16> {
        self.0.first().map(|iv| iv.start)
    }

    pub fn max(&self) -> Option<u16> {
        self.0.last().map(|iv| iv.end)
    }

    pub fn rank(&self, index: u16) -> u64 {
        let i = self.0.partition_point(|iv| iv.end < index);
        let below: u64 = self.0[..i].iter().map(Interval::run_len).sum();
        match self.0.get(i) {
            Some(iv) if iv.start <= index => below + u64::from(index - iv.start) + 1,
            _ => below,
        }
    }

    pub fn select(&self, n: u16) -> Option<u16> {
        let mut n = u64::from(n);
        for iv in &self.0 {
            if n < iv.run_len() {
                return Some(iv.start + n as u16);
            }
            n -= iv.run_len();
        }
        None
    }

    /// Smallest value `>= index`.
    pub fn next_value(&self, index: u16) -> Option<u16> {
        let i = self.0.partition_point(|iv| iv.end < index);
        self.0.get(i).map(|iv| max(iv.start, index))
    }

    /// Largest value `<= index`.
    pub fn previous_value(&self, index: u16) -> Option<u16> {
        let i = self.0.partition_point(|iv| iv.start <= index);
        i.checked_sub(1).map(|i| min(self.0[i].end, index))
    }

    /// Smallest value `>= index` that is not in a run.
    pub fn next_absent_value(&self, index: u16) -> Option<u16> {
        let i = self.0.partition_point(|iv| iv.end < index);
        match self.0.get(i) {
            Some(iv) if iv.start <= index => iv.end.checked_add(1),
            _ => Some(index),
        }
    }

    /// Largest value `<= index` that is not in a run.
    pub fn previous_absent_value(&self, index: u16) -> Option<u16> {
        let i = self.0.partition_point(|iv| iv.start <= index);
        match i.checked_sub(1).map(|i| self.0[i]) {
            Some(iv) if iv.end >= index => iv.start.checked_sub(1),
            _ => Some(index),
        }
    }

    pub fn to_array_store(&self) -> ArrayStore {
        let mut vec = Vec::with_capacity(self.len() as usize);
        for iv in &self.0 {
            vec.extend(iv.start..=iv.end);
        }
        ArrayStore::from_vec_unchecked(vec)
    }

    pub fn to_bitmap_store(&self) -> BitmapStore {
        let mut bitmap = BitmapStore::new();
        for iv in &self.0 {
            bitmap.insert_range(iv.start..=iv.end);
        }
        bitmap
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.0
    }

    pub fn into_intervals(self) -> Vec<Interval> {
        self.0
    }

    pub fn iter(&self) -> RunIter<&[Interval]> {
        RunIter::new(&self.0)
    }

    pub fn into_iter(self) -> RunIter<Vec<Interval>> {
        RunIter::new(self.0)
    }
}

/// Runs that cannot form a run store.
#[derive(Debug, Error)]
#[error("{kind} at run: {index}")]
pub struct Error {
    index: usize,
    kind: ErrorKind,
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("run ends before it starts")]
    Reversed,
    #[error("run overlaps or touches the previous run")]
    NotMaximal,
}

pub(crate) fn check_runs(intervals: &[Interval]) -> Result<(), Error> {
    for (index, iv) in intervals.iter().enumerate() {
        if iv.start > iv.end {
            return Err(Error { index, kind: ErrorKind::Reversed });
        }
        if index > 0 && u32::from(intervals[index - 1].end) + 1 >= u32::from(iv.start) {
            return Err(Error { index, kind: ErrorKind::NotMaximal });
        }
    }
    Ok(())
}

impl TryFrom<Vec<Interval>> for IntervalStore {
    type Error = Error;

    fn try_from(intervals: Vec<Interval>) -> Result<Self, Self::Error> {
        check_runs(&intervals)?;
        Ok(Self(intervals))
    }
}

/// Walks the values of a run store from both ends.
#[derive(Clone)]
pub struct RunIter<I: Borrow<[Interval]>> {
    intervals: I,
    // run holding `front_value`, the next value from the front
    front: usize,
    front_value: u32,
    // run holding `back_end - 1`, the next value from the back
    back: usize,
    back_end: u32,
}

impl<I: Borrow<[Interval]>> RunIter<I> {
    fn new(intervals: I) -> RunIter<I> {
        let runs = intervals.borrow();
        let front_value = runs.first().map_or(0, |iv| u32::from(iv.start));
        let back_end = runs.last().map_or(0, |iv| u32::from(iv.end) + 1);
        let back = runs.len().saturating_sub(1);
        RunIter { intervals, front: 0, front_value, back, back_end }
    }

    fn is_exhausted(&self) -> bool {
        self.front_value >= self.back_end
    }

    pub(crate) fn peek(&self) -> Option<u16> {
        (!self.is_exhausted()).then_some(self.front_value as u16)
    }

    pub(crate) fn peek_back(&self) -> Option<u16> {
        (!self.is_exhausted()).then(|| (self.back_end - 1) as u16)
    }

    /// Moves the front to the first value `>= index`, never backwards.
    pub(crate) fn advance_to(&mut self, index: u16) {
        let target = u32::from(index);
        if target <= self.front_value {
            return;
        }
        let runs = self.intervals.borrow();
        let i = self.front + runs[self.front..].partition_point(|iv| u32::from(iv.end) < target);
        match runs.get(i) {
            Some(iv) => {
                self.front = i;
                self.front_value = max(target, u32::from(iv.start));
            }
            None => self.front_value = u32::MAX,
        }
    }

    /// Moves the back to the last value `<= index`, never forwards.
    pub(crate) fn advance_back_to(&mut self, index: u16) {
        let target = u32::from(index);
        if target + 1 >= self.back_end {
            return;
        }
        let runs = self.intervals.borrow();
        let i = runs[..=self.back].partition_point(|iv| u32::from(iv.start) <= target);
        match i.checked_sub(1) {
            Some(i) => {
                self.back = i;
                self.back_end = min(target, u32::from(runs[i].end)) + 1;
            }
            None => self.back_end = 0,
        }
    }

    /// Splits the remaining values into the longest leading run `[start, end]`
    /// of at most `limit` values and consumes it.
    pub(crate) fn next_chunk(&mut self, limit: usize) -> Option<RangeInclusive<u16>> {
        if self.is_exhausted() || limit == 0 {
            return None;
        }
        let run_end = u32::from(self.intervals.borrow()[self.front].end);
        let end = min(min(run_end, self.back_end - 1), self.front_value + limit as u32 - 1);
        let chunk = self.front_value as u16..=end as u16;
        self.skip_front_to(end + 1);
        Some(chunk)
    }

    fn skip_front_to(&mut self, value: u32) {
        let runs = self.intervals.borrow();
        if value > u32::from(runs[self.front].end) {
            self.front += 1;
            self.front_value = runs.get(self.front).map_or(u32::MAX, |iv| u32::from(iv.start));
        } else {
            self.front_value = value;
        }
    }
}

impl<I: Borrow<[Interval]>> Iterator for RunIter<I> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        if self.is_exhausted() {
            return None;
        }
        let value = self.front_value;
        self.skip_front_to(value + 1);
        Some(value as u16)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.is_exhausted() {
            return (0, Some(0));
        }
        let runs = self.intervals.borrow();
        let len = if self.front == self.back {
            (self.back_end - self.front_value) as usize
        } else {
            let head = u32::from(runs[self.front].end) + 1 - self.front_value;
            let middle: u64 = runs[self.front + 1..self.back].iter().map(Interval::run_len).sum();
            let tail = self.back_end - u32::from(runs[self.back].start);
            (u64::from(head) + middle + u64::from(tail)) as usize
        };
        (len, Some(len))
    }
}

impl<I: Borrow<[Interval]>> DoubleEndedIterator for RunIter<I> {
    fn next_back(&mut self) -> Option<u16> {
        if self.is_exhausted() {
            return None;
        }
        let value = self.back_end - 1;
        let runs = self.intervals.borrow();
        if value == u32::from(runs[self.back].start) {
            match self.back.checked_sub(1) {
                Some(back) => {
                    self.back = back;
                    self.back_end = u32::from(runs[back].end) + 1;
                }
                None => self.back_end = 0,
            }
        } else {
            self.back_end = value;
        }
        Some(value as u16)
    }
}

impl<I: Borrow<[Interval]>> ExactSizeIterator for RunIter<I> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn runs(pairs: &[(u16, u16)]) -> IntervalStore {
        IntervalStore::try_from(pairs.iter().map(|&(s, e)| Interval::new(s, e)).collect::<Vec<_>>())
            .unwrap()
    }

    #[test]
    fn insert_merges_neighbours() {
        let mut store = runs(&[(1, 3), (7, 9)]);
        assert!(store.insert(5));
        assert_eq!(store, runs(&[(1, 3), (5, 5), (7, 9)]));
        assert!(store.insert(4));
        assert!(store.insert(6));
        assert_eq!(store, runs(&[(1, 9)]));
        assert!(!store.insert(2));
        assert!(store.insert(u16::MAX));
        assert_eq!(store, runs(&[(1, 9), (65535, 65535)]));
    }

    #[test]
    fn insert_range_counts_new_values() {
        let mut store = runs(&[(2, 4), (10, 12), (20, 30)]);
        assert_eq!(store.insert_range(3..=21), 19 - 2 - 3 - 2);
        assert_eq!(store, runs(&[(2, 30)]));
        assert_eq!(store.insert_range(32..=40), 9);
        assert_eq!(store.insert_range(31..=31), 1);
        assert_eq!(store, runs(&[(2, 40)]));
        assert_eq!(store.len(), 39);
    }

    #[test]
    fn remove_range_splits() {
        let mut store = runs(&[(0, 100)]);
        assert_eq!(store.remove_range(10..=20), 11);
        assert_eq!(store, runs(&[(0, 9), (21, 100)]));
        assert_eq!(store.remove_range(5..=30), 15);
        assert_eq!(store, runs(&[(0, 4), (31, 100)]));
        assert!(store.remove(31));
        assert!(!store.remove(31));
        assert_eq!(store.remove_range(0..=u16::MAX), 5 + 69);
        assert!(store.is_empty());
    }

    #[test]
    fn rank_select_and_neighbours() {
        let store = runs(&[(5, 9), (20, 20), (65530, 65535)]);
        assert_eq!(store.rank(4), 0);
        assert_eq!(store.rank(7), 3);
        assert_eq!(store.rank(19), 5);
        assert_eq!(store.rank(65535), 12);
        assert_eq!(store.select(5), Some(20));
        assert_eq!(store.select(11), Some(65535));
        assert_eq!(store.select(12), None);
        assert_eq!(store.next_value(10), Some(20));
        assert_eq!(store.previous_value(19), Some(9));
        assert_eq!(store.next_absent_value(5), Some(10));
        assert_eq!(store.next_absent_value(65532), None);
        assert_eq!(store.previous_absent_value(20), Some(19));
        assert_eq!(runs(&[(0, 3)]).previous_absent_value(2), None);
    }

    #[test]
    fn set_operations() {
        let a = runs(&[(0, 10), (20, 30), (50, 50)]);
        let b = runs(&[(5, 25), (31, 40)]);
        assert_eq!(a.union(&b), runs(&[(0, 40), (50, 50)]));
        assert_eq!(a.intersection(&b), runs(&[(5, 10), (20, 25)]));
        assert_eq!(a.intersection_len(&b), 12);
        assert_eq!(a.difference(&b), runs(&[(0, 4), (26, 30), (50, 50)]));
        assert_eq!(b.difference(&a), runs(&[(11, 19), (31, 40)]));
        assert_eq!(a.symmetric_difference(&b), runs(&[(0, 4), (11, 19), (26, 40), (50, 50)]));
        assert!(!a.is_disjoint(&b));
        assert!(runs(&[(0, 4)]).is_disjoint(&runs(&[(5, 9)])));
    }

    #[test]
    fn conversions() {
        let array = ArrayStore::try_from(vec![1, 2, 3, 7, 9, 10]).unwrap();
        let store = IntervalStore::from_sorted_values(array.as_slice());
        assert_eq!(store, runs(&[(1, 3), (7, 7), (9, 10)]));
        assert_eq!(store.to_array_store(), array);

        let bitmap = store.to_bitmap_store();
        assert_eq!(IntervalStore::from_bitmap(&bitmap), store);
        assert_eq!(IntervalStore::from_bitmap(&BitmapStore::full()), IntervalStore::full());
    }

    #[test]
    fn try_from_rejects_adjacent_runs() {
        let adjacent = vec![Interval::new(1, 3), Interval::new(4, 6)];
        assert!(IntervalStore::try_from(adjacent).is_err());
        let overlapping = vec![Interval::new(1, 5), Interval::new(4, 6)];
        assert!(IntervalStore::try_from(overlapping).is_err());
    }

    #[test]
    fn remove_smallest_and_biggest() {
        let mut store = runs(&[(0, 2), (10, 19)]);
        store.remove_smallest(4);
        assert_eq!(store, runs(&[(11, 19)]));
        store.remove_biggest(3);
        assert_eq!(store, runs(&[(11, 16)]));
        store.remove_biggest(100);
        assert!(store.is_empty());
    }

    #[test]
    fn iterator_moves_both_ends() {
        let store = runs(&[(5, 5), (10, 12), (20, 22)]);
        let mut iter = store.iter();
        assert_eq!(iter.len(), 7);
        assert_eq!(iter.next(), Some(5));
        assert_eq!(iter.next_back(), Some(22));
        assert_eq!(iter.len(), 5);
        iter.advance_to(11);
        assert_eq!(iter.peek(), Some(11));
        iter.advance_to(3);
        assert_eq!(iter.next(), Some(11));
        iter.advance_back_to(15);
        assert_eq!(iter.peek_back(), Some(12));
        assert_eq!(iter.collect::<Vec<_>>(), vec![12]);

        let mut iter = store.iter();
        assert_eq!(iter.next_chunk(2), Some(5..=5));
        assert_eq!(iter.next_chunk(2), Some(10..=11));
        assert_eq!(iter.next_chunk(10), Some(12..=12));
        assert_eq!(iter.next_chunk(10), Some(20..=22));
        assert_eq!(iter.next_chunk(10), None);

        let mut iter = store.into_iter();
        iter.advance_to(21);
        assert_eq!(iter.rev().collect::<Vec<_>>(), vec![22, 21]);
    }

    #[test]
    fn gaps_within_bound() {
        let store = runs(&[(2, 4), (8, 8), (20, 30)]);
        let gaps = IntervalStore::gaps_within(store.intervals().iter().copied(), 25);
        assert_eq!(gaps, runs(&[(0, 1), (5, 7), (9, 19)]));

        let gaps = IntervalStore::gaps_within(store.intervals().iter().copied(), 40);
        assert_eq!(gaps, runs(&[(0, 1), (5, 7), (9, 19), (31, 40)]));

        let gaps = IntervalStore::gaps_within(std::iter::empty(), 6);
        assert_eq!(gaps, runs(&[(0, 6)]));
    }
}
