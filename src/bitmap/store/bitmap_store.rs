use std::borrow::Borrow;
use std::ops::{BitAndAssign, BitOrAssign, BitXorAssign, RangeInclusive, SubAssign};

use thiserror::Error;

use super::array_store::ArrayStore;
use super::interval_store::Interval;

pub const BITMAP_LENGTH: usize = 1024;

/// Number of values a bitmap can hold.
const CAPACITY: u32 = BITMAP_LENGTH as u32 * 64;

#[derive(Clone, Eq, PartialEq)]
pub struct BitmapStore {
    len: u64,
    bits: Box<[u64; BITMAP_LENGTH]>,
}

impl BitmapStore {
    pub fn new() -> BitmapStore {
        BitmapStore { len: 0, bits: Box::new([0; BITMAP_LENGTH]) }
    }

    pub fn full() -> BitmapStore {
        BitmapStore { len: u64::from(CAPACITY), bits: Box::new([u64::MAX; BITMAP_LENGTH]) }
    }

    pub fn try_from(len: u64, bits: Box<[u64; BITMAP_LENGTH]>) -> Result<BitmapStore, Error> {
        let actual = popcount(&bits);
        if len != actual {
            Err(Error { kind: ErrorKind::Cardinality { expected: len, actual } })
        } else {
            Ok(BitmapStore { len, bits })
        }
    }

    /// Builds a store from raw words, counting the cardinality.
    pub fn from_words(bits: Box<[u64; BITMAP_LENGTH]>) -> BitmapStore {
        BitmapStore { len: popcount(&bits), bits }
    }

    /// Creates a store from a len and its words; the caller guarantees that
    /// `len` is the number of set bits.
    ///
    /// # Panics
    ///
    /// When debug_assertions are enabled and the guarantee is broken.
    pub fn from_unchecked(len: u64, bits: Box<[u64; BITMAP_LENGTH]>) -> BitmapStore {
        if cfg!(debug_assertions) {
            match BitmapStore::try_from(len, bits) {
                Ok(store) => store,
                Err(error) => panic!("invalid bitmap store: {error}"),
            }
        } else {
            BitmapStore { len, bits }
        }
    }

    #[inline]
    pub fn insert(&mut self, index: u16) -> bool {
        let word = &mut self.bits[key(index)];
        let mask = 1 << bit(index);
        let inserted = *word & mask == 0;
        *word |= mask;
        self.len += u64::from(inserted);
        inserted
    }

    pub fn insert_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        let mut inserted = 0;
        for (k, mask) in range_masks(range) {
            inserted += u64::from((mask & !self.bits[k]).count_ones());
            self.bits[k] |= mask;
        }
        self.len += inserted;
        inserted
    }

    /// Appends `index` if it is greater than every value of the store.
    pub fn push(&mut self, index: u16) -> bool {
        let appends = self.max() < Some(index);
        if appends {
            self.insert(index);
        }
        appends
    }

    /// Appends `index`, which the caller guarantees to be greater than every value.
    pub(crate) fn push_unchecked(&mut self, index: u16) {
        debug_assert!(self.max() < Some(index), "{index} does not extend the store");
        self.insert(index);
    }

    pub fn remove(&mut self, index: u16) -> bool {
        let word = &mut self.bits[key(index)];
        let mask = 1 << bit(index);
        let removed = *word & mask != 0;
        *word &= !mask;
        self.len -= u64::from(removed);
        removed
    }

    pub fn remove_range(&mut self, range: RangeInclusive<u16>) -> u64 {
        let mut removed = 0;
        for (k, mask) in range_masks(range) {
            removed += u64::from((mask & self.bits[k]).count_ones());
            self.bits[k] &= !mask;
        }
        self.len -= removed;
        removed
    }

    /// Complements every bit inside `range`.
    pub fn flip_range(&mut self, range: RangeInclusive<u16>) {
        for (k, mask) in range_masks(range) {
            let before = u64::from((mask & self.bits[k]).count_ones());
            self.bits[k] ^= mask;
            self.len = self.len - before + (u64::from(mask.count_ones()) - before);
        }
    }

    /// Clears the `n` lowest values.
    pub fn remove_smallest(&mut self, n: u64) {
        if self.take_len(n) {
            clear_ones(self.bits.iter_mut(), n, |word| word & (word - 1));
        }
    }

    /// Clears the `n` highest values.
    pub fn remove_biggest(&mut self, n: u64) {
        if self.take_len(n) {
            let highest = |word: u64| word & !(1 << (63 - word.leading_zeros()));
            clear_ones(self.bits.iter_mut().rev(), n, highest);
        }
    }

    /// Accounts for `n` removed values, returns `false` once nothing is left to clear.
    fn take_len(&mut self, n: u64) -> bool {
        if n >= self.len {
            self.clear();
            return false;
        }
        self.len -= n;
        true
    }

    pub fn contains(&self, index: u16) -> bool {
        self.bits[key(index)] & (1 << bit(index)) != 0
    }

    pub fn contains_range(&self, range: RangeInclusive<u16>) -> bool {
        range_masks(range).all(|(k, mask)| self.bits[k] & mask == mask)
    }

    pub fn range_cardinality(&self, range: RangeInclusive<u16>) -> u64 {
        range_masks(range).map(|(k, mask)| u64::from((self.bits[k] & mask).count_ones())).sum()
    }

    pub fn is_disjoint(&self, other: &BitmapStore) -> bool {
        self.bits.iter().zip(other.bits.iter()).all(|(&a, &b)| a & b == 0)
    }

    pub fn is_subset(&self, other: &Self) -> bool {
        self.len <= other.len
            && self.bits.iter().zip(other.bits.iter()).all(|(&a, &b)| a & b == a)
    }

    pub(crate) fn to_array_store(&self) -> ArrayStore {
        let mut vec = Vec::with_capacity(self.len as usize);
        vec.extend(self.iter());
        ArrayStore::from_vec_unchecked(vec)
    }

    /// Number of maximal runs of consecutive set bits.
    pub fn count_runs(&self) -> u64 {
        let mut carry = 0;
        let mut runs = 0;
        for &word in self.bits.iter() {
            // a run starts on every set bit whose lower neighbour is clear
            let starts = word & !((word << 1) | carry);
            runs += u64::from(starts.count_ones());
            carry = word >> 63;
        }
        runs
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn min(&self) -> Option<u16> {
        next_set_bit(&self.bits, 0, CAPACITY).map(|v| v as u16)
    }

    #[inline]
    pub fn max(&self) -> Option<u16> {
        previous_set_bit(&self.bits, 0, CAPACITY).map(|v| v as u16)
    }

    pub fn rank(&self, index: u16) -> u64 {
        let (key, bit) = (key(index), bit(index));
        let below: u64 = self.bits[..key].iter().map(|w| u64::from(w.count_ones())).sum();
        below + u64::from((self.bits[key] << (63 - bit)).count_ones())
    }

    pub fn select(&self, n: u16) -> Option<u16> {
        let mut n = u64::from(n);
        for (key, &word) in self.bits.iter().enumerate() {
            let len = u64::from(word.count_ones());
            if n < len {
                return Some((64 * key as u64 + select_in_word(word, n)) as u16);
            }
            n -= len;
        }
        None
    }

    /// Smallest value `>= index`.
    pub fn next_value(&self, index: u16) -> Option<u16> {
        next_set_bit(&self.bits, u32::from(index), CAPACITY).map(|v| v as u16)
    }

    /// Largest value `<= index`.
    pub fn previous_value(&self, index: u16) -> Option<u16> {
        previous_set_bit(&self.bits, 0, u32::from(index) + 1).map(|v| v as u16)
    }

    /// Smallest value `>= index` that is not set.
    pub fn next_absent_value(&self, index: u16) -> Option<u16> {
        let mut k = key(index);
        let mut word = !self.bits[k] & (u64::MAX << bit(index));
        loop {
            if word != 0 {
                return Some((k * 64) as u16 + word.trailing_zeros() as u16);
            }
            k += 1;
            word = !*self.bits.get(k)?;
        }
    }

    /// Largest value `<= index` that is not set.
    pub fn previous_absent_value(&self, index: u16) -> Option<u16> {
        let mut k = key(index);
        let mut word = !self.bits[k] & (u64::MAX >> (63 - bit(index)));
        loop {
            if word != 0 {
                return Some((k * 64) as u16 + 63 - word.leading_zeros() as u16);
            }
            k = k.checked_sub(1)?;
            word = !self.bits[k];
        }
    }

    pub fn intersection_len_bitmap(&self, other: &BitmapStore) -> u64 {
        self.bits
            .iter()
            .zip(other.bits.iter())
            .map(|(&a, &b)| u64::from((a & b).count_ones()))
            .sum()
    }

    /// Cardinality of the intersection restricted to `[0, last]`.
    pub(crate) fn intersection_len_bitmap_until(&self, other: &BitmapStore, last: u16) -> u64 {
        range_masks(0..=last)
            .map(|(k, mask)| u64::from((self.bits[k] & other.bits[k] & mask).count_ones()))
            .sum()
    }

    /// Sets every bit of `[0, last]` that is clear in `other`.
    pub(crate) fn or_not_bitmap(&mut self, other: &BitmapStore, last: u16) {
        for (k, mask) in range_masks(0..=last) {
            self.bits[k] |= !other.bits[k] & mask;
        }
        self.len = popcount(&self.bits);
    }

    pub(crate) fn intersection_len_array(&self, other: &ArrayStore) -> u64 {
        other.iter().filter(|&&index| self.contains(index)).count() as u64
    }

    pub(crate) fn intersection_len_interval(&self, interval: &Interval) -> u64 {
        self.range_cardinality(interval.start()..=interval.end())
    }

    /// Clears every bit outside of `intervals`.
    pub fn retain_intervals(&mut self, intervals: &[Interval]) {
        let mut next_kept = 0u32;
        for interval in intervals {
            if u32::from(interval.start()) > next_kept {
                self.remove_range(next_kept as u16..=interval.start() - 1);
            }
            next_kept = u32::from(interval.end()) + 1;
        }
        if next_kept < CAPACITY {
            self.remove_range(next_kept as u16..=u16::MAX);
        }
    }

    pub fn iter(&self) -> BitmapIter<&[u64; BITMAP_LENGTH]> {
        BitmapIter::new(&self.bits)
    }

    pub fn into_iter(self) -> BitmapIter<Box<[u64; BITMAP_LENGTH]>> {
        BitmapIter::new(self.bits)
    }

    pub fn as_array(&self) -> &[u64; BITMAP_LENGTH] {
        &self.bits
    }

    pub fn into_words(self) -> Box<[u64; BITMAP_LENGTH]> {
        self.bits
    }

    pub fn clear(&mut self) {
        self.bits.fill(0);
        self.len = 0;
    }
}

impl Default for BitmapStore {
    fn default() -> Self {
        BitmapStore::new()
    }
}

#[derive(Debug, Error)]
#[error("{kind}")]
pub struct Error {
    kind: ErrorKind,
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("expected cardinality was {expected} but was {actual}")]
    Cardinality { expected: u64, actual: u64 },
}

pub(crate) fn popcount(bits: &[u64; BITMAP_LENGTH]) -> u64 {
    bits.iter().map(|w| u64::from(w.count_ones())).sum()
}

/// Index of the `n`th set bit of `value`, counting from the least significant bit.
fn select_in_word(mut value: u64, n: u64) -> u64 {
    for _ in 0..n {
        value &= value - 1;
    }
    u64::from(value.trailing_zeros())
}

/// Yields `(word index, mask)` pairs covering every bit of `range`.
fn range_masks(range: RangeInclusive<u16>) -> impl Iterator<Item = (usize, u64)> {
    let (start, end) = (*range.start(), *range.end());
    let (first, last) = (key(start), key(end));
    (first..=last).map(move |k| {
        let mut mask = u64::MAX;
        if k == first {
            mask &= u64::MAX << bit(start);
        }
        if k == last {
            mask &= u64::MAX >> (63 - bit(end));
        }
        (k, mask)
    })
}

/// First set bit in `[from, until)`.
fn next_set_bit(bits: &[u64; BITMAP_LENGTH], from: u32, until: u32) -> Option<u32> {
    if from >= until {
        return None;
    }
    let mut k = from as usize / 64;
    let mut word = bits[k] & (u64::MAX << (from % 64));
    loop {
        if word != 0 {
            let found = k as u32 * 64 + word.trailing_zeros();
            return (found < until).then_some(found);
        }
        k += 1;
        if k as u32 * 64 >= until {
            return None;
        }
        word = bits[k];
    }
}

/// Last set bit in `[from, until)`.
fn previous_set_bit(bits: &[u64; BITMAP_LENGTH], from: u32, until: u32) -> Option<u32> {
    if from >= until {
        return None;
    }
    let last = until - 1;
    let mut k = last as usize / 64;
    let mut word = bits[k] & (u64::MAX >> (63 - last % 64));
    loop {
        if word != 0 {
            let found = k as u32 * 64 + 63 - word.leading_zeros();
            return (found >= from).then_some(found);
        }
        if k == 0 || (k as u32) * 64 <= from {
            return None;
        }
        k -= 1;
        word = bits[k];
    }
}

/// Iterates the set bits of a word array between a front and a back cursor.
#[derive(Clone)]
pub struct BitmapIter<B: Borrow<[u64; BITMAP_LENGTH]>> {
    bits: B,
    // next candidate from the front
    front: u32,
    // one past the next candidate from the back
    back: u32,
}

impl<B: Borrow<[u64; BITMAP_LENGTH]>> BitmapIter<B> {
    fn new(bits: B) -> BitmapIter<B> {
        BitmapIter { bits, front: 0, back: CAPACITY }
    }

    /// Moves the front to the first value `>= index`, never backwards.
    pub(crate) fn advance_to(&mut self, index: u16) {
        self.front = self.front.max(u32::from(index));
    }

    /// Moves the back to the last value `<= index`, never forwards.
    pub(crate) fn advance_back_to(&mut self, index: u16) {
        self.back = self.back.min(u32::from(index) + 1);
    }

    pub(crate) fn peek(&self) -> Option<u16> {
        next_set_bit(self.bits.borrow(), self.front, self.back).map(|v| v as u16)
    }

    pub(crate) fn peek_back(&self) -> Option<u16> {
        previous_set_bit(self.bits.borrow(), self.front, self.back).map(|v| v as u16)
    }
}

impl<B: Borrow<[u64; BITMAP_LENGTH]>> Iterator for BitmapIter<B> {
    type Item = u16;

    fn next(&mut self) -> Option<u16> {
        match next_set_bit(self.bits.borrow(), self.front, self.back) {
            Some(found) => {
                self.front = found + 1;
                Some(found as u16)
            }
            None => {
                self.front = self.back;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = if self.front >= self.back {
            0
        } else {
            let range = self.front as u16..=(self.back - 1) as u16;
            range_masks(range)
                .map(|(k, mask)| (self.bits.borrow()[k] & mask).count_ones() as usize)
                .sum()
        };
        (len, Some(len))
    }

    fn count(self) -> usize
    where
        Self: Sized,
    {
        self.len()
    }
}

impl<B: Borrow<[u64; BITMAP_LENGTH]>> DoubleEndedIterator for BitmapIter<B> {
    fn next_back(&mut self) -> Option<Self::Item> {
        match previous_set_bit(self.bits.borrow(), self.front, self.back) {
            Some(found) => {
                self.back = found;
                Some(found as u16)
            }
            None => {
                self.back = self.front;
                None
            }
        }
    }
}

impl<B: Borrow<[u64; BITMAP_LENGTH]>> ExactSizeIterator for BitmapIter<B> {}

/// Clears `n` set bits, walking `words` in order and unsetting one bit at a time.
fn clear_ones<'a>(words: impl Iterator<Item = &'a mut u64>, mut n: u64, unset: fn(u64) -> u64) {
    for word in words {
        let ones = u64::from(word.count_ones());
        if n < ones {
            for _ in 0..n {
                *word = unset(*word);
            }
            return;
        }
        n -= ones;
        *word = 0;
    }
}

#[inline]
pub fn key(index: u16) -> usize {
    index as usize / 64
}

#[inline]
pub fn bit(index: u16) -> usize {
    index as usize % 64
}

#[inline]
fn op_bitmaps(bits1: &mut BitmapStore, bits2: &BitmapStore, op: impl Fn(&mut u64, u64)) {
    bits1.len = 0;
    for (word1, &word2) in bits1.bits.iter_mut().zip(bits2.bits.iter()) {
        op(word1, word2);
        bits1.len += u64::from(word1.count_ones());
    }
}

impl BitOrAssign<&Self> for BitmapStore {
    fn bitor_assign(&mut self, rhs: &Self) {
        op_bitmaps(self, rhs, BitOrAssign::bitor_assign);
    }
}

impl BitOrAssign<&ArrayStore> for BitmapStore {
    fn bitor_assign(&mut self, rhs: &ArrayStore) {
        for &index in rhs.iter() {
            self.insert(index);
        }
    }
}

impl BitAndAssign<&Self> for BitmapStore {
    fn bitand_assign(&mut self, rhs: &Self) {
        op_bitmaps(self, rhs, BitAndAssign::bitand_assign);
    }
}

impl SubAssign<&Self> for BitmapStore {
    #[allow(clippy::suspicious_op_assign_impl)]
    fn sub_assign(&mut self, rhs: &Self) {
        op_bitmaps(self, rhs, |l, r| *l &= !r);
    }
}

impl SubAssign<&ArrayStore> for BitmapStore {
    fn sub_assign(&mut self, rhs: &ArrayStore) {
        for &index in rhs.iter() {
            self.remove(index);
        }
    }
}

impl BitXorAssign<&Self> for BitmapStore {
    fn bitxor_assign(&mut self, rhs: &Self) {
        op_bitmaps(self, rhs, BitXorAssign::bitxor_assign);
    }
}

impl BitXorAssign<&ArrayStore> for BitmapStore {
    fn bitxor_assign(&mut self, rhs: &ArrayStore) {
        for &index in rhs.iter() {
            if !self.insert(index) {
                self.remove(index);
            }
        }
    }
}
