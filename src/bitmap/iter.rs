use std::cmp::Ordering;
use std::iter::FusedIterator;
use std::ops::RangeBounds;
use std::{slice, vec};

use super::container::{self, Container};
use super::util::{self, Span};
use crate::{NonSortedIntegers, RoaringBitmap};

/// A borrowing iterator over the values of a [`RoaringBitmap`], in increasing order.
#[derive(Clone)]
pub struct Iter<'a> {
    walk: Walk<'a, slice::Iter<'a, Container>>,
}

/// An owning iterator over the values of a [`RoaringBitmap`], in increasing order.
#[derive(Clone)]
pub struct IntoIter {
    walk: Walk<'static, vec::IntoIter<Container>>,
}

/// Walks containers from both ends.
///
/// `front` and `back` are the partially consumed containers at either end, `rest` holds the
/// untouched containers between them.
#[derive(Clone)]
struct Walk<'a, C> {
    front: Option<container::Iter<'a>>,
    rest: C,
    back: Option<container::Iter<'a>>,
}

impl<'a, C> Walk<'a, C>
where
    C: DoubleEndedIterator + AsRef<[Container]>,
    C::Item: IntoIterator<Item = u32, IntoIter = container::Iter<'a>>,
{
    fn new(rest: C) -> Self {
        Walk { front: None, rest, back: None }
    }

    fn next(&mut self) -> Option<u32> {
        loop {
            if let Some(value) = self.front.as_mut().and_then(Iterator::next) {
                return Some(value);
            }
            match self.rest.next() {
                Some(container) => self.front = Some(container.into_iter()),
                None => {
                    self.front = None;
                    return self.back.as_mut().and_then(Iterator::next);
                }
            }
        }
    }

    fn next_back(&mut self) -> Option<u32> {
        loop {
            if let Some(value) = self.back.as_mut().and_then(DoubleEndedIterator::next_back) {
                return Some(value);
            }
            match self.rest.next_back() {
                Some(container) => self.back = Some(container.into_iter()),
                None => {
                    self.back = None;
                    return self.front.as_mut().and_then(DoubleEndedIterator::next_back);
                }
            }
        }
    }

    fn ends_len(&self) -> usize {
        self.front.as_ref().map_or(0, ExactSizeIterator::len)
            + self.back.as_ref().map_or(0, ExactSizeIterator::len)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let exact = self.rest.as_ref().iter().try_fold(self.ends_len(), |total, container| {
            usize::try_from(container.len()).ok().and_then(|len| total.checked_add(len))
        });
        match exact {
            Some(len) => (len, Some(len)),
            None => (usize::MAX, None),
        }
    }

    fn count(self) -> usize {
        let rest: u64 = self.rest.as_ref().iter().map(Container::len).sum();
        self.ends_len() + rest as usize
    }

    fn fold<B, F>(self, init: B, mut f: F) -> B
    where
        F: FnMut(B, u32) -> B,
    {
        let Walk { front, rest, back } = self;
        front
            .into_iter()
            .chain(rest.map(IntoIterator::into_iter))
            .chain(back)
            .fold(init, |acc, iter| iter.fold(acc, &mut f))
    }

    fn rfold<B, F>(self, init: B, mut f: F) -> B
    where
        F: FnMut(B, u32) -> B,
    {
        let Walk { front, rest, back } = self;
        back.into_iter()
            .chain(rest.rev().map(IntoIterator::into_iter))
            .chain(front)
            .fold(init, |acc, iter| iter.rfold(acc, &mut f))
    }

    fn nth(&mut self, mut n: usize) -> Option<u32> {
        if let Some(iter) = &mut self.front {
            let len = iter.len();
            if n < len {
                return iter.nth(n);
            }
            n -= len;
            self.front = None;
        }

        let mut skip = 0;
        for container in self.rest.as_ref() {
            let len = container.len() as usize;
            if n < len {
                break;
            }
            n -= len;
            skip += 1;
        }
        if let Some(container) = self.rest.nth(skip) {
            let mut iter = container.into_iter();
            let value = iter.nth(n);
            self.front = Some(iter);
            return value;
        }

        match &mut self.back {
            Some(iter) if n < iter.len() => iter.nth(n),
            _ => {
                self.back = None;
                None
            }
        }
    }

    fn nth_back(&mut self, mut n: usize) -> Option<u32> {
        if let Some(iter) = &mut self.back {
            let len = iter.len();
            if n < len {
                return iter.nth_back(n);
            }
            n -= len;
            self.back = None;
        }

        let mut skip = 0;
        for container in self.rest.as_ref().iter().rev() {
            let len = container.len() as usize;
            if n < len {
                break;
            }
            n -= len;
            skip += 1;
        }
        if let Some(container) = self.rest.nth_back(skip) {
            let mut iter = container.into_iter();
            let value = iter.nth_back(n);
            self.back = Some(iter);
            return value;
        }

        match &mut self.front {
            Some(iter) if n < iter.len() => iter.nth_back(n),
            _ => {
                self.front = None;
                None
            }
        }
    }

    fn advance_to(&mut self, value: u32) {
        let (key, low) = util::split(value);
        if let Some(iter) = &mut self.front {
            match key.cmp(&iter.key) {
                Ordering::Less => return,
                Ordering::Equal => {
                    iter.advance_to(low);
                    return;
                }
                Ordering::Greater => self.front = None,
            }
        }

        let containers = self.rest.as_ref();
        let below = containers.partition_point(|container| container.key < key);
        let remaining = containers.len() - below;
        if let Some(n) = below.checked_sub(1) {
            self.rest.nth(n);
        }
        if remaining > 0 {
            // the back stays out of reach behind a container at or above `key`
            if self.rest.as_ref().first().map(|container| container.key) == Some(key) {
                if let Some(container) = self.rest.next() {
                    let mut iter = container.into_iter();
                    iter.advance_to(low);
                    self.front = Some(iter);
                }
            }
            return;
        }

        if let Some(iter) = &mut self.back {
            match key.cmp(&iter.key) {
                Ordering::Less => (),
                Ordering::Equal => iter.advance_to(low),
                Ordering::Greater => self.back = None,
            }
        }
    }

    fn advance_back_to(&mut self, value: u32) {
        let (key, low) = util::split(value);
        if let Some(iter) = &mut self.back {
            match key.cmp(&iter.key) {
                Ordering::Greater => return,
                Ordering::Equal => {
                    iter.advance_back_to(low);
                    return;
                }
                Ordering::Less => self.back = None,
            }
        }

        let containers = self.rest.as_ref();
        let remaining = containers.partition_point(|container| container.key <= key);
        let above = containers.len() - remaining;
        if let Some(n) = above.checked_sub(1) {
            self.rest.nth_back(n);
        }
        if remaining > 0 {
            if self.rest.as_ref().last().map(|container| container.key) == Some(key) {
                if let Some(container) = self.rest.next_back() {
                    let mut iter = container.into_iter();
                    iter.advance_back_to(low);
                    self.back = Some(iter);
                }
            }
            return;
        }

        if let Some(iter) = &mut self.front {
            match key.cmp(&iter.key) {
                Ordering::Greater => (),
                Ordering::Equal => iter.advance_back_to(low),
                Ordering::Less => self.front = None,
            }
        }
    }

    fn peek(&self) -> Option<u32> {
        let first = || {
            let container = self.rest.as_ref().first()?;
            container.min().map(|min| util::join(container.key, min))
        };
        self.front
            .as_ref()
            .and_then(container::Iter::peek)
            .or_else(first)
            .or_else(|| self.back.as_ref().and_then(container::Iter::peek))
    }

    fn peek_back(&self) -> Option<u32> {
        let last = || {
            let container = self.rest.as_ref().last()?;
            container.max().map(|max| util::join(container.key, max))
        };
        self.back
            .as_ref()
            .and_then(container::Iter::peek_back)
            .or_else(last)
            .or_else(|| self.front.as_ref().and_then(container::Iter::peek_back))
    }

    fn next_many(&mut self, dst: &mut [u32]) -> usize {
        let mut filled = 0;
        while filled < dst.len() {
            if let Some(iter) = &mut self.front {
                filled += iter.next_many(&mut dst[filled..]);
                if filled == dst.len() {
                    break;
                }
            }
            match self.rest.next() {
                Some(container) => self.front = Some(container.into_iter()),
                None => {
                    self.front = None;
                    if let Some(iter) = &mut self.back {
                        filled += iter.next_many(&mut dst[filled..]);
                    }
                    break;
                }
            }
        }
        filled
    }
}

macro_rules! walk_iterator {
    ($ty:ty) => {
        impl Iterator for $ty {
            type Item = u32;

            fn next(&mut self) -> Option<u32> {
                self.walk.next()
            }

            fn size_hint(&self) -> (usize, Option<usize>) {
                self.walk.size_hint()
            }

            fn count(self) -> usize {
                self.walk.count()
            }

            fn nth(&mut self, n: usize) -> Option<u32> {
                self.walk.nth(n)
            }

            #[inline]
            fn fold<B, F>(self, init: B, f: F) -> B
            where
                F: FnMut(B, Self::Item) -> B,
            {
                self.walk.fold(init, f)
            }
        }

        impl DoubleEndedIterator for $ty {
            fn next_back(&mut self) -> Option<u32> {
                self.walk.next_back()
            }

            fn nth_back(&mut self, n: usize) -> Option<u32> {
                self.walk.nth_back(n)
            }

            #[inline]
            fn rfold<B, F>(self, init: B, f: F) -> B
            where
                F: FnMut(B, Self::Item) -> B,
            {
                self.walk.rfold(init, f)
            }
        }

        #[cfg(target_pointer_width = "64")]
        impl ExactSizeIterator for $ty {}

        impl FusedIterator for $ty {}
    };
}

walk_iterator!(Iter<'_>);
walk_iterator!(IntoIter);

impl Iter<'_> {
    fn empty() -> Self {
        let none: &[Container] = &[];
        Iter { walk: Walk::new(none.iter()) }
    }

    /// Skips every value below `n`.
    ///
    /// Does nothing when the next value is already `>= n`, the iterator never moves back.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let bitmap = RoaringBitmap::from([5, 10, 20]);
    /// let mut iter = bitmap.iter();
    ///
    /// iter.advance_to(10);
    /// assert_eq!(iter.next(), Some(10));
    /// iter.advance_to(5);
    /// assert_eq!(iter.next(), Some(20));
    /// ```
    pub fn advance_to(&mut self, n: u32) {
        self.walk.advance_to(n);
    }

    /// Skips every value above `n` at the back of the iterator.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let bitmap = RoaringBitmap::from([1, 2, 70_000]);
    /// let mut iter = bitmap.iter();
    /// iter.advance_back_to(69_999);
    ///
    /// assert_eq!(iter.next_back(), Some(2));
    /// assert_eq!(iter.next_back(), Some(1));
    /// assert_eq!(iter.next_back(), None);
    /// ```
    pub fn advance_back_to(&mut self, n: u32) {
        self.walk.advance_back_to(n);
    }

    /// The value `next` would return, without consuming it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let bitmap = RoaringBitmap::from([5, 70_000]);
    /// let mut iter = bitmap.iter();
    /// assert_eq!(iter.peek(), Some(5));
    /// assert_eq!(iter.next(), Some(5));
    /// assert_eq!(iter.peek(), Some(70_000));
    /// ```
    pub fn peek(&self) -> Option<u32> {
        self.walk.peek()
    }

    /// The value `next_back` would return, without consuming it.
    pub fn peek_back(&self) -> Option<u32> {
        self.walk.peek_back()
    }

    /// Moves the next values into `dst` and returns how many were written, `0` once exhausted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let bitmap = RoaringBitmap::from([1, 2, 3, 70_000, 70_001]);
    /// let mut iter = bitmap.iter();
    /// let mut buf = [0; 4];
    ///
    /// assert_eq!(iter.next_many(&mut buf), 4);
    /// assert_eq!(buf, [1, 2, 3, 70_000]);
    /// assert_eq!(iter.next_many(&mut buf), 1);
    /// assert_eq!(buf[0], 70_001);
    /// assert_eq!(iter.next_many(&mut buf), 0);
    /// ```
    pub fn next_many(&mut self, dst: &mut [u32]) -> usize {
        self.walk.next_many(dst)
    }
}

impl IntoIter {
    fn empty() -> Self {
        IntoIter { walk: Walk::new(Vec::new().into_iter()) }
    }

    /// Skips every value below `n`, see [`Iter::advance_to`].
    pub fn advance_to(&mut self, n: u32) {
        self.walk.advance_to(n);
    }

    /// Skips every value above `n` at the back, see [`Iter::advance_back_to`].
    pub fn advance_back_to(&mut self, n: u32) {
        self.walk.advance_back_to(n);
    }

    /// The value `next` would return, without consuming it.
    pub fn peek(&self) -> Option<u32> {
        self.walk.peek()
    }

    /// The value `next_back` would return, without consuming it.
    pub fn peek_back(&self) -> Option<u32> {
        self.walk.peek_back()
    }

    /// Moves the next values into `dst`, see [`Iter::next_many`].
    pub fn next_many(&mut self, dst: &mut [u32]) -> usize {
        self.walk.next_many(dst)
    }
}

impl RoaringBitmap {
    /// Iterates over the values in increasing order.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let bitmap = RoaringBitmap::from([3, 1, 70_000]);
    /// assert!(bitmap.iter().eq([1, 3, 70_000]));
    /// assert!(bitmap.iter().rev().eq([70_000, 3, 1]));
    /// ```
    pub fn iter(&self) -> Iter {
        Iter { walk: Walk::new(self.containers.iter()) }
    }

    /// Iterates over the values inside `range`. Empty and reversed ranges hold no value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use std::ops::Bound;
    /// use roaring_core::RoaringBitmap;
    ///
    /// let bitmap = RoaringBitmap::from([0, 1, 2, 3, 4, 5, 10, 11, 12, 20, 21, u32::MAX]);
    ///
    /// assert!(bitmap.range(10..20).eq([10, 11, 12]));
    /// assert!(bitmap.range(100..).eq([u32::MAX]));
    /// assert!(bitmap.range((Bound::Excluded(0), Bound::Included(10))).eq([1, 2, 3, 4, 5, 10]));
    /// assert_eq!(bitmap.range(7..7).next(), None);
    /// assert_eq!(bitmap.range(20..10).next(), None);
    /// ```
    pub fn range<R>(&self, range: R) -> Iter<'_>
    where
        R: RangeBounds<u32>,
    {
        let Some((start, end)) = Span::resolve(range).values().map(|r| r.into_inner())
        else {
            return Iter::empty();
        };
        let mut iter = self.iter();
        iter.advance_to(start);
        iter.advance_back_to(end);
        iter
    }

    /// Consumes the bitmap and iterates over the values inside `range`, like
    /// [`RoaringBitmap::range`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let bitmap = RoaringBitmap::from([0, 1, 2, 10, 11, 20, u32::MAX]);
    /// let values: Vec<u32> = bitmap.into_range(1..=11).collect();
    /// assert_eq!(values, [1, 2, 10, 11]);
    /// ```
    pub fn into_range<R>(self, range: R) -> IntoIter
    where
        R: RangeBounds<u32>,
    {
        let Some((start, end)) = Span::resolve(range).values().map(|r| r.into_inner())
        else {
            return IntoIter::empty();
        };
        let mut iter = self.into_iter();
        iter.advance_to(start);
        iter.advance_back_to(end);
        iter
    }
}

impl<'a> IntoIterator for &'a RoaringBitmap {
    type Item = u32;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Iter<'a> {
        self.iter()
    }
}

impl IntoIterator for RoaringBitmap {
    type Item = u32;
    type IntoIter = IntoIter;

    fn into_iter(self) -> IntoIter {
        IntoIter { walk: Walk::new(self.containers.into_iter()) }
    }
}

impl<const N: usize> From<[u32; N]> for RoaringBitmap {
    fn from(values: [u32; N]) -> Self {
        values.into_iter().collect()
    }
}

impl FromIterator<u32> for RoaringBitmap {
    fn from_iter<I: IntoIterator<Item = u32>>(values: I) -> RoaringBitmap {
        let mut bitmap = RoaringBitmap::new();
        bitmap.extend(values);
        bitmap
    }
}

impl<'a> FromIterator<&'a u32> for RoaringBitmap {
    fn from_iter<I: IntoIterator<Item = &'a u32>>(values: I) -> RoaringBitmap {
        values.into_iter().copied().collect()
    }
}

impl Extend<u32> for RoaringBitmap {
    /// Inserts every value, in any order.
    ///
    /// Runs of values sharing a container are inserted without looking the container up again,
    /// so sorted input is the fastest.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let mut rb = RoaringBitmap::new();
    /// rb.extend([1, 2, 3, 4, 1500, 1508, 1507, 1509]);
    /// assert!(rb.contains(2));
    /// assert!(rb.contains(1508));
    /// assert!(!rb.contains(5));
    /// ```
    #[inline]
    fn extend<I: IntoIterator<Item = u32>>(&mut self, values: I) {
        let mut current: Option<(u16, usize)> = None;
        for value in values {
            let (key, low) = util::split(value);
            let index = match current {
                Some((cached, index)) if cached == key => index,
                _ => self.find_container_by_key(key),
            };
            current = Some((key, index));
            self.containers[index].insert(low);
        }
    }
}

impl<'a> Extend<&'a u32> for RoaringBitmap {
    #[inline]
    fn extend<I: IntoIterator<Item = &'a u32>>(&mut self, values: I) {
        self.extend(values.into_iter().copied());
    }
}

impl RoaringBitmap {
    /// Builds a bitmap from strictly increasing values.
    ///
    /// Fails at the first value that is not greater than the previous one, see
    /// [`RoaringBitmap::append`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let rb = RoaringBitmap::from_sorted_iter(0..10).unwrap();
    /// assert!(rb.iter().eq(0..10));
    ///
    /// let error = RoaringBitmap::from_sorted_iter((0..10).rev()).unwrap_err();
    /// assert_eq!(error.valid_until(), 1);
    /// ```
    pub fn from_sorted_iter<I: IntoIterator<Item = u32>>(
        values: I,
    ) -> Result<RoaringBitmap, NonSortedIntegers> {
        let mut bitmap = RoaringBitmap::new();
        bitmap.append(values).map(|_| bitmap)
    }

    /// Pushes strictly increasing values that are all greater than the current maximum.
    ///
    /// Returns how many values were added. On the first value breaking the order, the values
    /// before it stay in the bitmap and the error tells how many there were.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let mut rb = RoaringBitmap::new();
    /// assert_eq!(rb.append(0..10), Ok(10));
    /// assert_eq!(rb.append([10, 11, 5]).unwrap_err().valid_until(), 2);
    /// assert!(rb.iter().eq(0..12));
    /// ```
    pub fn append<I: IntoIterator<Item = u32>>(
        &mut self,
        values: I,
    ) -> Result<u64, NonSortedIntegers> {
        let mut last = self.max();
        let mut appended = 0;
        for value in values {
            if last.is_some_and(|last| value <= last) {
                return Err(NonSortedIntegers { valid_until: appended });
            }
            self.push_unchecked(value);
            last = Some(value);
            appended += 1;
        }
        Ok(appended)
    }
}
