use std::cmp::Ordering;
use std::iter::Peekable;

use super::container::Container;
use crate::RoaringBitmap;

/// Anything sorted by container key.
pub(crate) trait Keyed {
    fn key(&self) -> u16;
}

impl Keyed for Container {
    fn key(&self) -> u16 {
        self.key
    }
}

impl Keyed for &Container {
    fn key(&self) -> u16 {
        self.key
    }
}

/// A step of [`merge`]: a key present on one side only, or on both.
pub(crate) enum Pair<L, R> {
    Left(L),
    Right(R),
    Both(L, R),
}

/// Walks two key-sorted sequences in lockstep.
pub(crate) struct Merge<I: Iterator, J: Iterator> {
    left: Peekable<I>,
    right: Peekable<J>,
}

pub(crate) fn merge<I, J>(left: I, right: J) -> Merge<I::IntoIter, J::IntoIter>
where
    I: IntoIterator,
    J: IntoIterator,
    I::Item: Keyed,
    J::Item: Keyed,
{
    Merge { left: left.into_iter().peekable(), right: right.into_iter().peekable() }
}

impl<I, J> Iterator for Merge<I, J>
where
    I: Iterator,
    J: Iterator,
    I::Item: Keyed,
    J::Item: Keyed,
{
    type Item = Pair<I::Item, J::Item>;

    fn next(&mut self) -> Option<Self::Item> {
        let order = match (self.left.peek(), self.right.peek()) {
            (None, None) => return None,
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (Some(left), Some(right)) => left.key().cmp(&right.key()),
        };
        match order {
            Ordering::Less => self.left.next().map(Pair::Left),
            Ordering::Greater => self.right.next().map(Pair::Right),
            Ordering::Equal => {
                let both = self.left.next().zip(self.right.next());
                both.map(|(left, right)| Pair::Both(left, right))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let (left_min, left_max) = self.left.size_hint();
        let (right_min, right_max) = self.right.size_hint();
        let max = left_max.zip(right_max).and_then(|(left, right)| left.checked_add(right));
        (left_min.max(right_min), max)
    }
}

impl RoaringBitmap {
    /// Returns `true` if both sets have no value in common, like an empty intersection would.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let mut rb1 = RoaringBitmap::from([1]);
    /// let mut rb2 = RoaringBitmap::from([2, 70_000]);
    /// assert!(rb1.is_disjoint(&rb2));
    ///
    /// rb2.insert(1);
    /// assert!(!rb1.is_disjoint(&rb2));
    /// ```
    pub fn is_disjoint(&self, other: &Self) -> bool {
        merge(&self.containers, &other.containers).all(|pair| match pair {
            Pair::Both(mine, theirs) => mine.is_disjoint(theirs),
            Pair::Left(_) | Pair::Right(_) => true,
        })
    }

    /// Returns `true` if every value of this set is in `other`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let mut rb1 = RoaringBitmap::from([1]);
    /// let mut rb2 = RoaringBitmap::new();
    /// assert!(!rb1.is_subset(&rb2));
    ///
    /// rb2.insert(1);
    /// assert!(rb1.is_subset(&rb2));
    ///
    /// rb1.insert(2);
    /// assert!(!rb1.is_subset(&rb2));
    /// ```
    pub fn is_subset(&self, other: &Self) -> bool {
        self.containers.len() <= other.containers.len()
            && merge(&self.containers, &other.containers).all(|pair| match pair {
                Pair::Both(mine, theirs) => mine.is_subset(theirs),
                Pair::Left(_) => false,
                Pair::Right(_) => true,
            })
    }

    /// Returns `true` if every value of `other` is in this set.
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let rb1 = RoaringBitmap::from([1, 2]);
    /// assert!(rb1.is_superset(&RoaringBitmap::from([2])));
    /// assert!(!rb1.is_superset(&RoaringBitmap::from([3])));
    /// ```
    pub fn is_superset(&self, other: &Self) -> bool {
        other.is_subset(self)
    }
}
