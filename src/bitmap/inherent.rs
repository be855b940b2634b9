use std::ops::{RangeBounds, RangeInclusive};

use tracing::debug;

use crate::{RangeError, RoaringBitmap};

use super::container::Container;
use super::util::{self, Span};

impl RoaringBitmap {
    /// Creates an empty `RoaringBitmap`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    /// let rb = RoaringBitmap::new();
    /// assert!(rb.is_empty());
    /// ```
    pub fn new() -> RoaringBitmap {
        RoaringBitmap { containers: Vec::new() }
    }

    /// Creates a `RoaringBitmap` holding every `u32`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    /// let rb = RoaringBitmap::full();
    /// assert_eq!(rb.len(), 1 << 32);
    /// ```
    pub fn full() -> RoaringBitmap {
        RoaringBitmap { containers: (0..=u16::MAX).map(Container::full).collect() }
    }

    /// The container holding the values of `key`, if any.
    fn container(&self, key: u16) -> Option<&Container> {
        let loc = self.containers.binary_search_by_key(&key, |c| c.key).ok()?;
        Some(&self.containers[loc])
    }

    /// Index of the container of `key`, created empty when missing.
    pub(crate) fn find_container_by_key(&mut self, key: u16) -> usize {
        self.containers.binary_search_by_key(&key, |c| c.key).unwrap_or_else(|loc| {
            self.containers.insert(loc, Container::new(key));
            loc
        })
    }

    /// The containers whose keys lie in `keys`.
    fn overlapping(&self, keys: &RangeInclusive<u16>) -> &[Container] {
        let start = self.containers.partition_point(|c| c.key < *keys.start());
        let end = self.containers.partition_point(|c| c.key <= *keys.end());
        &self.containers[start..end]
    }

    fn overlapping_mut(&mut self, keys: &RangeInclusive<u16>) -> &mut [Container] {
        let start = self.containers.partition_point(|c| c.key < *keys.start());
        let end = self.containers.partition_point(|c| c.key <= *keys.end());
        &mut self.containers[start..end]
    }

    /// Calls `rebuild` once for every key in `keys`, in order, handing it the container
    /// present for that key. The containers it returns replace the old ones, empty ones are
    /// dropped.
    fn rebuild_keys<F>(&mut self, keys: RangeInclusive<u16>, mut rebuild: F)
    where
        F: FnMut(u16, Option<Container>) -> Container,
    {
        let start = self.containers.partition_point(|c| c.key < *keys.start());
        let end = self.containers.partition_point(|c| c.key <= *keys.end());
        let tail = self.containers.split_off(end);
        let mut old = self.containers.split_off(start).into_iter().peekable();

        for key in keys {
            let container = rebuild(key, old.next_if(|c| c.key == key));
            if !container.is_empty() {
                self.containers.push(container);
            }
        }
        self.containers.extend(tail);
    }

    /// Adds a value to the set.
    ///
    /// Returns whether the value was absent from the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let mut rb = RoaringBitmap::new();
    /// assert!(rb.insert(3));
    /// assert!(!rb.insert(3));
    /// assert!(rb.contains(3));
    /// ```
    #[inline]
    pub fn insert(&mut self, value: u32) -> bool {
        let (key, low) = util::split(value);
        let loc = self.find_container_by_key(key);
        self.containers[loc].insert(low)
    }

    /// Inserts every value of `range` and returns how many of them were absent.
    ///
    /// Empty ranges insert nothing. A range whose start is after its end is rejected and the
    /// set is left untouched.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::{RangeError, RoaringBitmap};
    ///
    /// let mut rb = RoaringBitmap::new();
    /// assert_eq!(rb.insert_range(2..4), Ok(2));
    /// assert!(rb.contains(2));
    /// assert!(rb.contains(3));
    /// assert!(!rb.contains(4));
    ///
    /// assert_eq!(rb.insert_range(7..7), Ok(0));
    /// # #[allow(clippy::reversed_empty_ranges)]
    /// let reversed = rb.insert_range(9..2);
    /// assert_eq!(reversed, Err(RangeError::StartGreaterThanEnd { start: 9, end: 2 }));
    /// ```
    pub fn insert_range<R>(&mut self, range: R) -> Result<u64, RangeError>
    where
        R: RangeBounds<u32>,
    {
        let Some(values) = util::checked_range(range)? else {
            return Ok(0);
        };

        let mut inserted = 0;
        self.rebuild_keys(util::keys(&values), |key, container| {
            let positions = util::positions(key, &values);
            match container {
                Some(mut container) => {
                    inserted += container.insert_range(positions);
                    container
                }
                None => {
                    let container = Container::from_range(key, positions);
                    inserted += container.len();
                    container
                }
            }
        });
        Ok(inserted)
    }

    /// Inserts `value` only if it is bigger than every value of the set.
    ///
    /// Returns whether the value was inserted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let mut rb = RoaringBitmap::new();
    /// assert!(rb.push(1));
    /// assert!(rb.push(3));
    /// assert!(!rb.push(3));
    /// assert!(!rb.push(2));
    ///
    /// assert_eq!(rb.iter().collect::<Vec<u32>>(), vec![1, 3]);
    /// ```
    #[inline]
    pub fn push(&mut self, value: u32) -> bool {
        let (key, low) = util::split(value);
        match self.containers.last_mut() {
            Some(last) if last.key > key => false,
            Some(last) if last.key == key => last.push(low),
            _ => {
                self.containers.push(Container::from_range(key, low..=low));
                true
            }
        }
    }

    /// Appends `value`, which the caller knows to be bigger than [`RoaringBitmap::max`].
    #[inline]
    pub(crate) fn push_unchecked(&mut self, value: u32) {
        let (key, low) = util::split(value);
        match self.containers.last_mut() {
            Some(last) if last.key == key => last.push_unchecked(low),
            last => {
                debug_assert!(last.map_or(true, |last| last.key < key), "pushed out of order");
                self.containers.push(Container::from_range(key, low..=low));
            }
        }
    }

    /// Removes a value from the set. Returns `true` if the value was present.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let mut rb = RoaringBitmap::from([3]);
    /// assert!(rb.remove(3));
    /// assert!(!rb.remove(3));
    /// assert!(rb.is_empty());
    /// ```
    #[inline]
    pub fn remove(&mut self, value: u32) -> bool {
        let (key, low) = util::split(value);
        let Ok(loc) = self.containers.binary_search_by_key(&key, |c| c.key) else {
            return false;
        };
        let removed = self.containers[loc].remove(low);
        if self.containers[loc].is_empty() {
            self.containers.remove(loc);
        }
        removed
    }

    /// Removes every value of `range` and returns how many of them were present.
    ///
    /// Ranges are checked like in [`RoaringBitmap::insert_range`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let mut rb = RoaringBitmap::from([2, 3, 70_000]);
    /// assert_eq!(rb.remove_range(2..4), Ok(2));
    /// assert_eq!(rb.remove_range(..), Ok(1));
    /// assert!(rb.is_empty());
    /// ```
    pub fn remove_range<R>(&mut self, range: R) -> Result<u64, RangeError>
    where
        R: RangeBounds<u32>,
    {
        let Some(values) = util::checked_range(range)? else {
            return Ok(0);
        };

        let mut removed = 0;
        for container in self.overlapping_mut(&util::keys(&values)) {
            removed += container.remove_range(util::positions(container.key, &values));
        }
        if removed > 0 {
            self.containers.retain(|container| !container.is_empty());
        }
        Ok(removed)
    }

    /// Complements the values of `range`: present ones are removed, absent ones inserted.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let mut rb = RoaringBitmap::from_iter([1, 2, 3, 10]);
    /// rb.flip(2..6).unwrap();
    /// assert_eq!(rb.iter().collect::<Vec<u32>>(), vec![1, 4, 5, 10]);
    /// ```
    pub fn flip<R>(&mut self, range: R) -> Result<(), RangeError>
    where
        R: RangeBounds<u32>,
    {
        let Some(values) = util::checked_range(range)? else {
            return Ok(());
        };

        self.rebuild_keys(util::keys(&values), |key, container| {
            let positions = util::positions(key, &values);
            match container {
                Some(mut container) => {
                    container.flip_range(positions);
                    container
                }
                None => Container::from_range(key, positions),
            }
        });
        Ok(())
    }

    /// Like [`RoaringBitmap::flip`], on a copy.
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let rb = RoaringBitmap::from_iter([1, 2, 3]);
    /// let flipped = rb.flipped(0..2).unwrap();
    /// assert_eq!(flipped.iter().collect::<Vec<u32>>(), vec![0, 2, 3]);
    /// assert_eq!(rb.len(), 3);
    /// ```
    pub fn flipped<R>(&self, range: R) -> Result<RoaringBitmap, RangeError>
    where
        R: RangeBounds<u32>,
    {
        let mut flipped = self.clone();
        flipped.flip(range)?;
        Ok(flipped)
    }

    /// Shifts every value by `offset`, dropping the values that leave the `u32` domain.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let rb = RoaringBitmap::from([0, 10, u32::MAX]);
    /// assert_eq!(rb.add_offset(5), RoaringBitmap::from([5, 15]));
    /// assert_eq!(rb.add_offset(-5), RoaringBitmap::from([5, u32::MAX - 5]));
    /// assert!(rb.add_offset(1 << 40).is_empty());
    /// ```
    pub fn add_offset(&self, offset: i64) -> RoaringBitmap {
        if offset % (1 << 16) == 0 {
            // containers move to other keys as they are
            let keys = offset >> 16;
            let containers = self
                .containers
                .iter()
                .filter_map(|c| {
                    let key = u16::try_from(i64::from(c.key) + keys).ok()?;
                    Some(Container { key, store: c.store.clone() })
                })
                .collect();
            return RoaringBitmap { containers };
        }

        let mut shifted = RoaringBitmap::new();
        let moved = self.iter().filter_map(|value| {
            i64::from(value).checked_add(offset).and_then(|v| u32::try_from(v).ok())
        });
        for value in moved {
            shifted.push_unchecked(value);
        }
        shifted
    }

    /// Returns `true` if the set holds `value`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let rb = RoaringBitmap::from([1]);
    /// assert!(!rb.contains(0));
    /// assert!(rb.contains(1));
    /// ```
    #[inline]
    pub fn contains(&self, value: u32) -> bool {
        let (key, low) = util::split(value);
        self.container(key).is_some_and(|container| container.contains(low))
    }

    /// Returns `true` if every value of `range` is in the set.
    ///
    /// Empty and reversed ranges hold no value and are always contained.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::RoaringBitmap;
    ///
    /// let mut rb = RoaringBitmap::new();
    /// assert!(rb.contains_range(7..7));
    ///
    /// rb.insert_range(1..0xFFF).unwrap();
    /// assert!(rb.contains_range(1..0xFFF));
    /// assert!(rb.contains_range(2..0xFFF));
    /// assert!(!rb.contains_range(0..2));
    /// assert!(!rb.contains_range(1..=0xFFF));
    /// ```
    pub fn contains_range<R>(&self, range: R) -> bool
    where
        R: RangeBounds<u32>,
    {
        let Some(values) = Span::resolve(range).values() else {
            return true;
        };
        let keys = util::keys(&values);
        let overlapping = self.overlapping(&keys);

        // keys are unique, so a full count means no key is missing
        overlapping.len() == usize::from(keys.end() - keys.start()) + 1
            && overlapping.iter().all(|c| c.contains_range(util::positions(c.key, &values)))
    }

    /// Counts the values of the set lying in `range`. Empty and reversed ranges count `0`.
    ///
    /// # Examples
    ///
    /// ```
    /// use roaring_core::RoaringBitmap;
    ///
    /// let mut rb = RoaringBitmap::new();
    /// rb.insert_range(0x10000..0x40000).unwrap();
    /// rb.insert(0x50001);
    /// rb.insert(0x50005);
    /// rb.insert(u32::MAX);
    ///
    /// assert_eq!(rb.range_cardinality(0..0x10000), 0);
    /// assert_eq!(rb.range_cardinality(0x10000..0x40000), 0x30000);
    /// assert_eq!(rb.range_cardinality(0x50000..0x60000), 2);
    /// assert_eq!(rb.range_cardinality(0x50000..=u32::MAX), 3);
    /// ```
    pub fn range_cardinality<R>(&self, range: R) -> u64
    where
        R: RangeBounds<u32>,
    {
        let Some(values) = Span::resolve(range).values() else {
            return 0;
        };
        self.overlapping(&util::keys(&values))
            .iter()
            .map(|container| container.range_cardinality(util::positions(container.key, &values)))
            .sum()
    }

    /// Returns `true` if at least one value of the set lies in `range`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let rb = RoaringBitmap::from([10, 70_000]);
    /// assert!(rb.intersects_range(5..=10));
    /// assert!(rb.intersects_range(11..));
    /// assert!(!rb.intersects_range(11..70_000));
    /// assert!(!rb.intersects_range(10..10));
    /// ```
    pub fn intersects_range<R>(&self, range: R) -> bool
    where
        R: RangeBounds<u32>,
    {
        Span::resolve(range).values().is_some_and(|values| {
            self.next_value(*values.start()).is_some_and(|next| next <= *values.end())
        })
    }

    /// Returns `true` if the set holds more than `threshold` values.
    ///
    /// Stops counting as soon as the answer is known.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let rb = RoaringBitmap::from_iter(0..100);
    /// assert!(rb.cardinality_exceeds(99));
    /// assert!(!rb.cardinality_exceeds(100));
    /// ```
    pub fn cardinality_exceeds(&self, threshold: u64) -> bool {
        let mut seen = 0;
        self.containers.iter().any(|container| {
            seen += container.len();
            seen > threshold
        })
    }

    /// Removes every value.
    #[inline]
    pub fn clear(&mut self) {
        self.containers.clear();
    }

    /// Returns `true` if the set holds no value.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let mut rb = RoaringBitmap::new();
    /// assert!(rb.is_empty());
    ///
    /// rb.insert(3);
    /// assert!(!rb.is_empty());
    /// ```
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.containers.is_empty()
    }

    /// Returns `true` if the set holds every `u32`.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.containers.len() == 1 << 16 && self.containers.iter().all(Container::is_full)
    }

    /// The number of values in the set.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let mut rb = RoaringBitmap::new();
    /// assert_eq!(rb.len(), 0);
    ///
    /// rb.insert(3);
    /// rb.insert(3);
    /// rb.insert(70_000);
    /// assert_eq!(rb.len(), 2);
    /// ```
    #[inline]
    pub fn len(&self) -> u64 {
        self.containers.iter().map(Container::len).sum()
    }

    /// The smallest value, `None` for an empty set.
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// assert_eq!(RoaringBitmap::new().min(), None);
    /// assert_eq!(RoaringBitmap::from([70_000, 4]).min(), Some(4));
    /// ```
    #[inline]
    pub fn min(&self) -> Option<u32> {
        let first = self.containers.first()?;
        first.min().map(|low| util::join(first.key, low))
    }

    /// The biggest value, `None` for an empty set.
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// assert_eq!(RoaringBitmap::new().max(), None);
    /// assert_eq!(RoaringBitmap::from([70_000, 4]).max(), Some(70_000));
    /// ```
    #[inline]
    pub fn max(&self) -> Option<u32> {
        let last = self.containers.last()?;
        last.max().map(|low| util::join(last.key, low))
    }

    /// Counts the values smaller than or equal to `value`, so `rank(u32::MAX) == len()`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let rb = RoaringBitmap::from([3, 4, 70_000]);
    /// assert_eq!(rb.rank(0), 0);
    /// assert_eq!(rb.rank(3), 1);
    /// assert_eq!(rb.rank(10), 2);
    /// assert_eq!(rb.rank(u32::MAX), 3);
    /// ```
    #[inline]
    pub fn rank(&self, value: u32) -> u64 {
        let (key, low) = util::split(value);
        let at = self.containers.partition_point(|c| c.key < key);
        let before: u64 = self.containers[..at].iter().map(Container::len).sum();
        match self.containers.get(at) {
            Some(container) if container.key == key => before + container.rank(low),
            _ => before,
        }
    }

    /// The value at position `n` in ascending order, `None` when `n >= len()`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let rb = RoaringBitmap::from([0, 10, 100]);
    /// assert_eq!(rb.select(0), Some(0));
    /// assert_eq!(rb.select(2), Some(100));
    /// assert_eq!(rb.select(3), None);
    /// ```
    #[inline]
    pub fn select(&self, n: u32) -> Option<u32> {
        let mut rest = u64::from(n);
        for container in &self.containers {
            match rest.checked_sub(container.len()) {
                Some(after) => rest = after,
                // rest < len <= 65536
                None => {
                    let low = container.select(rest as u16)?;
                    return Some(util::join(container.key, low));
                }
            }
        }
        None
    }

    /// Removes the `n` smallest values, or every value when there are fewer.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let mut rb = RoaringBitmap::from_iter([1, 5, 7, 9]);
    /// rb.remove_smallest(2);
    /// assert_eq!(rb, RoaringBitmap::from_iter([7, 9]));
    /// ```
    pub fn remove_smallest(&mut self, mut n: u64) {
        let whole = self
            .containers
            .iter()
            .take_while(|container| match n.checked_sub(container.len()) {
                Some(rest) => {
                    n = rest;
                    true
                }
                None => false,
            })
            .count();
        self.containers.drain(..whole);

        if let Some(first) = self.containers.first_mut().filter(|_| n > 0) {
            first.remove_smallest(n);
        }
    }

    /// Removes the `n` biggest values, or every value when there are fewer.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let mut rb = RoaringBitmap::from_iter([1, 5, 7, 9]);
    /// rb.remove_biggest(3);
    /// assert_eq!(rb, RoaringBitmap::from_iter([1]));
    /// ```
    pub fn remove_biggest(&mut self, mut n: u64) {
        let whole = self
            .containers
            .iter()
            .rev()
            .take_while(|container| match n.checked_sub(container.len()) {
                Some(rest) => {
                    n = rest;
                    true
                }
                None => false,
            })
            .count();
        self.containers.truncate(self.containers.len() - whole);

        if let Some(last) = self.containers.last_mut().filter(|_| n > 0) {
            last.remove_biggest(n);
        }
    }

    /// The `n` smallest values of the set, or all of them when there are fewer.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let rb = RoaringBitmap::from_iter([1, 5, 7, 70_000]);
    /// assert_eq!(rb.limit(2), RoaringBitmap::from([1, 5]));
    /// assert_eq!(rb.limit(10), rb);
    /// ```
    pub fn limit(&self, n: u64) -> RoaringBitmap {
        let mut rest = n;
        let mut containers = Vec::new();
        for container in &self.containers {
            if rest == 0 {
                break;
            }
            let mut kept = container.clone();
            if let Some(excess) = kept.len().checked_sub(rest).filter(|&excess| excess > 0) {
                kept.remove_biggest(excess);
            }
            rest -= kept.len();
            containers.push(kept);
        }
        RoaringBitmap { containers }
    }

    /// The smallest value of the set that is greater than or equal to `value`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let rb = RoaringBitmap::from_iter([3, 70_000]);
    /// assert_eq!(rb.next_value(0), Some(3));
    /// assert_eq!(rb.next_value(3), Some(3));
    /// assert_eq!(rb.next_value(4), Some(70_000));
    /// assert_eq!(rb.next_value(70_001), None);
    /// ```
    pub fn next_value(&self, value: u32) -> Option<u32> {
        let (key, low) = util::split(value);
        let at = self.containers.partition_point(|c| c.key < key);
        self.containers[at..].iter().find_map(|container| {
            let from = if container.key == key { low } else { 0 };
            container.next_value(from).map(|next| util::join(container.key, next))
        })
    }

    /// The biggest value of the set that is less than or equal to `value`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let rb = RoaringBitmap::from_iter([3, 70_000]);
    /// assert_eq!(rb.previous_value(2), None);
    /// assert_eq!(rb.previous_value(3), Some(3));
    /// assert_eq!(rb.previous_value(69_999), Some(3));
    /// assert_eq!(rb.previous_value(u32::MAX), Some(70_000));
    /// ```
    pub fn previous_value(&self, value: u32) -> Option<u32> {
        let (key, low) = util::split(value);
        let end = self.containers.partition_point(|c| c.key <= key);
        self.containers[..end].iter().rev().find_map(|container| {
            let from = if container.key == key { low } else { u16::MAX };
            container.previous_value(from).map(|previous| util::join(container.key, previous))
        })
    }

    /// The smallest value missing from the set that is greater than or equal to `value`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let mut rb = RoaringBitmap::from_iter([3, 4, 5]);
    /// assert_eq!(rb.next_absent_value(3), Some(6));
    /// assert_eq!(rb.next_absent_value(7), Some(7));
    ///
    /// rb.insert_range(..).unwrap();
    /// assert_eq!(rb.next_absent_value(0), None);
    /// ```
    pub fn next_absent_value(&self, value: u32) -> Option<u32> {
        let (mut key, mut from) = util::split(value);
        let at = self.containers.partition_point(|c| c.key < key);
        let mut containers = self.containers[at..].iter();
        loop {
            match containers.next() {
                Some(container) if container.key == key => {
                    if let Some(absent) = container.next_absent_value(from) {
                        return Some(util::join(key, absent));
                    }
                }
                _ => return Some(util::join(key, from)),
            }
            key = key.checked_add(1)?;
            from = 0;
        }
    }

    /// The biggest value missing from the set that is less than or equal to `value`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let rb = RoaringBitmap::from_iter([0, 1, 65_535, 65_536]);
    /// assert_eq!(rb.previous_absent_value(1), None);
    /// assert_eq!(rb.previous_absent_value(65_536), Some(65_534));
    /// ```
    pub fn previous_absent_value(&self, value: u32) -> Option<u32> {
        let (mut key, mut from) = util::split(value);
        let end = self.containers.partition_point(|c| c.key <= key);
        let mut containers = self.containers[..end].iter().rev();
        loop {
            match containers.next() {
                Some(container) if container.key == key => {
                    if let Some(absent) = container.previous_absent_value(from) {
                        return Some(util::join(key, absent));
                    }
                }
                _ => return Some(util::join(key, from)),
            }
            key = key.checked_sub(1)?;
            from = u16::MAX;
        }
    }

    /// Stores every container in its smallest representation, runs included.
    ///
    /// Returns whether any container changed.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let mut rb = RoaringBitmap::from_iter(0..1000);
    /// let before = rb.serialized_size();
    /// assert!(rb.optimize());
    /// assert!(rb.serialized_size() < before);
    /// assert!(!rb.optimize());
    /// ```
    pub fn optimize(&mut self) -> bool {
        let changed = self.containers.iter_mut().map(Container::optimize).filter(|&c| c).count();
        debug!(changed, containers = self.containers.len(), "optimized bitmap");
        changed > 0
    }

    /// Turns every run container back into an array or a bitmap.
    ///
    /// Returns whether any container changed.
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let mut rb = RoaringBitmap::from_iter(0..1000);
    /// rb.optimize();
    /// assert!(rb.remove_run_compression());
    /// assert_eq!(rb.statistics().n_run_containers, 0);
    /// ```
    pub fn remove_run_compression(&mut self) -> bool {
        let containers = self.containers.iter_mut();
        let changed = containers.map(Container::remove_run_compression).filter(|&c| c).count();
        debug!(changed, containers = self.containers.len(), "removed run compression");
        changed > 0
    }
}

impl Default for RoaringBitmap {
    fn default() -> RoaringBitmap {
        RoaringBitmap::new()
    }
}

impl Clone for RoaringBitmap {
    fn clone(&self) -> Self {
        RoaringBitmap { containers: self.containers.clone() }
    }

    fn clone_from(&mut self, other: &Self) {
        self.containers.clone_from(&other.containers);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use proptest::collection::btree_set;
    use proptest::prelude::*;

    use super::*;

    fn keys(bitmap: &RoaringBitmap) -> Vec<u16> {
        bitmap.containers.iter().map(|c| c.key).collect()
    }

    proptest! {
        #[test]
        fn range_mutations_match_btree_set(
            values in btree_set(0u32..300_000, 0..2000),
            start in 0u32..300_000,
            len in 0u32..140_000,
        ) {
            let range = start..start.saturating_add(len);
            let outside = |v: &u32| !range.contains(v);

            let mut inserted = RoaringBitmap::from_iter(values.iter().copied());
            let added = inserted.insert_range(range.clone()).unwrap();
            prop_assert_eq!(added, u64::from(len) - range_len(&values, &range));
            prop_assert!(inserted.contains_range(range.clone()));
            prop_assert_eq!(inserted.len(), values.len() as u64 + added);

            let mut removed = RoaringBitmap::from_iter(values.iter().copied());
            prop_assert_eq!(removed.remove_range(range.clone()), Ok(range_len(&values, &range)));
            prop_assert!(removed.iter().eq(values.iter().copied().filter(outside)));

            let original = RoaringBitmap::from_iter(values.iter().copied());
            prop_assert_eq!(original.range_cardinality(range.clone()), range_len(&values, &range));
            let flipped = original.flipped(range.clone()).unwrap();
            for v in range.clone().step_by(97) {
                prop_assert_eq!(flipped.contains(v), !values.contains(&v));
            }
            prop_assert_eq!(flipped.flipped(range).unwrap(), original);
        }
    }

    fn range_len(values: &BTreeSet<u32>, range: &std::ops::Range<u32>) -> u64 {
        values.range(range.clone()).count() as u64
    }

    #[test]
    fn ranges_inside_one_container() {
        let mut rb = RoaringBitmap::new();
        assert_eq!(rb.insert_range(1..5), Ok(4));
        assert_eq!(rb.remove_range(2..10), Ok(3));
        assert!(rb.iter().eq([1]));

        assert_eq!(rb.insert_range(1..20_000), Ok(19_998));
        assert_eq!(rb.remove_range(10_000..21_000), Ok(10_000));
        assert_eq!(rb.insert_range(1..20_000), Ok(10_000));
        assert_eq!(keys(&rb), [0]);
    }

    #[test]
    fn ranges_across_containers() {
        let mut rb = RoaringBitmap::new();
        assert_eq!(rb.insert_range(0xFFFF..=0x1_0000), Ok(2));
        assert_eq!(keys(&rb), [0, 1]);
        assert_eq!(rb.remove_range(0x1_0000..=0x1_0000), Ok(1));
        assert_eq!(keys(&rb), [0]);

        assert!(rb.insert(0x4_0000));
        assert_eq!(rb.insert_range(0..0x1_0001), Ok(0x1_0000));
        assert_eq!(keys(&rb), [0, 1, 4]);
        assert_eq!(rb.remove_range(0x3_0000..=0x4_0000), Ok(1));
        assert_eq!(keys(&rb), [0, 1]);
    }

    #[test]
    fn every_value() {
        let mut rb = RoaringBitmap::from([7, 0x9_0000]);
        assert_eq!(rb.insert_range(..), Ok((1 << 32) - 2));
        assert!(rb.is_full());
        assert_eq!(rb.len(), 1 << 32);
        assert_eq!(rb.remove_range(..), Ok(1 << 32));
        assert!(rb.is_empty());
    }

    #[test]
    #[allow(clippy::reversed_empty_ranges)]
    fn reversed_ranges_leave_the_set_untouched() {
        let mut rb = RoaringBitmap::from_iter([1, 5, 9]);
        let expected = RangeError::StartGreaterThanEnd { start: 8, end: 3 };
        assert_eq!(rb.insert_range(8..3), Err(expected));
        assert_eq!(rb.remove_range(8..3), Err(expected));
        assert_eq!(rb.flip(8..3), Err(expected));
        assert_eq!(rb, RoaringBitmap::from_iter([1, 5, 9]));

        assert_eq!(rb.remove_range(5..5), Ok(0));
        assert_eq!(rb.flip(5..5), Ok(()));
        assert!(rb.contains_range(8..3));
        assert_eq!(rb.range_cardinality(8..3), 0);
        assert_eq!(rb.len(), 3);
    }

    #[test]
    fn flip_across_containers() {
        let mut rb = RoaringBitmap::from_iter([10, 65_540, 200_000]);
        rb.flip(65_530..131_080).unwrap();
        assert!(rb.contains(10));
        assert!(rb.contains(65_530));
        assert!(!rb.contains(65_540));
        assert!(rb.contains(131_079));
        assert!(!rb.contains(131_080));
        assert!(rb.contains(200_000));
        let len = 3 + (131_080 - 65_530) - 2;
        assert_eq!(rb.len(), len);

        rb.flip(..).unwrap();
        assert!(!rb.contains(10));
        assert!(rb.contains(11));
        assert_eq!(rb.len(), (1 << 32) - len);
    }

    #[test]
    fn flip_drops_emptied_containers() {
        let mut rb = RoaringBitmap::from_iter(0x1_0000..0x1_0010);
        rb.insert(5);
        rb.flip(0x1_0000..0x1_0010).unwrap();
        assert_eq!(keys(&rb), [0]);
    }

    #[test]
    fn push_keeps_order() {
        let mut rb = RoaringBitmap::new();
        assert!(rb.push(70_000));
        assert!(!rb.push(5));
        assert!(rb.push(70_001));
        assert!(rb.push(u32::MAX));
        assert!(!rb.push(u32::MAX));
        assert!(rb.iter().eq([70_000, 70_001, u32::MAX]));
    }

    #[test]
    fn rank_and_select_agree() {
        let rb: RoaringBitmap = (0..5000).chain(70_000..70_100).chain([u32::MAX]).collect();
        for (n, value) in rb.iter().enumerate().step_by(37) {
            assert_eq!(rb.select(n as u32), Some(value));
            assert_eq!(rb.rank(value), n as u64 + 1);
        }
        assert_eq!(rb.rank(69_999), 5000);
        assert_eq!(rb.select(5101), None);
    }

    #[test]
    fn neighbour_values() {
        let mut rb = RoaringBitmap::new();
        rb.insert_range(0..=0xFFFF).unwrap();
        rb.insert_range(0x1_0000..0x1_0004).unwrap();
        assert_eq!(rb.next_absent_value(0), Some(0x1_0004));
        assert_eq!(rb.previous_absent_value(0x1_0003), None);
        assert_eq!(rb.next_value(0x1_0004), None);
        assert_eq!(rb.previous_value(u32::MAX), Some(0x1_0003));
        assert_eq!(rb.next_value(0x8000), Some(0x8000));

        let rb = RoaringBitmap::from_iter([u32::MAX]);
        assert_eq!(rb.next_absent_value(u32::MAX), None);
        assert_eq!(rb.previous_absent_value(u32::MAX), Some(u32::MAX - 1));
        assert_eq!(rb.previous_value(u32::MAX - 1), None);
    }

    #[test]
    fn remove_smallest() {
        let mut rb = RoaringBitmap::from_iter([1, 2, 3, 7, 9, 11]);
        rb.remove_smallest(3);
        assert_eq!(rb, RoaringBitmap::from_iter([7, 9, 11]));
        rb.remove_smallest(7);
        assert!(rb.is_empty());

        let mut rb = RoaringBitmap::from_iter(0..0x1_0005);
        rb.remove_smallest(0x1_0001);
        assert!(rb.iter().eq(0x1_0001..0x1_0005));

        let mut rb = RoaringBitmap::from_iter(0..200_000);
        rb.remove_smallest(2000);
        assert_eq!(rb, RoaringBitmap::from_iter(2000..200_000));

        let mut rb: RoaringBitmap = (0..2).chain(4..7).chain(1000..6000).collect();
        rb.remove_smallest(30);
        assert_eq!(rb.len(), 4975);
        assert_eq!(rb.min(), Some(1025));
    }

    #[test]
    fn remove_biggest() {
        let mut rb = RoaringBitmap::from_iter([1, 2, 3, 7, 9, 11]);
        rb.remove_biggest(2);
        assert_eq!(rb, RoaringBitmap::from_iter([1, 2, 3, 7]));
        rb.remove_biggest(4);
        assert!(rb.is_empty());

        let mut rb = RoaringBitmap::from_iter(0..0x1_0005);
        rb.remove_biggest(0x1_0001);
        assert!(rb.iter().eq(0..4));

        let mut rb = RoaringBitmap::from_iter(0..200_000);
        rb.remove_biggest(196_000);
        assert_eq!(rb, RoaringBitmap::from_iter(0..4000));
        assert_eq!(keys(&rb), [0]);
    }

    proptest! {
        #[test]
        fn shifted_and_truncated_sets_match_btree_set(
            values in btree_set(any::<u32>(), 0..500),
            offset in prop_oneof![
                any::<i64>(),
                -(1i64 << 33)..(1 << 33),
                (-70_000i64..70_000).prop_map(|keys| keys << 16),
            ],
            n in 0u64..600,
        ) {
            let rb = RoaringBitmap::from_iter(values.iter().copied());

            let shifted = values
                .iter()
                .filter_map(|&v| i64::from(v).checked_add(offset))
                .filter_map(|v| u32::try_from(v).ok());
            prop_assert!(rb.add_offset(offset).iter().eq(shifted));

            prop_assert!(rb.limit(n).iter().eq(values.iter().copied().take(n as usize)));
            prop_assert_eq!(rb.cardinality_exceeds(n), values.len() as u64 > n);
        }

        #[test]
        fn intersects_range_matches_btree_set(
            values in btree_set(0u32..300_000, 0..200),
            start in 0u32..300_000,
            len in 0u32..140_000,
        ) {
            let rb = RoaringBitmap::from_iter(values.iter().copied());
            let range = start..start.saturating_add(len);
            let expected = values.range(range.clone()).next().is_some();
            prop_assert_eq!(rb.intersects_range(range), expected);
        }
    }

    #[test]
    fn add_offset_moves_whole_containers() {
        let mut rb = RoaringBitmap::from_iter(0..10);
        rb.insert_range(0x2_0000..0x3_0000).unwrap();

        let up = rb.add_offset(1 << 16);
        assert_eq!(keys(&up), [1, 3]);
        let (before, after) = (rb.statistics(), up.statistics());
        assert_eq!(after.n_run_containers, before.n_run_containers);
        assert_eq!(after.n_array_containers, before.n_array_containers);
        assert_eq!(up.add_offset(-(1 << 16)), rb);
        assert_eq!(keys(&rb.add_offset(-(2 << 16))), [0]);

        let split = rb.add_offset(0x8000);
        assert_eq!(keys(&split), [0, 2, 3]);
        assert_eq!(split.len(), rb.len());
        assert_eq!(rb.add_offset(0), rb);
        assert!(rb.add_offset(i64::MIN).is_empty());
    }

    #[test]
    fn limit_cuts_inside_a_container() {
        let rb = RoaringBitmap::from_iter((0..5000).chain(70_000..70_010));
        let first = rb.limit(4097);
        assert_eq!(first, RoaringBitmap::from_iter(0..4097));
        assert_eq!(first.statistics().n_bitset_containers, 1);

        assert_eq!(rb.limit(5005).max(), Some(70_004));
        assert!(rb.limit(0).is_empty());
    }

    #[test]
    fn intersects_range_at_the_edges() {
        let rb = RoaringBitmap::from([0, u32::MAX]);
        assert!(rb.intersects_range(..1));
        assert!(rb.intersects_range(u32::MAX..));
        assert!(!rb.intersects_range(1..u32::MAX));
        #[allow(clippy::reversed_empty_ranges)]
        let reversed = rb.intersects_range(10..0);
        assert!(!reversed);
        assert!(!RoaringBitmap::new().intersects_range(..));
        assert!(RoaringBitmap::full().cardinality_exceeds(u32::MAX.into()));
    }
}
