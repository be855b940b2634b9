use std::ops::{Bound, RangeBounds, RangeInclusive};

use crate::RangeError;

/// Splits a value into its container key (high bits) and its position in the container.
#[inline]
pub fn split(value: u32) -> (u16, u16) {
    ((value >> 16) as u16, value as u16)
}

/// Inverse of [`split`].
#[inline]
pub fn join(key: u16, low: u16) -> u32 {
    u32::from(key) << 16 | u32::from(low)
}

/// The keys of the containers overlapping `values`.
pub fn keys(values: &RangeInclusive<u32>) -> RangeInclusive<u16> {
    split(*values.start()).0..=split(*values.end()).0
}

/// The part of `values` stored in the container `key`, as positions in that container.
///
/// `key` must be one of [`keys`]`(values)`.
pub fn positions(key: u16, values: &RangeInclusive<u32>) -> RangeInclusive<u16> {
    let (start_key, start_low) = split(*values.start());
    let (end_key, end_low) = split(*values.end());
    let first = if key == start_key { start_low } else { 0 };
    let last = if key == end_key { end_low } else { u16::MAX };
    first..=last
}

/// The values covered by a `RangeBounds<u32>` once both bounds are resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Span {
    Values(RangeInclusive<u32>),
    /// `x..x`, or an exclusion pushing a bound past the edge of the domain.
    Empty,
    /// The raw start bound is after the raw end bound.
    Reversed { start: u32, end: u32 },
    /// `(Excluded(x), Excluded(x))`.
    ExcludedTwice,
}

impl Span {
    pub fn resolve<R: RangeBounds<u32>>(range: R) -> Span {
        use Bound::*;

        let (start, end) = (range.start_bound().cloned(), range.end_bound().cloned());
        match (start, end) {
            (Excluded(s), Excluded(e)) if s == e => return Span::ExcludedTwice,
            (Included(s) | Excluded(s), Included(e) | Excluded(e)) if s > e => {
                return Span::Reversed { start: s, end: e };
            }
            _ => (),
        }

        let first = match start {
            Included(s) => Some(s),
            Excluded(s) => s.checked_add(1),
            Unbounded => Some(0),
        };
        let last = match end {
            Included(e) => Some(e),
            Excluded(e) => e.checked_sub(1),
            Unbounded => Some(u32::MAX),
        };
        match (first, last) {
            (Some(first), Some(last)) if first <= last => Span::Values(first..=last),
            _ => Span::Empty,
        }
    }

    /// The covered values, `None` for empty and invalid ranges alike.
    pub fn values(self) -> Option<RangeInclusive<u32>> {
        match self {
            Span::Values(values) => Some(values),
            Span::Empty | Span::Reversed { .. } | Span::ExcludedTwice => None,
        }
    }
}

/// Validates a range for a mutating operation.
///
/// Empty ranges are fine and yield `Ok(None)`, reversed ranges are rejected.
pub fn checked_range<R>(range: R) -> Result<Option<RangeInclusive<u32>>, RangeError>
where
    R: RangeBounds<u32>,
{
    match Span::resolve(range) {
        Span::Values(values) => Ok(Some(values)),
        Span::Empty | Span::ExcludedTwice => Ok(None),
        Span::Reversed { start, end } => {
            Err(RangeError::StartGreaterThanEnd { start: start.into(), end: end.into() })
        }
    }
}

/// Converts a half-open `[0, end)` bound expressed as a `u64` to the last
/// included value, `None` when `end` is zero.
pub fn checked_exclusive_end(end: u64) -> Result<Option<u32>, RangeError> {
    match end.checked_sub(1).map(u32::try_from) {
        None => Ok(None),
        Some(Ok(last)) => Ok(Some(last)),
        Some(Err(_)) => Err(RangeError::OutOfDomain { end }),
    }
}

#[cfg(test)]
mod test {
    use std::ops::Bound::{Excluded, Included, Unbounded};

    use super::*;

    #[test]
    fn split_and_join() {
        let cases = [
            (0x0000_0000, (0x0000, 0x0000)),
            (0x0000_0001, (0x0000, 0x0001)),
            (0x0000_FFFF, (0x0000, 0xFFFF)),
            (0x0001_0000, (0x0001, 0x0000)),
            (0x1234_5678, (0x1234, 0x5678)),
            (0xFFFF_FFFF, (0xFFFF, 0xFFFF)),
        ];
        for (value, (key, low)) in cases {
            assert_eq!(split(value), (key, low));
            assert_eq!(join(key, low), value);
        }
    }

    #[test]
    fn keys_and_positions() {
        let values = 0x0001_FFF0..=0x0003_0010;
        assert_eq!(keys(&values), 1..=3);
        assert_eq!(positions(1, &values), 0xFFF0..=0xFFFF);
        assert_eq!(positions(2, &values), 0..=0xFFFF);
        assert_eq!(positions(3, &values), 0..=0x0010);

        let values = 0x0005_0002..=0x0005_0009;
        assert_eq!(keys(&values), 5..=5);
        assert_eq!(positions(5, &values), 2..=9);
    }

    #[test]
    #[allow(clippy::reversed_empty_ranges)]
    fn resolve() {
        assert_eq!(Span::resolve(1..6), Span::Values(1..=5));
        assert_eq!(Span::resolve(1..), Span::Values(1..=u32::MAX));
        assert_eq!(Span::resolve(..), Span::Values(0..=u32::MAX));
        assert_eq!(Span::resolve(16..=16), Span::Values(16..=16));
        assert_eq!(Span::resolve((Excluded(10), Excluded(20))), Span::Values(11..=19));

        assert_eq!(Span::resolve(5..5), Span::Empty);
        assert_eq!(Span::resolve(..0), Span::Empty);
        assert_eq!(Span::resolve((Excluded(0), Included(0))), Span::Empty);
        assert_eq!(Span::resolve((Excluded(u32::MAX), Unbounded)), Span::Empty);
        assert_eq!(Span::resolve(10..5), Span::Reversed { start: 10, end: 5 });
        assert_eq!(Span::resolve((Excluded(7), Excluded(7))), Span::ExcludedTwice);
    }

    #[test]
    #[allow(clippy::reversed_empty_ranges)]
    fn mutating_ranges() {
        assert_eq!(checked_range(3..10), Ok(Some(3..=9)));
        assert_eq!(checked_range(7..7), Ok(None));
        assert_eq!(checked_range((Excluded(7), Excluded(7))), Ok(None));
        assert_eq!(checked_range(9..2), Err(RangeError::StartGreaterThanEnd { start: 9, end: 2 }));
    }

    #[test]
    fn exclusive_ends() {
        assert_eq!(checked_exclusive_end(0), Ok(None));
        assert_eq!(checked_exclusive_end(7), Ok(Some(6)));
        assert_eq!(checked_exclusive_end(1 << 32), Ok(Some(u32::MAX)));
        assert_eq!(
            checked_exclusive_end((1 << 32) + 1),
            Err(RangeError::OutOfDomain { end: (1 << 32) + 1 })
        );
    }
}
