//! This is a [Rust][] implementation of the [Roaring bitmap][] data structure, a compressed set
//! of `u32` described in [_Better bitmap performance with Roaring bitmaps_][roaring-paper] and
//! [_Consistently faster and smaller compressed bitmaps with Roaring_][roaring-run-paper].
//!
//! Every group of 2<sup>16</sup> values sharing their high bits lives in a container which is
//! kept, depending on its content, as a sorted array, a bitmap or a list of runs.
//!
//! [Rust]: https://www.rust-lang.org/
//! [Roaring bitmap]: https://roaringbitmap.org/
//! [roaring-paper]: https://arxiv.org/pdf/1402.6407v4
//! [roaring-run-paper]: https://arxiv.org/pdf/1603.06549

#![warn(missing_docs)]

use std::io;

use thiserror::Error;

pub mod aggregation;
pub mod allocator;
mod bitmap;

pub use crate::bitmap::{
    ArrayError, FastRankRoaringBitmap, IntoIter, Iter, LazyUnion, RoaringBitmap, RunError,
    Statistics,
};

/// An error type that is returned when an iterator isn't sorted.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Error)]
#[error("integers are ordered up to the {valid_until}th element")]
pub struct NonSortedIntegers {
    valid_until: u64,
}

impl NonSortedIntegers {
    /// Returns the number of elements that were sorted before the first out of order one.
    pub fn valid_until(&self) -> u64 {
        self.valid_until
    }
}

/// A range given to a mutating operation could not be applied.
///
/// The bitmap is left unchanged when this error is returned.
#[derive(PartialEq, Eq, Clone, Copy, Debug, Error)]
pub enum RangeError {
    /// The start bound of the range is after its end bound.
    #[error("range start {start} is greater than range end {end}")]
    StartGreaterThanEnd {
        /// The start bound as given.
        start: u64,
        /// The end bound as given.
        end: u64,
    },
    /// The exclusive end bound lies beyond 2<sup>32</sup>.
    #[error("range end {end} is outside of the u32 domain")]
    OutOfDomain {
        /// The end bound as given.
        end: u64,
    },
}

/// The bytes given to a deserializer do not describe a valid bitmap.
///
/// Malformed input is always rejected before the memory it declares is allocated.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The underlying reader failed or ended too early.
    #[error(transparent)]
    Io(#[from] io::Error),
    /// The leading cookie matches neither the run nor the no-run format.
    #[error("unknown cookie value {0}")]
    UnknownCookie(u32),
    /// More containers are declared than keys exist.
    #[error("{0} containers declared but at most 65536 are supported")]
    TooManyContainers(u64),
    /// Container keys are not strictly increasing.
    #[error("container keys are not sorted at container {index}")]
    UnsortedKeys {
        /// Position of the first out of order container.
        index: usize,
    },
    /// A run container declares no run at all.
    #[error("run container {key} has zero runs")]
    ZeroRuns {
        /// Key of the offending container.
        key: u16,
    },
    /// A run container declares more runs than a container can hold.
    #[error("run container {key} declares {runs} runs but at most 32768 are possible")]
    TooManyRuns {
        /// Key of the offending container.
        key: u16,
        /// The declared number of runs.
        runs: u16,
    },
    /// A run goes past the end of the container.
    #[error("a run of container {key} overflows past 65535")]
    RunOverflow {
        /// Key of the offending container.
        key: u16,
    },
    /// Runs overlap, touch, or are out of order.
    #[error("invalid runs in container {key}: {source}")]
    InvalidRuns {
        /// Key of the offending container.
        key: u16,
        /// What is wrong with the runs.
        #[source]
        source: RunError,
    },
    /// Array values are out of order or duplicated.
    #[error("invalid array in container {key}: {source}")]
    InvalidArray {
        /// Key of the offending container.
        key: u16,
        /// What is wrong with the values.
        #[source]
        source: ArrayError,
    },
    /// The content of a container disagrees with its declared cardinality.
    #[error("container {key} holds {actual} values but declares {expected}")]
    CardinalityMismatch {
        /// Key of the offending container.
        key: u16,
        /// The declared cardinality.
        expected: u64,
        /// The cardinality of the decoded content.
        actual: u64,
    },
    /// The input declares more bytes than remain in the buffer.
    #[error("{needed} bytes are declared but only {remaining} remain")]
    Truncated {
        /// Bytes the next section declares.
        needed: u64,
        /// Bytes left in the buffer.
        remaining: u64,
    },
}

/// Set operations over any number of bitmaps, owned, borrowed or wrapped in `Result`s.
///
/// Unions only count values once every input was merged, and intersections start from the
/// inputs with the fewest containers.
///
/// # Examples
/// ```
/// use roaring_core::{MultiOps, RoaringBitmap};
///
/// let bitmaps = [
///     RoaringBitmap::from_iter(0..10),
///     RoaringBitmap::from_iter(10..20),
///     RoaringBitmap::from_iter(20..30),
/// ];
///
/// let folded = bitmaps.iter().fold(RoaringBitmap::new(), |acc, b| acc | b);
/// assert_eq!(bitmaps.union(), folded);
/// ```
pub trait MultiOps<T>: IntoIterator<Item = T> {
    /// A bitmap, or a `Result` holding one when the inputs are fallible.
    type Output;

    /// The values of any input.
    fn union(self) -> Self::Output;

    /// The values of every input. Empty for no input.
    fn intersection(self) -> Self::Output;

    /// The values of the first input missing from all the others.
    fn difference(self) -> Self::Output;

    /// The values present in an odd number of inputs.
    fn symmetric_difference(self) -> Self::Output;
}
