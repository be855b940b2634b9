//! Divide-and-conquer reduction of many bitmaps.
//!
//! [`union`] and [`symmetric_difference`] split the input slice in half, reduce both halves
//! through [`Strategy::join`] and merge the two results. Slices of at most [`AGGREGATION_LEAF`]
//! bitmaps are reduced in one go. The strategy only decides where the halves run, so every
//! strategy gives the same bitmap, containers and representations included.
//!
//! # Examples
//!
//! ```
//! use roaring_core::aggregation::{self, Sequential};
//! use roaring_core::RoaringBitmap;
//!
//! let bitmaps: Vec<RoaringBitmap> =
//!     (0..100).map(|i| RoaringBitmap::from_iter(i * 10..i * 10 + 15)).collect();
//!
//! let union = aggregation::union(&Sequential, &bitmaps);
//! assert_eq!(union, RoaringBitmap::from_iter(0..1005));
//! ```

use std::fmt;

use tracing::{debug, trace};

use crate::{LazyUnion, MultiOps, RoaringBitmap};

/// Slices of at most this many bitmaps are reduced without splitting.
pub const AGGREGATION_LEAF: usize = 8;

/// Where the two halves of a reduction run.
pub trait Strategy: Clone + Send + Sync + fmt::Debug {
    /// Runs both closures and returns both results, possibly in parallel.
    fn join<A, B, RA, RB>(&self, a: A, b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send;
}

/// Runs both halves one after the other on the current thread.
#[derive(Default, Debug, Clone, Copy)]
pub struct Sequential;

impl Strategy for Sequential {
    fn join<A, B, RA, RB>(&self, a: A, b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send,
    {
        (a(), b())
    }
}

#[cfg(feature = "parallel")]
pub use self::parallel::Parallel;

#[cfg(feature = "parallel")]
mod parallel {
    use std::sync::Arc;

    use rayon::ThreadPool;

    use super::Strategy;

    /// Runs the two halves of every split on a rayon [`ThreadPool`].
    ///
    /// `Parallel` holds an [`Arc<ThreadPool>`], so clones share the same threads.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use rayon::ThreadPoolBuilder;
    /// use roaring_core::aggregation::{self, Parallel};
    /// use roaring_core::RoaringBitmap;
    ///
    /// let pool = Arc::new(ThreadPoolBuilder::new().num_threads(2).build().unwrap());
    /// let strategy = Parallel::new(pool);
    ///
    /// let bitmaps: Vec<RoaringBitmap> =
    ///     (0..64).map(|i| RoaringBitmap::from([i, i + 1])).collect();
    /// let xor = aggregation::symmetric_difference(&strategy, &bitmaps);
    /// assert_eq!(xor, RoaringBitmap::from([0, 64]));
    /// ```
    #[derive(Debug, Clone)]
    pub struct Parallel {
        thread_pool: Arc<ThreadPool>,
    }

    impl Parallel {
        /// Creates a strategy running on `thread_pool`.
        pub fn new(thread_pool: Arc<ThreadPool>) -> Parallel {
            Parallel { thread_pool }
        }
    }

    impl From<Arc<ThreadPool>> for Parallel {
        fn from(thread_pool: Arc<ThreadPool>) -> Parallel {
            Parallel::new(thread_pool)
        }
    }

    impl Strategy for Parallel {
        fn join<A, B, RA, RB>(&self, a: A, b: B) -> (RA, RB)
        where
            A: FnOnce() -> RA + Send,
            B: FnOnce() -> RB + Send,
            RA: Send,
            RB: Send,
        {
            self.thread_pool.join(a, b)
        }
    }
}

/// The union of every bitmap of `bitmaps`.
pub fn union<S: Strategy>(strategy: &S, bitmaps: &[RoaringBitmap]) -> RoaringBitmap {
    debug!(inputs = bitmaps.len(), strategy = ?strategy, "aggregating union");
    reduce(
        strategy,
        bitmaps,
        &|leaf: &[RoaringBitmap]| leaf.iter().collect::<LazyUnion>().repair(),
        &|a: RoaringBitmap, b: RoaringBitmap| a | b,
    )
}

/// The values present in an odd number of the bitmaps of `bitmaps`.
pub fn symmetric_difference<S>(strategy: &S, bitmaps: &[RoaringBitmap]) -> RoaringBitmap
where
    S: Strategy,
{
    debug!(inputs = bitmaps.len(), strategy = ?strategy, "aggregating symmetric difference");
    reduce(
        strategy,
        bitmaps,
        &|leaf: &[RoaringBitmap]| leaf.iter().symmetric_difference(),
        &|a: RoaringBitmap, b: RoaringBitmap| a ^ b,
    )
}

fn reduce<S, L, M>(strategy: &S, bitmaps: &[RoaringBitmap], leaf: &L, merge: &M) -> RoaringBitmap
where
    S: Strategy,
    L: Fn(&[RoaringBitmap]) -> RoaringBitmap + Sync,
    M: Fn(RoaringBitmap, RoaringBitmap) -> RoaringBitmap + Sync,
{
    if bitmaps.len() <= AGGREGATION_LEAF {
        return leaf(bitmaps);
    }

    let (left, right) = bitmaps.split_at(bitmaps.len() / 2);
    trace!(left = left.len(), right = right.len(), "split aggregation");
    let (left, right) = strategy.join(
        || reduce(strategy, left, leaf, merge),
        || reduce(strategy, right, leaf, merge),
    );
    merge(left, right)
}
