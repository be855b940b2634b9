//! Sources of the buffers that back containers.
//!
//! Decoding a bitmap asks an [`Allocator`] for every value vector, run vector, container vector
//! and bitmap word block it needs, and [`RoaringBitmap::release_in`] hands all the buffers of a
//! bitmap back. Containers created or grown by later mutations take their buffers from [`Heap`],
//! so an allocator must accept the release of buffers it did not hand out.
//! [`Heap`] is the global allocator, [`Tracking`] accounts for every buffer it hands out.
//!
//! [`RoaringBitmap::release_in`]: crate::RoaringBitmap::release_in

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use tracing::trace;

use crate::bitmap::BITMAP_LENGTH;

/// Hands out and takes back the buffers of a bitmap.
///
/// Releasing consumes the buffer, so a buffer can never be released twice or used afterwards.
pub trait Allocator {
    /// Returns an empty vector able to hold `capacity` elements without reallocating.
    fn allocate_vec<T>(&self, capacity: usize) -> Vec<T>;

    /// Takes back a vector, whether it came from [`Allocator::allocate_vec`] or from elsewhere.
    fn release_vec<T>(&self, vec: Vec<T>);

    /// Returns a zeroed block of bitmap words.
    fn allocate_words(&self) -> Box<[u64; BITMAP_LENGTH]>;

    /// Takes back a block, whether it came from [`Allocator::allocate_words`] or from elsewhere.
    fn release_words(&self, words: Box<[u64; BITMAP_LENGTH]>);
}

/// The global allocator.
#[derive(Debug, Default, Clone, Copy)]
pub struct Heap;

impl Allocator for Heap {
    fn allocate_vec<T>(&self, capacity: usize) -> Vec<T> {
        Vec::with_capacity(capacity)
    }

    fn release_vec<T>(&self, vec: Vec<T>) {
        drop(vec);
    }

    fn allocate_words(&self) -> Box<[u64; BITMAP_LENGTH]> {
        Box::new([0; BITMAP_LENGTH])
    }

    fn release_words(&self, words: Box<[u64; BITMAP_LENGTH]>) {
        drop(words);
    }
}

/// Buffers handed out and not yet taken back, by address.
#[derive(Debug, Default)]
struct Ledger {
    live: HashMap<usize, usize>,
}

impl Ledger {
    fn hand_out(&mut self, address: usize) -> usize {
        *self.live.entry(address).or_insert(0) += 1;
        self.len()
    }

    /// Returns `false` when no buffer was handed out at `address`.
    fn take_back(&mut self, address: usize) -> bool {
        let Some(count) = self.live.get_mut(&address) else {
            return false;
        };
        *count -= 1;
        if *count == 0 {
            self.live.remove(&address);
        }
        true
    }

    fn len(&self) -> usize {
        self.live.values().sum()
    }
}

/// The global allocator, remembering each buffer it hands out until that buffer comes back.
///
/// Buffers are identified by address. A released buffer that was never handed out, such as the
/// words of a container promoted from an array after decoding, is freed without being counted.
/// A handed-out buffer that a mutation replaced stays live: the bitmap freed it on its own.
///
/// # Examples
///
/// ```rust
/// use roaring_core::allocator::Tracking;
/// use roaring_core::RoaringBitmap;
///
/// let rb: RoaringBitmap = (0..10_000).collect();
/// let mut bytes = vec![];
/// rb.serialize_into(&mut bytes).unwrap();
///
/// let tracking = Tracking::new();
/// let decoded = RoaringBitmap::deserialize_from_in(&bytes[..], &tracking).unwrap();
/// assert_eq!(tracking.live_words(), 1);
///
/// decoded.release_in(&tracking);
/// assert_eq!(tracking.live(), 0);
/// ```
#[derive(Debug, Default)]
pub struct Tracking {
    vecs: Mutex<Ledger>,
    words: Mutex<Ledger>,
}

impl Tracking {
    /// Creates an allocator with nothing live.
    pub fn new() -> Tracking {
        Tracking::default()
    }

    /// Number of vectors handed out and not yet released.
    pub fn live_vecs(&self) -> usize {
        Tracking::ledger(&self.vecs, |l| l.len())
    }

    /// Number of word blocks handed out and not yet released.
    pub fn live_words(&self) -> usize {
        Tracking::ledger(&self.words, |l| l.len())
    }

    /// Number of buffers of any kind handed out and not yet released.
    pub fn live(&self) -> usize {
        self.live_vecs() + self.live_words()
    }

    fn ledger<T>(ledger: &Mutex<Ledger>, f: impl FnOnce(&mut Ledger) -> T) -> T {
        f(&mut ledger.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn release(ledger: &Mutex<Ledger>, address: usize, kind: &str) {
        if Tracking::ledger(ledger, |ledger| ledger.take_back(address)) {
            trace!(kind, "released");
        } else {
            trace!(kind, "released a buffer allocated elsewhere");
        }
    }
}

impl Allocator for Tracking {
    fn allocate_vec<T>(&self, capacity: usize) -> Vec<T> {
        let vec: Vec<T> = Vec::with_capacity(capacity);
        let live = Tracking::ledger(&self.vecs, |ledger| ledger.hand_out(vec.as_ptr() as usize));
        trace!(capacity, live, "allocated vector");
        vec
    }

    fn release_vec<T>(&self, vec: Vec<T>) {
        Tracking::release(&self.vecs, vec.as_ptr() as usize, "vector");
        drop(vec);
    }

    fn allocate_words(&self) -> Box<[u64; BITMAP_LENGTH]> {
        let words: Box<[u64; BITMAP_LENGTH]> = Box::new([0; BITMAP_LENGTH]);
        let live = Tracking::ledger(&self.words, |ledger| ledger.hand_out(words.as_ptr() as usize));
        trace!(live, "allocated bitmap words");
        words
    }

    fn release_words(&self, words: Box<[u64; BITMAP_LENGTH]>) {
        Tracking::release(&self.words, words.as_ptr() as usize, "word block");
        drop(words);
    }
}
