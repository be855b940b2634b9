use std::io;

use bytemuck::cast_slice_mut;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use tracing::debug;

use crate::allocator::{Allocator, Heap};
use crate::bitmap::container::Container;
use crate::bitmap::store::{
    check_runs, check_sorted, popcount, ArrayStore, BitmapStore, Interval, IntervalStore, Store,
    ARRAY_LIMIT, BITMAP_BYTES,
};
use crate::{DecodeError, RoaringBitmap};

pub(crate) const SERIAL_COOKIE_NO_RUNCONTAINER: u32 = 12346;
pub(crate) const SERIAL_COOKIE: u16 = 12347;
pub(crate) const NO_OFFSET_THRESHOLD: usize = 4;

// header fields
const COOKIE_BYTES: usize = 4;
const SIZE_BYTES: usize = 4;
const DESCRIPTION_BYTES: usize = 4;
const OFFSET_BYTES: usize = 4;

// payload fields
const ARRAY_ELEMENT_BYTES: u64 = 2;
const RUN_ELEMENT_BYTES: u64 = 4;

const MAX_CONTAINERS: u64 = u16::MAX as u64 + 1;
const MAX_RUNS: u16 = 32768;

/// Everything written before the first container payload.
struct Header {
    containers: usize,
    /// Whether the run format, and its run flags, are used.
    runs: bool,
}

impl Header {
    fn of(containers: &[Container]) -> Header {
        Header { containers: containers.len(), runs: containers.iter().any(|c| c.store.is_run()) }
    }

    /// The run format leaves offsets out below `NO_OFFSET_THRESHOLD` containers.
    fn has_offsets(&self) -> bool {
        !self.runs || self.containers >= NO_OFFSET_THRESHOLD
    }

    fn run_flags_bytes(&self) -> usize {
        if self.runs {
            (self.containers + 7) / 8
        } else {
            0
        }
    }

    fn byte_size(&self) -> usize {
        // the run format packs the container count into the cookie
        let count = if self.runs { 0 } else { SIZE_BYTES };
        let offsets = if self.has_offsets() { OFFSET_BYTES * self.containers } else { 0 };
        let descriptions = DESCRIPTION_BYTES * self.containers;
        COOKIE_BYTES + count + self.run_flags_bytes() + descriptions + offsets
    }
}

impl RoaringBitmap {
    /// Number of bytes [`RoaringBitmap::serialize_into`] writes for this bitmap.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let mut rb = RoaringBitmap::from_iter(0..100);
    /// let mut bytes = Vec::new();
    /// rb.serialize_into(&mut bytes).unwrap();
    /// assert_eq!(bytes.len(), rb.serialized_size());
    ///
    /// // a single run is cheaper than a hundred array values
    /// rb.optimize();
    /// assert!(rb.serialized_size() < bytes.len());
    /// ```
    pub fn serialized_size(&self) -> usize {
        let payload: u64 = self.containers.iter().map(Container::byte_size).sum();
        Header::of(&self.containers).byte_size() + payload as usize
    }

    /// Writes this bitmap in the portable [Roaring format][format], readable by the other
    /// Roaring implementations.
    ///
    /// The run format is used as soon as one container holds runs.
    ///
    /// [format]: https://github.com/RoaringBitmap/RoaringFormatSpec
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let rb: RoaringBitmap = [1, 2, 70_000].into_iter().collect();
    /// let mut bytes = Vec::new();
    /// rb.serialize_into(&mut bytes).unwrap();
    /// assert_eq!(&bytes[..4], &12346u32.to_le_bytes());
    /// assert_eq!(RoaringBitmap::deserialize_from(&bytes[..]).unwrap(), rb);
    /// ```
    pub fn serialize_into<W: io::Write>(&self, mut writer: W) -> io::Result<()> {
        let header = Header::of(&self.containers);
        if header.runs {
            let cookie = u32::from(SERIAL_COOKIE) | ((header.containers as u32 - 1) << 16);
            writer.write_u32::<LittleEndian>(cookie)?;
            let mut flags = vec![0u8; header.run_flags_bytes()];
            for (i, _) in self.containers.iter().enumerate().filter(|(_, c)| c.store.is_run()) {
                flags[i / 8] |= 1 << (i % 8);
            }
            writer.write_all(&flags)?;
        } else {
            writer.write_u32::<LittleEndian>(SERIAL_COOKIE_NO_RUNCONTAINER)?;
            writer.write_u32::<LittleEndian>(header.containers as u32)?;
        }

        for container in &self.containers {
            writer.write_u16::<LittleEndian>(container.key)?;
            writer.write_u16::<LittleEndian>((container.len() - 1) as u16)?;
        }

        if header.has_offsets() {
            let mut offset = header.byte_size() as u32;
            for container in &self.containers {
                writer.write_u32::<LittleEndian>(offset)?;
                offset += container.byte_size() as u32;
            }
        }

        for container in &self.containers {
            write_store(&mut writer, &container.store)?;
        }
        Ok(())
    }

    /// Reads a bitmap in the portable [Roaring format][format], validating every container.
    ///
    /// Sizes are checked against their limits before anything is allocated, then values must
    /// be sorted and agree with their declared cardinalities. Input from a trusted source can
    /// skip the second part with [`RoaringBitmap::deserialize_unchecked_from`].
    ///
    /// [format]: https://github.com/RoaringBitmap/RoaringFormatSpec
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::{DecodeError, RoaringBitmap};
    ///
    /// let rb: RoaringBitmap = (1..4).collect();
    /// let mut bytes = Vec::new();
    /// rb.serialize_into(&mut bytes).unwrap();
    /// assert_eq!(RoaringBitmap::deserialize_from(&bytes[..]).unwrap(), rb);
    ///
    /// let garbage = [1, 2, 3, 4, 5, 6, 7, 8];
    /// let error = RoaringBitmap::deserialize_from(&garbage[..]).unwrap_err();
    /// assert!(matches!(error, DecodeError::UnknownCookie(_)));
    /// ```
    pub fn deserialize_from<R: io::Read>(reader: R) -> Result<RoaringBitmap, DecodeError> {
        RoaringBitmap::deserialize_from_in(reader, &Heap)
    }

    /// Like [`RoaringBitmap::deserialize_from`], taking every buffer from `alloc`.
    ///
    /// Buffers of a container that fails to decode are released to `alloc` before the error is
    /// returned.
    pub fn deserialize_from_in<R, A>(reader: R, alloc: &A) -> Result<RoaringBitmap, DecodeError>
    where
        R: io::Read,
        A: Allocator,
    {
        let decoder = Decoder { reader, remaining: None };
        RoaringBitmap::deserialize_from_impl(decoder, alloc, true)
    }

    /// Reads a bitmap in the portable [Roaring format][format] without checking that values
    /// are sorted or match their cardinalities.
    ///
    /// Container and run counts are still checked against their limits, so malformed input
    /// never causes a large allocation. It may however produce a bitmap whose containers break
    /// their invariants.
    ///
    /// [format]: https://github.com/RoaringBitmap/RoaringFormatSpec
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let rb: RoaringBitmap = (1..4).collect();
    /// let mut bytes = Vec::new();
    /// rb.serialize_into(&mut bytes).unwrap();
    /// assert_eq!(RoaringBitmap::deserialize_unchecked_from(&bytes[..]).unwrap(), rb);
    /// ```
    pub fn deserialize_unchecked_from<R: io::Read>(
        reader: R,
    ) -> Result<RoaringBitmap, DecodeError> {
        RoaringBitmap::deserialize_unchecked_from_in(reader, &Heap)
    }

    /// Like [`RoaringBitmap::deserialize_unchecked_from`], taking every buffer from `alloc`.
    pub fn deserialize_unchecked_from_in<R, A>(
        reader: R,
        alloc: &A,
    ) -> Result<RoaringBitmap, DecodeError>
    where
        R: io::Read,
        A: Allocator,
    {
        let decoder = Decoder { reader, remaining: None };
        RoaringBitmap::deserialize_from_impl(decoder, alloc, false)
    }

    /// Deserialize a bitmap from a byte slice, checking every declared size against the bytes
    /// that remain before reading or allocating anything.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::{DecodeError, RoaringBitmap};
    ///
    /// let rb1: RoaringBitmap = (1..4).collect();
    /// let mut bytes = vec![];
    /// rb1.serialize_into(&mut bytes).unwrap();
    /// assert_eq!(RoaringBitmap::deserialize_from_slice(&bytes).unwrap(), rb1);
    ///
    /// let error = RoaringBitmap::deserialize_from_slice(&bytes[..bytes.len() - 1]).unwrap_err();
    /// assert!(matches!(error, DecodeError::Truncated { .. }));
    /// ```
    pub fn deserialize_from_slice(bytes: &[u8]) -> Result<RoaringBitmap, DecodeError> {
        let decoder = Decoder { reader: bytes, remaining: Some(bytes.len() as u64) };
        RoaringBitmap::deserialize_from_impl(decoder, &Heap, true)
    }

    /// Hands every buffer of this bitmap back to `alloc`, including the ones that mutations
    /// took from [`Heap`] after decoding.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::allocator::Tracking;
    /// use roaring_core::RoaringBitmap;
    ///
    /// let rb: RoaringBitmap = (0..4096).map(|x| x * 2).collect();
    /// let mut bytes = vec![];
    /// rb.serialize_into(&mut bytes).unwrap();
    ///
    /// let tracking = Tracking::new();
    /// let mut decoded = RoaringBitmap::deserialize_from_in(&bytes[..], &tracking).unwrap();
    /// decoded.insert(1);
    /// decoded.release_in(&tracking);
    /// assert_eq!(tracking.live_words(), 0);
    /// ```
    pub fn release_in<A: Allocator>(self, alloc: &A) {
        release_containers(self.containers, alloc);
    }

    fn deserialize_from_impl<R, A>(
        mut decoder: Decoder<R>,
        alloc: &A,
        checked: bool,
    ) -> Result<RoaringBitmap, DecodeError>
    where
        R: io::Read,
        A: Allocator,
    {
        let result = decode(&mut decoder, alloc, checked);
        if let Err(error) = &result {
            debug!(%error, checked, "rejected serialized bitmap");
        }
        result
    }
}

/// Reads little-endian values, keeping track of the bytes left when decoding a slice.
struct Decoder<R> {
    reader: R,
    remaining: Option<u64>,
}

impl<R: io::Read> Decoder<R> {
    /// Claims `needed` bytes of the input, failing if a slice has fewer left.
    fn reserve(&mut self, needed: u64) -> Result<(), DecodeError> {
        if let Some(remaining) = &mut self.remaining {
            if needed > *remaining {
                return Err(DecodeError::Truncated { needed, remaining: *remaining });
            }
            *remaining -= needed;
        }
        Ok(())
    }

    /// Reads bytes that were already reserved.
    fn fill(&mut self, buf: &mut [u8]) -> Result<(), DecodeError> {
        Ok(self.reader.read_exact(buf)?)
    }

    fn read_u16(&mut self) -> Result<u16, DecodeError> {
        self.reserve(2)?;
        Ok(self.reader.read_u16::<LittleEndian>()?)
    }

    fn read_u32(&mut self) -> Result<u32, DecodeError> {
        self.reserve(4)?;
        Ok(self.reader.read_u32::<LittleEndian>()?)
    }
}

fn decode<R, A>(
    decoder: &mut Decoder<R>,
    alloc: &A,
    checked: bool,
) -> Result<RoaringBitmap, DecodeError>
where
    R: io::Read,
    A: Allocator,
{
    let header = read_header(decoder)?;
    let size = header.containers;

    let mut run_flags = vec![0u8; header.run_flags_bytes()];
    decoder.reserve(run_flags.len() as u64)?;
    decoder.fill(&mut run_flags)?;

    decoder.reserve((size * DESCRIPTION_BYTES) as u64)?;
    let mut descriptions = vec![0u8; size * DESCRIPTION_BYTES];
    decoder.fill(&mut descriptions)?;
    let mut descriptions = &descriptions[..];

    // offsets only serve random access, payloads follow each other anyway
    if header.has_offsets() {
        for _ in 0..size {
            decoder.read_u32()?;
        }
    }

    let mut containers: Vec<Container> = alloc.allocate_vec(size);
    let mut last_key = None::<u16>;
    for index in 0..size {
        let key = descriptions.read_u16::<LittleEndian>()?;
        let cardinality = u64::from(descriptions.read_u16::<LittleEndian>()?) + 1;
        let is_run = run_flags.get(index / 8).is_some_and(|flags| flags & (1 << (index % 8)) != 0);

        let store = match last_key.replace(key) {
            Some(last_key) if key <= last_key => Err(DecodeError::UnsortedKeys { index }),
            _ if is_run => read_runs(decoder, alloc, key, cardinality, checked),
            _ if cardinality <= ARRAY_LIMIT => {
                read_array(decoder, alloc, key, cardinality, checked)
            }
            _ => read_bitmap(decoder, alloc, key, cardinality, checked),
        };

        match store {
            Ok(store) => containers.push(Container { key, store }),
            Err(error) => {
                release_containers(containers, alloc);
                return Err(error);
            }
        }
    }

    Ok(RoaringBitmap { containers })
}

fn read_runs<R, A>(
    decoder: &mut Decoder<R>,
    alloc: &A,
    key: u16,
    cardinality: u64,
    checked: bool,
) -> Result<Store, DecodeError>
where
    R: io::Read,
    A: Allocator,
{
    let runs = decoder.read_u16()?;
    if runs == 0 {
        return Err(DecodeError::ZeroRuns { key });
    }
    if runs > MAX_RUNS {
        return Err(DecodeError::TooManyRuns { key, runs });
    }
    decoder.reserve(u64::from(runs) * RUN_ELEMENT_BYTES)?;

    let mut intervals: Vec<Interval> = alloc.allocate_vec(usize::from(runs));
    let decoded = read_intervals(decoder, &mut intervals, key, runs).and_then(|()| {
        if checked {
            check_runs(&intervals).map_err(|source| DecodeError::InvalidRuns { key, source })?;
            let actual = intervals.iter().map(Interval::run_len).sum();
            if actual != cardinality {
                return Err(DecodeError::CardinalityMismatch { key, expected: cardinality, actual });
            }
        }
        Ok(())
    });

    match decoded {
        Ok(()) => Ok(Store::Run(IntervalStore::from_vec_raw(intervals))),
        Err(error) => {
            alloc.release_vec(intervals);
            Err(error)
        }
    }
}

fn read_intervals<R: io::Read>(
    decoder: &mut Decoder<R>,
    intervals: &mut Vec<Interval>,
    key: u16,
    runs: u16,
) -> Result<(), DecodeError> {
    for _ in 0..runs {
        let start = decoder.reader.read_u16::<LittleEndian>()?;
        let len = decoder.reader.read_u16::<LittleEndian>()?;
        let end = start.checked_add(len).ok_or(DecodeError::RunOverflow { key })?;
        intervals.push(Interval::new(start, end));
    }
    Ok(())
}

fn read_array<R, A>(
    decoder: &mut Decoder<R>,
    alloc: &A,
    key: u16,
    cardinality: u64,
    checked: bool,
) -> Result<Store, DecodeError>
where
    R: io::Read,
    A: Allocator,
{
    decoder.reserve(cardinality * ARRAY_ELEMENT_BYTES)?;

    let mut values: Vec<u16> = alloc.allocate_vec(cardinality as usize);
    values.resize(cardinality as usize, 0);
    let decoded = decoder.fill(cast_slice_mut(&mut values)).and_then(|()| {
        values.iter_mut().for_each(|n| *n = u16::from_le(*n));
        if checked {
            check_sorted(&values).map_err(|source| DecodeError::InvalidArray { key, source })?;
        }
        Ok(())
    });

    match decoded {
        Ok(()) => Ok(Store::Array(ArrayStore::from_vec_raw(values))),
        Err(error) => {
            alloc.release_vec(values);
            Err(error)
        }
    }
}

fn read_bitmap<R, A>(
    decoder: &mut Decoder<R>,
    alloc: &A,
    key: u16,
    cardinality: u64,
    checked: bool,
) -> Result<Store, DecodeError>
where
    R: io::Read,
    A: Allocator,
{
    decoder.reserve(BITMAP_BYTES)?;

    let mut words = alloc.allocate_words();
    let decoded = decoder.fill(cast_slice_mut(&mut words[..])).and_then(|()| {
        words.iter_mut().for_each(|n| *n = u64::from_le(*n));
        let actual = popcount(&words);
        if checked && actual != cardinality {
            return Err(DecodeError::CardinalityMismatch { key, expected: cardinality, actual });
        }
        Ok(())
    });

    match decoded {
        Ok(()) => Ok(Store::Bitmap(BitmapStore::from_words(words))),
        Err(error) => {
            alloc.release_words(words);
            Err(error)
        }
    }
}

fn release_containers<A: Allocator>(mut containers: Vec<Container>, alloc: &A) {
    for container in containers.drain(..) {
        match container.store {
            Store::Array(values) => alloc.release_vec(values.into_vec()),
            Store::Bitmap(bits) => alloc.release_words(bits.into_words()),
            Store::Run(runs) => alloc.release_vec(runs.into_intervals()),
        }
    }
    alloc.release_vec(containers);
}

fn read_header<R: io::Read>(decoder: &mut Decoder<R>) -> Result<Header, DecodeError> {
    let cookie = decoder.read_u32()?;
    if cookie == SERIAL_COOKIE_NO_RUNCONTAINER {
        let containers = u64::from(decoder.read_u32()?);
        if containers > MAX_CONTAINERS {
            return Err(DecodeError::TooManyContainers(containers));
        }
        Ok(Header { containers: containers as usize, runs: false })
    } else if cookie as u16 == SERIAL_COOKIE {
        Ok(Header { containers: (cookie >> 16) as usize + 1, runs: true })
    } else {
        Err(DecodeError::UnknownCookie(cookie))
    }
}

fn write_store<W: io::Write>(writer: &mut W, store: &Store) -> io::Result<()> {
    match store {
        Store::Array(values) => {
            values.iter().try_for_each(|&value| writer.write_u16::<LittleEndian>(value))
        }
        Store::Bitmap(bits) => {
            bits.as_array().iter().try_for_each(|&word| writer.write_u64::<LittleEndian>(word))
        }
        Store::Run(runs) => {
            writer.write_u16::<LittleEndian>(runs.run_amount() as u16)?;
            runs.intervals().iter().try_for_each(|run| {
                writer.write_u16::<LittleEndian>(run.start())?;
                writer.write_u16::<LittleEndian>(run.end() - run.start())
            })
        }
    }
}
