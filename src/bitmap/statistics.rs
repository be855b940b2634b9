use crate::RoaringBitmap;

use super::store::Store;

/// How the values of a [`RoaringBitmap`] are spread over the three container representations.
///
/// Byte counts are the sizes of the serialized payloads: `2` bytes per array value, `8192`
/// bytes per bitmap and `2 + 4` bytes per run.
#[derive(Clone, Copy, PartialEq, Debug)]
#[non_exhaustive]
pub struct Statistics {
    /// Containers of any kind.
    pub n_containers: u32,
    /// Containers stored as sorted arrays.
    pub n_array_containers: u32,
    /// Containers stored as runs.
    pub n_run_containers: u32,
    /// Containers stored as bitmaps.
    pub n_bitset_containers: u32,
    /// Values held by array containers.
    pub n_values_array_containers: u32,
    /// Values held by run containers.
    pub n_values_run_containers: u64,
    /// Values held by bitmap containers.
    pub n_values_bitset_containers: u64,
    /// Serialized bytes of the array containers.
    pub n_bytes_array_containers: u64,
    /// Serialized bytes of the run containers.
    pub n_bytes_run_containers: u64,
    /// Serialized bytes of the bitmap containers.
    pub n_bytes_bitset_containers: u64,
    /// The largest value, if any.
    pub max_value: Option<u32>,
    /// The smallest value, if any.
    pub min_value: Option<u32>,
    /// Values in the whole bitmap.
    pub cardinality: u64,
}

impl RoaringBitmap {
    /// Counts containers, values and payload bytes per representation.
    ///
    /// ```
    /// use roaring_core::RoaringBitmap;
    ///
    /// let mut bitmap: RoaringBitmap = (0..10).chain(70_000..80_000).collect();
    /// let statistics = bitmap.statistics();
    ///
    /// assert_eq!(statistics.n_containers, 2);
    /// assert_eq!((statistics.n_array_containers, statistics.n_bitset_containers), (1, 1));
    /// assert_eq!(statistics.n_values_array_containers, 10);
    /// assert_eq!(statistics.n_bytes_array_containers, 20);
    /// assert_eq!(statistics.n_bytes_bitset_containers, 8192);
    /// assert_eq!((statistics.min_value, statistics.max_value), (Some(0), Some(79_999)));
    /// assert_eq!(statistics.cardinality, 10_010);
    ///
    /// bitmap.optimize();
    /// let statistics = bitmap.statistics();
    /// assert_eq!(statistics.n_run_containers, 2);
    /// assert_eq!(statistics.n_values_run_containers, 10_010);
    /// assert_eq!(statistics.n_bytes_run_containers, 12);
    /// ```
    pub fn statistics(&self) -> Statistics {
        let mut statistics = Statistics {
            n_containers: 0,
            n_array_containers: 0,
            n_run_containers: 0,
            n_bitset_containers: 0,
            n_values_array_containers: 0,
            n_values_run_containers: 0,
            n_values_bitset_containers: 0,
            n_bytes_array_containers: 0,
            n_bytes_run_containers: 0,
            n_bytes_bitset_containers: 0,
            max_value: self.max(),
            min_value: self.min(),
            cardinality: 0,
        };

        for container in &self.containers {
            let store = &container.store;
            let (len, bytes) = (store.len(), store.byte_size());
            statistics.n_containers += 1;
            statistics.cardinality += len;
            match store {
                Store::Array(_) => {
                    statistics.n_array_containers += 1;
                    // at most 4096 values per array, 65536 containers
                    statistics.n_values_array_containers += len as u32;
                    statistics.n_bytes_array_containers += bytes;
                }
                Store::Bitmap(_) => {
                    statistics.n_bitset_containers += 1;
                    statistics.n_values_bitset_containers += len;
                    statistics.n_bytes_bitset_containers += bytes;
                }
                Store::Run(_) => {
                    statistics.n_run_containers += 1;
                    statistics.n_values_run_containers += len;
                    statistics.n_bytes_run_containers += bytes;
                }
            }
        }

        statistics
    }
}
