use proptest::collection::btree_set;
use proptest::prelude::*;

use roaring_core::RoaringBitmap;

#[test]
fn smoke() {
    let mut bitmap = RoaringBitmap::new();
    assert_eq!(bitmap.len(), 0);
    assert!(bitmap.is_empty());
    bitmap.remove(0);
    assert!(bitmap.is_empty());

    assert!(bitmap.insert(1));
    assert!(!bitmap.insert(1));
    assert!(bitmap.contains(1));
    assert_eq!(bitmap.len(), 1);
    assert!(!bitmap.is_empty());

    bitmap.insert(u32::MAX - 2);
    assert!(bitmap.contains(u32::MAX - 2));
    assert_eq!(bitmap.len(), 2);

    bitmap.insert(u32::MAX);
    assert!(bitmap.contains(u32::MAX));
    assert_eq!(bitmap.len(), 3);

    bitmap.insert(2);
    assert_eq!(bitmap.len(), 4);

    assert!(bitmap.remove(2));
    assert!(!bitmap.remove(2));
    assert!(!bitmap.contains(2));
    assert_eq!(bitmap.len(), 3);

    assert!(!bitmap.contains(0));
    assert!(bitmap.contains(1));
    assert!(!bitmap.contains(100));
    assert!(!bitmap.contains(u32::MAX - 1));

    bitmap.clear();
    assert!(bitmap.is_empty());
}

#[test]
fn array_bitmap_threshold() {
    let mut bitmap: RoaringBitmap = (0..4096).collect();
    let statistics = bitmap.statistics();
    assert_eq!(statistics.n_array_containers, 1);
    assert_eq!(statistics.n_bytes_array_containers, 8192);

    bitmap.insert(4096);
    let statistics = bitmap.statistics();
    assert_eq!(statistics.n_array_containers, 0);
    assert_eq!(statistics.n_bitset_containers, 1);
    assert_eq!(statistics.n_bytes_bitset_containers, 8192);
    assert_eq!(statistics.cardinality, 4097);

    bitmap.remove(17);
    let statistics = bitmap.statistics();
    assert_eq!(statistics.n_array_containers, 1);
    assert_eq!(statistics.n_bitset_containers, 0);
    assert_eq!(statistics.cardinality, 4096);
    assert!(!bitmap.contains(17));
}

#[test]
fn empty_containers_are_dropped() {
    let mut bitmap = RoaringBitmap::from([1, 70_000, 1 << 30]);
    assert_eq!(bitmap.statistics().n_containers, 3);

    bitmap.remove(70_000);
    assert_eq!(bitmap.statistics().n_containers, 2);

    bitmap.remove_range(0..=1).unwrap();
    assert_eq!(bitmap.statistics().n_containers, 1);

    let other = bitmap.clone();
    bitmap -= &other;
    assert!(bitmap.is_empty());
    assert_eq!(bitmap.statistics().n_containers, 0);
}

#[test]
fn optimize_picks_the_smallest_layout() {
    let mut bitmap = RoaringBitmap::new();
    bitmap.extend(0..50_000);
    bitmap.extend((100_000..110_000).step_by(7));
    bitmap.extend([200_000, 200_002]);

    let before = bitmap.statistics();
    assert_eq!(before.n_bitset_containers, 1);
    assert_eq!(before.n_run_containers, 0);

    assert!(bitmap.optimize());
    let after = bitmap.statistics();
    // 0..50_000 becomes one run, the scattered containers stay arrays
    assert_eq!(after.n_run_containers, 1);
    assert_eq!(after.n_bytes_run_containers, 6);
    assert_eq!(after.n_array_containers, before.n_array_containers);
    assert_eq!(after.cardinality, before.cardinality);

    assert!(!bitmap.optimize());
    assert!(bitmap.remove_run_compression());
    assert_eq!(bitmap.statistics(), before);
}

#[test]
fn full_set() {
    let full = RoaringBitmap::full();
    assert!(full.is_full());
    assert_eq!(full.len(), 1 << 32);
    assert_eq!(full.min(), Some(0));
    assert_eq!(full.max(), Some(u32::MAX));
    assert_eq!(full.statistics().n_run_containers, 65_536);

    let mut almost = full.clone();
    almost.remove(12_345);
    assert!(!almost.is_full());
    assert_eq!(almost.next_absent_value(0), Some(12_345));
}

#[test]
fn remove_smallest_and_biggest() {
    let mut bitmap: RoaringBitmap = (0..10).chain(70_000..70_010).collect();
    bitmap.remove_smallest(12);
    assert!(bitmap.iter().eq(70_002..70_010));

    bitmap.remove_biggest(3);
    assert!(bitmap.iter().eq(70_002..70_007));

    bitmap.remove_biggest(100);
    assert!(bitmap.is_empty());
}

#[test]
fn debug_formatting() {
    assert_eq!(format!("{:?}", RoaringBitmap::new()), "RoaringBitmap<[]>");
    assert_eq!(format!("{:?}", RoaringBitmap::from([3, 1])), "RoaringBitmap<[1, 3]>");
}

proptest! {
    #[test]
    fn optimize_never_grows_the_serialization(values in btree_set(..=300_000_u32, ..=20_000)) {
        let plain = RoaringBitmap::from_sorted_iter(values).unwrap();
        let mut optimized = plain.clone();
        optimized.optimize();

        prop_assert!(optimized.serialized_size() <= plain.serialized_size());
        prop_assert_eq!(&optimized, &plain);

        let once = optimized.statistics();
        prop_assert!(!optimized.optimize());
        prop_assert_eq!(optimized.statistics(), once);
    }

    #[test]
    fn algebra_ignores_representations(
        a in btree_set(..=300_000_u32, ..=10_000),
        b in btree_set(..=300_000_u32, ..=10_000),
    ) {
        let plain_a = RoaringBitmap::from_sorted_iter(a.iter().copied()).unwrap();
        let plain_b = RoaringBitmap::from_sorted_iter(b.iter().copied()).unwrap();
        let mut runs_a = plain_a.clone();
        runs_a.optimize();
        let mut runs_b = plain_b.clone();
        runs_b.optimize();

        let and: RoaringBitmap = a.intersection(&b).copied().collect();
        let or: RoaringBitmap = a.union(&b).copied().collect();
        let xor: RoaringBitmap = a.symmetric_difference(&b).copied().collect();
        let sub: RoaringBitmap = a.difference(&b).copied().collect();

        let pairs = [(&plain_a, &plain_b), (&runs_a, &plain_b), (&plain_a, &runs_b)];
        for (x, y) in pairs.into_iter().chain([(&runs_a, &runs_b)]) {
            prop_assert_eq!(x & y, and.clone());
            prop_assert_eq!(x | y, or.clone());
            prop_assert_eq!(x ^ y, xor.clone());
            prop_assert_eq!(x - y, sub.clone());
        }
    }
}
