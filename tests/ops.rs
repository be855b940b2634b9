use proptest::collection::btree_set;
use proptest::prelude::*;

use roaring_core::{RangeError, RoaringBitmap};

/// Checks every owned and borrowed spelling of an operator against `expected`.
macro_rules! check_spellings {
    ($lhs:expr, $rhs:expr, $op:tt, $op_assign:tt, $expected:expr) => {{
        let (lhs, rhs, expected): (RoaringBitmap, RoaringBitmap, RoaringBitmap) =
            ($lhs, $rhs, $expected);
        assert_eq!(&lhs $op &rhs, expected);
        assert_eq!(&lhs $op rhs.clone(), expected);
        assert_eq!(lhs.clone() $op &rhs, expected);
        assert_eq!(lhs.clone() $op rhs.clone(), expected);

        let mut by_ref = lhs.clone();
        by_ref $op_assign &rhs;
        let mut by_value = lhs;
        by_value $op_assign rhs;
        assert_eq!(by_ref, expected);
        assert_eq!(by_value, expected);
    }};
}

#[test]
fn operators_on_small_sets() {
    let low = || RoaringBitmap::from_iter(1..4);
    let high = || RoaringBitmap::from_iter(3..6);

    check_spellings!(low(), high(), |, |=, RoaringBitmap::from_iter(1..6));
    check_spellings!(low(), high(), &, &=, RoaringBitmap::from([3]));
    check_spellings!(low(), high(), -, -=, RoaringBitmap::from([1, 2]));
    check_spellings!(low(), high(), ^, ^=, RoaringBitmap::from([1, 2, 4, 5]));

    assert_eq!(low().union_len(&high()), 5);
    assert_eq!(low().intersection_len(&high()), 1);
    assert_eq!(low().difference_len(&high()), 2);
    assert_eq!(low().symmetric_difference_len(&high()), 4);
}

#[test]
fn difference_across_the_array_limit() {
    let lhs = RoaringBitmap::from_iter(1..4000);
    let rhs = RoaringBitmap::from_iter(3..5000);
    check_spellings!(lhs, rhs, -, -=, RoaringBitmap::from([1, 2]));
}

#[test]
fn difference_keeps_zero() {
    let mut a = RoaringBitmap::from([0, 35, 80, 104, 138, 214, 235, 258]);
    a -= RoaringBitmap::from([9, 35, 42, 51, 111, 134, 231, 239]);
    assert!(a.iter().eq([0, 80, 104, 138, 214, 235, 258]));
}

#[test]
fn xor_with_itself_is_empty() {
    let mut a = RoaringBitmap::from_iter((0..100_000).step_by(7));
    a ^= a.clone();
    assert!(a.is_empty());
    assert_eq!(a.statistics().n_containers, 0);
}

#[test]
fn results_take_the_smallest_representation() {
    let dense = (0..10_000).collect::<RoaringBitmap>();
    let sparse = (5000..5010).collect::<RoaringBitmap>();

    // an intersection that shrinks below the array limit becomes an array
    let and = &dense & &sparse;
    assert_eq!(and.statistics().n_array_containers, 1);

    // a difference leaving more than the array limit stays a bitmap
    let sub = &dense - &sparse;
    assert_eq!(sub.len(), 9990);
    assert_eq!(sub.statistics().n_array_containers, 0);

    // a difference leaving 4096 values is an array again
    let sub = &dense - &(4096..10_000).collect::<RoaringBitmap>();
    assert_eq!(sub.len(), 4096);
    assert_eq!(sub.statistics().n_array_containers, 1);
}

#[test]
fn operations_on_runs() {
    let mut runs = RoaringBitmap::new();
    runs.insert_range(0..50_000).unwrap();
    runs.insert_range(1 << 20..(1 << 20) + 10).unwrap();
    runs.optimize();
    assert_eq!(runs.statistics().n_run_containers, 2);

    let sparse = RoaringBitmap::from([7, 49_999, 50_000, (1 << 20) + 3, u32::MAX]);

    assert_eq!((&runs & &sparse).iter().collect::<Vec<u32>>(), [7, 49_999, (1 << 20) + 3]);
    assert_eq!((&runs | &sparse).len(), 50_000 + 10 + 2);
    assert_eq!((&runs - &sparse).len(), 50_000 + 10 - 3);
    assert_eq!((&runs ^ &sparse).len(), 50_000 + 10 - 3 + 2);
    assert_eq!(runs.intersection_len(&sparse), 3);
}

#[test]
fn or_not_complements_below_the_bound() {
    let rb = RoaringBitmap::from([0, 10]);
    let result = rb.or_not(&RoaringBitmap::new(), 7).unwrap();
    assert_eq!(result, RoaringBitmap::from_iter((0..=6).chain([10])));

    let other = RoaringBitmap::from([1, 2, 3, 70_000]);
    let result = rb.or_not(&other, 70_002).unwrap();
    let expected: RoaringBitmap = [0].into_iter().chain(4..70_000).chain(70_001..70_002).collect();
    assert_eq!(result, expected);
    assert_eq!(rb.or_not_len(&other, 70_002), Ok(expected.len()));

    assert_eq!(rb.or_not(&other, 0).unwrap(), rb);
    assert_eq!(rb.or_not_len(&other, 0), Ok(2));
}

#[test]
fn or_not_covers_the_whole_domain() {
    let rb = RoaringBitmap::from([5]);
    let other = RoaringBitmap::from([5, 6, u32::MAX]);
    let result = rb.or_not(&other, 1 << 32).unwrap();
    assert_eq!(result.len(), (1 << 32) - 2);
    assert!(!result.contains(6));
    assert!(!result.contains(u32::MAX));
    assert_eq!(rb.or_not_len(&other, 1 << 32), Ok((1 << 32) - 2));

    let error = rb.or_not(&other, (1 << 32) + 1).unwrap_err();
    assert_eq!(error, RangeError::OutOfDomain { end: (1 << 32) + 1 });
    assert!(rb.or_not_len(&other, u64::MAX).is_err());
}

proptest! {
    #[test]
    fn lengths_match_the_materialized_results(
        a in btree_set(..=200_000_u32, ..=2000),
        b in btree_set(..=200_000_u32, ..=2000),
    ) {
        let a = RoaringBitmap::from_sorted_iter(a).unwrap();
        let b = RoaringBitmap::from_sorted_iter(b).unwrap();

        prop_assert_eq!(a.intersection_len(&b), (&a & &b).len());
        prop_assert_eq!(a.union_len(&b), (&a | &b).len());
        prop_assert_eq!(a.difference_len(&b), (&a - &b).len());
        prop_assert_eq!(a.symmetric_difference_len(&b), (&a ^ &b).len());
    }

    #[test]
    fn or_not_matches_its_definition(
        a in btree_set(..=200_000_u32, ..=2000),
        b in btree_set(..=200_000_u32, ..=2000),
        bound in ..=200_001_u64,
    ) {
        let a = RoaringBitmap::from_sorted_iter(a).unwrap();
        let b = RoaringBitmap::from_sorted_iter(b).unwrap();

        let mut below = RoaringBitmap::new();
        if bound > 0 {
            below.insert_range(0..=(bound - 1) as u32).unwrap();
        }
        let expected = &a | &(below - &b);

        prop_assert_eq!(a.or_not_len(&b, bound), Ok(expected.len()));
        prop_assert_eq!(a.or_not(&b, bound), Ok(expected));
    }
}
