use proptest::collection::btree_set;
use proptest::prelude::*;

use roaring_core::RoaringBitmap;

fn evens_across_two_containers() -> RoaringBitmap {
    (0..=0x2_0000).step_by(2).collect()
}

#[test]
fn skips_to_the_first_value_at_or_after_the_target() {
    let bitmap = RoaringBitmap::from([1, 2, 3, 4, 11, 12, 13, 14]);
    let mut iter = bitmap.iter();
    iter.advance_to(10);
    assert!(iter.by_ref().eq(11..=14));
    assert_eq!(iter.next(), None);
}

#[test]
fn never_moves_backwards() {
    let bitmap = RoaringBitmap::from([5, 10, 20]);
    let mut iter = bitmap.iter();
    iter.advance_to(10);
    assert_eq!(iter.next(), Some(10));
    iter.advance_to(5);
    assert_eq!(iter.next(), Some(20));
    assert_eq!(iter.next(), None);

    let mut iter = bitmap.iter();
    iter.advance_back_to(10);
    assert_eq!(iter.next_back(), Some(10));
    iter.advance_back_to(20);
    assert_eq!(iter.next_back(), Some(5));
    assert_eq!(iter.next_back(), None);
}

#[test]
fn into_missing_container() {
    let bitmap = RoaringBitmap::from([1, 0x2_0001, 0x2_0002]);
    let mut iter = bitmap.iter();
    iter.advance_to(0x1_0000);
    assert_eq!(iter.peek(), Some(0x2_0001));
    assert_eq!(iter.next(), Some(0x2_0001));
    assert_eq!(iter.next(), Some(0x2_0002));
    assert_eq!(iter.next(), None);

    let mut iter = bitmap.iter();
    iter.advance_back_to(0x1_FFFF);
    assert_eq!(iter.peek_back(), Some(1));
    assert_eq!(iter.next_back(), Some(1));
    assert_eq!(iter.next_back(), None);
}

#[test]
fn back_then_front() {
    let bitmap = RoaringBitmap::from([1, 2, 3, 4, 11, 12, 13, 14]);
    let mut iter = bitmap.iter();
    iter.advance_back_to(10);
    assert_eq!(iter.next(), Some(1));
    assert_eq!(iter.next(), Some(2));
    assert_eq!(iter.next_back(), Some(4));
    assert_eq!(iter.next_back(), Some(3));
    assert_eq!(iter.next(), None);
    assert_eq!(iter.next_back(), None);
}

#[test]
fn past_either_end() {
    let bitmap = RoaringBitmap::from([1, 2, 3, 100_000, 100_001]);

    let mut iter = bitmap.iter();
    iter.advance_to(100_002);
    assert_eq!(iter.size_hint(), (0, Some(0)));
    assert_eq!(iter.next(), None);

    let mut iter = bitmap.iter();
    iter.advance_back_to(0);
    assert_eq!(iter.size_hint(), (0, Some(0)));
    assert_eq!(iter.next_back(), None);
}

#[test]
fn size_hint_follows_the_skip() {
    let bitmap = RoaringBitmap::from([1, 2, 3, 100_000, 100_001]);
    let mut iter = bitmap.iter();
    iter.advance_to(3);
    for remaining in (0..=3).rev() {
        assert_eq!(iter.size_hint(), (remaining, Some(remaining)));
        iter.next();
    }

    let mut iter = bitmap.clone().into_iter();
    iter.advance_to(3);
    assert_eq!(iter.size_hint(), (3, Some(3)));
    assert!(iter.eq([3, 100_000, 100_001]));
}

#[test]
fn empty_bitmaps() {
    let bitmap = RoaringBitmap::new();
    let mut iter = bitmap.iter();
    iter.advance_to(31337);
    iter.advance_back_to(31337);
    assert_eq!(iter.size_hint(), (0, Some(0)));
    assert_eq!(iter.peek(), None);
    assert_eq!(iter.next(), None);

    let mut iter = RoaringBitmap::new().into_iter();
    iter.advance_to(31337);
    assert_eq!(iter.next(), None);
}

#[test]
fn with_a_consumed_tail() {
    let bitmap = RoaringBitmap::from([1, 2, 3, 100_000, 100_001]);
    let mut iter = bitmap.iter();
    assert_eq!(iter.next_back(), Some(100_001));
    iter.advance_to(100_000);
    assert_eq!(iter.size_hint(), (1, Some(1)));
    assert_eq!(iter.next(), Some(100_000));
    assert_eq!(iter.next(), None);
}

#[test]
fn to_the_last_value() {
    let bitmap = RoaringBitmap::from([u32::MAX]);
    let mut iter = bitmap.iter();
    iter.advance_to(u32::MAX);
    assert_eq!(iter.next(), Some(u32::MAX));
    assert_eq!(iter.next(), None);
}

#[test]
fn within_bitmap_containers() {
    let bitmap = evens_across_two_containers();
    let mut iter = bitmap.iter();
    iter.advance_to(0x1_0000 - 4);
    // odd, so the back stops on the even value below it
    iter.advance_back_to(0x1_0000 + 5);
    assert_eq!(iter.next(), Some(0x1_0000 - 4));
    assert_eq!(iter.next_back(), Some(0x1_0000 + 4));
    assert!(iter.eq([0x1_0000 - 2, 0x1_0000, 0x1_0000 + 2]));

    let mut iter = bitmap.iter();
    iter.advance_to(4);
    iter.advance_back_to(0x2_0000 - 4);
    assert!(iter.eq((4..=0x2_0000 - 4).step_by(2)));
}

#[test]
fn within_run_containers() {
    let mut bitmap = RoaringBitmap::new();
    bitmap.insert_range(100..200).unwrap();
    bitmap.insert_range(70_000..140_000).unwrap();
    bitmap.optimize();
    assert_eq!(bitmap.statistics().n_run_containers, 3);

    let mut iter = bitmap.iter();
    iter.advance_to(150);
    iter.advance_back_to(70_010);
    assert!(iter.eq((150..200).chain(70_000..=70_010)));

    let mut iter = bitmap.into_iter();
    iter.advance_to(200);
    assert_eq!(iter.next(), Some(70_000));
    iter.advance_back_to(131_072);
    assert_eq!(iter.next_back(), Some(131_072));
    assert_eq!(iter.next_back(), Some(131_071));
}

proptest! {
    #[test]
    fn matches_btree_ranges(
        values in btree_set(..=262_143_u32, ..=1000),
        front in ..=262_143_u32,
        back in ..=262_143_u32,
    ) {
        let bitmap = RoaringBitmap::from_sorted_iter(values.iter().copied()).unwrap();
        let mut iter = bitmap.iter();
        iter.advance_to(front);
        iter.advance_back_to(back);

        let expected: Vec<u32> = values
            .iter()
            .copied()
            .filter(|&value| value >= front && value <= back)
            .collect();
        prop_assert_eq!(iter.len(), expected.len());
        prop_assert_eq!(iter.collect::<Vec<u32>>(), expected);
    }
}
