use std::borrow::Cow;
use std::convert::Infallible;
use std::mem;
use std::ops::{BitAndAssign, BitOrAssign, SubAssign};

use crate::{MultiOps, RoaringBitmap};

use super::container::Container;
use super::store::Store;
use super::LazyUnion;

/// How many leading inputs an intersection reorders, smallest first.
const HEAD: usize = 16;

/// A bitmap taking part in a many-way operation, owned or borrowed.
trait Operand<'a>: Sized {
    fn n_containers(&self) -> usize;

    fn into_owned(self) -> RoaringBitmap;

    /// Xors the containers into `acc`, borrowing them while they are left untouched.
    fn xor_into(self, acc: &mut Vec<Cow<'a, Container>>);
}

impl<'a> Operand<'a> for RoaringBitmap {
    fn n_containers(&self) -> usize {
        self.containers.len()
    }

    fn into_owned(self) -> RoaringBitmap {
        self
    }

    fn xor_into(self, acc: &mut Vec<Cow<'a, Container>>) {
        xor_containers(acc, self.containers.into_iter().map(Cow::Owned));
    }
}

impl<'a> Operand<'a> for &'a RoaringBitmap {
    fn n_containers(&self) -> usize {
        self.containers.len()
    }

    fn into_owned(self) -> RoaringBitmap {
        self.clone()
    }

    fn xor_into(self, acc: &mut Vec<Cow<'a, Container>>) {
        xor_containers(acc, self.containers.iter().map(Cow::Borrowed));
    }
}

macro_rules! multi_ops {
    ([$($lt:lifetime)?] $item:ty) => {
        impl<$($lt,)? I> MultiOps<$item> for I
        where
            I: IntoIterator<Item = $item>,
        {
            type Output = RoaringBitmap;

            fn union(self) -> Self::Output {
                infallible(try_union(self.into_iter().map(Ok)))
            }

            fn intersection(self) -> Self::Output {
                infallible(try_intersection(self.into_iter().map(Ok)))
            }

            fn difference(self) -> Self::Output {
                infallible(try_difference(self.into_iter().map(Ok)))
            }

            fn symmetric_difference(self) -> Self::Output {
                infallible(try_symmetric_difference(self.into_iter().map(Ok)))
            }
        }

        impl<$($lt,)? I, E> MultiOps<Result<$item, E>> for I
        where
            I: IntoIterator<Item = Result<$item, E>>,
        {
            type Output = Result<RoaringBitmap, E>;

            fn union(self) -> Self::Output {
                try_union(self)
            }

            fn intersection(self) -> Self::Output {
                try_intersection(self)
            }

            fn difference(self) -> Self::Output {
                try_difference(self)
            }

            fn symmetric_difference(self) -> Self::Output {
                try_symmetric_difference(self)
            }
        }
    };
}

multi_ops!([] RoaringBitmap);
multi_ops!(['a] &'a RoaringBitmap);

fn infallible(result: Result<RoaringBitmap, Infallible>) -> RoaringBitmap {
    match result {
        Ok(bitmap) => bitmap,
        Err(never) => match never {},
    }
}

/// No container is counted before the last input was merged.
fn try_union<B, E>(inputs: impl IntoIterator<Item = Result<B, E>>) -> Result<RoaringBitmap, E>
where
    LazyUnion: BitOrAssign<B>,
{
    let mut union = LazyUnion::new();
    for input in inputs {
        union |= input?;
    }
    Ok(union.repair())
}

fn try_intersection<'a, B, E>(
    inputs: impl IntoIterator<Item = Result<B, E>>,
) -> Result<RoaringBitmap, E>
where
    B: Operand<'a>,
    RoaringBitmap: BitAndAssign<B>,
{
    let mut inputs = inputs.into_iter();
    let mut head = inputs.by_ref().take(HEAD).collect::<Result<Vec<B>, E>>()?;
    head.sort_unstable_by_key(|input| input.n_containers());

    let mut head = head.into_iter();
    let Some(first) = head.next() else {
        return Ok(RoaringBitmap::new());
    };
    let mut result = first.into_owned();
    for input in head.map(Ok).chain(inputs) {
        if result.is_empty() {
            break;
        }
        result &= input?;
    }
    Ok(result)
}

fn try_difference<'a, B, E>(
    inputs: impl IntoIterator<Item = Result<B, E>>,
) -> Result<RoaringBitmap, E>
where
    B: Operand<'a>,
    RoaringBitmap: SubAssign<B>,
{
    let mut inputs = inputs.into_iter();
    let mut result = match inputs.next().transpose()? {
        Some(first) => first.into_owned(),
        None => return Ok(RoaringBitmap::new()),
    };
    for input in inputs {
        if result.is_empty() {
            break;
        }
        result -= input?;
    }
    Ok(result)
}

fn try_symmetric_difference<'a, B, E>(
    inputs: impl IntoIterator<Item = Result<B, E>>,
) -> Result<RoaringBitmap, E>
where
    B: Operand<'a>,
{
    let mut acc = Vec::new();
    for input in inputs {
        input?.xor_into(&mut acc);
    }

    let containers = acc
        .into_iter()
        .filter(|container| !container.is_empty())
        .map(|container| {
            let mut container = container.into_owned();
            container.ensure_correct_store();
            container
        })
        .collect();
    Ok(RoaringBitmap { containers })
}

fn xor_containers<'a>(
    acc: &mut Vec<Cow<'a, Container>>,
    containers: impl IntoIterator<Item = Cow<'a, Container>>,
) {
    for rhs in containers {
        let key = rhs.key;
        match acc.binary_search_by_key(&key, |c| c.key) {
            Err(loc) => acc.insert(loc, rhs),
            Ok(loc) => {
                let lhs = mem::replace(&mut acc[loc], Cow::Owned(Container::new(key)));
                let (dense, sparse) =
                    if is_bitmap(&rhs) && !is_bitmap(&lhs) { (rhs, lhs) } else { (lhs, rhs) };
                let mut store = accumulator(dense);
                store ^= &sparse.store;
                acc[loc] = Cow::Owned(Container { key, store });
            }
        }
    }
}

fn is_bitmap(container: &Container) -> bool {
    matches!(container.store, Store::Bitmap(_))
}

/// The store a xor writes into. Arrays are widened to bitmaps, anything else is taken as is.
fn accumulator(container: Cow<'_, Container>) -> Store {
    if let Store::Array(array) = &container.store {
        return Store::Bitmap(array.to_bitmap_store());
    }
    container.into_owned().store
}

#[cfg(test)]
mod test {
    use crate::{MultiOps, RoaringBitmap};
    use proptest::collection::vec;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn multi_ops_match_folds(bitmaps in vec(RoaringBitmap::arbitrary(), 1..6)) {
            let first = bitmaps[0].clone();
            let rest = &bitmaps[1..];

            let union = rest.iter().fold(first.clone(), |acc, b| acc | b);
            let intersection = rest.iter().fold(first.clone(), |acc, b| acc & b);
            let difference = rest.iter().fold(first.clone(), |acc, b| acc - b);
            let symmetric_difference = rest.iter().fold(first, |acc, b| acc ^ b);

            prop_assert_eq!(&bitmaps.iter().union(), &union);
            prop_assert_eq!(&bitmaps.iter().intersection(), &intersection);
            prop_assert_eq!(&bitmaps.iter().difference(), &difference);
            prop_assert_eq!(&bitmaps.iter().symmetric_difference(), &symmetric_difference);

            prop_assert_eq!(bitmaps.clone().union(), union);
            prop_assert_eq!(bitmaps.clone().intersection(), intersection);
            prop_assert_eq!(bitmaps.clone().difference(), difference);
            prop_assert_eq!(bitmaps.symmetric_difference(), symmetric_difference);
        }
    }

    #[test]
    fn empty_inputs_give_empty_bitmaps() {
        let none: Vec<RoaringBitmap> = Vec::new();
        assert!(none.iter().union().is_empty());
        assert!(none.iter().intersection().is_empty());
        assert!(none.iter().difference().is_empty());
        assert!(none.symmetric_difference().is_empty());
    }

    #[test]
    fn first_error_is_returned() {
        let bitmaps: Vec<Result<RoaringBitmap, &str>> = vec![
            Ok(RoaringBitmap::from([1, 2, 3])),
            Err("first"),
            Ok(RoaringBitmap::from([4])),
            Err("second"),
        ];
        assert_eq!(bitmaps.clone().union(), Err("first"));
        assert_eq!(bitmaps.clone().intersection(), Err("first"));
        assert_eq!(bitmaps.clone().difference(), Err("first"));
        assert_eq!(bitmaps.symmetric_difference(), Err("first"));

        let a = RoaringBitmap::from([1, 2, 3]);
        let b = RoaringBitmap::from([3, 4]);
        let borrowed: [Result<&RoaringBitmap, ()>; 2] = [Ok(&a), Ok(&b)];
        assert_eq!(borrowed.union(), Ok(RoaringBitmap::from([1, 2, 3, 4])));
    }

    #[test]
    fn xor_widens_shared_arrays() {
        let a = RoaringBitmap::from([1, 2, 3]);
        let b = RoaringBitmap::from([3, 4]);
        let c = RoaringBitmap::from([4, 70_000]);
        let xor = [&a, &b, &c].symmetric_difference();
        assert_eq!(xor, RoaringBitmap::from([1, 2, 70_000]));
        assert_eq!(xor.statistics().n_array_containers, 2);
    }
}
