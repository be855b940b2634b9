use std::mem;
use std::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, BitXor, BitXorAssign, Sub, SubAssign};

use crate::bitmap::cmp::{merge, Keyed, Pair};
use crate::bitmap::container::Container;
use crate::bitmap::util;
use crate::{RangeError, RoaringBitmap};

/// Merges two container sequences. `step` decides what each key turns into, empty results
/// are dropped.
fn merged<L, R, F>(
    lhs: impl IntoIterator<Item = L>,
    rhs: impl IntoIterator<Item = R>,
    mut step: F,
) -> Vec<Container>
where
    L: Keyed,
    R: Keyed,
    F: FnMut(Pair<L, R>) -> Option<Container>,
{
    merge(lhs, rhs).filter_map(|pair| step(pair).filter(|c| !c.is_empty())).collect()
}

impl RoaringBitmap {
    /// The cardinality of `self & other`, without building it.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let rb1: RoaringBitmap = (1..4).collect();
    /// let rb2: RoaringBitmap = (3..5).collect();
    /// assert_eq!(rb1.intersection_len(&rb2), (rb1 & rb2).len());
    /// ```
    pub fn intersection_len(&self, other: &RoaringBitmap) -> u64 {
        merge(&self.containers, &other.containers)
            .map(|pair| match pair {
                Pair::Both(lhs, rhs) => lhs.intersection_len(rhs),
                Pair::Left(_) | Pair::Right(_) => 0,
            })
            .sum()
    }

    /// The cardinality of `self | other`, without building it.
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let rb1: RoaringBitmap = (1..4).collect();
    /// let rb2: RoaringBitmap = (3..5).collect();
    /// assert_eq!(rb1.union_len(&rb2), (rb1 | rb2).len());
    /// ```
    pub fn union_len(&self, other: &RoaringBitmap) -> u64 {
        self.len() + other.len() - self.intersection_len(other)
    }

    /// The cardinality of `self - other`, without building it.
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let rb1: RoaringBitmap = (1..4).collect();
    /// let rb2: RoaringBitmap = (3..5).collect();
    /// assert_eq!(rb1.difference_len(&rb2), (rb1 - rb2).len());
    /// ```
    pub fn difference_len(&self, other: &RoaringBitmap) -> u64 {
        self.len() - self.intersection_len(other)
    }

    /// The cardinality of `self ^ other`, without building it.
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let rb1: RoaringBitmap = (1..4).collect();
    /// let rb2: RoaringBitmap = (3..5).collect();
    /// assert_eq!(rb1.symmetric_difference_len(&rb2), (rb1 ^ rb2).len());
    /// ```
    pub fn symmetric_difference_len(&self, other: &RoaringBitmap) -> u64 {
        self.len() + other.len() - 2 * self.intersection_len(other)
    }

    /// Computes the union of this set with the values below `bound` that are absent from `other`.
    ///
    /// The result is `self ∪ ([0, bound) \ other)`, the complement of `other` is never
    /// materialized on its own. `bound` may be up to 2<sup>32</sup>.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::{RangeError, RoaringBitmap};
    ///
    /// let rb = RoaringBitmap::from([0, 10]);
    /// let result = rb.or_not(&RoaringBitmap::new(), 7).unwrap();
    /// assert_eq!(result, RoaringBitmap::from_iter((0..=6).chain([10])));
    ///
    /// let out_of_domain = rb.or_not(&RoaringBitmap::new(), (1 << 32) + 1);
    /// assert_eq!(out_of_domain, Err(RangeError::OutOfDomain { end: (1 << 32) + 1 }));
    /// ```
    pub fn or_not(&self, other: &RoaringBitmap, bound: u64) -> Result<RoaringBitmap, RangeError> {
        let (last_key, last_low) = match util::checked_exclusive_end(bound)? {
            Some(last) => util::split(last),
            None => return Ok(self.clone()),
        };

        let mut containers = Vec::with_capacity(usize::from(last_key) + 1);
        let mut lhs = self.containers.iter().peekable();
        let mut rhs = other.containers.iter().peekable();
        for key in 0..=last_key {
            let last = if key == last_key { last_low } else { u16::MAX };
            let own = lhs.next_if(|c| c.key == key);
            let excluded = rhs.next_if(|c| c.key == key);
            let container = match (own, excluded) {
                (Some(own), Some(excluded)) => own.or_not(excluded, last),
                (Some(own), None) => {
                    let mut container = own.clone();
                    container.insert_range(0..=last);
                    container
                }
                (None, Some(excluded)) => {
                    let mut container = Container::from_range(key, 0..=last);
                    container -= excluded;
                    container
                }
                (None, None) => Container::from_range(key, 0..=last),
            };
            if !container.is_empty() {
                containers.push(container);
            }
        }
        containers.extend(lhs.cloned());

        Ok(RoaringBitmap { containers })
    }

    /// Computes the len of [`RoaringBitmap::or_not`] without creating a new bitmap.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use roaring_core::RoaringBitmap;
    ///
    /// let rb1 = RoaringBitmap::from([0, 10, 70_000]);
    /// let rb2 = RoaringBitmap::from_iter(2..5);
    /// assert_eq!(rb1.or_not_len(&rb2, 20), Ok(rb1.or_not(&rb2, 20).unwrap().len()));
    /// ```
    pub fn or_not_len(&self, other: &RoaringBitmap, bound: u64) -> Result<u64, RangeError> {
        let Some(last) = util::checked_exclusive_end(bound)? else {
            return Ok(self.len());
        };
        let (last_key, last_low) = util::split(last);

        // every value of the window counts until a container says otherwise
        let mut len = u64::from(last) + 1;
        for pair in merge(&self.containers, &other.containers) {
            let key = match &pair {
                Pair::Left(own) | Pair::Both(own, _) => own.key,
                Pair::Right(excluded) => excluded.key,
            };
            if key > last_key {
                if let Pair::Left(own) | Pair::Both(own, _) = pair {
                    len += own.len();
                }
                continue;
            }
            let upto = if key == last_key { last_low } else { u16::MAX };
            let window = u64::from(upto) + 1;
            len = len - window
                + match pair {
                    Pair::Left(own) => own.len() + window - own.rank(upto),
                    Pair::Right(excluded) => window - excluded.rank(upto),
                    Pair::Both(own, excluded) => own.or_not_len(excluded, upto),
                };
        }
        Ok(len)
    }
}

/// Operators taking at least one side by value, derived from the assigning form and
/// from `&a op &b`.
macro_rules! by_value_ops {
    ($Op:ident::$op:ident, $OpAssign:ident::$op_assign:ident, $rhs_first:ident) => {
        impl $Op<RoaringBitmap> for RoaringBitmap {
            type Output = RoaringBitmap;

            fn $op(mut self, rhs: RoaringBitmap) -> RoaringBitmap {
                $OpAssign::$op_assign(&mut self, rhs);
                self
            }
        }

        impl $Op<&RoaringBitmap> for RoaringBitmap {
            type Output = RoaringBitmap;

            fn $op(mut self, rhs: &RoaringBitmap) -> RoaringBitmap {
                $OpAssign::$op_assign(&mut self, rhs);
                self
            }
        }

        impl $Op<RoaringBitmap> for &RoaringBitmap {
            type Output = RoaringBitmap;

            fn $op(self, rhs: RoaringBitmap) -> RoaringBitmap {
                by_value_ops!(@owned_rhs $rhs_first, $Op::$op, self, rhs)
            }
        }
    };
    // symmetric operators reuse the owned right hand side
    (@owned_rhs commutative, $Op:ident::$op:ident, $lhs:ident, $rhs:ident) => {
        $Op::$op($rhs, $lhs)
    };
    (@owned_rhs ordered, $Op:ident::$op:ident, $lhs:ident, $rhs:ident) => {
        $Op::$op($lhs, &$rhs)
    };
}

by_value_ops!(BitOr::bitor, BitOrAssign::bitor_assign, commutative);
by_value_ops!(BitAnd::bitand, BitAndAssign::bitand_assign, commutative);
by_value_ops!(Sub::sub, SubAssign::sub_assign, ordered);
by_value_ops!(BitXor::bitxor, BitXorAssign::bitxor_assign, commutative);

impl BitOr<&RoaringBitmap> for &RoaringBitmap {
    type Output = RoaringBitmap;

    /// The values of either set.
    fn bitor(self, rhs: &RoaringBitmap) -> RoaringBitmap {
        let containers = merged(&self.containers, &rhs.containers, |pair| match pair {
            Pair::Left(only) | Pair::Right(only) => Some(only.clone()),
            Pair::Both(lhs, rhs) => Some(lhs | rhs),
        });
        RoaringBitmap { containers }
    }
}

impl BitOrAssign<RoaringBitmap> for RoaringBitmap {
    fn bitor_assign(&mut self, mut rhs: RoaringBitmap) {
        // union into the side with more containers
        if self.containers.len() < rhs.containers.len() {
            mem::swap(self, &mut rhs);
        }
        let lhs = mem::take(&mut self.containers);
        self.containers = merged(lhs, rhs.containers, |pair| match pair {
            Pair::Left(only) | Pair::Right(only) => Some(only),
            Pair::Both(mut lhs, rhs) => {
                lhs |= rhs;
                Some(lhs)
            }
        });
    }
}

impl BitOrAssign<&RoaringBitmap> for RoaringBitmap {
    fn bitor_assign(&mut self, rhs: &RoaringBitmap) {
        let lhs = mem::take(&mut self.containers);
        self.containers = merged(lhs, &rhs.containers, |pair| match pair {
            Pair::Left(lhs) => Some(lhs),
            Pair::Right(rhs) => Some(rhs.clone()),
            Pair::Both(mut lhs, rhs) => {
                lhs |= rhs;
                Some(lhs)
            }
        });
    }
}

impl BitAnd<&RoaringBitmap> for &RoaringBitmap {
    type Output = RoaringBitmap;

    /// The values of both sets.
    fn bitand(self, rhs: &RoaringBitmap) -> RoaringBitmap {
        let containers = merged(&self.containers, &rhs.containers, |pair| match pair {
            Pair::Both(lhs, rhs) => Some(lhs & rhs),
            Pair::Left(_) | Pair::Right(_) => None,
        });
        RoaringBitmap { containers }
    }
}

impl BitAndAssign<RoaringBitmap> for RoaringBitmap {
    fn bitand_assign(&mut self, rhs: RoaringBitmap) {
        let lhs = mem::take(&mut self.containers);
        self.containers = merged(lhs, rhs.containers, |pair| match pair {
            Pair::Both(mut lhs, rhs) => {
                lhs &= rhs;
                Some(lhs)
            }
            Pair::Left(_) | Pair::Right(_) => None,
        });
    }
}

impl BitAndAssign<&RoaringBitmap> for RoaringBitmap {
    fn bitand_assign(&mut self, rhs: &RoaringBitmap) {
        let lhs = mem::take(&mut self.containers);
        self.containers = merged(lhs, &rhs.containers, |pair| match pair {
            Pair::Both(mut lhs, rhs) => {
                lhs &= rhs;
                Some(lhs)
            }
            Pair::Left(_) | Pair::Right(_) => None,
        });
    }
}

impl Sub<&RoaringBitmap> for &RoaringBitmap {
    type Output = RoaringBitmap;

    /// The values of `self` missing from `rhs`.
    fn sub(self, rhs: &RoaringBitmap) -> RoaringBitmap {
        let containers = merged(&self.containers, &rhs.containers, |pair| match pair {
            Pair::Left(lhs) => Some(lhs.clone()),
            Pair::Right(_) => None,
            Pair::Both(lhs, rhs) => Some(lhs - rhs),
        });
        RoaringBitmap { containers }
    }
}

impl SubAssign<RoaringBitmap> for RoaringBitmap {
    fn sub_assign(&mut self, rhs: RoaringBitmap) {
        SubAssign::sub_assign(self, &rhs)
    }
}

impl SubAssign<&RoaringBitmap> for RoaringBitmap {
    fn sub_assign(&mut self, rhs: &RoaringBitmap) {
        let lhs = mem::take(&mut self.containers);
        self.containers = merged(lhs, &rhs.containers, |pair| match pair {
            Pair::Left(lhs) => Some(lhs),
            Pair::Right(_) => None,
            Pair::Both(mut lhs, rhs) => {
                lhs -= rhs;
                Some(lhs)
            }
        });
    }
}

impl BitXor<&RoaringBitmap> for &RoaringBitmap {
    type Output = RoaringBitmap;

    /// The values of exactly one of the sets.
    fn bitxor(self, rhs: &RoaringBitmap) -> RoaringBitmap {
        let containers = merged(&self.containers, &rhs.containers, |pair| match pair {
            Pair::Left(only) | Pair::Right(only) => Some(only.clone()),
            Pair::Both(lhs, rhs) => Some(lhs ^ rhs),
        });
        RoaringBitmap { containers }
    }
}

impl BitXorAssign<RoaringBitmap> for RoaringBitmap {
    fn bitxor_assign(&mut self, rhs: RoaringBitmap) {
        let lhs = mem::take(&mut self.containers);
        self.containers = merged(lhs, rhs.containers, |pair| match pair {
            Pair::Left(only) | Pair::Right(only) => Some(only),
            Pair::Both(mut lhs, rhs) => {
                lhs ^= rhs;
                Some(lhs)
            }
        });
    }
}

impl BitXorAssign<&RoaringBitmap> for RoaringBitmap {
    fn bitxor_assign(&mut self, rhs: &RoaringBitmap) {
        let lhs = mem::take(&mut self.containers);
        self.containers = merged(lhs, &rhs.containers, |pair| match pair {
            Pair::Left(lhs) => Some(lhs),
            Pair::Right(rhs) => Some(rhs.clone()),
            Pair::Both(mut lhs, rhs) => {
                lhs ^= rhs;
                Some(lhs)
            }
        });
    }
}
