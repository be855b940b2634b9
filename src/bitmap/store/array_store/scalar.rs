//! Set operations on the sorted slices backing an [ArrayStore](super::ArrayStore).

use std::cmp::Ordering::*;

use super::sink::Sink;

/// When one side of an intersection is this many times larger than the
/// other, walking it one value at a time is replaced by galloping.
pub const GALLOP_RATIO: usize = 64;

/// The parts of a two-way merge that reach the sink.
#[derive(Clone, Copy)]
struct Keep {
    left: bool,
    both: bool,
    right: bool,
}

#[inline]
fn merge(lhs: &[u16], rhs: &[u16], keep: Keep, out: &mut impl Sink) {
    let (mut i, mut j) = (0, 0);
    while let (Some(&a), Some(&b)) = (lhs.get(i), rhs.get(j)) {
        match a.cmp(&b) {
            Less => {
                if keep.left {
                    out.push(a);
                }
                i += 1;
            }
            Greater => {
                if keep.right {
                    out.push(b);
                }
                j += 1;
            }
            Equal => {
                if keep.both {
                    out.push(a);
                }
                i += 1;
                j += 1;
            }
        }
    }
    if keep.left {
        out.push_slice(&lhs[i..]);
    }
    if keep.right {
        out.push_slice(&rhs[j..]);
    }
}

pub fn or(lhs: &[u16], rhs: &[u16], out: &mut impl Sink) {
    merge(lhs, rhs, Keep { left: true, both: true, right: true }, out);
}

pub fn and(lhs: &[u16], rhs: &[u16], out: &mut impl Sink) {
    if lhs.len().saturating_mul(GALLOP_RATIO) < rhs.len() {
        gallop_and(lhs, rhs, out);
    } else if rhs.len().saturating_mul(GALLOP_RATIO) < lhs.len() {
        gallop_and(rhs, lhs, out);
    } else {
        merge(lhs, rhs, Keep { left: false, both: true, right: false }, out);
    }
}

pub fn sub(lhs: &[u16], rhs: &[u16], out: &mut impl Sink) {
    merge(lhs, rhs, Keep { left: true, both: false, right: false }, out);
}

pub fn xor(lhs: &[u16], rhs: &[u16], out: &mut impl Sink) {
    merge(lhs, rhs, Keep { left: true, both: false, right: true }, out);
}

/// Probes `large` exponentially for every value of `small`.
fn gallop_and(small: &[u16], large: &[u16], out: &mut impl Sink) {
    let mut rest = large;
    for &value in small {
        rest = &rest[gallop(rest, value)..];
        match rest.first() {
            Some(&found) if found == value => {
                out.push(value);
                rest = &rest[1..];
            }
            Some(_) => (),
            None => return,
        }
    }
}

/// Returns the index of the first element of `slice` that is `>= target`.
pub fn gallop(slice: &[u16], target: u16) -> usize {
    let mut bound = 1;
    while bound < slice.len() && slice[bound - 1] < target {
        bound *= 2;
    }
    // slice[..bound / 2] is entirely below target
    let start = bound / 2;
    let end = bound.min(slice.len());
    start + slice[start..end].partition_point(|&v| v < target)
}
