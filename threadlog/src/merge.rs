//! Stable ordered merge of two already-sorted sequences
//!
//! This is the primitive under [`ContextLogGrouping::combine`](crate::ContextLogGrouping::combine):
//! when two trace fragments are folded together, their log and timer
//! sequences are merged here rather than re-sorted wholesale.
//!
//! The merge walks the shorter input against the longer one and emits the
//! longer input's element only when the shorter input's current element
//! compares strictly greater. On an exact tie the element from the shorter
//! input is therefore emitted first; equal-length inputs treat the first
//! argument as the shorter one. Once the shorter input is exhausted the
//! remaining tail of the longer input is appended unchanged.

use std::cmp::Ordering;

/// Merge two sequences, each already sorted ascending under `cmp`, into one
/// sorted sequence containing every element of both.
///
/// Neither input is mutated; the output length is always the sum of the
/// input lengths.
pub fn merge_sorted_by<T, F>(a: &[T], b: &[T], mut cmp: F) -> Vec<T>
where
    T: Clone,
    F: FnMut(&T, &T) -> Ordering,
{
    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let mut merged = Vec::with_capacity(a.len() + b.len());
    let mut i = 0;
    let mut j = 0;

    while i < shorter.len() {
        if j < longer.len() && cmp(&shorter[i], &longer[j]) == Ordering::Greater {
            merged.push(longer[j].clone());
            j += 1;
        } else {
            merged.push(shorter[i].clone());
            i += 1;
        }
    }

    merged.extend_from_slice(&longer[j..]);
    merged
}

/// [`merge_sorted_by`] with the comparator derived from a key read off each
/// element.
pub fn merge_sorted_by_key<T, K, F>(a: &[T], b: &[T], mut key: F) -> Vec<T>
where
    T: Clone,
    K: Ord,
    F: FnMut(&T) -> K,
{
    merge_sorted_by(a, b, |x, y| key(x).cmp(&key(y)))
}
