//! Suffix array builder
//!
//! Creates the array of all suffix positions `[0, n)` and sorts them by the
//! suffixes they point to.

use crate::index::types::Position;
use rayon::prelude::*;

/// Texts at least this long are sorted with rayon
const PARALLEL_THRESHOLD: usize = 100_000;

/// Build the suffix array of `text`.
///
/// Time: O(n log n) comparisons, each up to O(n) on repetitive text.
/// Space: O(n) for the suffix array
pub fn build_suffix_array(text: &[u8]) -> Vec<Position> {
    debug_assert!(text.len() <= Position::MAX as usize);
    let mut sa: Vec<Position> = (0..text.len() as Position).collect();

    if text.len() >= PARALLEL_THRESHOLD {
        sa.par_sort_unstable_by(|&a, &b| compare_suffixes(text, a as usize, b as usize));
    } else {
        sa.sort_unstable_by(|&a, &b| compare_suffixes(text, a as usize, b as usize));
    }

    sa
}

/// Compare two suffixes lexicographically. A proper prefix sorts first.
#[inline]
fn compare_suffixes(text: &[u8], a: usize, b: usize) -> std::cmp::Ordering {
    text[a..].cmp(&text[b..])
}
