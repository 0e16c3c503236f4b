//! Suffix array search
//!
//! Holds the text and its sorted suffixes in memory and answers queries by
//! two binary searches over the suffix order.

use super::builder::build_suffix_array;
use crate::index::types::Position;
use serde::Serialize;
use std::time::Instant;
use tracing::debug;

/// In-memory suffix array over one text. Symbols are compared as raw bytes.
#[derive(Debug, Clone)]
pub struct SuffixArray {
    text: Vec<u8>,
    suffixes: Vec<Position>,
}

impl SuffixArray {
    pub fn build(text: &[u8]) -> Self {
        let start = Instant::now();
        let suffixes = build_suffix_array(text);
        debug!(
            text_len = text.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built suffix array"
        );
        Self {
            text: text.to_vec(),
            suffixes,
        }
    }

    #[inline]
    pub fn text(&self) -> &[u8] {
        &self.text
    }

    #[inline]
    fn text_at(&self, pos: Position) -> &[u8] {
        &self.text[pos as usize..]
    }

    /// Range `[lo, hi)` of suffix ranks whose suffix starts with `pattern`.
    pub fn search(&self, pattern: &[u8]) -> (usize, usize) {
        if pattern.is_empty() || self.suffixes.is_empty() {
            return (0, 0);
        }
        let lo = self.lower_bound(pattern);
        let hi = self.upper_bound(pattern, lo);
        (lo, hi)
    }

    /// First rank whose suffix is not less than `pattern` on its first
    /// `pattern.len()` symbols
    fn lower_bound(&self, pattern: &[u8]) -> usize {
        self.suffixes.partition_point(|&pos| {
            let suffix = self.text_at(pos);
            &suffix[..pattern.len().min(suffix.len())] < pattern
        })
    }

    /// First rank at or after `start` whose suffix does not start with `pattern`
    fn upper_bound(&self, pattern: &[u8], start: usize) -> usize {
        start
            + self.suffixes[start..].partition_point(|&pos| self.text_at(pos).starts_with(pattern))
    }

    /// Every offset where `pattern` occurs, ascending
    pub fn search_positions(&self, pattern: &[u8]) -> Vec<Position> {
        let (lo, hi) = self.search(pattern);
        let mut positions = self.suffixes[lo..hi].to_vec();
        positions.sort_unstable();
        positions
    }

    /// Number of occurrences without collecting them
    pub fn count(&self, pattern: &[u8]) -> usize {
        let (lo, hi) = self.search(pattern);
        hi - lo
    }

    pub fn contains(&self, pattern: &[u8]) -> bool {
        let (lo, hi) = self.search(pattern);
        lo < hi
    }

    pub fn stats(&self) -> SuffixArrayStats {
        SuffixArrayStats {
            text_size: self.text.len(),
            suffix_count: self.suffixes.len(),
            estimated_bytes: (self.text.len() + self.suffixes.len() * size_of::<Position>())
                as u64,
        }
    }
}

/// Statistics about a suffix array
#[derive(Debug, Clone, Serialize)]
pub struct SuffixArrayStats {
    pub text_size: usize,
    pub suffix_count: usize,
    pub estimated_bytes: u64,
}
