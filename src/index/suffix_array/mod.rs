//! Baseline exact-match index over a single text.
//!
//! A plain suffix array answers every query in O(m log n) with no notion of
//! k, which makes it the reference the k-mer indexes are checked against.
//!
//! - `builder`: sorts the suffixes (in parallel for large texts)
//! - `reader`: binary-searches the sorted suffixes

pub mod builder;
pub mod reader;

pub use builder::build_suffix_array;
pub use reader::{SuffixArray, SuffixArrayStats};
