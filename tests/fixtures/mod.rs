//! Shared helpers for integration tests.
#![allow(dead_code)]

use kmx::index::types::Position;
use kmx::index::{IndexConfig, MultiKIndex};
use kmx::utils::{Alphabet, SequenceGenerator};
use proptest::prelude::*;
use std::sync::Arc;

pub const DNA: &[u8] = b"ACGT";

pub fn dna() -> Arc<Alphabet> {
    Arc::new(Alphabet::dna())
}

/// Every offset where `query` occurs, by brute force
pub fn naive_positions(text: &[u8], query: &[u8]) -> Vec<Position> {
    if query.is_empty() || query.len() > text.len() {
        return Vec::new();
    }
    text.windows(query.len())
        .enumerate()
        .filter(|(_, w)| *w == query)
        .map(|(i, _)| i as Position)
        .collect()
}

/// Seeded random DNA text
pub fn random_text(seed: u64, len: usize) -> Vec<u8> {
    SequenceGenerator::new(dna(), seed).sequence(len)
}

pub fn build_multi(text: &[u8], ks: &[usize], config: &IndexConfig) -> MultiKIndex {
    MultiKIndex::build(text, ks, dna(), config).expect("index build failed")
}

/// DNA strings with length in `len`
pub fn dna_string(len: std::ops::Range<usize>) -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(proptest::sample::select(DNA.to_vec()), len)
}
