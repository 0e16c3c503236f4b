#![no_main]

use arbitrary::Arbitrary;
use kmx::index::{IndexConfig, MultiKIndex, RemainderStrategy, SuffixArray};
use kmx::utils::Alphabet;
use libfuzzer_sys::fuzz_target;
use std::sync::Arc;

#[derive(Arbitrary, Debug)]
struct Input {
    text: Vec<u8>,
    queries: Vec<Vec<u8>>,
    ks: Vec<u8>,
    overlapping: bool,
}

// Map arbitrary bytes onto the DNA alphabet
fn to_dna(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().map(|b| b"ACGT"[(b & 3) as usize]).collect()
}

fuzz_target!(|input: Input| {
    let text = to_dna(&input.text);
    let ks: Vec<usize> = input.ks.iter().map(|&k| 2 + (k % 14) as usize).collect();
    if text.is_empty() || ks.is_empty() {
        return;
    }

    let remainder = if input.overlapping {
        RemainderStrategy::OverlappingTile
    } else {
        RemainderStrategy::SubK
    };
    let config = IndexConfig::default().with_remainder(remainder).with_threads(1);
    let index = MultiKIndex::build(&text, &ks, Arc::new(Alphabet::dna()), &config)
        .expect("valid k values must build");
    let baseline = SuffixArray::build(&text);

    for q in input.queries.iter().take(16) {
        let q = to_dna(q);
        let expected = baseline.search_positions(&q);
        match index.search(&q) {
            Ok(view) => assert_eq!(view.to_vector(true), expected),
            Err(e) => assert!(e.is_domain() && (q.is_empty() || q.len() > text.len())),
        }
    }
});
