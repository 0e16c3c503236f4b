//! Seedable random texts and queries for tests, benchmarks, and `kmx generate`.

use crate::utils::alphabet::Alphabet;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Deterministic generator over one alphabet. Same seed, same output.
#[derive(Debug, Clone)]
pub struct SequenceGenerator {
    alphabet: Arc<Alphabet>,
    rng: SmallRng,
}

impl SequenceGenerator {
    pub fn new(alphabet: Arc<Alphabet>, seed: u64) -> Self {
        Self {
            alphabet,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Restart the stream from `seed`
    pub fn reset(&mut self, seed: u64) {
        self.rng = SmallRng::seed_from_u64(seed);
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    /// Uniform random text of `len` symbols
    pub fn sequence(&mut self, len: usize) -> Vec<u8> {
        let symbols = self.alphabet.symbols();
        (0..len)
            .map(|_| symbols[self.rng.gen_range(0..symbols.len())])
            .collect()
    }

    /// A substring of `text` of length `len` (clamped to the text length),
    /// so the query is guaranteed to occur at least once.
    pub fn substring_query(&mut self, text: &[u8], len: usize) -> Vec<u8> {
        let len = len.min(text.len());
        let start = self.rng.gen_range(0..=text.len() - len);
        text[start..start + len].to_vec()
    }

    /// `count` queries with lengths drawn from `lens`: even draws are
    /// substrings of `text`, odd draws are random and usually absent.
    pub fn queries(&mut self, text: &[u8], count: usize, lens: &[usize]) -> Vec<Vec<u8>> {
        if lens.is_empty() {
            return Vec::new();
        }
        (0..count)
            .map(|i| {
                let len = lens[self.rng.gen_range(0..lens.len())];
                if i % 2 == 0 && !text.is_empty() {
                    self.substring_query(text, len)
                } else {
                    self.sequence(len)
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generator(seed: u64) -> SequenceGenerator {
        SequenceGenerator::new(Arc::new(Alphabet::dna()), seed)
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let a = generator(7).sequence(500);
        let b = generator(7).sequence(500);
        let c = generator(8).sequence(500);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_reset_restarts_stream() {
        let mut g = generator(1);
        let first = g.sequence(64);
        g.sequence(64);
        g.reset(1);
        assert_eq!(g.sequence(64), first);
    }

    #[test]
    fn test_sequence_uses_alphabet() {
        let mut g = generator(3);
        let text = g.sequence(1000);
        assert!(g.alphabet().validate(&text).is_ok());
        for symbol in b"ACGT" {
            assert!(text.contains(symbol));
        }
    }

    #[test]
    fn test_substring_query_occurs() {
        let mut g = generator(11);
        let text = g.sequence(200);
        for len in [1, 5, 17, 200, 300] {
            let q = g.substring_query(&text, len);
            assert_eq!(q.len(), len.min(text.len()));
            assert!(text.windows(q.len()).any(|w| w == q.as_slice()));
        }
    }

    #[test]
    fn test_queries_lengths() {
        let mut g = generator(5);
        let text = g.sequence(100);
        let qs = g.queries(&text, 20, &[3, 7]);
        assert_eq!(qs.len(), 20);
        assert!(qs.iter().all(|q| q.len() == 3 || q.len() == 7));
        assert!(g.queries(&text, 5, &[]).is_empty());
    }
}
