//! Base-sigma k-mer hashing.
//!
//! A window `s_0..s_{k-1}` hashes to `sum(rank(s_i) * sigma^(k-1-i))`. For a
//! fixed k this is a bijection between windows and `[0, sigma^k)`, so equal
//! hashes mean equal windows.

use crate::error::{IndexError, Result};
use crate::index::types::KmerHash;
use crate::utils::alphabet::Alphabet;

/// Integer power by repeated squaring. `None` when the result overflows `u64`.
#[inline]
pub fn pow(base: u64, mut exp: u32) -> Option<u64> {
    let mut result: u64 = 1;
    let mut b = base;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.checked_mul(b)?;
        }
        exp >>= 1;
        if exp > 0 {
            b = b.checked_mul(b)?;
        }
    }
    Some(result)
}

/// `pow` clamped to `u64::MAX` on overflow
#[inline]
pub fn saturating_pow(base: u64, exp: u32) -> u64 {
    pow(base, exp).unwrap_or(u64::MAX)
}

/// Hasher for k-length windows over one alphabet.
#[derive(Debug, Clone, Copy)]
pub struct KmerHasher {
    sigma: u64,
    k: usize,
    /// sigma^(k-1), weight of the leading symbol
    lead_weight: u64,
    /// sigma^k
    key_space: u64,
}

impl KmerHasher {
    /// Fails if `sigma^k` does not fit in 64 bits.
    pub fn new(sigma: usize, k: usize) -> Result<Self> {
        let overflow = || IndexError::HashOverflow { sigma, k };
        let exp = u32::try_from(k).map_err(|_| overflow())?;
        let key_space = pow(sigma as u64, exp).ok_or_else(overflow)?;
        Ok(Self {
            sigma: sigma as u64,
            k,
            lead_weight: key_space / sigma as u64,
            key_space,
        })
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    #[inline]
    pub fn sigma(&self) -> u64 {
        self.sigma
    }

    /// Number of distinct hashes, `sigma^k`
    #[inline]
    pub fn key_space(&self) -> u64 {
        self.key_space
    }

    /// Hash a window already mapped to ranks. Any length up to k is accepted;
    /// shorter windows hash as `sigma^len`-space prefixes.
    #[inline]
    pub fn hash_ranks(&self, ranks: &[u8]) -> KmerHash {
        debug_assert!(ranks.len() <= self.k);
        ranks
            .iter()
            .fold(0u64, |h, &r| h * self.sigma + r as KmerHash)
    }

    /// Hash a window of symbols. `base_offset` is added to the reported offset
    /// of a foreign symbol so callers can point into the original sequence.
    pub fn hash_symbols(
        &self,
        alphabet: &Alphabet,
        window: &[u8],
        base_offset: usize,
    ) -> Result<KmerHash> {
        debug_assert!(window.len() <= self.k);
        let mut h: KmerHash = 0;
        for (i, &symbol) in window.iter().enumerate() {
            let r = alphabet.rank(symbol).ok_or(IndexError::InvalidSymbol {
                offset: base_offset + i,
                symbol,
            })?;
            h = h * self.sigma + r as KmerHash;
        }
        Ok(h)
    }

    /// Slide the window one symbol right: drop `out_rank`, append `in_rank`.
    #[inline]
    pub fn roll(&self, h: KmerHash, out_rank: u8, in_rank: u8) -> KmerHash {
        (h - out_rank as KmerHash * self.lead_weight) * self.sigma + in_rank as KmerHash
    }

    /// Range of full k-mer hashes whose first `prefix_len` symbols hash to
    /// `prefix_hash`. Covers every completion of the free positions.
    #[inline]
    pub fn prefix_range(&self, prefix_hash: KmerHash, prefix_len: usize) -> (KmerHash, KmerHash) {
        debug_assert!(prefix_len <= self.k);
        let span = saturating_pow(self.sigma, (self.k - prefix_len) as u32);
        let lo = prefix_hash * span;
        (lo, lo + span)
    }
}

/// Rolling iterator over `(offset, hash)` of every k-window of a rank sequence.
pub struct RollingHashes<'a> {
    hasher: KmerHasher,
    ranks: &'a [u8],
    next: usize,
    current: KmerHash,
}

impl<'a> RollingHashes<'a> {
    pub fn new(hasher: KmerHasher, ranks: &'a [u8]) -> Self {
        Self {
            hasher,
            ranks,
            next: 0,
            current: 0,
        }
    }
}

impl Iterator for RollingHashes<'_> {
    type Item = (usize, KmerHash);

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.hasher.k;
        if self.next + k > self.ranks.len() {
            return None;
        }
        let pos = self.next;
        self.current = if pos == 0 {
            self.hasher.hash_ranks(&self.ranks[..k])
        } else {
            self.hasher
                .roll(self.current, self.ranks[pos - 1], self.ranks[pos + k - 1])
        };
        self.next += 1;
        Some((pos, self.current))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let k = self.hasher.k;
        let n = (self.ranks.len() + 1).saturating_sub(self.next + k);
        (n, Some(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pow() {
        assert_eq!(pow(4, 0), Some(1));
        assert_eq!(pow(4, 5), Some(1024));
        assert_eq!(pow(20, 14), Some(1_638_400_000_000_000_000));
        assert_eq!(pow(2, 63), Some(1 << 63));
        assert_eq!(pow(2, 64), None);
        assert_eq!(pow(20, 15), None);
        assert_eq!(saturating_pow(4, 40), u64::MAX);
    }

    #[test]
    fn test_hash_is_base_sigma() {
        let a = Alphabet::dna();
        let h = KmerHasher::new(4, 3).unwrap();
        // C=1, G=2, T=3 -> 1*16 + 2*4 + 3
        assert_eq!(h.hash_symbols(&a, b"CGT", 0).unwrap(), 27);
        assert_eq!(h.hash_symbols(&a, b"AAA", 0).unwrap(), 0);
        assert_eq!(h.hash_symbols(&a, b"TTT", 0).unwrap(), 63);
        assert_eq!(h.key_space(), 64);
    }

    #[test]
    fn test_hash_overflow_rejected() {
        assert!(KmerHasher::new(4, 31).is_ok());
        assert!(matches!(
            KmerHasher::new(4, 32),
            Err(IndexError::HashOverflow { sigma: 4, k: 32 })
        ));
    }

    #[test]
    fn test_foreign_symbol_reports_offset() {
        let a = Alphabet::dna();
        let h = KmerHasher::new(4, 3).unwrap();
        match h.hash_symbols(&a, b"ANG", 10) {
            Err(IndexError::InvalidSymbol { offset, symbol }) => {
                assert_eq!(offset, 11);
                assert_eq!(symbol, b'N');
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_rolling_matches_direct() {
        let a = Alphabet::dna();
        let text = b"ACGTTGCAAGTCCGATA";
        let ranks = a.ranks(text).unwrap();
        let h = KmerHasher::new(4, 5).unwrap();

        let rolled: Vec<_> = RollingHashes::new(h, &ranks).collect();
        assert_eq!(rolled.len(), text.len() - 4);
        for (pos, hash) in rolled {
            assert_eq!(hash, h.hash_ranks(&ranks[pos..pos + 5]));
        }
    }

    #[test]
    fn test_rolling_short_text() {
        let h = KmerHasher::new(4, 5).unwrap();
        let ranks = [0u8, 1, 2];
        assert_eq!(RollingHashes::new(h, &ranks).count(), 0);
    }

    #[test]
    fn test_prefix_range() {
        let a = Alphabet::dna();
        let h = KmerHasher::new(4, 4).unwrap();
        let prefix = h.hash_symbols(&a, b"CG", 0).unwrap();
        let (lo, hi) = h.prefix_range(prefix, 2);
        assert_eq!(hi - lo, 16);
        for ext in [b"CGAA", b"CGTT", b"CGCA"] {
            let full = h.hash_symbols(&a, ext, 0).unwrap();
            assert!(full >= lo && full < hi);
        }
        let outside = h.hash_symbols(&a, b"CTAA", 0).unwrap();
        assert!(outside >= hi);
    }
}
