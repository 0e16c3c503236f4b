//! Single-k index: one backing store built by a linear scan of the text.
//!
//! Queries are answered relative to the fixed k:
//!
//! - `len == k`: one hash lookup.
//! - `len < k`: the query is anchored at the start of the k-window, so every
//!   matching k-mer hashes into one contiguous range; each bucket in that range
//!   lists match offsets directly. Offsets in the last `k - 1` symbols have no
//!   k-window and are recovered by scanning the stored boundary symbols.
//! - `len > k`: the query is cut into `len / k` tiles plus a remainder, and a
//!   start offset survives only if every tile (and the remainder) chains from it.

use crate::error::{IndexError, Result};
use crate::index::hashing::{KmerHasher, RollingHashes};
use crate::index::store::{choose_store, BackingStore, StoreKind};
use crate::index::types::{IndexConfig, KmerHash, Position, RemainderStrategy};
use crate::result::{Bitmask, ResultView};
use crate::utils::alphabet::Alphabet;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Exact-match index over all k-windows of one text.
#[derive(Debug, Clone)]
pub struct KmerIndex {
    k: usize,
    alphabet: Arc<Alphabet>,
    hasher: KmerHasher,
    store: BackingStore,
    /// Ranks of the trailing symbols no k-window starts in
    boundary: Vec<u8>,
    /// Text offset of `boundary[0]`
    boundary_start: usize,
    text_len: usize,
    remainder: RemainderStrategy,
}

impl KmerIndex {
    /// Build the index for `text` with window length `k`.
    ///
    /// Fails on `k <= 1`, on symbols outside `alphabet`, when `sigma^k`
    /// overflows the hash space, or when no backing store fits the config.
    pub fn build(
        text: &[u8],
        k: usize,
        alphabet: Arc<Alphabet>,
        config: &IndexConfig,
    ) -> Result<Self> {
        if k <= 1 {
            return Err(IndexError::InvalidK { k });
        }
        if text.len() > Position::MAX as usize {
            return Err(IndexError::TextTooLong { len: text.len() });
        }

        let start = Instant::now();
        let hasher = KmerHasher::new(alphabet.sigma(), k)?;
        let ranks = alphabet.ranks(text)?;
        let windows = (text.len() + 1).saturating_sub(k);

        let choice = choose_store(hasher.key_space(), windows as u64, config)?;
        let mut store = BackingStore::new(
            choice.kind,
            hasher.key_space(),
            choice.distinct_estimate as usize,
        );
        for (pos, hash) in RollingHashes::new(hasher, &ranks) {
            store.insert(hash, pos as Position);
        }
        store.shrink_to_fit();

        let boundary_start = text.len().saturating_sub(k - 1);
        let boundary = ranks[boundary_start..].to_vec();

        info!(
            k,
            text_len = text.len(),
            store = ?store.kind(),
            distinct = store.distinct(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built k-mer index"
        );

        Ok(Self {
            k,
            alphabet,
            hasher,
            store,
            boundary,
            boundary_start,
            text_len: text.len(),
            remainder: config.remainder,
        })
    }

    #[inline]
    pub fn k(&self) -> usize {
        self.k
    }

    pub fn text_len(&self) -> usize {
        self.text_len
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn store(&self) -> &BackingStore {
        &self.store
    }

    pub fn store_kind(&self) -> StoreKind {
        self.store.kind()
    }

    pub fn hasher(&self) -> &KmerHasher {
        &self.hasher
    }

    /// Every non-empty `(hash, positions)` bucket in hash order
    pub fn buckets(&self) -> Vec<(KmerHash, &[Position])> {
        self.store.buckets()
    }

    /// Position list of one k-length window
    pub fn lookup_kmer(&self, kmer: &[u8]) -> Result<&[Position]> {
        if kmer.len() != self.k {
            return Err(IndexError::config(format!(
                "k-mer of length {} passed to a k = {} index",
                kmer.len(),
                self.k
            )));
        }
        let hash = self.hasher.hash_symbols(&self.alphabet, kmer, 0)?;
        Ok(self.store.lookup(hash))
    }

    /// All offsets where `query` occurs.
    ///
    /// Errors are per query: an empty query, one longer than the text, or one
    /// with symbols outside the alphabet. The index is unaffected.
    pub fn search(&self, query: &[u8]) -> Result<ResultView<'_>> {
        if query.is_empty() {
            return Err(IndexError::EmptyQuery);
        }
        if query.len() > self.text_len {
            return Err(IndexError::QueryTooLong {
                query_len: query.len(),
                text_len: self.text_len,
            });
        }
        let ranks = self.alphabet.ranks(query)?;

        let view = match ranks.len().cmp(&self.k) {
            std::cmp::Ordering::Equal => self.search_exact(&ranks),
            std::cmp::Ordering::Less => self.search_sub_k(&ranks),
            std::cmp::Ordering::Greater => self.search_tiled(&ranks),
        };
        debug!(k = self.k, query_len = ranks.len(), hits = view.size(), "search");
        Ok(view)
    }

    fn search_exact(&self, ranks: &[u8]) -> ResultView<'_> {
        ResultView::from_lists([self.store.lookup(self.hasher.hash_ranks(ranks))])
    }

    /// Union of every bucket whose k-mer starts with `ranks`, plus boundary hits.
    fn search_sub_k(&self, ranks: &[u8]) -> ResultView<'_> {
        let prefix = self.hasher.hash_ranks(ranks);
        let (lo, hi) = self.hasher.prefix_range(prefix, ranks.len());
        let mut view = ResultView::from_lists(self.store.range(lo, hi).into_iter().map(|(_, l)| l));
        view.push_owned(self.boundary_matches(ranks));
        view
    }

    /// Offsets inside the boundary region where `ranks` occurs
    fn boundary_matches(&self, ranks: &[u8]) -> Vec<Position> {
        self.boundary
            .windows(ranks.len())
            .enumerate()
            .filter(|(_, w)| *w == ranks)
            .map(|(j, _)| (self.boundary_start + j) as Position)
            .collect()
    }

    /// Tile the query and keep the first tile's offsets that chain through
    /// every other tile and the remainder.
    fn search_tiled(&self, ranks: &[u8]) -> ResultView<'_> {
        let k = self.k;
        let tiles = ranks.len() / k;
        let rem = ranks.len() % k;

        let first = self.store.lookup(self.hasher.hash_ranks(&ranks[..k]));

        // (positions, offset of the constraint relative to the match start)
        let mut constraints: Vec<(Cow<'_, [Position]>, usize)> = (0..tiles)
            .map(|i| {
                let hash = self.hasher.hash_ranks(&ranks[i * k..(i + 1) * k]);
                (Cow::Borrowed(self.store.lookup(hash)), i * k)
            })
            .collect();

        if rem > 0 {
            let remainder = match self.remainder {
                RemainderStrategy::SubK => (
                    Cow::Owned(self.search_sub_k(&ranks[tiles * k..]).to_vector(true)),
                    tiles * k,
                ),
                RemainderStrategy::OverlappingTile => {
                    let start = ranks.len() - k;
                    let hash = self.hasher.hash_ranks(&ranks[start..]);
                    (Cow::Borrowed(self.store.lookup(hash)), start)
                }
            };
            constraints.push(remainder);
        }

        if constraints.iter().any(|(list, _)| list.is_empty()) {
            return ResultView::empty();
        }

        // Walk the rarest constraint and probe the rest, rarest first.
        let anchor = constraints
            .iter()
            .enumerate()
            .min_by_key(|(_, (list, _))| list.len())
            .map_or(0, |(i, _)| i);
        let (anchor_list, anchor_offset) = constraints.swap_remove(anchor);
        constraints.sort_by_key(|(list, _)| list.len());

        let mut mask = Bitmask::new(first.len(), false);
        for &x in anchor_list.iter() {
            let Some(p) = (x as usize).checked_sub(anchor_offset) else {
                continue;
            };
            let chained = constraints.iter().all(|(list, offset)| {
                Position::try_from(p + offset).is_ok_and(|q| list.binary_search(&q).is_ok())
            });
            if chained {
                // p is in the first tile's list: either it was the anchor or it
                // passed the membership probe above
                if let Ok(i) = first.binary_search(&(p as Position)) {
                    mask.set(i);
                }
            }
        }

        ResultView::filtered(first, mask)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::StorePolicy;

    fn dna() -> Arc<Alphabet> {
        Arc::new(Alphabet::dna())
    }

    fn build(text: &[u8], k: usize) -> KmerIndex {
        KmerIndex::build(text, k, dna(), &IndexConfig::default()).unwrap()
    }

    fn naive(text: &[u8], query: &[u8]) -> Vec<Position> {
        if query.len() > text.len() {
            return Vec::new();
        }
        text.windows(query.len())
            .enumerate()
            .filter(|(_, w)| *w == query)
            .map(|(i, _)| i as Position)
            .collect()
    }

    fn hits(index: &KmerIndex, query: &[u8]) -> Vec<Position> {
        index.search(query).unwrap().to_vector(true)
    }

    #[test]
    fn test_rejects_small_k() {
        for k in [0, 1] {
            assert!(matches!(
                KmerIndex::build(b"ACGT", k, dna(), &IndexConfig::default()),
                Err(IndexError::InvalidK { .. })
            ));
        }
    }

    #[test]
    fn test_rejects_foreign_text_symbol() {
        match KmerIndex::build(b"ACGTNACGT", 3, dna(), &IndexConfig::default()) {
            Err(IndexError::InvalidSymbol { offset, symbol }) => {
                assert_eq!(offset, 4);
                assert_eq!(symbol, b'N');
            }
            other => panic!("unexpected result: {:?}", other.map(|i| i.k())),
        }
    }

    #[test]
    fn test_exact_k_every_window() {
        let text = b"ACGTTGCAACGTAGGCTTACGA";
        let index = build(text, 4);
        for p in 0..=text.len() - 4 {
            let view = index.search(&text[p..p + 4]).unwrap();
            assert!(view.is_trivially_valid());
            assert!(view.iter().any(|x| x as usize == p));
        }
    }

    #[test]
    fn test_sub_k_completeness() {
        let text = b"AACGTACGTT";
        let index = build(text, 5);
        assert_eq!(hits(&index, b"AC"), vec![1, 5]);
        assert_eq!(hits(&index, b"AA"), vec![0]);
        // matches inside the last k - 1 symbols come from the boundary scan
        assert_eq!(hits(&index, b"GTT"), vec![7]);
        assert_eq!(hits(&index, b"T"), vec![4, 8, 9]);
    }

    #[test]
    fn test_sub_k_boundary_generalizes() {
        let text = b"CGTACCGTA";
        let index = build(text, 6);
        for len in 1..6 {
            for p in 0..=text.len() - len {
                let q = &text[p..p + len];
                assert_eq!(hits(&index, q), naive(text, q), "query {:?}", q);
            }
        }
    }

    #[test]
    fn test_tiling_chain() {
        let text = b"ATCATCATC";
        let index = build(text, 3);
        assert_eq!(hits(&index, b"ATCATC"), vec![0, 3]);
        assert_eq!(hits(&index, b"ATCATCATC"), vec![0]);

        // one tile matching is not enough
        let text = b"ATCGGGATCATC";
        let index = build(text, 3);
        assert_eq!(hits(&index, b"ATCATC"), vec![6]);
    }

    #[test]
    fn test_tiling_keeps_first_tile_view() {
        let text = b"ATCATCATCGATC";
        let index = build(text, 3);
        let view = index.search(b"ATCATC").unwrap();
        assert_eq!(view.entry_count(), index.lookup_kmer(b"ATC").unwrap().len());
        assert_eq!(view.to_vector(true), vec![0, 3]);
        assert!(!view.bitmask_at(2));
    }

    #[test]
    fn test_tiling_with_remainder_strategies() {
        let text = b"GATTACAGATTACCGATTACAGT";
        for strategy in [RemainderStrategy::SubK, RemainderStrategy::OverlappingTile] {
            let config = IndexConfig::default().with_remainder(strategy);
            let index = KmerIndex::build(text, 3, dna(), &config).unwrap();
            for q in [&b"GATTACA"[..], b"GATTAC", b"ATTACAG", b"TTACCGAT", b"GATTACAGT"] {
                assert_eq!(hits(&index, q), naive(text, q), "{:?} {:?}", strategy, q);
            }
        }
    }

    #[test]
    fn test_direct_and_hashed_agree() {
        let text = b"TTGACCAGTAGGATTACCATGACCAGTTAGAC";
        let k = 3;
        let direct = KmerIndex::build(
            text,
            k,
            dna(),
            &IndexConfig::default().with_store(StorePolicy::Direct),
        )
        .unwrap();
        let hashed = KmerIndex::build(
            text,
            k,
            dna(),
            &IndexConfig::default().with_store(StorePolicy::Hashed),
        )
        .unwrap();
        assert_eq!(direct.store_kind(), StoreKind::Direct);
        assert_eq!(hashed.store_kind(), StoreKind::Hashed);
        assert_eq!(direct.buckets(), hashed.buckets());

        for len in 1..=3 * k {
            for p in 0..=text.len() - len {
                let q = &text[p..p + len];
                assert_eq!(hits(&direct, q), hits(&hashed, q));
            }
        }
    }

    #[test]
    fn test_text_shorter_than_k() {
        let index = build(b"ACGA", 6);
        assert_eq!(index.store().distinct(), 0);
        assert_eq!(hits(&index, b"A"), vec![0, 3]);
        assert_eq!(hits(&index, b"ACGA"), vec![0]);
    }

    #[test]
    fn test_query_errors_leave_index_usable() {
        let index = build(b"ACGTACGT", 3);
        assert!(matches!(index.search(b""), Err(IndexError::EmptyQuery)));
        assert!(matches!(
            index.search(b"ACGTACGTA"),
            Err(IndexError::QueryTooLong { .. })
        ));
        let err = index.search(b"ACX").unwrap_err();
        assert!(err.is_domain());
        assert_eq!(hits(&index, b"CGT"), vec![1, 5]);
    }

    #[test]
    fn test_lowercase_query_matches() {
        let index = build(b"ACGTACGT", 3);
        assert_eq!(hits(&index, b"cgt"), vec![1, 5]);
    }
}
