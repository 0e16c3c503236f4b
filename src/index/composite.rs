//! Multi-k index: one single-k index per requested k, built in parallel.

use crate::error::{IndexError, Result};
use crate::index::single::KmerIndex;
use crate::index::stats::IndexStats;
use crate::index::types::IndexConfig;
use crate::pool::{BuildPool, ShutdownMode};
use crate::result::ResultView;
use crate::utils::alphabet::Alphabet;
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Aggregate of single-k indexes over one text. Immutable once built, so
/// concurrent searches need no locking.
#[derive(Debug, Clone)]
pub struct MultiKIndex {
    indices: BTreeMap<usize, KmerIndex>,
    alphabet: Arc<Alphabet>,
    text_len: usize,
}

impl MultiKIndex {
    /// Build every requested k on a fresh pool sized from `config.threads`.
    pub fn build(
        text: &[u8],
        ks: &[usize],
        alphabet: Arc<Alphabet>,
        config: &IndexConfig,
    ) -> Result<Self> {
        let ks = normalize_ks(ks)?;
        let workers = config.effective_threads().min(ks.len());
        let mut pool = BuildPool::new(workers)?;
        let index = Self::build_with_pool(&pool, text, &ks, alphabet, config);
        pool.shutdown(ShutdownMode::Graceful);
        index
    }

    /// Build on an existing pool, one task per k.
    ///
    /// A task that panics surfaces as [`IndexError::BuildAborted`] for its k.
    pub fn build_with_pool(
        pool: &BuildPool,
        text: &[u8],
        ks: &[usize],
        alphabet: Arc<Alphabet>,
        config: &IndexConfig,
    ) -> Result<Self> {
        let ks = normalize_ks(ks)?;
        let start = Instant::now();
        let text: Arc<[u8]> = Arc::from(text);
        let (tx, rx) = mpsc::channel();

        for &k in &ks {
            let tx = tx.clone();
            let text = Arc::clone(&text);
            let alphabet = Arc::clone(&alphabet);
            let config = config.clone();
            pool.execute(move || {
                let built = KmerIndex::build(&text, k, alphabet, &config);
                // receiver outlives every task; a send error means the caller gave up
                let _ = tx.send((k, built));
            })?;
        }
        drop(tx);

        let mut indices = BTreeMap::new();
        let mut first_error = None;
        for (k, built) in rx {
            match built {
                Ok(index) => {
                    indices.insert(k, index);
                }
                Err(e) => {
                    debug!(k, error = %e, "single-k build failed");
                    first_error.get_or_insert(e);
                }
            }
        }
        if let Some(e) = first_error {
            return Err(e);
        }
        if let Some(&k) = ks.iter().find(|k| !indices.contains_key(k)) {
            return Err(IndexError::BuildAborted { k });
        }

        info!(
            ks = ?ks,
            workers = pool.size(),
            text_len = text.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "built multi-k index"
        );

        Ok(Self {
            indices,
            alphabet,
            text_len: text.len(),
        })
    }

    /// k used for a query of `len` symbols: exact match, else the largest
    /// k below it, else the smallest k.
    pub fn select_k(&self, len: usize) -> Option<usize> {
        if self.indices.contains_key(&len) {
            return Some(len);
        }
        self.indices
            .range(..=len)
            .next_back()
            .or_else(|| self.indices.iter().next())
            .map(|(&k, _)| k)
    }

    pub fn search(&self, query: &[u8]) -> Result<ResultView<'_>> {
        if query.is_empty() {
            return Err(IndexError::EmptyQuery);
        }
        let k = self.select_k(query.len()).ok_or(IndexError::NoKValues)?;
        self.indices[&k].search(query)
    }

    /// Answer many queries in parallel. Results keep the input order.
    pub fn search_batch<Q>(&self, queries: &[Q]) -> Vec<Result<ResultView<'_>>>
    where
        Q: AsRef<[u8]> + Sync,
    {
        queries
            .par_iter()
            .map(|q| self.search(q.as_ref()))
            .collect()
    }

    pub fn get(&self, k: usize) -> Option<&KmerIndex> {
        self.indices.get(&k)
    }

    /// Built k values in ascending order
    pub fn ks(&self) -> impl Iterator<Item = usize> + '_ {
        self.indices.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn text_len(&self) -> usize {
        self.text_len
    }

    pub fn alphabet(&self) -> &Alphabet {
        &self.alphabet
    }

    pub fn stats(&self) -> IndexStats {
        IndexStats::collect(self.text_len, self.alphabet.sigma(), self.indices.values())
    }
}

/// Sorted, deduplicated k set; rejects an empty set or any `k <= 1`.
fn normalize_ks(ks: &[usize]) -> Result<Vec<usize>> {
    let set: BTreeSet<usize> = ks.iter().copied().collect();
    if set.is_empty() {
        return Err(IndexError::NoKValues);
    }
    if let Some(&k) = set.iter().find(|&&k| k <= 1) {
        return Err(IndexError::InvalidK { k });
    }
    Ok(set.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::types::Position;

    fn build(text: &[u8], ks: &[usize], threads: usize) -> MultiKIndex {
        let config = IndexConfig::default().with_threads(threads);
        MultiKIndex::build(text, ks, Arc::new(Alphabet::dna()), &config).unwrap()
    }

    fn naive(text: &[u8], query: &[u8]) -> Vec<Position> {
        text.windows(query.len())
            .enumerate()
            .filter(|(_, w)| *w == query)
            .map(|(i, _)| i as Position)
            .collect()
    }

    #[test]
    fn test_rejects_bad_k_sets() {
        let a = Arc::new(Alphabet::dna());
        let config = IndexConfig::default();
        assert!(matches!(
            MultiKIndex::build(b"ACGT", &[], Arc::clone(&a), &config),
            Err(IndexError::NoKValues)
        ));
        assert!(matches!(
            MultiKIndex::build(b"ACGT", &[3, 1], a, &config),
            Err(IndexError::InvalidK { k: 1 })
        ));
    }

    #[test]
    fn test_select_k_dispatch() {
        let index = build(b"ACGTACGTACGT", &[3, 5, 8], 2);
        assert_eq!(index.ks().collect::<Vec<_>>(), vec![3, 5, 8]);
        assert_eq!(index.select_k(5), Some(5));
        assert_eq!(index.select_k(7), Some(5));
        assert_eq!(index.select_k(20), Some(8));
        assert_eq!(index.select_k(2), Some(3));
    }

    #[test]
    fn test_search_all_lengths() {
        let text = b"TTAGGCATCGATCGGATTACAGGCATCGTTA";
        let index = build(text, &[3, 4, 6], 3);
        for len in 1..=12 {
            for p in (0..=text.len() - len).step_by(3) {
                let q = &text[p..p + len];
                assert_eq!(index.search(q).unwrap().to_vector(true), naive(text, q));
            }
        }
    }

    #[test]
    fn test_build_error_propagates() {
        let config = IndexConfig::default();
        let err = MultiKIndex::build(b"ACGTNN", &[2, 3], Arc::new(Alphabet::dna()), &config)
            .unwrap_err();
        assert!(matches!(err, IndexError::InvalidSymbol { offset: 4, .. }));
    }

    #[test]
    fn test_parallel_build_is_deterministic() {
        let text = b"GATTACAGATTACACCGTAGCTAGCTAGGATCCA";
        let one = build(text, &[2, 3, 4, 5], 1);
        let many = build(text, &[2, 3, 4, 5], 4);
        for k in one.ks() {
            assert_eq!(one.get(k).unwrap().buckets(), many.get(k).unwrap().buckets());
        }
    }

    #[test]
    fn test_search_batch_keeps_order() {
        let text = b"ACGTTGCAACGT";
        let index = build(text, &[3], 2);
        let queries: Vec<&[u8]> = vec![&b"ACG"[..], &b"TTG"[..], &b""[..], &b"GCAAC"[..]];
        let results = index.search_batch(&queries);
        assert_eq!(results.len(), 4);
        assert_eq!(results[0].as_ref().unwrap().to_vector(true), vec![0, 8]);
        assert_eq!(results[1].as_ref().unwrap().to_vector(true), vec![3]);
        assert!(matches!(results[2], Err(IndexError::EmptyQuery)));
        assert_eq!(results[3].as_ref().unwrap().to_vector(true), vec![5]);
    }

    #[test]
    fn test_build_with_shared_pool() {
        let pool = BuildPool::new(2).unwrap();
        let a = Arc::new(Alphabet::dna());
        let config = IndexConfig::default();
        let first = MultiKIndex::build_with_pool(&pool, b"ACGTACGT", &[2, 3], Arc::clone(&a), &config)
            .unwrap();
        let second = MultiKIndex::build_with_pool(&pool, b"TTTTACGT", &[4], a, &config).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(second.search(b"TTTT").unwrap().to_vector(true), vec![0]);
    }
}
