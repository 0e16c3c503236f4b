//! Choosing which k values to build.
//!
//! A k is scored against an expected distribution of query lengths: exact
//! matches score best, lengths k divides come next, and tiling remainders or
//! sub-k searches lose points per symbol the index has to enumerate.

use crate::index::types::PlannerWeights;
use ahash::AHashMap;
use serde::Serialize;
use std::collections::BTreeMap;

/// Probability of each query length
#[derive(Debug, Clone, Default, Serialize)]
pub struct QueryLengthDistribution {
    probs: BTreeMap<usize, f64>,
}

impl QueryLengthDistribution {
    /// Empirical distribution of observed lengths. Zero lengths are ignored.
    pub fn from_lengths<I>(lengths: I) -> Self
    where
        I: IntoIterator<Item = usize>,
    {
        let mut counts: AHashMap<usize, u64> = AHashMap::new();
        for len in lengths.into_iter().filter(|&l| l > 0) {
            *counts.entry(len).or_insert(0) += 1;
        }
        let total: u64 = counts.values().sum();
        let probs = counts
            .into_iter()
            .map(|(len, c)| (len, c as f64 / total as f64))
            .collect();
        Self { probs }
    }

    /// Every length in `[min, max]` equally likely
    pub fn uniform(min: usize, max: usize) -> Self {
        Self::from_lengths(min.max(1)..=max)
    }

    pub fn is_empty(&self) -> bool {
        self.probs.is_empty()
    }

    /// `(length, probability)` in ascending length order
    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.probs.iter().map(|(&l, &p)| (l, p))
    }

    pub fn mean(&self) -> f64 {
        self.iter().map(|(l, p)| l as f64 * p).sum()
    }
}

/// k used for a query of `len` symbols among the ascending `ks`: exact match,
/// else the largest k below `len`, else the smallest k.
pub fn dispatch_k(ks: &[usize], len: usize) -> Option<usize> {
    match ks.binary_search(&len) {
        Ok(i) => Some(ks[i]),
        Err(0) => ks.first().copied(),
        Err(i) => Some(ks[i - 1]),
    }
}

#[derive(Debug, Clone, Default)]
pub struct KPlanner {
    weights: PlannerWeights,
}

impl KPlanner {
    pub fn new(weights: PlannerWeights) -> Self {
        Self { weights }
    }

    /// Score of answering a `len`-symbol query with a k index
    pub fn score_length(&self, k: usize, len: usize) -> f64 {
        let w = &self.weights;
        let score = if len == k {
            w.exact
        } else if len > k {
            match len % k {
                0 => w.divisible,
                r => w.divisible - w.remainder_penalty * (k - r) as f64,
            }
        } else {
            w.exact - w.subk_penalty * (k - len) as f64
        };
        score.max(0.0)
    }

    /// Expected score of a single k over the distribution
    pub fn score_k(&self, k: usize, dist: &QueryLengthDistribution) -> f64 {
        dist.iter().map(|(len, p)| p * self.score_length(k, len)).sum()
    }

    /// Expected score of a k set, each query routed the way a multi-k index
    /// routes it
    pub fn score_set(&self, ks: &[usize], dist: &QueryLengthDistribution) -> f64 {
        let mut sorted = ks.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        dist.iter()
            .filter_map(|(len, p)| dispatch_k(&sorted, len).map(|k| p * self.score_length(k, len)))
            .sum()
    }

    /// Greedily pick up to `count` k values from `candidates` (values `<= 1`
    /// are skipped). Each step adds the candidate that raises the set score the
    /// most; ties go to the smaller k. Stops early once no candidate helps.
    pub fn plan(
        &self,
        dist: &QueryLengthDistribution,
        count: usize,
        candidates: &[usize],
    ) -> Vec<usize> {
        let mut pool: Vec<usize> = candidates.iter().copied().filter(|&k| k > 1).collect();
        pool.sort_unstable();
        pool.dedup();

        let mut chosen: Vec<usize> = Vec::new();
        let mut current = 0.0;
        while chosen.len() < count && !pool.is_empty() {
            let mut best: Option<(usize, f64)> = None;
            for (i, &k) in pool.iter().enumerate() {
                let mut trial = chosen.clone();
                trial.push(k);
                let score = self.score_set(&trial, dist);
                if best.is_none_or(|(_, s)| score > s) {
                    best = Some((i, score));
                }
            }
            let Some((i, score)) = best else {
                break;
            };
            if !chosen.is_empty() && score <= current {
                break;
            }
            chosen.push(pool.remove(i));
            current = score;
        }
        chosen.sort_unstable();
        chosen
    }
}
