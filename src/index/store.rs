//! Backing stores mapping a k-mer hash to its position list.
//!
//! Two layouts share one contract: a dense direct-address table, valid while
//! `sigma^k` slots stay affordable, and a sparse hash table for everything
//! else. [`choose_store`] picks one before the construction scan and the choice
//! is fixed for the lifetime of the index.

use crate::error::{IndexError, Result};
use crate::index::types::{IndexConfig, KmerHash, Position, StorePolicy};
use rustc_hash::FxHashMap;
use serde::Serialize;
use std::mem::size_of;

/// Shared empty list returned for every absent hash. Never mutated.
pub static EMPTY_POSITIONS: &[Position] = &[];

/// Bytes charged per direct-address slot
const SLOT_BYTES: u64 = size_of::<Vec<Position>>() as u64;

/// Bytes charged per hash-table entry (key + list header + control byte)
const ENTRY_BYTES: u64 = (size_of::<KmerHash>() + size_of::<Vec<Position>>() + 1) as u64;

/// Backing store layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Direct,
    Hashed,
}

/// Dense table over the observed hash range `[min_hash, min_hash + slots.len())`.
#[derive(Debug, Clone)]
pub struct DirectTable {
    min_hash: KmerHash,
    slots: Vec<Vec<Position>>,
    /// Exclusive upper bound for any hash (sigma^k)
    key_space: KmerHash,
    positions: usize,
}

impl DirectTable {
    pub fn new(key_space: KmerHash) -> Self {
        Self {
            min_hash: 0,
            slots: Vec::new(),
            key_space,
            positions: 0,
        }
    }

    /// Append `pos` to the list for `hash`, growing the slot range if needed.
    ///
    /// Growth doubles the covered range (clamped to `[0, key_space)`) so a
    /// run of ever-smaller or ever-larger hashes costs amortized O(1) per
    /// insert rather than O(range).
    pub fn insert(&mut self, hash: KmerHash, pos: Position) {
        debug_assert!(hash < self.key_space);
        if self.slots.is_empty() {
            self.min_hash = hash;
            self.slots.push(Vec::new());
        } else if hash < self.min_hash {
            let needed = self.min_hash - hash;
            let grow = needed.max(self.slots.len() as u64).min(self.min_hash) as usize;
            let mut grown = Vec::with_capacity(grow + self.slots.len());
            grown.resize_with(grow, Vec::new);
            grown.append(&mut self.slots);
            self.slots = grown;
            self.min_hash -= grow as u64;
        } else {
            let end = self.min_hash + self.slots.len() as u64;
            if hash >= end {
                let needed = hash - end + 1;
                let grow = needed
                    .max(self.slots.len() as u64)
                    .min(self.key_space - end);
                self.slots
                    .resize_with(self.slots.len() + grow as usize, Vec::new);
            }
        }
        self.slots[(hash - self.min_hash) as usize].push(pos);
        self.positions += 1;
    }

    #[inline]
    pub fn lookup(&self, hash: KmerHash) -> &[Position] {
        if hash < self.min_hash {
            return EMPTY_POSITIONS;
        }
        match self.slots.get((hash - self.min_hash) as usize) {
            Some(list) => list,
            None => EMPTY_POSITIONS,
        }
    }

    /// Non-empty lists for hashes in `[lo, hi)`, in hash order.
    pub fn range(&self, lo: KmerHash, hi: KmerHash) -> Vec<(KmerHash, &[Position])> {
        let end = self.min_hash + self.slots.len() as u64;
        let lo = lo.max(self.min_hash);
        let hi = hi.min(end);
        if lo >= hi {
            return Vec::new();
        }
        let start = (lo - self.min_hash) as usize;
        self.slots[start..(hi - self.min_hash) as usize]
            .iter()
            .enumerate()
            .filter(|(_, list)| !list.is_empty())
            .map(|(i, list)| (lo + i as u64, list.as_slice()))
            .collect()
    }

    /// Covered hash range as `(min_hash, slot_count)`
    pub fn bounds(&self) -> (KmerHash, usize) {
        (self.min_hash, self.slots.len())
    }

    fn shrink_to_fit(&mut self) {
        // Trim empty slots left over from geometric growth.
        let first = self.slots.iter().position(|l| !l.is_empty());
        let last = self.slots.iter().rposition(|l| !l.is_empty());
        match (first, last) {
            (Some(first), Some(last)) => {
                self.slots.truncate(last + 1);
                self.slots.drain(..first);
                self.min_hash += first as u64;
            }
            _ => {
                self.slots.clear();
                self.min_hash = 0;
            }
        }
        for list in &mut self.slots {
            list.shrink_to_fit();
        }
        self.slots.shrink_to_fit();
    }
}

/// Sparse map from hash to position list.
#[derive(Debug, Clone, Default)]
pub struct HashTable {
    map: FxHashMap<KmerHash, Vec<Position>>,
    positions: usize,
}

impl HashTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(distinct: usize) -> Self {
        Self {
            map: FxHashMap::with_capacity_and_hasher(distinct, Default::default()),
            positions: 0,
        }
    }

    #[inline]
    pub fn insert(&mut self, hash: KmerHash, pos: Position) {
        self.map.entry(hash).or_default().push(pos);
        self.positions += 1;
    }

    #[inline]
    pub fn lookup(&self, hash: KmerHash) -> &[Position] {
        self.map.get(&hash).map_or(EMPTY_POSITIONS, |l| l.as_slice())
    }

    /// Non-empty lists for hashes in `[lo, hi)`, in hash order.
    ///
    /// Probes every hash of the range when it is no wider than the number of
    /// occupied buckets, otherwise scans the buckets.
    pub fn range(&self, lo: KmerHash, hi: KmerHash) -> Vec<(KmerHash, &[Position])> {
        if lo >= hi {
            return Vec::new();
        }
        if hi - lo <= self.map.len() as u64 {
            (lo..hi)
                .filter_map(|h| self.map.get(&h).map(|l| (h, l.as_slice())))
                .collect()
        } else {
            let mut hits: Vec<_> = self
                .map
                .iter()
                .filter(|(h, _)| **h >= lo && **h < hi)
                .map(|(h, l)| (*h, l.as_slice()))
                .collect();
            hits.sort_unstable_by_key(|(h, _)| *h);
            hits
        }
    }

    fn shrink_to_fit(&mut self) {
        for list in self.map.values_mut() {
            list.shrink_to_fit();
        }
        self.map.shrink_to_fit();
    }
}

/// Backing store held by value in each single-k index.
#[derive(Debug, Clone)]
pub enum BackingStore {
    Direct(DirectTable),
    Hashed(HashTable),
}

impl BackingStore {
    /// Empty store of the given kind. `distinct_hint` pre-sizes the hash table.
    pub fn new(kind: StoreKind, key_space: KmerHash, distinct_hint: usize) -> Self {
        match kind {
            StoreKind::Direct => BackingStore::Direct(DirectTable::new(key_space)),
            StoreKind::Hashed => BackingStore::Hashed(HashTable::with_capacity(distinct_hint)),
        }
    }

    #[inline]
    pub fn insert(&mut self, hash: KmerHash, pos: Position) {
        match self {
            BackingStore::Direct(t) => t.insert(hash, pos),
            BackingStore::Hashed(t) => t.insert(hash, pos),
        }
    }

    /// Position list for `hash`; the shared empty list when absent.
    #[inline]
    pub fn lookup(&self, hash: KmerHash) -> &[Position] {
        match self {
            BackingStore::Direct(t) => t.lookup(hash),
            BackingStore::Hashed(t) => t.lookup(hash),
        }
    }

    /// Non-empty lists for hashes in `[lo, hi)`, in hash order.
    pub fn range(&self, lo: KmerHash, hi: KmerHash) -> Vec<(KmerHash, &[Position])> {
        match self {
            BackingStore::Direct(t) => t.range(lo, hi),
            BackingStore::Hashed(t) => t.range(lo, hi),
        }
    }

    pub fn kind(&self) -> StoreKind {
        match self {
            BackingStore::Direct(_) => StoreKind::Direct,
            BackingStore::Hashed(_) => StoreKind::Hashed,
        }
    }

    /// Number of distinct k-mers stored
    pub fn distinct(&self) -> usize {
        match self {
            BackingStore::Direct(t) => t.slots.iter().filter(|l| !l.is_empty()).count(),
            BackingStore::Hashed(t) => t.map.len(),
        }
    }

    /// Total number of stored positions
    pub fn position_count(&self) -> usize {
        match self {
            BackingStore::Direct(t) => t.positions,
            BackingStore::Hashed(t) => t.positions,
        }
    }

    /// Every non-empty `(hash, positions)` pair in hash order.
    pub fn buckets(&self) -> Vec<(KmerHash, &[Position])> {
        match self {
            BackingStore::Direct(t) => t.range(0, t.key_space),
            BackingStore::Hashed(t) => {
                let mut all: Vec<_> = t.map.iter().map(|(h, l)| (*h, l.as_slice())).collect();
                all.sort_unstable_by_key(|(h, _)| *h);
                all
            }
        }
    }

    /// Approximate heap footprint in bytes.
    pub fn estimated_bytes(&self) -> u64 {
        let positions = self.position_count() as u64 * size_of::<Position>() as u64;
        match self {
            BackingStore::Direct(t) => t.slots.len() as u64 * SLOT_BYTES + positions,
            BackingStore::Hashed(t) => t.map.capacity() as u64 * ENTRY_BYTES + positions,
        }
    }

    /// Release construction slack. Called once the scan is complete.
    pub fn shrink_to_fit(&mut self) {
        match self {
            BackingStore::Direct(t) => t.shrink_to_fit(),
            BackingStore::Hashed(t) => t.shrink_to_fit(),
        }
    }
}

/// Outcome of the store heuristic
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StoreChoice {
    pub kind: StoreKind,
    /// sigma^k
    pub key_space: u64,
    /// Expected number of distinct k-mers, min(sigma^k, windows)
    pub distinct_estimate: u64,
    pub direct_bytes: u64,
    pub hashed_bytes: u64,
}

impl StoreChoice {
    pub fn estimated_bytes(&self) -> u64 {
        match self.kind {
            StoreKind::Direct => self.direct_bytes,
            StoreKind::Hashed => self.hashed_bytes,
        }
    }
}

/// Pick a backing store for `windows` k-mers drawn from a space of
/// `key_space` hashes.
///
/// Direct addressing is preferred while its slot array stays under
/// `direct_max_bytes` and its total estimate stays within
/// `direct_cost_ratio` times the hash table's. Under a memory limit the other
/// layout is tried before giving up.
pub fn choose_store(key_space: u64, windows: u64, config: &IndexConfig) -> Result<StoreChoice> {
    let position_bytes = windows.saturating_mul(size_of::<Position>() as u64);
    let slot_bytes = key_space.saturating_mul(SLOT_BYTES);
    let distinct_estimate = key_space.min(windows);
    // hashbrown keeps the table at most 7/8 full
    let hashed_bytes = (distinct_estimate.saturating_mul(ENTRY_BYTES) / 7)
        .saturating_mul(8)
        .saturating_add(position_bytes);
    let direct_bytes = slot_bytes.saturating_add(position_bytes);

    let direct_fits = slot_bytes <= config.direct_max_bytes;
    let mut choice = StoreChoice {
        kind: StoreKind::Hashed,
        key_space,
        distinct_estimate,
        direct_bytes,
        hashed_bytes,
    };

    match config.store {
        StorePolicy::Direct => {
            if !direct_fits {
                return Err(IndexError::StoreTooLarge {
                    slots: key_space,
                    bytes: slot_bytes,
                    limit: config.direct_max_bytes,
                });
            }
            choice.kind = StoreKind::Direct;
        }
        StorePolicy::Hashed => choice.kind = StoreKind::Hashed,
        StorePolicy::Auto => {
            let prefer_direct =
                direct_fits && direct_bytes as f64 <= config.direct_cost_ratio * hashed_bytes as f64;
            choice.kind = if prefer_direct {
                StoreKind::Direct
            } else {
                StoreKind::Hashed
            };

            if let Some(limit) = config.memory_limit_bytes {
                if choice.estimated_bytes() > limit {
                    let alternative = match choice.kind {
                        StoreKind::Direct => StoreKind::Hashed,
                        StoreKind::Hashed if direct_fits => StoreKind::Direct,
                        StoreKind::Hashed => StoreKind::Hashed,
                    };
                    choice.kind = alternative;
                }
            }
        }
    }

    if let Some(limit) = config.memory_limit_bytes {
        if choice.estimated_bytes() > limit {
            return Err(IndexError::MemoryLimit {
                estimated: choice.estimated_bytes(),
                limit,
            });
        }
    }

    tracing::debug!(
        kind = ?choice.kind,
        key_space,
        windows,
        direct_bytes,
        hashed_bytes,
        "selected backing store"
    );

    Ok(choice)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(kind: StoreKind, entries: &[(KmerHash, Position)]) -> BackingStore {
        let mut store = BackingStore::new(kind, 1 << 20, entries.len());
        for &(h, p) in entries {
            store.insert(h, p);
        }
        store
    }

    #[test]
    fn test_direct_grows_both_ends() {
        let mut t = DirectTable::new(1000);
        t.insert(500, 0);
        t.insert(10, 1);
        t.insert(900, 2);
        t.insert(500, 3);

        assert_eq!(t.lookup(500), &[0, 3]);
        assert_eq!(t.lookup(10), &[1]);
        assert_eq!(t.lookup(900), &[2]);
        assert!(t.lookup(11).is_empty());
        assert!(t.lookup(999).is_empty());
        assert!(t.lookup(5000).is_empty());

        let (min, len) = t.bounds();
        assert!(min <= 10);
        assert!(min + len as u64 > 900);
        assert!(min + len as u64 <= 1000);
    }

    #[test]
    fn test_direct_shrink_keeps_lookups() {
        let mut store = filled(StoreKind::Direct, &[(40, 1), (7, 2), (90, 3)]);
        store.shrink_to_fit();
        assert_eq!(store.lookup(7), &[2]);
        assert_eq!(store.lookup(40), &[1]);
        assert_eq!(store.lookup(90), &[3]);
        if let BackingStore::Direct(t) = &store {
            assert_eq!(t.bounds(), (7, 84));
        }
    }

    #[test]
    fn test_absent_lookup_is_shared_sentinel() {
        for kind in [StoreKind::Direct, StoreKind::Hashed] {
            let store = filled(kind, &[(3, 0)]);
            let absent = store.lookup(4);
            assert!(absent.is_empty());
            assert!(std::ptr::eq(absent, EMPTY_POSITIONS));
        }
    }

    #[test]
    fn test_range_same_for_both_layouts() {
        let entries = [(5, 0), (6, 1), (9, 2), (6, 3), (20, 4), (2, 5)];
        let direct = filled(StoreKind::Direct, &entries);
        let hashed = filled(StoreKind::Hashed, &entries);

        // narrow range probes, wide range scans
        for (lo, hi) in [(5, 10), (0, 1 << 20), (7, 9), (21, 40)] {
            assert_eq!(direct.range(lo, hi), hashed.range(lo, hi));
        }
        assert_eq!(direct.buckets(), hashed.buckets());
        assert_eq!(direct.distinct(), 5);
        assert_eq!(hashed.position_count(), 6);
    }

    #[test]
    fn test_auto_prefers_direct_for_small_space() {
        let config = IndexConfig::default();
        let choice = choose_store(4u64.pow(6), 1_000_000, &config).unwrap();
        assert_eq!(choice.kind, StoreKind::Direct);
    }

    #[test]
    fn test_auto_prefers_hash_for_large_space() {
        let config = IndexConfig::default();
        let choice = choose_store(4u64.pow(20), 10_000, &config).unwrap();
        assert_eq!(choice.kind, StoreKind::Hashed);
    }

    #[test]
    fn test_forced_direct_too_large() {
        let config = IndexConfig::default().with_store(StorePolicy::Direct);
        assert!(matches!(
            choose_store(4u64.pow(25), 100, &config),
            Err(IndexError::StoreTooLarge { .. })
        ));
    }

    #[test]
    fn test_memory_limit() {
        let mut config = IndexConfig::default();
        config.memory_limit_bytes = Some(1024);
        assert!(matches!(
            choose_store(4u64.pow(10), 1_000_000, &config),
            Err(IndexError::MemoryLimit { .. })
        ));

        // a limit the hash table fits falls back from direct addressing
        config.memory_limit_bytes = Some(64 * 1024);
        config.direct_cost_ratio = 1000.0;
        let choice = choose_store(4u64.pow(8), 100, &config).unwrap();
        assert_eq!(choice.kind, StoreKind::Hashed);
    }
}
