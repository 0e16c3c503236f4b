use crate::error::{IndexError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Zero-based offset into the indexed text
pub type Position = u32;

/// Base-sigma k-mer hash, always in `[0, sigma^k)`
pub type KmerHash = u64;

/// Default ceiling for the direct-address slot array (256 MiB)
pub const DEFAULT_DIRECT_MAX_BYTES: u64 = 256 * 1024 * 1024;

/// Default tolerance for choosing the dense table over the hash table
pub const DEFAULT_DIRECT_COST_RATIO: f64 = 2.0;

/// Which backing store a single-k index uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorePolicy {
    /// Pick by estimated footprint
    #[default]
    Auto,
    /// Force the dense direct-address table
    Direct,
    /// Force the sparse hash table
    Hashed,
}

impl std::str::FromStr for StorePolicy {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(StorePolicy::Auto),
            "direct" | "dense" => Ok(StorePolicy::Direct),
            "hashed" | "hash" | "sparse" => Ok(StorePolicy::Hashed),
            other => Err(IndexError::config(format!("unknown store policy {:?}", other))),
        }
    }
}

/// How the tail of a query longer than k is confirmed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RemainderStrategy {
    /// Sub-k search on the trailing `len % k` symbols
    #[default]
    SubK,
    /// One exact-k lookup of the window that ends where the query ends
    OverlappingTile,
}

impl std::str::FromStr for RemainderStrategy {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sub_k" | "subk" => Ok(RemainderStrategy::SubK),
            "overlapping_tile" | "overlap" => Ok(RemainderStrategy::OverlappingTile),
            other => Err(IndexError::config(format!(
                "unknown remainder strategy {:?}",
                other
            ))),
        }
    }
}

/// Weights used to score k values against expected query lengths
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerWeights {
    /// Score when the query length equals k
    pub exact: f64,
    /// Score when k divides the query length
    pub divisible: f64,
    /// Penalty per unconstrained symbol of a tiling remainder
    pub remainder_penalty: f64,
    /// Penalty per unconstrained symbol of a sub-k search
    pub subk_penalty: f64,
}

impl Default for PlannerWeights {
    fn default() -> Self {
        Self {
            exact: 1.0,
            divisible: 0.9,
            remainder_penalty: 0.1,
            subk_penalty: 0.25,
        }
    }
}

/// Configuration for index construction and search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    pub store: StorePolicy,
    /// Largest slot array the direct-address table may allocate
    pub direct_max_bytes: u64,
    /// Direct addressing wins while its estimate is at most this multiple
    /// of the hash table estimate
    pub direct_cost_ratio: f64,
    /// Hard ceiling on the estimated size of any single-k store
    pub memory_limit_bytes: Option<u64>,
    pub remainder: RemainderStrategy,
    /// Worker threads for composite construction (0 = available parallelism)
    pub threads: usize,
    pub planner: PlannerWeights,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            store: StorePolicy::Auto,
            direct_max_bytes: DEFAULT_DIRECT_MAX_BYTES,
            direct_cost_ratio: DEFAULT_DIRECT_COST_RATIO,
            memory_limit_bytes: None,
            remainder: RemainderStrategy::SubK,
            threads: 0,
            planner: PlannerWeights::default(),
        }
    }
}

impl IndexConfig {
    /// Read a JSON config file. Missing fields fall back to defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| IndexError::config(format!("{}: {}", path.display(), e)))
    }

    /// Load config with priority: environment variables > config file > defaults
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Apply `KMX_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("KMX_STORE") {
            self.store = val.parse()?;
        }

        if let Ok(val) = std::env::var("KMX_THREADS") {
            self.threads = parse_env("KMX_THREADS", &val)?;
        }

        if let Ok(val) = std::env::var("KMX_DIRECT_MAX_BYTES") {
            self.direct_max_bytes = parse_env("KMX_DIRECT_MAX_BYTES", &val)?;
        }

        if let Ok(val) = std::env::var("KMX_MEMORY_LIMIT") {
            self.memory_limit_bytes = Some(parse_env("KMX_MEMORY_LIMIT", &val)?);
        }

        if let Ok(val) = std::env::var("KMX_REMAINDER") {
            self.remainder = val.parse()?;
        }

        Ok(())
    }

    /// Same config with a forced backing store
    pub fn with_store(mut self, store: StorePolicy) -> Self {
        self.store = store;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_remainder(mut self, remainder: RemainderStrategy) -> Self {
        self.remainder = remainder;
        self
    }

    /// Worker count with 0 resolved to the machine's parallelism
    pub fn effective_threads(&self) -> usize {
        if self.threads > 0 {
            self.threads
        } else {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, val: &str) -> Result<T> {
    val.trim()
        .parse()
        .map_err(|_| IndexError::config(format!("{} has invalid value {:?}", name, val)))
}
