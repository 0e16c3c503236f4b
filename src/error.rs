//! Error types for kmx

use thiserror::Error;

/// Result type alias using [`IndexError`]
pub type Result<T> = std::result::Result<T, IndexError>;

/// Errors raised while building or querying an index.
///
/// Construction errors abort the build and leave nothing behind. Domain errors
/// are reported per query and never touch index state, so a failed query has no
/// effect on later ones.
#[derive(Error, Debug)]
pub enum IndexError {
    /// k must be at least 2
    #[error("invalid k = {k}: k must be greater than 1")]
    InvalidK { k: usize },

    /// sigma^k does not fit the 64-bit hash space
    #[error("hash space overflow: {sigma}^{k} does not fit in 64 bits")]
    HashOverflow { sigma: usize, k: usize },

    /// Direct addressing was forced but the slot array exceeds its ceiling
    #[error("direct-address table of {slots} slots needs {bytes} bytes, above the {limit}-byte ceiling")]
    StoreTooLarge { slots: u64, bytes: u64, limit: u64 },

    /// No backing store fits the configured memory limit
    #[error("estimated index size of {estimated} bytes exceeds the memory limit of {limit} bytes")]
    MemoryLimit { estimated: u64, limit: u64 },

    /// Text does not fit the 32-bit position range
    #[error("text of {len} symbols exceeds the addressable position range")]
    TextTooLong { len: usize },

    /// A composite index needs at least one k
    #[error("no k values requested")]
    NoKValues,

    /// A build task finished without reporting a result
    #[error("build task for k = {k} did not complete")]
    BuildAborted { k: usize },

    /// Symbol outside the alphabet
    #[error("symbol {symbol:#04x} at offset {offset} is not in the alphabet")]
    InvalidSymbol { offset: usize, symbol: u8 },

    /// Query longer than the indexed text
    #[error("query of length {query_len} is longer than the indexed text ({text_len})")]
    QueryTooLong { query_len: usize, text_len: usize },

    #[error("empty query")]
    EmptyQuery,

    /// Worker thread could not be started
    #[error("failed to spawn build worker: {0}")]
    Spawn(#[source] std::io::Error),

    /// Task submitted to a pool that is draining or stopped
    #[error("build pool is not running")]
    PoolStopped,

    #[error("invalid alphabet: {0}")]
    InvalidAlphabet(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl IndexError {
    /// True for errors that only concern one query (the index stays usable).
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            IndexError::InvalidSymbol { .. }
                | IndexError::QueryTooLong { .. }
                | IndexError::EmptyQuery
        )
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        IndexError::Config(msg.into())
    }
}
