//! # kmx - exact-match k-mer substring index
//!
//! kmx indexes a text over a small alphabet (DNA, protein, or any symbol set
//! up to 255 symbols) by hashing every k-length window, and answers exact
//! substring queries of any length from those hashes.
//!
//! ## Architecture
//!
//! - [`index`] - Rank hashing, backing stores, single-k and multi-k indexes,
//!   k planning, and the suffix-array baseline
//! - [`result`] - Lazy, bitmask-filtered result views
//! - [`pool`] - Worker pool used for parallel construction
//! - [`output`] - Colored hit printing
//! - [`utils`] - Alphabets, sequence loading, and random generators
//!
//! ## Quick Start
//!
//! ```
//! use kmx::index::{IndexConfig, MultiKIndex};
//! use kmx::utils::Alphabet;
//! use std::sync::Arc;
//!
//! let text = b"GATTACAGATTACA";
//! let index = MultiKIndex::build(text, &[3, 5], Arc::new(Alphabet::dna()), &IndexConfig::default())?;
//!
//! let hits = index.search(b"ATTACA")?.to_vector(true);
//! assert_eq!(hits, vec![1, 8]);
//! # Ok::<(), kmx::IndexError>(())
//! ```
//!
//! ## Search strategy
//!
//! Each single-k index answers three query shapes:
//!
//! 1. **Exact** (`len == k`) - one hash lookup
//! 2. **Sub-k** (`len < k`) - a contiguous range of hashes sharing the query
//!    as prefix, plus the text's last `k - 1` symbols
//! 3. **Tiling** (`len > k`) - non-overlapping k-tiles chained by offset,
//!    with the remainder resolved by sub-k search or an overlapping tile
//!
//! Results borrow the index's position lists and are filtered with a bitmask
//! instead of being copied.

pub mod error;
pub mod index;
pub mod output;
pub mod pool;
pub mod result;
pub mod utils;

pub use error::{IndexError, Result};
pub use index::{IndexConfig, KmerIndex, MultiKIndex};
pub use result::ResultView;
