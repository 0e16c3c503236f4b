//! Utility functions and data structures.
//!
//! ## Modules
//!
//! - [`alphabet`] - Symbol set and rank lookup table
//! - [`generator`] - Seedable random texts and queries
//! - [`sequence`] - Raw and FASTA text loading
//! - [`progress`] - Terminal spinner (no-op without the `progress` feature)

pub mod alphabet;
pub mod generator;
pub mod progress;
pub mod sequence;

pub use alphabet::Alphabet;
pub use generator::SequenceGenerator;
pub use sequence::{load_sequence, parse_sequence, SequenceFormat};
