pub mod composite;
pub mod hashing;
pub mod planner;
pub mod single;
pub mod stats;
pub mod store;
pub mod suffix_array;
pub mod types;

pub use composite::MultiKIndex;
pub use planner::{KPlanner, QueryLengthDistribution};
pub use single::KmerIndex;
pub use stats::IndexStats;
pub use store::{BackingStore, StoreKind};
pub use suffix_array::SuffixArray;
pub use types::*;
