//! Search results: the packed validity mask and the lazy view built on it.

pub mod bitmask;
pub mod view;

pub use bitmask::Bitmask;
pub use view::{Cursor, Iter, ResultView};
