//! Match identity resolution
//!
//! Providers never share a primary key, so equivalence between their
//! fixture records is decided here: coarse name similarity gated by a
//! both-sides threshold, a time-window candidate pool, and persisted
//! link decisions so repeat polls skip the fuzzy search.

pub mod linker;
pub mod normalize;

pub use linker::MatchLinker;
pub use normalize::{names_equal, normalize, similarity};
