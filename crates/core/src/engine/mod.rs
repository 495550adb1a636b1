//! Request-scoped neighbor scoring.
//!
//! `similarity` compares two rating vectors, `neighborhood` ranks the
//! population against one target user, and `scoring` turns that ranking into
//! predicted product scores. Everything here is pure; I/O lives in the
//! service.

mod neighborhood;
pub use neighborhood::{NeighborhoodBuilder, rank_neighbors};

mod scoring;
pub use scoring::{ScoringEngine, rank_entries};

mod similarity;
pub use similarity::{co_rated_count, similarity, similarity_with};
