//! Sink implementations for the similarity engine.
//!
//! This module contains the concrete destinations a computed
//! SimilarityTable can be written to.

pub mod json;
pub mod memory;
pub mod sqlite;

// Re-export for convenience
pub use json::JsonFileSink;
pub use memory::MemorySink;
pub use sqlite::{SqliteSimilaritySink, StoredComp};
