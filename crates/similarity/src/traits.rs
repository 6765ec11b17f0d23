//! Core traits for the similarity engine.
//!
//! This module defines the SimilaritySink trait that allows the computed
//! table to be persisted anywhere (SQLite, JSON, memory) without the engine
//! knowing where.

use crate::table::SimilarityTable;
use anyhow::Result;

/// Consumer of a finished similarity table.
///
/// ## Contract
/// - `replace` swaps out whatever the sink held before for `table`
///   (full replacement, never a merge), so writing the same table twice
///   leaves the same contents
/// - rank order within a subject must be preserved
/// - a failing sink never invalidates the in-memory table; the engine
///   returns the table either way
pub trait SimilaritySink {
    /// Returns the name of this sink (for logging/debugging)
    fn name(&self) -> &str;

    /// Replace the persisted relation with `table`.
    ///
    /// # Returns
    /// * `Ok(usize)` - number of records written
    /// * `Err` - if persistence failed
    fn replace(&mut self, table: &SimilarityTable) -> Result<usize>;
}
