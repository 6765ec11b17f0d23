//! Sink that keeps the last table in memory.
//!
//! Used for dry runs and tests.

use crate::table::SimilarityTable;
use crate::traits::SimilaritySink;
use anyhow::Result;

#[derive(Debug, Default)]
pub struct MemorySink {
    table: Option<SimilarityTable>,
    replacements: usize,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The most recently written table, if any
    pub fn table(&self) -> Option<&SimilarityTable> {
        self.table.as_ref()
    }

    /// How many times `replace` was called
    pub fn replacements(&self) -> usize {
        self.replacements
    }
}

impl SimilaritySink for MemorySink {
    fn name(&self) -> &str {
        "MemorySink"
    }

    fn replace(&mut self, table: &SimilarityTable) -> Result<usize> {
        self.table = Some(table.clone());
        self.replacements += 1;
        Ok(table.len())
    }
}
