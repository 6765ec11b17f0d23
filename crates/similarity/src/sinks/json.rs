//! Export a similarity table as pretty-printed JSON.

use crate::table::SimilarityTable;
use crate::traits::SimilaritySink;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes the table to a file, truncating it on every replace.
#[derive(Debug, Clone)]
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SimilaritySink for JsonFileSink {
    fn name(&self) -> &str {
        "JsonFileSink"
    }

    fn replace(&mut self, table: &SimilarityTable) -> Result<usize> {
        let file = File::create(&self.path)
            .with_context(|| format!("create {}", self.path.display()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, table).context("serialize similarity table")?;
        writeln!(writer)?;
        writer.flush()?;
        Ok(table.len())
    }
}
