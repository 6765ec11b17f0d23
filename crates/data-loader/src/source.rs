//! The feature-table seam between storage and the similarity engine.

use crate::error::Result;
use crate::parser;
use crate::types::{Cohort, FeatureSchema};
use std::path::PathBuf;

/// Anything that can produce a validated cohort.
///
/// Implementations must fail with a `SchemaError` rather than drop or pad
/// rows that don't fit the schema.
pub trait FeatureSource {
    /// Human-readable description of where rows come from (for logging)
    fn describe(&self) -> String;

    /// Load the full cohort
    fn load(&self) -> Result<Cohort>;
}

/// Reads a comma-separated statistics export from disk.
pub struct DelimitedFileSource {
    path: PathBuf,
    schema: FeatureSchema,
}

impl DelimitedFileSource {
    pub fn new(path: impl Into<PathBuf>, schema: FeatureSchema) -> Self {
        Self {
            path: path.into(),
            schema,
        }
    }
}

impl FeatureSource for DelimitedFileSource {
    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }

    fn load(&self) -> Result<Cohort> {
        parser::parse_cohort(&self.path, &self.schema)
    }
}

/// Already-built cohort; useful for tests and callers that assemble rows
/// themselves.
impl FeatureSource for Cohort {
    fn describe(&self) -> String {
        format!("in-memory cohort of {} rows", self.len())
    }

    fn load(&self) -> Result<Cohort> {
        Ok(self.clone())
    }
}
