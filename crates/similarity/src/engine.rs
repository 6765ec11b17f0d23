//! The SimilarityEngine orchestrates one similarity run.
//!
//! Stages, strictly in this order:
//! 1. Validate the config (k, feature list)
//! 2. Check the cohort's schema against the configured features
//! 3. Check k against the cohort size (before any distance is computed)
//! 4. Standardize
//! 5. Rank neighbours
//! 6. Optionally hand the table to a sink

use crate::config::SimilarityConfig;
use crate::error::Result;
use crate::ranker::NeighborRanker;
use crate::standardize::Standardization;
use crate::table::SimilarityTable;
use crate::traits::SimilaritySink;
use data_loader::{Cohort, SchemaError};
use tracing::{debug, info, instrument, warn};

/// Everything one computation produced
#[derive(Debug, Clone)]
pub struct SimilarityOutput {
    pub table: SimilarityTable,
    /// Means and standard deviations the z-scores were computed with
    pub standardization: Standardization,
}

/// Result of `SimilarityEngine::run`.
///
/// The computed output is always present; `persisted` tells whether the
/// sink accepted it.
#[derive(Debug)]
pub struct SimilarityRun {
    pub output: SimilarityOutput,
    pub persisted: anyhow::Result<usize>,
}

/// Computes ranked comps for every row of a cohort.
///
/// ## Usage
/// ```ignore
/// let engine = SimilarityEngine::new(SimilarityConfig::default().with_k(5));
/// let output = engine.compute(&cohort)?;
///
/// for comp in output.table.neighbors_of(subject) {
///     println!("{}. {} ({:.3})", comp.rank, comp.comp, comp.distance);
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    config: SimilarityConfig,
    parallel: bool,
}

impl SimilarityEngine {
    /// Create a new engine for the given config.
    pub fn new(config: SimilarityConfig) -> Self {
        Self {
            config,
            parallel: true,
        }
    }

    /// Rank rows on the calling thread only (results are identical either way)
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn config(&self) -> &SimilarityConfig {
        &self.config
    }

    fn ranker(&self) -> NeighborRanker {
        let ranker = NeighborRanker::new(self.config.k);
        if self.parallel { ranker } else { ranker.sequential() }
    }

    /// Check that the cohort carries exactly the configured features, in order.
    pub fn check_schema(&self, cohort: &Cohort) -> Result<()> {
        let found = cohort.schema().names();
        if found != self.config.features.as_slice() {
            return Err(SchemaError::SchemaMismatch {
                expected: self.config.features.clone(),
                found: found.to_vec(),
            }
            .into());
        }
        Ok(())
    }

    /// Validate and standardize without ranking.
    pub fn standardize(&self, cohort: &Cohort) -> Result<Standardization> {
        self.config.validate()?;
        self.check_schema(cohort)?;
        Ok(Standardization::fit(cohort))
    }

    /// Run the full computation on a cohort.
    ///
    /// # Returns
    /// * `Ok(SimilarityOutput)` - k ranked comps for every row
    /// * `Err(SimilarityError)` - config, schema or cohort-size problems;
    ///   nothing is computed in that case
    #[instrument(skip_all, fields(rows = cohort.len(), k = self.config.k))]
    pub fn compute(&self, cohort: &Cohort) -> Result<SimilarityOutput> {
        self.config.validate()?;
        self.check_schema(cohort)?;
        let ranker = self.ranker();
        ranker.check(cohort.len())?;

        let standardization = Standardization::fit(cohort);
        debug!(
            "Standardized {} features ({} constant)",
            standardization.columns.len(),
            standardization.constant_features().len()
        );

        let table = ranker.rank(&standardization.matrix, &cohort.keys())?;
        info!(
            "Computed {} similarity rows for {} players",
            table.len(),
            table.subject_count()
        );

        Ok(SimilarityOutput {
            table,
            standardization,
        })
    }

    /// Compute, then replace the sink's contents with the result.
    ///
    /// A sink failure is reported in `SimilarityRun::persisted` and logged;
    /// it never discards the computed table.
    pub fn run(&self, cohort: &Cohort, sink: &mut dyn SimilaritySink) -> Result<SimilarityRun> {
        let output = self.compute(cohort)?;

        let persisted = sink.replace(&output.table);
        match &persisted {
            Ok(written) => info!("{} wrote {} records", sink.name(), written),
            Err(e) => warn!("{} failed: {:#}", sink.name(), e),
        }

        Ok(SimilarityRun { output, persisted })
    }
}

impl Default for SimilarityEngine {
    fn default() -> Self {
        Self::new(SimilarityConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigurationError, SimilarityError};
    use crate::sinks::MemorySink;
    use data_loader::{FeatureRow, FeatureSchema, SubjectKey};

    fn cohort(names: &[&str], values: &[f64]) -> Cohort {
        let schema = FeatureSchema::new(names.iter().copied()).unwrap();
        let rows = values
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                FeatureRow::new(SubjectKey::new(i as u32 + 1, 2025), vec![Some(v); names.len()])
            })
            .collect();
        Cohort::new(schema, rows).unwrap()
    }

    struct FailingSink;

    impl SimilaritySink for FailingSink {
        fn name(&self) -> &str {
            "FailingSink"
        }

        fn replace(&mut self, _table: &SimilarityTable) -> anyhow::Result<usize> {
            anyhow::bail!("disk full")
        }
    }

    #[test]
    fn test_schema_mismatch_is_rejected() {
        let engine = SimilarityEngine::new(SimilarityConfig::default().with_features(["ast", "pts"]));
        let err = engine.compute(&cohort(&["pts", "ast"], &[1.0, 2.0, 3.0])).unwrap_err();
        assert!(matches!(err, SimilarityError::Schema(SchemaError::SchemaMismatch { .. })));
    }

    #[test]
    fn test_small_cohort_fails_fast() {
        let engine = SimilarityEngine::new(SimilarityConfig::default().with_k(5).with_features(["pts"]));
        let err = engine.compute(&cohort(&["pts"], &[1.0, 2.0, 3.0, 4.0, 5.0])).unwrap_err();
        assert_eq!(
            err,
            SimilarityError::Configuration(ConfigurationError::NeighborCountTooLarge {
                k: 5,
                cohort_size: 5,
            })
        );
    }

    #[test]
    fn test_run_writes_to_sink() {
        let engine = SimilarityEngine::new(SimilarityConfig::default().with_k(1).with_features(["pts"]));
        let mut sink = MemorySink::new();
        let run = engine.run(&cohort(&["pts"], &[1.0, 2.0, 4.0]), &mut sink).unwrap();

        assert_eq!(run.persisted.unwrap(), 3);
        assert_eq!(sink.table(), Some(&run.output.table));
    }

    #[test]
    fn test_sink_failure_keeps_result() {
        let engine = SimilarityEngine::new(SimilarityConfig::default().with_k(1).with_features(["pts"]));
        let run = engine.run(&cohort(&["pts"], &[1.0, 2.0, 4.0]), &mut FailingSink).unwrap();

        assert!(run.persisted.is_err());
        assert_eq!(run.output.table.len(), 3);
    }

    #[test]
    fn test_standardize_reports_parameters() {
        let engine = SimilarityEngine::new(SimilarityConfig::default().with_features(["pts"]));
        let stats = engine.standardize(&cohort(&["pts"], &[0.0, 2.0, 4.0])).unwrap();
        assert_eq!(stats.means(), vec![2.0]);
    }
}
