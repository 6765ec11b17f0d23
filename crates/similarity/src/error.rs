//! Error types for the similarity engine.

use data_loader::SchemaError;
use thiserror::Error;

/// The requested computation can't be satisfied by this configuration/cohort.
///
/// Raised before any distance is computed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Fewer than k other rows to choose neighbours from
    #[error("Cannot rank {k} neighbours in a cohort of {cohort_size} (need at least {} rows)", .k + 1)]
    NeighborCountTooLarge { k: usize, cohort_size: usize },

    #[error("Neighbour count k must be at least 1")]
    ZeroNeighborCount,

    #[error("No features configured")]
    EmptyFeatureList,

    #[error("Feature {0} is configured more than once")]
    DuplicateFeature(String),

    /// Subject keys and matrix rows must line up one to one
    #[error("{keys} subject keys given for {rows} matrix rows")]
    KeyCountMismatch { keys: usize, rows: usize },
}

/// Errors returned by the similarity computation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimilarityError {
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, SimilarityError>;
