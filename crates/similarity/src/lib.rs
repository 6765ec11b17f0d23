//! Player-season similarity engine.
//!
//! This crate provides:
//! - Standardization of a cohort's features to z-scores
//! - Exact k-nearest-neighbour ranking with deterministic tie-breaks
//! - SimilarityEngine for running both stages with validation
//! - SimilaritySink trait and implementations for persisting the result
//!
//! ## Architecture
//! Data flows one way:
//! 1. A `data_loader::FeatureSource` produces a validated `Cohort`
//! 2. `Standardization` maps every row to z-scores (population std,
//!    constant features pinned to 0)
//! 3. `NeighborRanker` picks each row's k nearest other rows by Euclidean
//!    distance, ties broken by ascending subject key
//! 4. A `SimilaritySink` replaces its stored relation with the result
//!
//! ## Example Usage
//! ```ignore
//! use similarity::{SimilarityConfig, SimilarityEngine};
//! use similarity::sinks::SqliteSimilaritySink;
//!
//! let engine = SimilarityEngine::new(SimilarityConfig::default());
//! let mut sink = SqliteSimilaritySink::with_default_table(&conn)?;
//! let run = engine.run(&cohort, &mut sink)?;
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod ranker;
pub mod sinks;
pub mod standardize;
pub mod table;
pub mod traits;

// Re-export main types
pub use config::{SimilarityConfig, DEFAULT_K};
pub use engine::{SimilarityEngine, SimilarityOutput, SimilarityRun};
pub use error::{ConfigurationError, Result, SimilarityError};
pub use ranker::{euclidean_distance, NeighborRanker};
pub use standardize::{ColumnStats, FeatureMatrix, Standardization};
pub use table::{NeighborRecord, SimilarityTable};
pub use traits::SimilaritySink;
