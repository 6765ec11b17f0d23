//! # Data Loader Crate
//!
//! This crate loads per-player season statistics into a validated `Cohort`,
//! the input of the similarity engine.
//!
//! ## Main Components
//!
//! - **types**: Core domain types (SubjectKey, FeatureSchema, FeatureRow, Cohort)
//! - **source**: The `FeatureSource` trait and the delimited-file source
//! - **parser**: Parse comma-separated statistics exports
//! - **store**: Read cohorts from the SQLite statistics database
//! - **stats**: Derived box-score metrics (true shooting)
//! - **error**: Error types for data loading
//!
//! ## Example Usage
//!
//! ```ignore
//! use data_loader::{FeatureSchema, FeatureSource, SqliteFeatureSource, store};
//! use std::path::Path;
//!
//! let conn = store::open_db(Path::new("db/ncaa_dev.db"))?;
//! let cohort = SqliteFeatureSource::with_default_view(&conn, FeatureSchema::default()).load()?;
//!
//! println!("Loaded {} player-seasons", cohort.len());
//! ```

// Public modules
pub mod error;
pub mod parser;
pub mod source;
pub mod stats;
pub mod store;
pub mod types;

// Re-export commonly used types for convenience
pub use error::{DataLoadError, Result, SchemaError};
pub use source::{DelimitedFileSource, FeatureSource};
pub use store::SqliteFeatureSource;
pub use types::{
    // Type aliases
    PlayerId,
    Season,
    // Core types
    Cohort,
    FeatureRow,
    FeatureSchema,
    SubjectKey,
    DEFAULT_FEATURES,
};
