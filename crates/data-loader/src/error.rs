//! Error types for the data-loader crate.
//!
//! Two layers:
//! - `SchemaError` describes a cohort whose rows don't agree with the
//!   declared feature schema. It is fatal for the whole cohort.
//! - `DataLoadError` wraps everything that can go wrong while reading a
//!   source (I/O, parsing, SQLite) and carries `SchemaError` through.

use crate::types::SubjectKey;
use thiserror::Error;

/// A row or a source disagrees with the declared feature schema.
///
/// Rows are never dropped or padded to make a cohort fit; any of these
/// aborts loading for the whole cohort.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaError {
    /// Schema has no features at all
    #[error("Feature schema is empty")]
    EmptySchema,

    /// The same feature name appears twice in a schema
    #[error("Feature {name} appears more than once in the schema")]
    DuplicateFeature { name: String },

    /// A row's feature vector has the wrong length
    #[error("Subject {subject} has {found} feature values but the schema declares {expected}")]
    FeatureCountMismatch {
        subject: SubjectKey,
        expected: usize,
        found: usize,
    },

    /// A declared feature is not provided by the source
    #[error("Feature {name} is not present in {source_name}")]
    MissingFeature { name: String, source_name: String },

    /// Two schemas that must be identical are not (names or order)
    #[error("Schema mismatch: expected [{}], found [{}]", .expected.join(", "), .found.join(", "))]
    SchemaMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },

    /// Two rows share a subject key
    #[error("Subject {subject} appears more than once in the cohort")]
    DuplicateSubject { subject: SubjectKey },

    /// A present value is infinite
    #[error("Subject {subject} has a non-finite value for {feature}: {value}")]
    NonFiniteValue {
        subject: SubjectKey,
        feature: String,
        value: f64,
    },

    /// A table or column name is not a plain SQL identifier
    #[error("Invalid identifier: {0:?}")]
    InvalidIdentifier(String),
}

/// Errors that can occur during data loading and parsing
#[derive(Error, Debug)]
pub enum DataLoadError {
    /// File could not be found or opened
    #[error("Failed to open file: {path}")]
    FileNotFound { path: String },

    /// I/O error occurred while reading file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Line in data file couldn't be parsed
    #[error("Parse error at line {line} in {file}: {reason}")]
    ParseError {
        file: String,
        line: usize,
        reason: String,
    },

    /// Expected number of fields in a line doesn't match actual
    #[error("Expected {expected} fields but found {found} in line {line}")]
    FieldCountMismatch {
        expected: usize,
        found: usize,
        line: usize,
    },

    /// The source is readable but its rows don't fit the schema
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Query against the statistics database failed
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

/// Convenience type alias for Results in this crate
pub type Result<T> = std::result::Result<T, DataLoadError>;
