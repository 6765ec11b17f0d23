//! Core domain types for conference player-season statistics.
//!
//! This module defines the fundamental data structures used throughout the system:
//! - Type aliases for domain clarity (PlayerId, Season)
//! - `SubjectKey`, the identifier of one player-season
//! - `FeatureSchema`, the declared ordered list of statistical features
//! - `FeatureRow` and `Cohort`, validated once at load time

use crate::error::SchemaError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

// =============================================================================
// Type Aliases
// =============================================================================

/// Unique identifier for a player in the statistics database
pub type PlayerId = u32;

/// Season, identified by the calendar year it ends in (2024-25 is 2025)
pub type Season = u16;

/// Feature names used when no schema is configured.
///
/// Points, assists, total rebounds, steals, blocks, minutes (all per game)
/// and true-shooting percentage.
pub const DEFAULT_FEATURES: [&str; 7] = ["pts", "ast", "trb", "stl", "blk", "mp", "ts_pct"];

// =============================================================================
// Subject identifiers
// =============================================================================

/// Identifies one player-season.
///
/// Ordering is by `player_id`, then `season`. The similarity ranker uses this
/// ordering to break distance ties, so it must stay a total order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubjectKey {
    pub player_id: PlayerId,
    pub season: Season,
}

impl SubjectKey {
    pub fn new(player_id: PlayerId, season: Season) -> Self {
        Self { player_id, season }
    }
}

impl fmt::Display for SubjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.player_id, self.season)
    }
}

// =============================================================================
// Feature schema
// =============================================================================

/// Declared, fixed ordered list of feature names.
///
/// Rust concept: the inner Vec is private, so the only way to build a schema
/// is through `new`, which enforces "non-empty, unique names".
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeatureSchema {
    names: Vec<String>,
}

impl FeatureSchema {
    /// Build a schema from feature names, rejecting empty or duplicated lists
    pub fn new<I, S>(names: I) -> Result<Self, SchemaError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        if names.is_empty() {
            return Err(SchemaError::EmptySchema);
        }
        let mut seen = HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(SchemaError::DuplicateFeature { name: name.clone() });
            }
        }
        Ok(Self { names })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of features (f)
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Position of a feature in the schema
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

impl Default for FeatureSchema {
    fn default() -> Self {
        Self {
            names: DEFAULT_FEATURES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

// =============================================================================
// Rows and cohorts
// =============================================================================

/// One player-season with its raw feature values.
///
/// `values` is aligned with the cohort's `FeatureSchema`. `None` marks a
/// missing value; it is imputed to 0.0 before standardization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub key: SubjectKey,
    /// Display name (e.g. "Jane Doe"); may be empty
    pub name: String,
    /// Team slug (e.g. "app-state"); may be empty
    pub team: String,
    pub values: Vec<Option<f64>>,
}

impl FeatureRow {
    /// Create a row with no display metadata.
    ///
    /// NaN values are normalized to `None`, since sources use NaN for "no data".
    pub fn new(key: SubjectKey, values: Vec<Option<f64>>) -> Self {
        Self {
            key,
            name: String::new(),
            team: String::new(),
            values: values
                .into_iter()
                .map(|v| v.filter(|x| !x.is_nan()))
                .collect(),
        }
    }

    /// Builder-style display metadata
    pub fn with_label(mut self, name: impl Into<String>, team: impl Into<String>) -> Self {
        self.name = name.into();
        self.team = team.into();
        self
    }

    /// Feature values with missing entries replaced by 0.0
    pub fn imputed(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().map(|v| v.unwrap_or(0.0))
    }
}

/// The full set of player-seasons compared in one similarity computation.
///
/// A cohort is validated once on construction and immutable afterwards,
/// so every consumer can rely on:
/// - every row has exactly `schema.len()` values
/// - every present value is finite
/// - subject keys are unique
#[derive(Debug, Clone)]
pub struct Cohort {
    schema: FeatureSchema,
    rows: Vec<FeatureRow>,
}

impl Cohort {
    /// Validate rows against the schema and build the cohort.
    ///
    /// Rows keep their load order, which is only used for output grouping.
    pub fn new(schema: FeatureSchema, rows: Vec<FeatureRow>) -> Result<Self, SchemaError> {
        let mut seen = HashSet::with_capacity(rows.len());
        for row in &rows {
            if row.values.len() != schema.len() {
                return Err(SchemaError::FeatureCountMismatch {
                    subject: row.key,
                    expected: schema.len(),
                    found: row.values.len(),
                });
            }
            for (name, value) in schema.names().iter().zip(&row.values) {
                if let Some(v) = value {
                    if v.is_infinite() {
                        return Err(SchemaError::NonFiniteValue {
                            subject: row.key,
                            feature: name.clone(),
                            value: *v,
                        });
                    }
                }
            }
            if !seen.insert(row.key) {
                return Err(SchemaError::DuplicateSubject { subject: row.key });
            }
        }
        Ok(Self { schema, rows })
    }

    pub fn schema(&self) -> &FeatureSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Number of rows (n)
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Subject keys in cohort order
    pub fn keys(&self) -> Vec<SubjectKey> {
        self.rows.iter().map(|r| r.key).collect()
    }

    /// Look up a row by subject key
    pub fn get(&self, key: SubjectKey) -> Option<&FeatureRow> {
        self.rows.iter().find(|r| r.key == key)
    }

    /// Count of missing (imputed) values across the cohort
    pub fn missing_count(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.values.iter().filter(|v| v.is_none()).count())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema(names: &[&str]) -> FeatureSchema {
        FeatureSchema::new(names.iter().copied()).unwrap()
    }

    #[test]
    fn test_subject_key_ordering() {
        let a = SubjectKey::new(1, 2025);
        let b = SubjectKey::new(1, 2026);
        let c = SubjectKey::new(2, 2024);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a.to_string(), "1/2025");
    }

    #[test]
    fn test_schema_rejects_empty_and_duplicates() {
        let empty: Vec<String> = Vec::new();
        assert_eq!(FeatureSchema::new(empty), Err(SchemaError::EmptySchema));
        assert!(matches!(
            FeatureSchema::new(["pts", "ast", "pts"]),
            Err(SchemaError::DuplicateFeature { name }) if name == "pts"
        ));
    }

    #[test]
    fn test_default_schema() {
        let schema = FeatureSchema::default();
        assert_eq!(schema.len(), 7);
        assert_eq!(schema.index_of("ts_pct"), Some(6));
        assert_eq!(schema.index_of("tov"), None);
    }

    #[test]
    fn test_nan_becomes_missing_and_imputes_to_zero() {
        let row = FeatureRow::new(SubjectKey::new(1, 2025), vec![Some(f64::NAN), None, Some(3.5)]);
        assert_eq!(row.values, vec![None, None, Some(3.5)]);
        assert_eq!(row.imputed().collect::<Vec<_>>(), vec![0.0, 0.0, 3.5]);
    }

    #[test]
    fn test_cohort_rejects_wrong_feature_count() {
        let rows = vec![
            FeatureRow::new(SubjectKey::new(1, 2025), vec![Some(1.0), Some(2.0)]),
            FeatureRow::new(SubjectKey::new(2, 2025), vec![Some(1.0)]),
        ];
        let err = Cohort::new(schema(&["pts", "ast"]), rows).unwrap_err();
        assert_eq!(
            err,
            SchemaError::FeatureCountMismatch {
                subject: SubjectKey::new(2, 2025),
                expected: 2,
                found: 1,
            }
        );
    }

    #[test]
    fn test_cohort_rejects_duplicate_subjects() {
        let rows = vec![
            FeatureRow::new(SubjectKey::new(7, 2025), vec![Some(1.0)]),
            FeatureRow::new(SubjectKey::new(7, 2025), vec![Some(2.0)]),
        ];
        let err = Cohort::new(schema(&["pts"]), rows).unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateSubject { .. }));
    }

    #[test]
    fn test_cohort_rejects_infinite_values() {
        let rows = vec![FeatureRow::new(
            SubjectKey::new(1, 2025),
            vec![Some(f64::INFINITY)],
        )];
        let err = Cohort::new(schema(&["pts"]), rows).unwrap_err();
        assert!(matches!(err, SchemaError::NonFiniteValue { ref feature, .. } if feature == "pts"));
    }

    #[test]
    fn test_cohort_accessors() {
        let rows = vec![
            FeatureRow::new(SubjectKey::new(2, 2025), vec![Some(1.0), None])
                .with_label("B Player", "troy"),
            FeatureRow::new(SubjectKey::new(1, 2025), vec![None, Some(4.0)]),
        ];
        let cohort = Cohort::new(schema(&["pts", "ast"]), rows).unwrap();

        assert_eq!(cohort.len(), 2);
        assert_eq!(cohort.missing_count(), 2);
        assert_eq!(cohort.keys(), vec![SubjectKey::new(2, 2025), SubjectKey::new(1, 2025)]);
        assert_eq!(cohort.get(SubjectKey::new(2, 2025)).unwrap().team, "troy");
        assert!(cohort.get(SubjectKey::new(3, 2025)).is_none());
    }
}
