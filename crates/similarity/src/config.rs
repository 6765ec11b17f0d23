//! Configuration for one similarity run.

use crate::error::ConfigurationError;
use data_loader::{FeatureSchema, DEFAULT_FEATURES};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Number of comps kept per player-season when nothing else is configured
pub const DEFAULT_K: usize = 5;

/// Neighbour count and feature list for a similarity run.
///
/// Can be read from JSON; missing fields fall back to the defaults:
/// ```json
/// { "k": 5, "features": ["pts", "ast", "trb", "stl", "blk", "mp", "ts_pct"] }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimilarityConfig {
    /// Neighbours ranked per subject
    pub k: usize,
    /// Ordered feature names; must match the cohort's schema exactly
    pub features: Vec<String>,
}

impl Default for SimilarityConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            features: DEFAULT_FEATURES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SimilarityConfig {
    /// Load a config from a JSON file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Configure the neighbour count (default: 5)
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Configure the feature list (default: the seven box-score features)
    pub fn with_features<I, S>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.features = features.into_iter().map(Into::into).collect();
        self
    }

    /// Check the config on its own, independent of any cohort
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.k == 0 {
            return Err(ConfigurationError::ZeroNeighborCount);
        }
        if self.features.is_empty() {
            return Err(ConfigurationError::EmptyFeatureList);
        }
        let mut seen = HashSet::new();
        for feature in &self.features {
            if !seen.insert(feature) {
                return Err(ConfigurationError::DuplicateFeature(feature.clone()));
            }
        }
        Ok(())
    }

    /// The feature schema loaders should read for this config
    pub fn schema(&self) -> Result<FeatureSchema, ConfigurationError> {
        self.validate()?;
        // validate() already rejected the empty and duplicate cases
        FeatureSchema::new(self.features.iter().cloned())
            .map_err(|_| ConfigurationError::EmptyFeatureList)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SimilarityConfig::default();
        assert_eq!(config.k, 5);
        assert_eq!(config.features.len(), 7);
        assert!(config.validate().is_ok());
        assert_eq!(config.schema().unwrap(), FeatureSchema::default());
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let config: SimilarityConfig = serde_json::from_str(r#"{ "k": 3 }"#).unwrap();
        assert_eq!(config.k, 3);
        assert_eq!(config.features, SimilarityConfig::default().features);

        let config: SimilarityConfig =
            serde_json::from_str(r#"{ "features": ["pts", "ast"] }"#).unwrap();
        assert_eq!(config.k, DEFAULT_K);
        assert_eq!(config.features, vec!["pts", "ast"]);
    }

    #[test]
    fn test_validate_rejects_bad_configs() {
        let zero = SimilarityConfig::default().with_k(0);
        assert_eq!(zero.validate(), Err(ConfigurationError::ZeroNeighborCount));

        let empty = SimilarityConfig::default().with_features(Vec::<String>::new());
        assert_eq!(empty.validate(), Err(ConfigurationError::EmptyFeatureList));

        let dup = SimilarityConfig::default().with_features(["pts", "ast", "pts"]);
        assert_eq!(
            dup.validate(),
            Err(ConfigurationError::DuplicateFeature("pts".to_string()))
        );
    }
}
