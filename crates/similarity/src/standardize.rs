//! Z-score standardization of a cohort's feature matrix.
//!
//! ## Algorithm
//! For each feature column j, over all n rows (missing values already 0.0):
//! 1. mean[j] = Σ x / n
//! 2. std[j]  = sqrt(Σ (x - mean[j])² / n)   (population, divide by n)
//! 3. if every value in the column is identical, std[j] = 1.0 instead
//! 4. z[i][j] = (x[i][j] - mean[j]) / std[j]
//!
//! A constant column therefore contributes exactly 0 to every z-score and
//! stops discriminating between rows, rather than dividing by zero.

use data_loader::Cohort;
use serde::Serialize;
use tracing::debug;

/// Dense row-major matrix of feature values, one row per cohort row.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    n_rows: usize,
    dim: usize,
    values: Vec<f64>, // concatenated rows of length `dim`
}

impl FeatureMatrix {
    /// Raw (unstandardized) values of a cohort, missing values imputed to 0.0
    pub fn from_cohort(cohort: &Cohort) -> Self {
        let dim = cohort.schema().len();
        let mut values = Vec::with_capacity(cohort.len() * dim);
        for row in cohort.rows() {
            values.extend(row.imputed());
        }
        Self {
            n_rows: cohort.len(),
            dim,
            values,
        }
    }

    /// Build from explicit rows.
    ///
    /// Returns `None` if the rows don't all have the same length.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let dim = rows.first().map(|r| r.len()).unwrap_or(0);
        if rows.iter().any(|r| r.len() != dim) {
            return None;
        }
        Some(Self {
            n_rows: rows.len(),
            dim,
            values: rows.concat(),
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    /// Number of features per row
    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn row(&self, i: usize) -> &[f64] {
        let start = i * self.dim;
        &self.values[start..start + self.dim]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        (0..self.n_rows).map(move |i| self.row(i))
    }

    fn column(&self, j: usize) -> impl Iterator<Item = f64> + Clone + '_ {
        self.values.iter().skip(j).step_by(self.dim.max(1)).copied()
    }
}

/// Mean and standard deviation of one feature column
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColumnStats {
    pub mean: f64,
    /// Standard deviation actually divided by (1.0 for constant columns)
    pub std_dev: f64,
    /// Every row had the same value for this feature
    pub constant: bool,
}

impl ColumnStats {
    fn of(values: impl Iterator<Item = f64> + Clone) -> Self {
        let mut iter = values.clone();
        let Some(first) = iter.next() else {
            return Self { mean: 0.0, std_dev: 1.0, constant: true };
        };
        // Exact comparison so the z-score is exactly 0, not mean-rounding noise
        if iter.all(|v| v == first) {
            return Self { mean: first, std_dev: 1.0, constant: true };
        }

        let (sum, n) = values.clone().fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
        let n = n as f64;
        let mean = sum / n;
        let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();
        if std_dev == 0.0 {
            Self { mean, std_dev: 1.0, constant: true }
        } else {
            Self { mean, std_dev, constant: false }
        }
    }
}

/// Result of standardizing a cohort: the z-score matrix and the parameters used.
#[derive(Debug, Clone)]
pub struct Standardization {
    /// z-scores, same shape and row order as the input
    pub matrix: FeatureMatrix,
    /// Per-feature statistics, in schema order
    pub columns: Vec<ColumnStats>,
}

impl Standardization {
    /// Standardize a cohort's imputed feature values.
    pub fn fit(cohort: &Cohort) -> Self {
        let result = Self::fit_matrix(&FeatureMatrix::from_cohort(cohort));
        let names = cohort.schema().names();
        for j in result.constant_features() {
            debug!("Feature {} is constant across the cohort; z-score fixed at 0", names[j]);
        }
        result
    }

    /// Standardize an arbitrary matrix column by column.
    pub fn fit_matrix(raw: &FeatureMatrix) -> Self {
        let columns: Vec<ColumnStats> = (0..raw.dim())
            .map(|j| ColumnStats::of(raw.column(j)))
            .collect();

        let mut values = Vec::with_capacity(raw.values.len());
        for row in raw.rows() {
            values.extend(
                row.iter()
                    .zip(&columns)
                    .map(|(x, stats)| (x - stats.mean) / stats.std_dev),
            );
        }

        Self {
            matrix: FeatureMatrix {
                n_rows: raw.n_rows(),
                dim: raw.dim(),
                values,
            },
            columns,
        }
    }

    pub fn means(&self) -> Vec<f64> {
        self.columns.iter().map(|c| c.mean).collect()
    }

    pub fn std_devs(&self) -> Vec<f64> {
        self.columns.iter().map(|c| c.std_dev).collect()
    }

    /// Indices of features that were constant (std substituted with 1.0)
    pub fn constant_features(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.constant)
            .map(|(j, _)| j)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use data_loader::{FeatureRow, FeatureSchema, SubjectKey};

    const TOLERANCE: f64 = 1e-4;

    fn cohort(names: &[&str], rows: &[&[Option<f64>]]) -> Cohort {
        let schema = FeatureSchema::new(names.iter().copied()).unwrap();
        let rows = rows
            .iter()
            .enumerate()
            .map(|(i, values)| FeatureRow::new(SubjectKey::new(i as u32, 2025), values.to_vec()))
            .collect();
        Cohort::new(schema, rows).unwrap()
    }

    #[test]
    fn test_population_std_zscores() {
        let cohort = cohort(
            &["x", "y"],
            &[
                &[Some(0.0), Some(0.0)],
                &[Some(2.0), Some(0.0)],
                &[Some(4.0), Some(0.0)],
            ],
        );
        let result = Standardization::fit(&cohort);

        assert!((result.columns[0].mean - 2.0).abs() < 1e-12);
        assert!((result.columns[0].std_dev - 1.632_993).abs() < TOLERANCE);

        let expected = [-1.2247, 0.0, 1.2247];
        for (i, want) in expected.iter().enumerate() {
            let z = result.matrix.row(i)[0];
            assert!((z - want).abs() < TOLERANCE, "row {}: {} vs {}", i, z, want);
        }
    }

    #[test]
    fn test_zero_variance_feature_is_zero() {
        let cohort = cohort(
            &["x", "c"],
            &[
                &[Some(1.0), Some(0.1)],
                &[Some(5.0), Some(0.1)],
                &[Some(9.0), Some(0.1)],
            ],
        );
        let result = Standardization::fit(&cohort);

        assert_eq!(result.constant_features(), vec![1]);
        assert_eq!(result.columns[1].std_dev, 1.0);
        for row in result.matrix.rows() {
            assert_eq!(row[1], 0.0);
            assert!(row[0].is_finite());
        }
    }

    #[test]
    fn test_missing_values_impute_to_zero_before_stats() {
        let cohort = cohort(&["x"], &[&[None], &[Some(4.0)]]);
        let result = Standardization::fit(&cohort);

        assert_eq!(result.means(), vec![2.0]);
        assert_eq!(result.std_devs(), vec![2.0]);
        assert_eq!(result.matrix.row(0), &[-1.0]);
        assert_eq!(result.matrix.row(1), &[1.0]);
    }

    #[test]
    fn test_standardized_columns_have_zero_mean_unit_std() {
        let raw = FeatureMatrix::from_rows(&[
            vec![10.0, 0.3],
            vec![14.0, 0.5],
            vec![3.0, 0.9],
            vec![22.0, 0.4],
        ])
        .unwrap();
        let result = Standardization::fit_matrix(&raw);
        let again = Standardization::fit_matrix(&result.matrix);

        for stats in &again.columns {
            assert!(stats.mean.abs() < 1e-12);
            assert!((stats.std_dev - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn test_from_rows_rejects_ragged_input() {
        assert!(FeatureMatrix::from_rows(&[vec![1.0, 2.0], vec![1.0]]).is_none());
    }
}
