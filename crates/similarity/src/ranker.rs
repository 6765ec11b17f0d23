//! Exact k-nearest-neighbour ranking over a feature matrix.
//!
//! ## Algorithm
//! For every row i (rows are independent, so they're ranked in parallel):
//! 1. Compute the Euclidean distance to every other row j != i
//! 2. Keep the k best candidates in a bounded max-heap (O(k) memory per row)
//! 3. Emit them in ascending order as ranks 1..=k
//!
//! "Best" is the total order `(distance, candidate key, row index)`, so equal
//! distances resolve by ascending subject key. The result never depends on
//! load order or on how rows are split across threads.
//!
//! Cost is O(n² · f) by construction, fine for cohorts of a few thousand rows.

use crate::error::{ConfigurationError, Result};
use crate::standardize::FeatureMatrix;
use crate::table::{NeighborRecord, SimilarityTable};
use data_loader::SubjectKey;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::{debug, instrument};

/// Euclidean distance between two equal-length vectors
#[inline]
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// A potential neighbour of the row being ranked.
///
/// Rust concept: implementing `Ord` ourselves lets `BinaryHeap` order
/// candidates by distance even though `f64` is only `PartialOrd`.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    distance: f64,
    key: SubjectKey,
    index: usize,
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then_with(|| self.key.cmp(&other.key))
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

/// Ranks the k nearest other rows for every row of a matrix.
#[derive(Debug, Clone, Copy)]
pub struct NeighborRanker {
    k: usize,
    parallel: bool,
}

impl NeighborRanker {
    /// Create a ranker keeping `k` neighbours per row
    pub fn new(k: usize) -> Self {
        Self { k, parallel: true }
    }

    /// Rank rows on the calling thread only
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// Check that k neighbours exist for every row of an `n`-row cohort.
    ///
    /// `k >= n` is an error rather than a silent reduction of k: a cohort
    /// smaller than k + 1 means the cohort or the config is wrong.
    pub fn check(&self, n: usize) -> std::result::Result<(), ConfigurationError> {
        if self.k == 0 {
            return Err(ConfigurationError::ZeroNeighborCount);
        }
        if n <= self.k {
            return Err(ConfigurationError::NeighborCountTooLarge {
                k: self.k,
                cohort_size: n,
            });
        }
        Ok(())
    }

    /// Rank every row of `matrix`; `keys[i]` identifies row i.
    #[instrument(skip_all, fields(n = matrix.n_rows(), k = self.k))]
    pub fn rank(&self, matrix: &FeatureMatrix, keys: &[SubjectKey]) -> Result<SimilarityTable> {
        if keys.len() != matrix.n_rows() {
            return Err(ConfigurationError::KeyCountMismatch {
                keys: keys.len(),
                rows: matrix.n_rows(),
            }
            .into());
        }
        self.check(matrix.n_rows())?;

        let n = matrix.n_rows();
        let groups: Vec<Vec<NeighborRecord>> = if self.parallel {
            (0..n)
                .into_par_iter()
                .map(|i| self.rank_row(i, matrix, keys))
                .collect()
        } else {
            (0..n).map(|i| self.rank_row(i, matrix, keys)).collect()
        };

        debug!("Ranked {} neighbours for each of {} rows", self.k, n);
        Ok(SimilarityTable::from_groups(self.k, groups))
    }

    /// Top-k selection for a single row.
    fn rank_row(&self, i: usize, matrix: &FeatureMatrix, keys: &[SubjectKey]) -> Vec<NeighborRecord> {
        let subject = matrix.row(i);
        let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(self.k);

        for j in 0..matrix.n_rows() {
            // Self is never a candidate
            if j == i {
                continue;
            }
            let candidate = Candidate {
                distance: euclidean_distance(subject, matrix.row(j)),
                key: keys[j],
                index: j,
            };
            if heap.len() < self.k {
                heap.push(candidate);
            } else if let Some(mut worst) = heap.peek_mut() {
                if candidate < *worst {
                    *worst = candidate;
                }
            }
        }

        heap.into_sorted_vec()
            .into_iter()
            .zip(1u32..)
            .map(|(c, rank)| NeighborRecord {
                subject: keys[i],
                comp: c.key,
                distance: c.distance,
                rank,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimilarityError;

    fn keys(ids: &[u32]) -> Vec<SubjectKey> {
        ids.iter().map(|&id| SubjectKey::new(id, 2025)).collect()
    }

    fn matrix(rows: &[&[f64]]) -> FeatureMatrix {
        let rows: Vec<Vec<f64>> = rows.iter().map(|r| r.to_vec()).collect();
        FeatureMatrix::from_rows(&rows).unwrap()
    }

    #[test]
    fn test_euclidean_distance() {
        assert_eq!(euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(euclidean_distance(&[1.5], &[1.5]), 0.0);
    }

    #[test]
    fn test_never_selects_self_even_with_identical_rows() {
        let m = matrix(&[&[1.0], &[1.0], &[5.0]]);
        let table = NeighborRanker::new(1).rank(&m, &keys(&[1, 2, 3])).unwrap();

        for record in table.records() {
            assert_ne!(record.subject, record.comp);
        }
        assert_eq!(table.neighbors_of(SubjectKey::new(1, 2025))[0].comp.player_id, 2);
        assert_eq!(table.neighbors_of(SubjectKey::new(2, 2025))[0].comp.player_id, 1);
        assert_eq!(table.neighbors_of(SubjectKey::new(1, 2025))[0].distance, 0.0);
    }

    #[test]
    fn test_ties_break_by_key_not_load_order() {
        // Rows at -1 and +1 are equidistant from the row at 0
        let m = matrix(&[&[0.0], &[1.0], &[-1.0]]);
        let table = NeighborRanker::new(1).rank(&m, &keys(&[50, 30, 10])).unwrap();
        assert_eq!(table.neighbors_of(SubjectKey::new(50, 2025))[0].comp.player_id, 10);

        // Same rows, different load order
        let m = matrix(&[&[-1.0], &[0.0], &[1.0]]);
        let table = NeighborRanker::new(1).rank(&m, &keys(&[10, 50, 30])).unwrap();
        assert_eq!(table.neighbors_of(SubjectKey::new(50, 2025))[0].comp.player_id, 10);
    }

    #[test]
    fn test_ranks_are_dense_and_distances_ascending() {
        let m = matrix(&[&[0.0, 0.0], &[1.0, 0.0], &[0.0, 3.0], &[4.0, 4.0], &[2.0, 2.0]]);
        let table = NeighborRanker::new(3).rank(&m, &keys(&[1, 2, 3, 4, 5])).unwrap();

        assert_eq!(table.len(), 15);
        for group in table.groups() {
            let ranks: Vec<u32> = group.iter().map(|r| r.rank).collect();
            assert_eq!(ranks, vec![1, 2, 3]);
            assert!(group.windows(2).all(|w| w[0].distance <= w[1].distance));
        }
    }

    #[test]
    fn test_k_must_be_smaller_than_cohort() {
        let m = matrix(&[&[0.0], &[1.0], &[2.0]]);
        let err = NeighborRanker::new(3).rank(&m, &keys(&[1, 2, 3])).unwrap_err();
        assert_eq!(
            err,
            SimilarityError::Configuration(ConfigurationError::NeighborCountTooLarge {
                k: 3,
                cohort_size: 3,
            })
        );
        assert!(NeighborRanker::new(2).rank(&m, &keys(&[1, 2, 3])).is_ok());
    }

    #[test]
    fn test_zero_k_and_key_mismatch() {
        let m = matrix(&[&[0.0], &[1.0]]);
        assert_eq!(NeighborRanker::new(0).check(2), Err(ConfigurationError::ZeroNeighborCount));
        assert!(matches!(
            NeighborRanker::new(1).rank(&m, &keys(&[1])),
            Err(SimilarityError::Configuration(ConfigurationError::KeyCountMismatch { .. }))
        ));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        // Small deterministic generator; coarse values so plenty of ties occur
        let mut state: u64 = 42;
        let mut next = || {
            state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((state >> 33) % 5) as f64
        };
        let rows: Vec<Vec<f64>> = (0..200).map(|_| vec![next(), next(), next()]).collect();
        let m = FeatureMatrix::from_rows(&rows).unwrap();
        let ids: Vec<u32> = (0..200).rev().collect();
        let k = keys(&ids);

        let parallel = NeighborRanker::new(5).rank(&m, &k).unwrap();
        let sequential = NeighborRanker::new(5).sequential().rank(&m, &k).unwrap();
        assert_eq!(parallel, sequential);
    }
}
