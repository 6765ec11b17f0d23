//! Ranked neighbour records and the per-run similarity table.

use data_loader::SubjectKey;
use serde::Serialize;
use std::collections::HashMap;

/// One (subject, comp) pair: `comp` is the subject's `rank`-th nearest row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NeighborRecord {
    pub subject: SubjectKey,
    pub comp: SubjectKey,
    pub distance: f64,
    /// 1-based, dense per subject
    pub rank: u32,
}

/// All neighbour records for one cohort and one k.
///
/// Records are grouped by subject in cohort order; within a subject they
/// are in rank order. Every subject has exactly `k` records, so subject `i`
/// occupies `records[i * k..(i + 1) * k]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityTable {
    k: usize,
    records: Vec<NeighborRecord>,
    #[serde(skip)]
    positions: HashMap<SubjectKey, usize>,
}

impl SimilarityTable {
    /// Assemble a table from per-subject neighbour lists (cohort order).
    ///
    /// Callers guarantee each list has exactly `k` records.
    pub(crate) fn from_groups(k: usize, groups: Vec<Vec<NeighborRecord>>) -> Self {
        let mut positions = HashMap::with_capacity(groups.len());
        let mut records = Vec::with_capacity(groups.len() * k);
        for (i, group) in groups.into_iter().enumerate() {
            debug_assert_eq!(group.len(), k);
            if let Some(first) = group.first() {
                positions.insert(first.subject, i);
            }
            records.extend(group);
        }
        Self {
            k,
            records,
            positions,
        }
    }

    /// Neighbours kept per subject
    pub fn k(&self) -> usize {
        self.k
    }

    /// All records, grouped by subject, rank order preserved
    pub fn records(&self) -> &[NeighborRecord] {
        &self.records
    }

    /// Number of subjects ranked
    pub fn subject_count(&self) -> usize {
        self.positions.len()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// A subject's comps in rank order (empty if the subject isn't in the table)
    pub fn neighbors_of(&self, subject: SubjectKey) -> &[NeighborRecord] {
        self.positions
            .get(&subject)
            .map(|&i| &self.records[i * self.k..(i + 1) * self.k])
            .unwrap_or(&[])
    }

    /// Per-subject slices in cohort order
    pub fn groups(&self) -> impl Iterator<Item = &[NeighborRecord]> + '_ {
        self.records.chunks(self.k.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(subject: u32, comp: u32, distance: f64, rank: u32) -> NeighborRecord {
        NeighborRecord {
            subject: SubjectKey::new(subject, 2025),
            comp: SubjectKey::new(comp, 2025),
            distance,
            rank,
        }
    }

    #[test]
    fn test_lookup_by_subject() {
        let table = SimilarityTable::from_groups(
            2,
            vec![
                vec![record(5, 6, 0.5, 1), record(5, 7, 0.9, 2)],
                vec![record(6, 5, 0.5, 1), record(6, 7, 0.6, 2)],
            ],
        );

        assert_eq!(table.len(), 4);
        assert_eq!(table.subject_count(), 2);
        let comps: Vec<u32> = table
            .neighbors_of(SubjectKey::new(6, 2025))
            .iter()
            .map(|r| r.comp.player_id)
            .collect();
        assert_eq!(comps, vec![5, 7]);
        assert!(table.neighbors_of(SubjectKey::new(9, 2025)).is_empty());
        assert_eq!(table.groups().count(), 2);
    }

    #[test]
    fn test_serializes_records_only() {
        let table = SimilarityTable::from_groups(1, vec![vec![record(1, 2, 1.5, 1)]]);
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["k"], 1);
        assert_eq!(json["records"][0]["comp"]["player_id"], 2);
        assert!(json.get("positions").is_none());
    }
}
