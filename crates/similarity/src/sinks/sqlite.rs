//! Persist similarity tables in the SQLite statistics database.
//!
//! Layout matches what downstream queries expect:
//! ```text
//! player_id, season, comp_player_id, comp_season, distance, rank
//! PRIMARY KEY (player_id, season, comp_player_id, comp_season)
//! ```
//! Every `replace` deletes all rows and inserts the new table inside one
//! transaction, so readers never see a half-written ranking.

use crate::table::{NeighborRecord, SimilarityTable};
use crate::traits::SimilaritySink;
use anyhow::{Context, Result};
use data_loader::store::validate_identifier;
use data_loader::SubjectKey;
use rusqlite::{params, Connection};
use tracing::{debug, instrument};

/// Table holding the 2024-25 Sun Belt comps
pub const DEFAULT_TABLE: &str = "player_similarity_sun_belt_2024_25";

/// One persisted comp, with the comp's display name when it could be joined
#[derive(Debug, Clone, PartialEq)]
pub struct StoredComp {
    pub record: NeighborRecord,
    pub comp_name: Option<String>,
}

pub struct SqliteSimilaritySink<'c> {
    conn: &'c Connection,
    table: String,
}

impl<'c> SqliteSimilaritySink<'c> {
    /// Create a sink writing to `table`; the name must be a plain identifier.
    pub fn new(conn: &'c Connection, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_identifier(&table)?;
        Ok(Self { conn, table })
    }

    pub fn with_default_table(conn: &'c Connection) -> Result<Self> {
        Self::new(conn, DEFAULT_TABLE)
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// Create the similarity table if it doesn't exist yet
    pub fn init_schema(&self) -> Result<()> {
        self.conn
            .execute_batch(&format!(
                r#"
                CREATE TABLE IF NOT EXISTS {table} (
                    player_id      INTEGER NOT NULL,
                    season         INTEGER NOT NULL,
                    comp_player_id INTEGER NOT NULL,
                    comp_season    INTEGER NOT NULL,
                    distance       REAL    NOT NULL,
                    rank           INTEGER NOT NULL,

                    PRIMARY KEY (player_id, season, comp_player_id, comp_season)
                );
                "#,
                table = self.table
            ))
            .with_context(|| format!("create table {}", self.table))?;
        Ok(())
    }

    /// Number of rows currently stored
    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", self.table), [], |row| row.get(0))?;
        Ok(n as usize)
    }

    /// A subject's stored comps in rank order.
    pub fn neighbors_of(&self, subject: SubjectKey) -> Result<Vec<NeighborRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT comp_player_id, comp_season, distance, rank
             FROM {}
             WHERE player_id = ?1 AND season = ?2
             ORDER BY rank",
            self.table
        ))?;
        let records = stmt
            .query_map(params![subject.player_id, subject.season], |row| {
                Ok(NeighborRecord {
                    subject,
                    comp: SubjectKey::new(row.get(0)?, row.get(1)?),
                    distance: row.get(2)?,
                    rank: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    /// Like `neighbors_of`, joined to a player-season view for comp names.
    ///
    /// Comps missing from the view keep `comp_name = None`.
    pub fn named_neighbors_of(&self, subject: SubjectKey, view: &str) -> Result<Vec<StoredComp>> {
        let view = validate_identifier(view)?;
        let mut stmt = self.conn.prepare(&format!(
            "SELECT s.comp_player_id, s.comp_season, s.distance, s.rank, v.full_name
             FROM {table} AS s
             LEFT JOIN {view} AS v
               ON v.player_id = s.comp_player_id
              AND v.season    = s.comp_season
             WHERE s.player_id = ?1 AND s.season = ?2
             ORDER BY s.rank",
            table = self.table,
            view = view
        ))?;
        let comps = stmt
            .query_map(params![subject.player_id, subject.season], |row| {
                Ok(StoredComp {
                    record: NeighborRecord {
                        subject,
                        comp: SubjectKey::new(row.get(0)?, row.get(1)?),
                        distance: row.get(2)?,
                        rank: row.get(3)?,
                    },
                    comp_name: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(comps)
    }
}

impl SimilaritySink for SqliteSimilaritySink<'_> {
    fn name(&self) -> &str {
        "SqliteSimilaritySink"
    }

    #[instrument(skip_all, fields(table = %self.table, records = table.len()))]
    fn replace(&mut self, table: &SimilarityTable) -> Result<usize> {
        self.init_schema()?;

        let tx = self
            .conn
            .unchecked_transaction()
            .context("begin similarity transaction")?;
        let deleted = tx.execute(&format!("DELETE FROM {}", self.table), [])?;
        {
            let mut insert = tx.prepare(&format!(
                "INSERT INTO {} (player_id, season, comp_player_id, comp_season, distance, rank)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                self.table
            ))?;
            for r in table.records() {
                insert.execute(params![
                    r.subject.player_id,
                    r.subject.season,
                    r.comp.player_id,
                    r.comp.season,
                    r.distance,
                    r.rank
                ])?;
            }
        }
        tx.commit().context("commit similarity transaction")?;

        debug!("Replaced {} rows with {}", deleted, table.len());
        Ok(table.len())
    }
}
