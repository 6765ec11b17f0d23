//! Loading cohorts from the SQLite statistics database.
//!
//! The database is populated by the scraping/ETL scripts; this module only
//! reads the per-season view they maintain (one row per player-season with
//! `player_id`, `season`, `full_name`, `team_slug` and the stat columns).

use crate::error::{DataLoadError, Result, SchemaError};
use crate::source::FeatureSource;
use crate::types::*;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use tracing::{debug, instrument};

/// View the ETL scripts create for the 2024-25 Sun Belt season
pub const DEFAULT_VIEW: &str = "v_sun_belt_player_season_2024_25";

/// Open an existing statistics database.
///
/// Unlike `Connection::open`, this does not create an empty file when the
/// path is wrong.
pub fn open_db(path: &Path) -> Result<Connection> {
    if !path.exists() {
        return Err(DataLoadError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    Ok(conn)
}

/// Open a database for writing, creating it (and its directory) if needed.
pub fn open_or_create_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(Connection::open(path)?)
}

/// Check that `name` can be interpolated into SQL as a table or column name.
///
/// Only `[A-Za-z_][A-Za-z0-9_]*` is accepted.
pub fn validate_identifier(name: &str) -> std::result::Result<&str, SchemaError> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    };
    if valid {
        Ok(name)
    } else {
        Err(SchemaError::InvalidIdentifier(name.to_string()))
    }
}

/// Reads one cohort from a view (or table) of the statistics database.
pub struct SqliteFeatureSource<'c> {
    conn: &'c Connection,
    view: String,
    schema: FeatureSchema,
}

impl<'c> SqliteFeatureSource<'c> {
    /// Create a source reading `schema`'s columns from `view`.
    pub fn new(conn: &'c Connection, view: impl Into<String>, schema: FeatureSchema) -> Self {
        Self {
            conn,
            view: view.into(),
            schema,
        }
    }

    /// Source for the default view
    pub fn with_default_view(conn: &'c Connection, schema: FeatureSchema) -> Self {
        Self::new(conn, DEFAULT_VIEW, schema)
    }

    fn build_query(&self) -> Result<String> {
        let view = validate_identifier(&self.view)?;
        let mut columns = Vec::with_capacity(self.schema.len());
        for name in self.schema.names() {
            columns.push(validate_identifier(name)?);
        }
        Ok(format!(
            "SELECT player_id, season, full_name, team_slug, {} FROM {} ORDER BY player_id, season",
            columns.join(", "),
            view
        ))
    }

    /// Names of the columns the view actually has
    fn view_columns(&self) -> Result<Vec<String>> {
        let view = validate_identifier(&self.view)?;
        let mut stmt = self.conn.prepare(&format!("PRAGMA table_info({})", view))?;
        let columns = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(columns)
    }
}

impl FeatureSource for SqliteFeatureSource<'_> {
    fn describe(&self) -> String {
        format!("sqlite view {}", self.view)
    }

    #[instrument(skip(self), fields(view = %self.view))]
    fn load(&self) -> Result<Cohort> {
        let available = self.view_columns()?;
        if available.is_empty() {
            return Err(DataLoadError::ParseError {
                file: self.view.clone(),
                line: 0,
                reason: "view or table does not exist".to_string(),
            });
        }
        if let Some(missing) = self
            .schema
            .names()
            .iter()
            .find(|name| !available.contains(name))
        {
            return Err(SchemaError::MissingFeature {
                name: missing.clone(),
                source_name: self.view.clone(),
            }
            .into());
        }

        let query = self.build_query()?;
        debug!("Loading cohort: {}", query);

        let width = self.schema.len();
        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt
            .query_map([], |row| {
                let key = SubjectKey::new(row.get(0)?, row.get(1)?);
                let name: Option<String> = row.get(2)?;
                let team: Option<String> = row.get(3)?;
                let mut values = Vec::with_capacity(width);
                for i in 0..width {
                    values.push(row.get::<_, Option<f64>>(4 + i)?);
                }
                Ok(FeatureRow::new(key, values)
                    .with_label(name.unwrap_or_default(), team.unwrap_or_default()))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        debug!("Loaded {} player-seasons", rows.len());
        Ok(Cohort::new(self.schema.clone(), rows)?)
    }
}
