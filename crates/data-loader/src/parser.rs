//! Parser for comma-separated player-season statistics exports.
//!
//! Expected layout: one header row, then one player-season per line:
//! ```text
//! player_id,season,full_name,team_slug,pts,ast,trb,stl,blk,mp,ts_pct
//! 101,2025,Jane Doe,troy,14.2,3.1,5.0,1.2,0.4,28.5,0.561
//! ```
//!
//! - `player_id` and `season` are required; `full_name`/`player` and
//!   `team_slug`/`team` are optional display columns
//! - every schema feature is looked up by header name; column order in the
//!   file doesn't matter
//! - empty cells, `NA` and `NaN` are missing values (imputed later)
//! - `ts_pct` is derived from `pts`, `fga` and `fta` when the file doesn't
//!   carry it
//!
//! Fields are split on plain commas; quoted fields are not supported.

use crate::error::{DataLoadError, Result, SchemaError};
use crate::stats::true_shooting_pct;
use crate::types::*;
use std::path::Path;
use tracing::debug;

/// Where a schema feature's value comes from in each line
#[derive(Debug, Clone, Copy)]
enum FeatureColumn {
    Column(usize),
    TrueShooting { pts: usize, fga: usize, fta: usize },
}

/// Column positions resolved once from the header
#[derive(Debug)]
struct Layout {
    width: usize,
    player_id: usize,
    season: usize,
    name: Option<usize>,
    team: Option<usize>,
    features: Vec<FeatureColumn>,
}

/// Parse a statistics file into a validated cohort.
pub fn parse_cohort(path: &Path, schema: &FeatureSchema) -> Result<Cohort> {
    let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => DataLoadError::FileNotFound {
            path: path.display().to_string(),
        },
        _ => DataLoadError::IoError(e),
    })?;
    let file = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    parse_cohort_str(&content, &file, schema)
}

/// Parse already-loaded file contents.
///
/// `file` is only used to give errors context.
pub fn parse_cohort_str(content: &str, file: &str, schema: &FeatureSchema) -> Result<Cohort> {
    let mut lines = content
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim()))
        .filter(|(_, line)| !line.is_empty());

    let (header_no, header) = lines.next().ok_or_else(|| DataLoadError::ParseError {
        file: file.to_string(),
        line: 1,
        reason: "Missing header row".to_string(),
    })?;
    let layout = resolve_layout(header, header_no, file, schema)?;

    let mut rows = Vec::new();
    for (line_no, line) in lines {
        rows.push(parse_row(line, line_no, file, &layout)?);
    }
    debug!("Parsed {} rows from {}", rows.len(), file);

    Ok(Cohort::new(schema.clone(), rows)?)
}

fn resolve_layout(header: &str, line: usize, file: &str, schema: &FeatureSchema) -> Result<Layout> {
    let columns: Vec<&str> = header.split(',').map(str::trim).collect();
    let find = |name: &str| columns.iter().position(|c| *c == name);
    let require = |name: &str| {
        find(name).ok_or_else(|| DataLoadError::ParseError {
            file: file.to_string(),
            line,
            reason: format!("Missing {} column", name),
        })
    };

    let player_id = require("player_id")?;
    let season = require("season")?;
    let name = find("full_name").or_else(|| find("player"));
    let team = find("team_slug").or_else(|| find("team"));

    let mut features = Vec::with_capacity(schema.len());
    for feature in schema.names() {
        let column = match find(feature.as_str()) {
            Some(idx) => FeatureColumn::Column(idx),
            None if feature == "ts_pct" => match (find("pts"), find("fga"), find("fta")) {
                (Some(pts), Some(fga), Some(fta)) => FeatureColumn::TrueShooting { pts, fga, fta },
                _ => return Err(missing_feature(feature, file)),
            },
            None => return Err(missing_feature(feature, file)),
        };
        features.push(column);
    }

    Ok(Layout {
        width: columns.len(),
        player_id,
        season,
        name,
        team,
        features,
    })
}

fn missing_feature(name: &str, file: &str) -> DataLoadError {
    SchemaError::MissingFeature {
        name: name.to_string(),
        source_name: file.to_string(),
    }
    .into()
}

fn parse_row(line: &str, line_no: usize, file: &str, layout: &Layout) -> Result<FeatureRow> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    if fields.len() != layout.width {
        return Err(DataLoadError::FieldCountMismatch {
            expected: layout.width,
            found: fields.len(),
            line: line_no,
        });
    }

    let parse_error = |reason: String| DataLoadError::ParseError {
        file: file.to_string(),
        line: line_no,
        reason,
    };

    let player_id: PlayerId = fields[layout.player_id]
        .parse()
        .map_err(|e| parse_error(format!("Invalid player_id: {}", e)))?;
    let season = parse_season(fields[layout.season])
        .ok_or_else(|| parse_error(format!("Invalid season: {}", fields[layout.season])))?;

    let value_at = |idx: usize| {
        parse_value(fields[idx]).map_err(|e| parse_error(format!("Invalid value in column {}: {}", idx + 1, e)))
    };

    let mut values = Vec::with_capacity(layout.features.len());
    for column in &layout.features {
        let value = match *column {
            FeatureColumn::Column(idx) => value_at(idx)?,
            FeatureColumn::TrueShooting { pts, fga, fta } => {
                match (value_at(pts)?, value_at(fga)?, value_at(fta)?) {
                    (Some(p), Some(a), Some(f)) => true_shooting_pct(p, a, f),
                    _ => None,
                }
            }
        };
        values.push(value);
    }

    let label = |idx: Option<usize>| idx.map(|i| fields[i].to_string()).unwrap_or_default();
    Ok(FeatureRow::new(SubjectKey::new(player_id, season), values)
        .with_label(label(layout.name), label(layout.team)))
}

/// Parse a season as either `2025` or `2024-25` (both mean the season ending in 2025)
fn parse_season(s: &str) -> Option<Season> {
    match s.split_once('-') {
        Some((start, _)) => start.parse::<Season>().ok()?.checked_add(1),
        None => s.parse().ok(),
    }
}

/// Parse one numeric cell; blank, `NA` and `NaN` are missing
fn parse_value(s: &str) -> std::result::Result<Option<f64>, std::num::ParseFloatError> {
    if s.is_empty() || s.eq_ignore_ascii_case("na") || s.eq_ignore_ascii_case("nan") {
        return Ok(None);
    }
    s.parse::<f64>().map(Some)
}
