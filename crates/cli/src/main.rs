use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use colored::Colorize;
use data_loader::store::{self, DEFAULT_VIEW};
use data_loader::{Cohort, DelimitedFileSource, FeatureSource, PlayerId, Season, SqliteFeatureSource, SubjectKey};
use similarity::sinks::{JsonFileSink, MemorySink, SqliteSimilaritySink, sqlite::DEFAULT_TABLE};
use similarity::{SimilarityConfig, SimilarityEngine, SimilarityOutput, SimilaritySink};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// HoopsComps - Player-season similarity engine
#[derive(Parser)]
#[command(name = "hoops-comps")]
#[command(about = "Find the most statistically similar player-seasons in a conference", long_about = None)]
struct Cli {
    /// Path to the SQLite statistics database
    #[arg(long, global = true, default_value = "db/ncaa_dev.db")]
    db: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that builds a cohort
#[derive(clap::Args)]
struct CohortArgs {
    /// Read the cohort from a CSV file instead of the database
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Database view holding one row per player-season
    #[arg(long, default_value = DEFAULT_VIEW)]
    view: String,

    /// JSON config file with `k` and `features`
    #[arg(long)]
    config: Option<PathBuf>,

    /// Comma-separated feature list (overrides the config file)
    #[arg(long, value_delimiter = ',')]
    features: Option<Vec<String>>,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute comps for every player-season and store them
    Compute {
        #[command(flatten)]
        cohort: CohortArgs,

        /// Table the comps are written to
        #[arg(long, default_value = DEFAULT_TABLE)]
        table: String,

        /// Number of comps per player-season (overrides the config file)
        #[arg(long)]
        k: Option<usize>,

        /// Compute and print without touching the database
        #[arg(long)]
        dry_run: bool,

        /// Also export the table as JSON to this path
        #[arg(long)]
        json: Option<PathBuf>,
    },

    /// Show the stored comps for one player-season
    Comps {
        #[arg(long)]
        player_id: PlayerId,

        /// Season end year, e.g. 2025 for 2024-25
        #[arg(long)]
        season: Season,

        /// Table the comps were written to
        #[arg(long, default_value = DEFAULT_TABLE)]
        table: String,

        /// View used to look up comp names
        #[arg(long, default_value = DEFAULT_VIEW)]
        view: String,
    },

    /// Show the standardization parameters for a cohort
    Stats {
        #[command(flatten)]
        cohort: CohortArgs,
    },
}

fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Compute {
            cohort,
            table,
            k,
            dry_run,
            json,
        } => handle_compute(&cli.db, &cohort, &table, k, dry_run, json.as_deref())?,
        Commands::Comps {
            player_id,
            season,
            table,
            view,
        } => handle_comps(&cli.db, SubjectKey::new(player_id, season), &table, &view)?,
        Commands::Stats { cohort } => handle_stats(&cli.db, &cohort)?,
    }

    Ok(())
}

/// Build the run config: defaults, then the config file, then flags
fn build_config(args: &CohortArgs, k: Option<usize>) -> Result<SimilarityConfig> {
    let mut config = match &args.config {
        Some(path) => SimilarityConfig::from_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => SimilarityConfig::default(),
    };
    if let Some(features) = &args.features {
        config = config.with_features(features.iter().map(|f| f.trim()));
    }
    if let Some(k) = k {
        config = config.with_k(k);
    }
    config.validate()?;
    Ok(config)
}

fn load_cohort(db: &Path, args: &CohortArgs, config: &SimilarityConfig) -> Result<Cohort> {
    let schema = config.schema()?;
    match &args.csv {
        Some(path) => load_from(&DelimitedFileSource::new(path, schema)),
        None => {
            let conn = store::open_db(db)
                .with_context(|| format!("Failed to open database {}", db.display()))?;
            load_from(&SqliteFeatureSource::new(&conn, args.view.as_str(), schema))
        }
    }
}

fn load_from(source: &dyn FeatureSource) -> Result<Cohort> {
    println!("Loading cohort from {}...", source.describe());
    let start = Instant::now();
    let cohort = source
        .load()
        .with_context(|| format!("Failed to load cohort from {}", source.describe()))?;
    println!(
        "{} Loaded {} player-seasons in {:?}",
        "✓".green(),
        cohort.len(),
        start.elapsed()
    );
    if cohort.missing_count() > 0 {
        println!(
            "{} {} missing values will be treated as 0",
            "!".yellow(),
            cohort.missing_count()
        );
    }
    Ok(cohort)
}

/// Handle the 'compute' command
fn handle_compute(
    db: &Path,
    args: &CohortArgs,
    table: &str,
    k: Option<usize>,
    dry_run: bool,
    json: Option<&Path>,
) -> Result<()> {
    let config = build_config(args, k)?;
    let cohort = load_cohort(db, args, &config)?;
    let engine = SimilarityEngine::new(config);

    let start = Instant::now();
    let run = if dry_run {
        engine.run(&cohort, &mut MemorySink::new())?
    } else {
        let conn = store::open_or_create_db(db)
            .with_context(|| format!("Failed to open database {}", db.display()))?;
        let mut sink = SqliteSimilaritySink::new(&conn, table)?;
        engine.run(&cohort, &mut sink)?
    };
    let elapsed = start.elapsed();

    print_summary(&cohort, &run.output, elapsed);

    if let Some(path) = json {
        let mut sink = JsonFileSink::new(path);
        let written = sink
            .replace(&run.output.table)
            .with_context(|| format!("Failed to export {}", path.display()))?;
        println!("{} Exported {} records to {}", "✓".green(), written, path.display());
    }

    match run.persisted {
        Ok(_) if dry_run => println!("{} Dry run, database untouched", "•".cyan()),
        Ok(written) => println!("{} Wrote {} rows to {}", "✓".green(), written, table),
        Err(e) => return Err(e.context(format!("Failed to write similarity table {}", table))),
    }

    Ok(())
}

/// Handle the 'comps' command
fn handle_comps(db: &Path, subject: SubjectKey, table: &str, view: &str) -> Result<()> {
    let conn = store::open_db(db)
        .with_context(|| format!("Failed to open database {}", db.display()))?;
    let sink = SqliteSimilaritySink::new(&conn, table)?;

    let comps = sink.named_neighbors_of(subject, view)?;
    if comps.is_empty() {
        return Err(anyhow!("No comps stored for {} in {}", subject, table));
    }

    println!("{}", format!("Comps for {}:", subject).bold().blue());
    for comp in comps {
        let name = comp.comp_name.unwrap_or_else(|| "(unknown)".to_string());
        println!(
            "{}. {} {} - distance {:.3}",
            comp.record.rank.to_string().green(),
            name,
            comp.record.comp.to_string().dimmed(),
            comp.record.distance
        );
    }
    Ok(())
}

/// Handle the 'stats' command
fn handle_stats(db: &Path, args: &CohortArgs) -> Result<()> {
    let config = build_config(args, None)?;
    let cohort = load_cohort(db, args, &config)?;
    let standardization = SimilarityEngine::new(config).standardize(&cohort)?;

    println!("{}", "Standardization parameters:".bold().blue());
    println!("{:<10} {:>12} {:>12}", "feature", "mean", "std");
    for (name, column) in cohort.schema().names().iter().zip(&standardization.columns) {
        let flag = if column.constant {
            "constant".yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "{:<10} {:>12.4} {:>12.4} {}",
            name, column.mean, column.std_dev, flag
        );
    }
    Ok(())
}

/// Print run totals and the comps of the first player-season
fn print_summary(cohort: &Cohort, output: &SimilarityOutput, elapsed: std::time::Duration) {
    let table = &output.table;
    println!(
        "{} Computed {} comps for {} player-seasons (k = {}) in {:?}",
        "✓".green(),
        table.len(),
        table.subject_count(),
        table.k(),
        elapsed
    );

    let constant = output.standardization.constant_features();
    if !constant.is_empty() {
        let names: Vec<&str> = constant
            .iter()
            .map(|&i| cohort.schema().names()[i].as_str())
            .collect();
        println!("{} Constant features ignored: {}", "!".yellow(), names.join(", "));
    }

    let Some(sample) = cohort.rows().first() else {
        return;
    };
    println!(
        "\n{}",
        format!("Sample: {} ({}, {})", sample.name, sample.team, sample.key).bold().blue()
    );
    for record in table.neighbors_of(sample.key) {
        let name = cohort.get(record.comp).map(|r| r.name.as_str()).unwrap_or("");
        println!(
            "{}. {} {} - distance {:.3}",
            record.rank.to_string().green(),
            name,
            record.comp.to_string().dimmed(),
            record.distance
        );
    }
}
