//! Guild roster CLI
//!
//! Command-line tool for refreshing guild roster tables from swgoh.gg and
//! swgoh.help.

use clap::{Parser, Subcommand};
use roster_core::rar::{load_rows, write_template};
use roster_core::{
    list_tables, parse_csv, Digests, DirectorySink, FileCache, FreshnessTracker, OutputFormat,
    Orchestrator, ProviderAdapter, RarRow, RefreshOutcome, Setup,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "Guild roster aggregator", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch guilds, apply manual edits and write the output tables
    Refresh {
        /// Setup file (JSON)
        #[arg(short, long)]
        setup: PathBuf,

        /// Output directory for the tables
        #[arg(short, long)]
        output: PathBuf,

        /// Output format (csv or json)
        #[arg(long, default_value = "csv")]
        format: String,

        /// Refresh even if no setting changed
        #[arg(long)]
        force: bool,
    },

    /// Report which settings changed since the last refresh
    Status {
        /// Setup file (JSON)
        #[arg(short, long)]
        setup: PathBuf,
    },

    /// Create a setup file template and an empty manual-edit table
    Init {
        /// Output path for the setup file
        #[arg(short, long)]
        output: PathBuf,
    },

    /// List the tables written to an output directory
    List {
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Print a written CSV table
    Show {
        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Table name (roster, units, abilities, heroes, ships)
        #[arg(short, long)]
        table: String,

        /// Maximum number of rows to display
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> roster_core::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Refresh {
            setup,
            output,
            format,
            force,
        } => cmd_refresh(&setup, &output, &format, force),
        Commands::Status { setup } => cmd_status(&setup),
        Commands::Init { output } => cmd_init(&output),
        Commands::List { output } => cmd_list(&output),
        Commands::Show { output, table, limit } => cmd_show(&output, &table, limit),
    }
}

/// Manual-edit rows of the setup; a configured but missing table reads as empty
fn rar_rows(setup: &Setup) -> roster_core::Result<Vec<RarRow>> {
    match setup.rar_table_file() {
        Some(path) if !path.exists() => {
            tracing::warn!(path = %path.display(), "manual-edit table not found, ignoring");
            Ok(Vec::new())
        }
        path => load_rows(path.as_deref()),
    }
}

fn cmd_refresh(setup_path: &Path, output: &Path, format: &str, force: bool) -> roster_core::Result<()> {
    let mut setup = Setup::load(setup_path)?;
    let rows = rar_rows(&setup)?;
    let format: OutputFormat = format.parse()?;

    let mut cache = FileCache::load(setup.cache_file())?;
    let mut sink = DirectorySink::open(output, format)?;
    let providers = ProviderAdapter::from_setup(&setup)?;

    let outcome = Orchestrator::new(&setup, &rows, &providers, &mut cache, &mut sink).refresh(force)?;

    let summary = match outcome {
        RefreshOutcome::UpToDate => {
            println!("Nothing to do: settings unchanged since the last refresh");
            return Ok(());
        }
        RefreshOutcome::Refreshed(summary) => summary,
    };

    let before = setup.clone();
    setup.apply_guild_names(&summary.guilds);
    if setup != before {
        setup.save(setup_path)?;
        println!("Saved resolved guild names to {}", setup_path.display());
    }

    println!("Refreshed {} guild(s), {} player(s):", summary.guilds.len(), summary.players);
    for guild in &summary.guilds {
        println!("  {} ({})", guild.name, guild.source);
    }
    println!();
    println!("Tables written to {}:", output.display());
    for (name, rows) in &summary.tables {
        println!("  {} ({} rows)", name, rows);
    }

    Ok(())
}

fn cmd_status(setup_path: &Path) -> roster_core::Result<()> {
    let setup = Setup::load(setup_path)?;
    let rows = rar_rows(&setup)?;
    let mut cache = FileCache::load(setup.cache_file())?;

    println!("Cache: {}", cache.path().display());

    let digests = Digests::compute(&setup, &rows)?;
    let tracker = FreshnessTracker::new(&mut cache, setup.cache_key.as_str(), digests);

    println!("Active guilds: {}", setup.active_guilds().len());
    println!();
    for (domain, fresh) in tracker.report() {
        let state = if fresh { "fresh" } else { "stale" };
        println!("  {:<12}{}", domain.to_string(), state);
    }
    println!();
    if tracker.all_fresh() {
        println!("Up to date");
    } else {
        println!("Refresh needed");
    }

    Ok(())
}

fn cmd_init(output: &Path) -> roster_core::Result<()> {
    let mut setup = Setup::template();
    setup.save(output)?;
    println!("Created setup file: {}", output.display());

    setup.base_dir = output.parent().map(Path::to_path_buf).unwrap_or_default();
    if let Some(rar) = setup.rar_table_file() {
        if rar.exists() {
            println!("Kept existing manual-edit table: {}", rar.display());
        } else {
            write_template(&rar)?;
            println!("Created manual-edit table: {}", rar.display());
        }
    }

    println!();
    println!("Edit the guild rows, then run: roster refresh --setup {} --output <dir>", output.display());

    Ok(())
}

fn cmd_list(output: &Path) -> roster_core::Result<()> {
    let tables = list_tables(output)?;

    println!("Tables ({}):", tables.len());
    for table in &tables {
        println!("  {} [{}] {}", table.name, table.format, table.path.display());
    }

    Ok(())
}

fn cmd_show(output: &Path, name: &str, limit: Option<usize>) -> roster_core::Result<()> {
    let file = list_tables(output)?
        .into_iter()
        .find(|t| t.name == name && t.format == OutputFormat::Csv)
        .ok_or_else(|| roster_core::Error::MissingSinkTarget(output.join(format!("{}.csv", name))))?;

    let table = parse_csv(&file.path)?;

    println!("Table: {}", table.name);
    println!("Columns: {}", table.column_count());
    println!("Rows: {}", table.row_count());
    println!();

    // Print header
    println!("{}", table.headers().join("\t"));
    println!("{}", "-".repeat(table.column_count() * 12));

    // Print rows
    let row_limit = limit.unwrap_or(table.row_count());
    for row in table.rows.iter().take(row_limit) {
        let values: Vec<String> = row.cells.iter().map(|c| c.to_string_value()).collect();
        println!("{}", values.join("\t"));
    }

    if table.row_count() > row_limit {
        println!("... ({} more rows)", table.row_count() - row_limit);
    }

    Ok(())
}
