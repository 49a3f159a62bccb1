use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use std::path::{Path, PathBuf};

use bull_registry::{BullStore, Config, ImportPolicy, Importer, SqliteBullStore};

#[derive(Parser, Debug)]
#[command(
    name = "bull-registry",
    version,
    about = "Manage bull records and import them from spreadsheets"
)]
struct Cli {
    /// SQLite database file (defaults to $BULLS_DATABASE_PATH or bulls.db).
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create one bull per data row of a spreadsheet (.xlsx, .xls, .ods or .csv).
    Import {
        file: PathBuf,

        /// Skip rows that fail instead of stopping at the first one.
        #[arg(long)]
        skip_invalid: bool,
    },
    /// Print every bull as JSON lines.
    List,
    /// Print one bull as JSON.
    Show { id: i64 },
    /// Delete one bull.
    Delete { id: i64 },
    /// Print the number of bulls.
    Count,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().with_database_path(cli.database);

    let store = SqliteBullStore::open(&config.database_path)
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;

    match cli.command {
        Command::Import { file, skip_invalid } => run_import(&store, &file, skip_invalid),
        Command::List => {
            for bull in store.all()? {
                println!("{}", serde_json::to_string(&bull)?);
            }
            Ok(())
        }
        Command::Show { id } => {
            let bull = store.find(id)?;
            println!("{}", serde_json::to_string_pretty(&bull)?);
            Ok(())
        }
        Command::Delete { id } => {
            store.delete(id)?;
            log::info!("Deleted bull {}", id);
            Ok(())
        }
        Command::Count => {
            println!("{}", store.count()?);
            Ok(())
        }
    }
}

fn run_import(store: &SqliteBullStore, file: &Path, skip_invalid: bool) -> Result<()> {
    let policy = if skip_invalid {
        ImportPolicy::SkipInvalid
    } else {
        ImportPolicy::Abort
    };

    let before = store.count()?;
    let report = Importer::new(store)
        .with_policy(policy)
        .import(file)
        .with_context(|| format!("Import of {} failed", file.display()))?;

    for skipped in &report.skipped {
        eprintln!("row {}: {}", skipped.line, skipped.error);
    }
    println!(
        "Created {} bulls ({} skipped); database now holds {} (was {})",
        report.created_count(),
        report.skipped.len(),
        store.count()?,
        before
    );

    Ok(())
}
