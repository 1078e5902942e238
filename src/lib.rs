//! logdata-migrate: consolidate per-game event logs into one collection.
//!
//! Event logs historically landed in one collection per game, in two shapes:
//!
//! - **Prefixed** collections (`logs_<game>`) nest the event payload under a
//!   `data` sub-object.
//! - **Raw** collections (named after the game, no prefix) are already flat.
//!
//! The `consolidate` job folds every source into the unified `logdata`
//! collection with one canonical shape (`_id`, `game`, flat event fields),
//! then builds the query indexes. The `rename-timestamp` job is the later
//! follow-up that moves `dbtimestamp` to `serverTimestamp`.
//!
//! # Guarantees
//!
//! - **Idempotent**: documents are keyed by their original `_id`; re-running
//!   reports duplicates as skipped and changes nothing.
//! - **Resumable**: there is no checkpoint state. An interrupted job is
//!   recovered by running it again.
//! - **Fail-open per document**: one bad document, index or source is
//!   reported and the rest of the batch continues.
//!
//! # Examples
//!
//! ```bash
//! # Preview which collections would be migrated
//! logdata-migrate consolidate --db strata.db --dry-run
//!
//! # Consolidate, then rename the legacy timestamp field
//! logdata-migrate consolidate --db strata.db
//! logdata-migrate rename-timestamp --db strata.db
//!
//! # Inspect the result
//! logdata-migrate verify --db strata.db --sample
//! ```
//!
//! # Crate Structure
//!
//! - [`core`]: document store seam, classification, transformation, loading
//! - [`jobs`]: the batch jobs wired on top of `core`

pub mod core;
pub mod jobs;

use crate::core::{
    config::{self, MigrateConfig},
    db::SqliteDocumentStore,
    error,
    journal::Journal,
    time,
};
use crate::jobs::{JobContext, consolidate, import, rename, verify};

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Parser, Debug)]
#[clap(
    name = "logdata-migrate",
    version = env!("CARGO_PKG_VERSION"),
    about = "Consolidate per-game event-log collections into one unified collection"
)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct StoreArgs {
    /// Document database file.
    #[clap(long)]
    db: PathBuf,
    /// TOML file overriding collection, field and index names.
    #[clap(long)]
    config: Option<PathBuf>,
    /// Output format: 'text' or 'json'.
    #[clap(long, default_value = "text")]
    format: String,
}

#[derive(clap::Args, Debug)]
struct ConsolidateCli {
    #[clap(flatten)]
    store: StoreArgs,
    /// Print the collection plan without writing anything.
    #[clap(long)]
    dry_run: bool,
}

#[derive(clap::Args, Debug)]
struct VerifyCli {
    #[clap(flatten)]
    store: StoreArgs,
    /// Include one sample document per classification.
    #[clap(long)]
    sample: bool,
}

#[derive(clap::Args, Debug)]
struct ImportCli {
    #[clap(flatten)]
    store: StoreArgs,
    /// Source collection to load into.
    #[clap(long)]
    collection: String,
    /// JSON-lines file, one document per line.
    #[clap(long)]
    file: PathBuf,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Migrate every source collection into the unified collection
    #[clap(name = "consolidate")]
    Consolidate(ConsolidateCli),

    /// Rename the deprecated timestamp field on the unified collection
    #[clap(name = "rename-timestamp")]
    RenameTimestamp(StoreArgs),

    /// Show per-classification counts of the unified collection
    #[clap(name = "verify")]
    Verify(VerifyCli),

    /// Load a JSON-lines file into a source collection
    #[clap(name = "import")]
    Import(ImportCli),

    /// Show version information
    #[clap(name = "version")]
    Version,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_format(raw: &str) -> Result<OutputFormat, error::MigrateError> {
    match raw {
        "text" => Ok(OutputFormat::Text),
        "json" => Ok(OutputFormat::Json),
        other => Err(error::MigrateError::ValidationError(format!(
            "unknown format '{}': expected 'text' or 'json'",
            other
        ))),
    }
}

/// Everything one job invocation needs, opened from the CLI arguments.
struct Session {
    store: SqliteDocumentStore,
    config: MigrateConfig,
    journal: Journal,
    format: OutputFormat,
}

impl Session {
    fn open(args: &StoreArgs, create: bool) -> Result<Self, error::MigrateError> {
        let format = parse_format(&args.format)?;
        let config = config::load_config(args.config.as_deref())?;
        if !create && !args.db.exists() {
            return Err(error::MigrateError::NotFound(format!(
                "database {}",
                args.db.display()
            )));
        }
        let store = SqliteDocumentStore::open(&args.db)?;
        let journal = Journal::for_database(&args.db);
        Ok(Self {
            store,
            config,
            journal,
            format,
        })
    }

    fn context(&self) -> JobContext<'_> {
        JobContext::new(&self.store, &self.config, &self.journal)
            .verbose(self.format == OutputFormat::Text)
    }

    fn emit<T: Serialize>(
        &self,
        job: &str,
        clean: bool,
        summary: &T,
    ) -> Result<(), error::MigrateError> {
        if self.format == OutputFormat::Json {
            let status = if clean { "ok" } else { "partial" };
            let envelope = time::job_envelope(job, status, serde_json::to_value(summary)?);
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        Ok(())
    }
}

pub fn run() -> Result<(), error::MigrateError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Version => {
            println!("v{}", VERSION);
            Ok(())
        }
        Command::Consolidate(args) => {
            let session = Session::open(&args.store, false)?;
            let summary = consolidate::run_consolidation(&session.context(), args.dry_run)?;
            session.emit("consolidate", summary.is_clean(), &summary)
        }
        Command::RenameTimestamp(args) => {
            let session = Session::open(&args, false)?;
            let report = rename::rename_timestamp(&session.context())?;
            session.emit("rename-timestamp", report.remaining == 0, &report)
        }
        Command::Verify(args) => {
            let session = Session::open(&args.store, false)?;
            let summary = verify::verify_target(&session.context(), args.sample)?;
            session.emit("verify", true, &summary)
        }
        Command::Import(args) => {
            let session = Session::open(&args.store, true)?;
            let summary = import::import_jsonl(&session.context(), &args.collection, &args.file)?;
            session.emit("import", summary.stats.failed == 0, &summary)
        }
    }
}
