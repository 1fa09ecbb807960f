//! Command-line host for the deduplication service.
//!
//! Starts the service against a SQLite contact database, connects, performs
//! one call and prints the user-facing notification.

use clap::{Parser, Subcommand};
use contactsweep_core::db::open_db;
use contactsweep_core::{
    init_logging, DedupConfig, DedupPreview, DedupService, NewContact, SqliteContactStore,
    SqliteDedupRunner, StatusCode,
};
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "contactsweep")]
#[command(about = "Find and remove duplicate phone contacts")]
#[command(version)]
struct Cli {
    /// JSON config file; environment variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Contact database path (overrides config and environment)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Remove duplicate contacts, keeping the newest of each group
    Run,
    /// Show duplicate groups without deleting anything
    Preview,
    /// Import contacts from a JSON array of `{owner_id, display_name, numbers}`
    Seed {
        /// Path to the JSON contacts file
        file: PathBuf,
    },
    /// Print core linkage information
    Health,
}

#[derive(Serialize)]
struct RunOutput<'a> {
    code: i32,
    status: StatusCode,
    message: &'a str,
    detail: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match execute(cli) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(2)
        }
    }
}

fn execute(cli: Cli) -> Result<ExitCode, Box<dyn Error>> {
    let config = load_config(&cli)?;
    if let Some(log_dir) = &config.log_dir {
        init_logging(&config.log_level, &log_dir.to_string_lossy())?;
    }

    match cli.command {
        Command::Run => run(&config, cli.json),
        Command::Preview => preview(&config, cli.json),
        Command::Seed { file } => seed(&config, &file),
        Command::Health => {
            println!("contactsweep_core ping={}", contactsweep_core::ping());
            println!("contactsweep_core version={}", contactsweep_core::core_version());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_config(cli: &Cli) -> Result<DedupConfig, Box<dyn Error>> {
    let base = match &cli.config {
        Some(path) => DedupConfig::from_json_file(path)?,
        None => DedupConfig::default(),
    };
    let mut config = base.with_env_overrides()?;
    if let Some(db) = &cli.db {
        config.db_path = db.clone();
    }
    config.validate()?;
    Ok(config)
}

fn run(config: &DedupConfig, json: bool) -> Result<ExitCode, Box<dyn Error>> {
    let runner = SqliteDedupRunner::new(config.db_path.clone(), config.capabilities()?);
    let service = DedupService::new(Arc::new(runner));
    service.start();

    let outcome = service.with_connection(|connection| connection.remove_duplicates_outcome())?;
    service.stop();

    let status = outcome.status_code();
    if json {
        let output = RunOutput {
            code: status.as_i32(),
            status,
            message: status.notification(),
            detail: outcome.to_string(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!("{} ({outcome})", status.notification());
    }

    Ok(match status {
        StatusCode::Error => ExitCode::from(2),
        StatusCode::Success | StatusCode::NoDuplicatesFound => ExitCode::SUCCESS,
    })
}

fn preview(config: &DedupConfig, json: bool) -> Result<ExitCode, Box<dyn Error>> {
    let runner = SqliteDedupRunner::new(config.db_path.clone(), config.capabilities()?);
    let preview = runner.preview()?;
    if json {
        println!("{}", serde_json::to_string_pretty(&preview)?);
    } else {
        print_preview(&preview);
    }
    Ok(ExitCode::SUCCESS)
}

fn print_preview(preview: &DedupPreview) {
    println!(
        "records={} skipped={} groups={}",
        preview.records_read,
        preview.rows_skipped,
        preview.groups.len()
    );
    for group in &preview.groups {
        let removed = group
            .removed
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        println!(
            "  {:?} {:?}: keep {} remove [{}]",
            group.key.name, group.key.digits, group.survivor, removed
        );
    }
    if !preview.has_duplicates() {
        println!("{}", StatusCode::NoDuplicatesFound.notification());
    }
}

fn seed(config: &DedupConfig, file: &Path) -> Result<ExitCode, Box<dyn Error>> {
    let raw = std::fs::read_to_string(file)?;
    let contacts: Vec<NewContact> = serde_json::from_str(&raw)?;

    let conn = open_db(&config.db_path)?;
    let store = SqliteContactStore::new(&conn);
    for contact in &contacts {
        store.insert_contact(contact)?;
    }
    println!(
        "seeded {} contact(s) into {}",
        contacts.len(),
        config.db_path.display()
    );
    Ok(ExitCode::SUCCESS)
}
