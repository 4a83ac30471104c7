//! Operator CLI for the Lyceum document store.
//!
//! # Responsibility
//! - Load connection settings, start logging, connect and provision.
//! - Run one CRUD operation per invocation with JSON documents.
//!
//! # Invariants
//! - Results are printed as JSON on stdout; errors go to stderr.
//! - Exit code is 0 on success, 2 for not-found, 1 for any other failure.

use clap::{Parser, Subcommand};
use lyceum_store::{
    connect, init_logging, store_version, ConnectOptions, Diagnostics, DocumentStore,
    LogSettings, StoreError, StoreResult, TableRef,
};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "lyceum", version, about = "Provision and query the Lyceum document store")]
struct Cli {
    /// TOML file with connection and logging settings.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides `db_url` from the config file.
    #[arg(long, global = true)]
    db_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the database and tables if missing.
    Init,
    /// Print one document.
    Get { table: String, key: String },
    /// Print every document in a table.
    List { table: String },
    /// Insert a JSON document and print it as stored.
    Insert { table: String, document: String },
    /// Merge a JSON patch into a document and print the result.
    Update {
        table: String,
        key: String,
        patch: String,
    },
    /// Delete a document; missing keys are not an error.
    Delete { table: String, key: String },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            if err.is_not_found() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: Cli) -> StoreResult<()> {
    let mut options = match &cli.config {
        Some(path) => ConnectOptions::from_file(path)?,
        None => ConnectOptions::default(),
    };
    if let Some(db_url) = cli.db_url {
        options.db_url = db_url;
    }

    let log_settings = LogSettings::from_options(&options)?;
    if let Some(settings) = &log_settings {
        init_logging(settings)?;
    }
    log::info!(
        "event=cli_start module=cli status=ok version={} db_url={}",
        store_version(),
        options.db_url
    );

    let diagnostics = Diagnostics::default();
    let session = connect(&options, &diagnostics)?;
    let store = DocumentStore::new(&session, diagnostics);
    let table_ref = |table: &str| TableRef::new(options.database.as_str(), table);

    match cli.command {
        Command::Init => {
            let log_dir = log_settings.as_ref().map(|settings| settings.dir.display().to_string());
            println!("{}", json!({ "database": options.database, "log_dir": log_dir }));
        }
        Command::Get { table, key } => {
            let document: Value = store.read(&table_ref(&table)?, &key)?;
            println!("{document}");
        }
        Command::List { table } => {
            let documents: Vec<Value> = store.read_all(&table_ref(&table)?)?;
            println!("{}", Value::Array(documents));
        }
        Command::Insert { table, document } => {
            let document = parse_json("document", &document)?;
            let stored: Value = store.create(&table_ref(&table)?, &document)?;
            println!("{stored}");
        }
        Command::Update { table, key, patch } => {
            let patch = parse_json("patch", &patch)?;
            let stored: Value = store.update(&table_ref(&table)?, &key, &patch)?;
            println!("{stored}");
        }
        Command::Delete { table, key } => {
            store.delete(&table_ref(&table)?, &key)?;
            println!("{}", json!({ "deleted": key }));
        }
    }

    Ok(())
}

fn parse_json(argument: &str, text: &str) -> StoreResult<Value> {
    serde_json::from_str(text)
        .map_err(|err| StoreError::InvalidInput(format!("`{argument}` is not valid JSON: {err}")))
}
