// SPDX-FileCopyrightText: 2026 Lodestore Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Lodestore - save, load, and delete named databases from the command line.
//!
//! This is the binary entry point. Every command goes through the same
//! adapter and write queue that library users get.

mod database;
mod status;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use lodestore_config::model::LodestoreConfig;
use lodestore_storage::{DatabaseAdapter, FsBackend};

/// Lodestore - durable named databases over a sequential write queue.
#[derive(Parser, Debug)]
#[command(name = "lodestore", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Replace the contents of a database.
    Save {
        /// Database name.
        name: String,
        /// Read the payload from this file instead of stdin.
        #[arg(long, short)]
        file: Option<PathBuf>,
    },
    /// Print the contents of a database to stdout.
    Load {
        /// Database name.
        name: String,
    },
    /// Remove a database.
    Delete {
        /// Database name.
        name: String,
    },
    /// Check that the storage root is reachable.
    Status {
        /// Emit JSON instead of text.
        #[arg(long)]
        json: bool,
    },
}

/// Exit code for `load` of a database with no data.
const EXIT_NOT_FOUND: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => lodestore_config::load_and_validate_path(path),
        None => lodestore_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            lodestore_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config.log.level);

    match run(cli.command, &config).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("lodestore: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(
    command: Commands,
    config: &LodestoreConfig,
) -> Result<ExitCode, lodestore_core::StoreError> {
    let backend = Arc::new(FsBackend::from_config(&config.storage)?);
    let adapter = DatabaseAdapter::from_config(backend, &config.storage);

    let code = match command {
        Commands::Save { name, file } => {
            let payload = database::read_payload(file.as_deref())?;
            database::run_save(&adapter, &name, payload).await?;
            ExitCode::SUCCESS
        }
        Commands::Load { name } => {
            let mut stdout = std::io::stdout().lock();
            if database::run_load(&adapter, &name, &mut stdout).await? {
                ExitCode::SUCCESS
            } else {
                eprintln!("lodestore: database `{name}` not found");
                ExitCode::from(EXIT_NOT_FOUND)
            }
        }
        Commands::Delete { name } => {
            database::run_delete(&adapter, &name).await?;
            ExitCode::SUCCESS
        }
        Commands::Status { json } => {
            if status::run_status(&adapter, config, json).await {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    };

    adapter.flush().await;
    Ok(code)
}

/// Initializes the tracing subscriber with the given log level.
///
/// Logs go to stderr so `load` output on stdout stays clean.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter_directive(log_level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();
}

/// Targets that follow the configured `log.level`.
const WORKSPACE_TARGETS: &[&str] = &[
    "lodestore",
    "lodestore_core",
    "lodestore_config",
    "lodestore_storage",
    "lodestore_test_utils",
];

/// Filter directive applying `log_level` to every workspace crate and `warn`
/// to dependencies.
fn default_filter_directive(log_level: &str) -> String {
    let mut directives: Vec<String> = WORKSPACE_TARGETS
        .iter()
        .map(|target| format!("{target}={log_level}"))
        .collect();
    directives.push("warn".to_string());
    directives.join(",")
}
