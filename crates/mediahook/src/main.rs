// SPDX-FileCopyrightText: 2026 mediahook Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! mediahook - Telegram media ingestion with a durable JSON work queue.
//!
//! This is the binary entry point.

mod app;
mod cleanup;
mod ingest;
mod queue;
mod serve;
mod shutdown;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use mediahook_config::MediaHookConfig;
use mediahook_core::MediaHookError;

/// mediahook - Telegram media ingestion with a durable JSON work queue.
#[derive(Parser, Debug)]
#[command(name = "mediahook", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the usual locations.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the webhook server and background download worker.
    Serve,
    /// Poll Telegram once and download new media.
    Fetch,
    /// Ingest one Telegram update from a JSON file ("-" for stdin).
    Ingest {
        file: PathBuf,
        /// Download pending items before returning.
        #[arg(long)]
        download: bool,
    },
    /// Show queue counts and the poll cursor.
    Status {
        #[arg(long)]
        json: bool,
    },
    /// List downloaded media not yet consumed.
    Pending {
        #[arg(long)]
        json: bool,
    },
    /// Put a failed item back in the queue.
    Retry {
        #[arg(required_unless_present = "all")]
        id: Option<String>,
        /// Retry every failed item below the attempt ceiling.
        #[arg(long, conflicts_with = "id")]
        all: bool,
    },
    /// Mark a downloaded item as consumed.
    Consume { id: String },
    /// Remove old consumed items, their files, and leftover partial downloads.
    Cleanup {
        /// Overrides cleanup.max_age_days.
        #[arg(long)]
        max_age_days: Option<u32>,
    },
    /// Validate configuration and print resolved paths.
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => mediahook_config::load_and_validate_path(path),
        None => mediahook_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            mediahook_config::render_errors(&errors);
            return ExitCode::FAILURE;
        }
    };

    serve::init_tracing(&config.log.level);

    match run(cli.command, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("mediahook: error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: MediaHookConfig) -> Result<(), MediaHookError> {
    let app = app::App::open(config)?;
    match command {
        Commands::Serve => serve::run_serve(app).await,
        Commands::Fetch => ingest::run_fetch(&app).await,
        Commands::Ingest { file, download } => ingest::run_ingest(&app, &file, download).await,
        Commands::Status { json } => queue::run_status(&app, json).await,
        Commands::Pending { json } => queue::run_pending(&app, json).await,
        Commands::Retry { id, all } => queue::run_retry(&app, id.as_deref(), all).await,
        Commands::Consume { id } => queue::run_consume(&app, &id).await,
        Commands::Cleanup { max_age_days } => {
            let days = max_age_days.unwrap_or(app.config.cleanup.max_age_days);
            cleanup::run_cleanup(&app, days).await
        }
        Commands::Check => queue::run_check(&app).await,
    }
}
