//! scribe: applies streamed model output to a project and keeps its history.
//!
//! Entry point for the `scribe` binary. Wires together configuration
//! (`config`), the command line (`cli`), the ingest pipeline (`ingest`,
//! `source`, `event`, `report`), the history commands (`commands`), and the
//! shared WAL-mode SQLite store (`scribe-core`).
//!
//! # Startup sequence
//!
//! 1. Parse the command line.
//! 2. Load `config.toml`. Soft failure: problems are printed and defaults used.
//! 3. Initialise `tracing-subscriber` on stderr, so stdout stays clean for
//!    `checkout` output and turn summaries.
//! 4. Open the store and dispatch the subcommand.
//! 5. Shut the runtime down without waiting on a stdin read that is still
//!    parked on the blocking pool.

mod cli;
mod commands;
mod config;
mod event;
mod ingest;
mod report;
mod signal;
mod source;

use std::future::Future;
use std::path::Path;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};

/// `RUST_LOG` wins; otherwise the configured filter; otherwise `warn`.
fn init_logging(default_filter: &str) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Opens the store at `path`, creating its parent directory if needed.
pub(crate) async fn open_store(path: &Path) -> anyhow::Result<tokio_rusqlite::Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    scribe_core::db::open_db(path)
        .await
        .with_context(|| format!("cannot open database {}", path.display()))
}

/// Runs `fut` to completion on a fresh runtime.
///
/// Blocking-pool tasks still running afterwards are detached instead of
/// joined.
fn block_on_detached<T>(fut: impl Future<Output = anyhow::Result<T>>) -> anyhow::Result<T> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("cannot start async runtime")?;
    let result = runtime.block_on(fut);
    runtime.shutdown_background();
    result
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = config::load();
    init_logging(&config.log_filter);
    block_on_detached(dispatch(cli, config))
}

async fn dispatch(cli: Cli, config: config::Config) -> anyhow::Result<()> {
    let db_path = cli.db.clone().unwrap_or_else(|| config.db_path.clone());
    let mut stdout = std::io::stdout();

    match cli.command {
        Command::Ingest(args) => ingest::run(&db_path, &config, args).await,
        Command::Files(args) => {
            let conn = open_store(&db_path).await?;
            commands::files(&conn, &args.project, &mut stdout).await
        }
        Command::History(args) => {
            let conn = open_store(&db_path).await?;
            commands::history(&conn, &args.project, &mut stdout).await
        }
        Command::Checkout(args) => {
            let conn = open_store(&db_path).await?;
            let before = usize::try_from(args.before).context("--before is out of range")?;
            commands::checkout(&conn, &args.project.project, before, &mut stdout).await
        }
    }
}
