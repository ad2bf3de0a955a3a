use std::path::PathBuf;

use clap::Args;
use clap::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(version, about = "Apply streamed model output to a project and keep its undo history")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// SQLite database holding committed files and turn history.
    /// Overrides `db_path` from config.toml.
    #[arg(long, global = true, value_name = "FILE")]
    pub db: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Stream a tagged transcript into the project and commit it as one turn.
    Ingest(IngestArgs),

    /// List the project's committed files.
    Files(ProjectArgs),

    /// List the project's turns, newest first.
    History(ProjectArgs),

    /// Print the project as it was before a past turn, as `<ns-file>` blocks.
    Checkout(CheckoutArgs),
}

#[derive(Args, Debug)]
pub struct ProjectArgs {
    /// Project name. Created on first ingest.
    #[arg(long, short = 'p')]
    pub project: String,
}

#[derive(Args, Debug)]
pub struct IngestArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Transcript to read. Reads stdin when omitted or `-`.
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Read size in bytes. Overrides `chunk_size` from config.toml.
    #[arg(long, value_name = "BYTES", value_parser = clap::value_parser!(u64).range(1..))]
    pub chunk_size: Option<u64>,

    /// Parse and report without committing anything.
    #[arg(long, default_value_t = false)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct CheckoutArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Which turn to rewind past: 1 is the most recent.
    #[arg(long, value_name = "K", value_parser = clap::value_parser!(u64).range(1..))]
    pub before: u64,
}
