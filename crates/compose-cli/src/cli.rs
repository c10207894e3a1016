use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "compose", about = "Compose text sources into one queryable index")]
pub struct Cli {
    /// Log debug detail to stderr
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Where the snapshot lives
#[derive(Args, Clone)]
pub struct SnapshotArgs {
    /// Snapshot file (defaults to $COMPOSE_SNAPSHOT or <data dir>/index.json)
    #[arg(long)]
    pub snapshot: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Register every subdirectory of DOCS as a source and save the snapshot
    Build {
        /// Directory whose subdirectories each hold one source's text files
        #[arg(long)]
        docs: PathBuf,

        #[command(flatten)]
        snapshot: SnapshotArgs,
    },
    /// List the sources recorded in a snapshot
    Show {
        #[command(flatten)]
        snapshot: SnapshotArgs,

        /// Output raw JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },
    /// Restore the index and run an aggregate query over every source
    Query {
        /// Query text
        text: String,

        /// Directory holding the source subdirectories named in the snapshot
        #[arg(long)]
        docs: PathBuf,

        #[command(flatten)]
        snapshot: SnapshotArgs,

        /// Results requested from each source
        #[arg(long, short = 'n', default_value = "5")]
        limit: usize,

        /// Keep at most K merged results
        #[arg(long)]
        top_k: Option<usize>,

        /// Skip failing sources instead of failing the query
        #[arg(long)]
        continue_on_error: bool,

        /// Per-source timeout in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Output raw JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },
}
