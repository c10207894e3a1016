mod cli;
mod commands;
mod error;
mod source;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use cli::{Cli, Command, SnapshotArgs};
use commands::QueryOptions;
use error::CliError;

fn snapshot_path(args: &SnapshotArgs) -> PathBuf {
    args.snapshot
        .clone()
        .unwrap_or_else(compose_core::default_snapshot_path)
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Build { docs, snapshot } => {
            let snap = commands::build(&docs, &snapshot_path(&snapshot))?;
            print!("{}", commands::format_snapshot(&snap));
        }
        Command::Show { snapshot, json } => {
            let snap = commands::show(&snapshot_path(&snapshot))?;
            if json {
                println!("{}", snap.to_json()?);
            } else {
                print!("{}", commands::format_snapshot(&snap));
            }
        }
        Command::Query {
            text,
            docs,
            snapshot,
            limit,
            top_k,
            continue_on_error,
            timeout_ms,
            json,
        } => {
            let opts = QueryOptions {
                limit,
                top_k,
                continue_on_error,
                timeout: timeout_ms.map(Duration::from_millis),
            };
            let response = commands::query(&text, &docs, &snapshot_path(&snapshot), &opts).await?;
            if json {
                println!("{}", commands::response_json(&response)?);
            } else {
                print!("{}", commands::format_response(&response));
            }
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
