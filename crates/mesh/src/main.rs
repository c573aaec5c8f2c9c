//! Mesh CLI - site index and page server.
//!
//! Provides commands for:
//! - `serve`: Index the site and serve it over HTTP
//! - `index`: Crawl the site once and print the ranked page list

mod commands;
mod error;
mod output;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{IndexArgs, ServeArgs};
use output::Output;

/// Application version from Cargo.toml.
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Mesh - site index and page server.
#[derive(Parser)]
#[command(name = "mesh", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index the site and serve it over HTTP.
    Serve(ServeArgs),
    /// Crawl the site once and print the ranked page list.
    Index(IndexArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    let verbose = match &cli.command {
        Commands::Serve(args) => args.verbose,
        Commands::Index(args) => args.verbose,
    };

    // --verbose raises to DEBUG, otherwise RUST_LOG or INFO
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Serve(args) => tokio::runtime::Runtime::new()
            .map_err(error::CliError::from)
            .and_then(|rt| rt.block_on(args.execute(VERSION))),
        Commands::Index(args) => args.execute(),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
