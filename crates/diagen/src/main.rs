//! diagen CLI - Content-addressed diagram generation.
//!
//! Provides commands for:
//! - `generate`: Render every missing diagram artifact
//! - `check`: Verify the renderer can run
//! - `hash`: Print the fingerprint of a diagram source
//! - `list`: Show every diagram block and its cache status

mod commands;
mod error;
mod output;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use commands::{GenerateArgs, HashArgs, ListArgs};
use output::Output;

/// diagen - Content-addressed diagram generation.
#[derive(Parser)]
#[command(name = "diagen", version, about)]
struct Cli {
    /// Path to configuration file (default: auto-discover diagen.toml).
    #[arg(short, long, global = true, env = "DIAGEN_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output (per-document and per-diagram logs).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Render diagrams that are not in the artifact cache yet.
    Generate(GenerateArgs),
    /// Check that the configured renderer is available.
    Check,
    /// Print the fingerprint of a diagram source.
    Hash(HashArgs),
    /// List diagram blocks without rendering.
    List(ListArgs),
}

fn main() {
    let cli = Cli::parse();
    let output = Output::new();

    // Initialize tracing with appropriate log level
    // --verbose enables INFO level, otherwise use RUST_LOG or default to WARN
    let filter = if cli.verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config.as_deref();
    let result = match cli.command {
        Commands::Generate(args) => args.execute(config),
        Commands::Check => commands::check::execute(config),
        Commands::Hash(args) => args.execute(config),
        Commands::List(args) => args.execute(config),
    };

    if let Err(err) = result {
        output.error(&format!("Error: {err}"));
        std::process::exit(1);
    }
}
