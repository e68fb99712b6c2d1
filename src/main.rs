//! michiru: AniDB anime title search
//!
//! Imports the AniDB title dump into Meilisearch and serves the search API.

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use michiru::config::{Config, LogFormat, LoggingConfig};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "michiru")]
#[command(about = "AniDB anime title search backed by Meilisearch")]
#[command(version)]
struct Cli {
    /// Configuration file path; environment variables override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve the search API
    Serve,

    /// Import the title dump into the search index
    Import {
        /// Read the dump from a local file instead of TITLE_DUMP_URL
        #[arg(long)]
        dump_file: Option<PathBuf>,
    },

    /// Delete every index on the search engine
    Reset {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

fn init_logging(config: &LoggingConfig, verbose: u8) -> Result<()> {
    let level = config.level.more_verbose(verbose);
    let builder = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::new(level.as_str()))
        .with_target(false);

    match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish())?,
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish())?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::from_env()?,
    };

    init_logging(&config.logging, cli.verbose)?;

    match cli.command {
        Commands::Serve => commands::serve::serve(config).await,
        Commands::Import { dump_file } => commands::import::import(config, dump_file).await,
        Commands::Reset { yes } => commands::reset::reset(config, yes).await,
    }
}
