//! CLI application for invoice template learning and matching.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, learn, matching, stats, templates};

/// Invoice template engine - learn and match per-vendor invoice layouts
#[derive(Parser)]
#[command(name = "qalib")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    /// Override the template store directory
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Learn a template from a saved extraction result
    Learn(learn::LearnArgs),

    /// Match an extraction result against learned templates
    Match(matching::MatchArgs),

    /// Learn templates from many extraction results
    Batch(batch::BatchArgs),

    /// Show template store statistics
    Stats(stats::StatsArgs),

    /// Inspect and manage stored templates
    Templates(templates::TemplatesArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    let store_dir = cli.store_dir.as_deref();

    // Execute command
    match cli.command {
        Commands::Learn(args) => learn::run(args, config_path, store_dir).await,
        Commands::Match(args) => matching::run(args, config_path, store_dir).await,
        Commands::Batch(args) => batch::run(args, config_path, store_dir).await,
        Commands::Stats(args) => stats::run(args, config_path, store_dir).await,
        Commands::Templates(args) => templates::run(args, config_path, store_dir).await,
        Commands::Config(args) => config::run(args).await,
    }
}
