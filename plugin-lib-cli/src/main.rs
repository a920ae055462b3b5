use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use config::ConfigLoader;

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "plugin-lib", about = "Load and run dependency-ordered plugins")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the user and project files
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// List plugin descriptors without loading them
    List(commands::list::ListArgs),
    /// Print the dependency load order
    Plan(commands::plan::PlanArgs),
    /// Load plugins and enable them by phase
    Run(commands::run::RunArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => {
            anyhow::ensure!(path.exists(), "Config file {} not found", path.display());
            ConfigLoader::load_from_path(path)?
        }
        None => ConfigLoader::load()?,
    };

    match cli.command {
        Commands::Config(args) => commands::config::run(args, &config),
        Commands::List(args) => commands::list::run(args, &config).await,
        Commands::Plan(args) => commands::plan::run(args, &config).await,
        Commands::Run(args) => commands::run::run(args, &config).await,
    }
}
