use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "adapquest", about = "Adaptive questionnaires over Bayesian skill models")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Validate a survey and print its structure
    Inspect(commands::inspect::InspectArgs),
    /// Take a survey
    Run(commands::run::RunArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = config::ConfigLoader::load()?;

    let filter = if cli.verbose {
        "debug".to_string()
    } else {
        config.log.filter.clone()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Config(args) => commands::config::run(args, &config),
        Commands::Inspect(args) => commands::inspect::run(args),
        Commands::Run(args) => commands::run::run(args, &config.engine).await,
    }
}
