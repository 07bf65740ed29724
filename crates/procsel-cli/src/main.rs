//! CLI application for selecting CAM process files.

mod commands;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{batch, config, parse, resolve, rules};

/// Process file selection - map recognized feature fields to a .prc file
#[derive(Parser)]
#[command(name = "procsel")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve the process file for one feature
    Resolve(resolve::ResolveArgs),

    /// Resolve many field files
    Batch(batch::BatchArgs),

    /// Parse recognized panel text into fields
    Parse(parse::ParseArgs),

    /// Inspect and validate rule tables
    Rules(rules::RulesArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
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
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Resolve(args) => resolve::run(args, config_path).await,
        Commands::Batch(args) => batch::run(args, config_path).await.map(|_| ExitCode::SUCCESS),
        Commands::Parse(args) => parse::run(args, config_path).await.map(|_| ExitCode::SUCCESS),
        Commands::Rules(args) => rules::run(args, config_path).await,
        Commands::Config(args) => config::run(args, config_path).await.map(|_| ExitCode::SUCCESS),
    }
}
