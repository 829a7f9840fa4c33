//! CLI application for Vietnamese invoice extraction.

mod commands;
mod llm;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

use commands::{batch, calc, config, detect, mine, process};

/// Vietnamese invoice extraction - structured data from e-invoice XML, PDFs and photos
#[derive(Parser)]
#[command(name = "invx")]
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
    /// Extract one invoice file
    Process(process::ProcessArgs),

    /// Extract many invoice files
    Batch(batch::BatchArgs),

    /// Report the detected format of a file
    Detect(detect::DetectArgs),

    /// Dump or search the embedded text of a PDF
    Mine(mine::MineArgs),

    /// Recompute line items and totals of an invoice JSON file
    Calc(calc::CalcArgs),

    /// Manage configuration
    Config(config::ConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    // RUST_LOG wins over -v when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Process(args) => process::run(args, config_path).await,
        Commands::Batch(args) => batch::run(args, config_path).await,
        Commands::Detect(args) => detect::run(args).await,
        Commands::Mine(args) => mine::run(args, config_path).await,
        Commands::Calc(args) => calc::run(args).await,
        Commands::Config(args) => config::run(args, config_path).await,
    }
}
