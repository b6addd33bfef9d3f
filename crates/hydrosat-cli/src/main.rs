mod commands;
mod progress;
mod summary;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hydrosat", about = "Satellite watershed monitoring")]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify parcels in one region over one period
    Classify(commands::classify::ClassifyArgs),
    /// Classify and rank every watershed
    Watersheds(commands::watersheds::WatershedsArgs),
    /// Compare a region between two periods
    Changes(commands::changes::ChangesArgs),
    /// Raise watershed alerts for a period
    Alerts(commands::alerts::AlertsArgs),
    /// Show the monitoring dashboard summary
    Dashboard(commands::dashboard::DashboardArgs),
    /// Run a task through the background job queue
    Job(commands::job::JobArgs),
    /// Print, save or check the engine config
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Classify(args) => commands::classify::run(args),
        Commands::Watersheds(args) => commands::watersheds::run(args),
        Commands::Changes(args) => commands::changes::run(args),
        Commands::Alerts(args) => commands::alerts::run(args),
        Commands::Dashboard(args) => commands::dashboard::run(args),
        Commands::Job(args) => commands::job::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
