mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::model::{IrrArgs, ModelArgs, ProjectArgs};

/// Leveraged buyout return modelling
#[derive(Parser)]
#[command(
    name = "lbo",
    version,
    about = "Leveraged buyout return modelling with decimal precision",
    long_about = "Projects a multi-year LBO income statement and debt/cash \
                  waterfall from entry assumptions, then computes levered and \
                  unlevered IRR with a growth/multiple/yield/leverage \
                  decomposition."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Project the income statement and debt/cash schedule
    Project(ProjectArgs),
    /// Run the full model: projection, returns, and IRR decomposition
    Model(ModelArgs),
    /// Solve IRR for a raw cash-flow series
    Irr(IrrArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Project(args) => commands::model::run_project(args),
        Commands::Model(args) => commands::model::run_model(args),
        Commands::Irr(args) => commands::model::run_irr(args),
        Commands::Version => {
            println!("lbo {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
