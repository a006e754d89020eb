mod commands;
mod input;
mod logging;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::capture::{HighlightsArgs, MatrixArgs, PnlArgs, UpcomingArgs};
use commands::dataset::TickersArgs;
use commands::margin::MarginCostArgs;

/// SGX dividend-capture trade analysis
#[derive(Parser)]
#[command(
    name = "sgxcap",
    version,
    about = "SGX dividend-capture trade analysis",
    long_about = "A CLI for exploring dividend-capture trades on SGX listings with decimal \
                  precision. Computes brokerage and margin-financing costs, the P&L of \
                  buying before and selling after an ex-dividend date, and auto-highlights \
                  the best historical entry/exit offsets per ticker."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log level for diagnostics on stderr (RUST_LOG takes precedence)
    #[arg(long, default_value = "warn", global = true)]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Round-trip brokerage and margin financing cost of one trade
    MarginCost(MarginCostArgs),
    /// P&L of buying at one offset and selling at another around an ex-date
    Pnl(PnlArgs),
    /// Best greedy trade per event, ranked per ticker and overall
    Highlights(HighlightsArgs),
    /// Net result of every buy/sell offset pair for one event
    Matrix(MatrixArgs),
    /// Next (or latest) ex-dividend date and yield for a ticker
    Upcoming(UpcomingArgs),
    /// List tickers in a snapshot
    Tickers(TickersArgs),
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
    let cli = Cli::parse();

    if let Err(e) = logging::init(&cli.log_level) {
        eprintln!("{}: {}", "warning".yellow().bold(), e);
    }

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::MarginCost(args) => commands::margin::run_margin_cost(args),
        Commands::Pnl(args) => commands::capture::run_pnl(args),
        Commands::Highlights(args) => commands::capture::run_highlights(args),
        Commands::Matrix(args) => commands::capture::run_matrix(args),
        Commands::Upcoming(args) => commands::capture::run_upcoming(args),
        Commands::Tickers(args) => commands::dataset::run_tickers(args),
        Commands::Version => {
            println!("sgxcap {}", env!("CARGO_PKG_VERSION"));
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
