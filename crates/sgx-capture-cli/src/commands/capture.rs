use chrono::{NaiveDate, Utc};
use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use sgx_capture_core::capture::highlights::{self, HighlightOptions, HighlightRequest};
use sgx_capture_core::capture::matrix;
use sgx_capture_core::capture::pnl::{self, PnlQuery};

use crate::commands::dataset::load_snapshot;
use crate::commands::margin::CostArgs;
use crate::input;

/// Arguments for P&L of one buy/sell offset pair
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct PnlArgs {
    /// Path to the consolidated snapshot JSON
    #[arg(long)]
    pub snapshot: Option<String>,

    /// SGX ticker, with or without the .SI suffix
    #[arg(long)]
    pub ticker: Option<String>,

    /// Ex-dividend date (YYYY-MM-DD)
    #[arg(long)]
    pub ex_date: Option<NaiveDate>,

    /// Buy offset in trading days before the ex-date (negative)
    #[arg(long, allow_hyphen_values = true)]
    pub buy: Option<i32>,

    /// Sell offset in trading days after the ex-date (positive)
    #[arg(long)]
    pub sell: Option<i32>,

    /// Capital to deploy in SGD (default 50000)
    #[arg(long)]
    pub capital: Option<Decimal>,

    #[command(flatten)]
    pub costs: CostArgs,

    /// Path to JSON query file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for auto-trade highlighting
#[derive(Args)]
pub struct HighlightsArgs {
    /// Path to the consolidated snapshot JSON
    #[arg(long)]
    pub snapshot: Option<String>,

    /// Comma-separated tickers to scan (default: every ticker)
    #[arg(long, value_delimiter = ',')]
    pub tickers: Option<Vec<String>>,

    /// Capital to deploy in SGD (default 50000)
    #[arg(long)]
    pub capital: Option<Decimal>,

    /// Maximum highlighted events per ticker
    #[arg(long, default_value = "3")]
    pub max_rows: usize,

    #[command(flatten)]
    pub costs: CostArgs,

    /// Path to JSON request file with events (overrides the snapshot)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the full offset P&L grid of one event
#[derive(Args)]
pub struct MatrixArgs {
    /// Path to the consolidated snapshot JSON
    #[arg(long)]
    pub snapshot: String,

    /// SGX ticker
    #[arg(long)]
    pub ticker: String,

    /// Ex-dividend date (YYYY-MM-DD)
    #[arg(long)]
    pub ex_date: NaiveDate,

    /// Capital to deploy in SGD (default 50000)
    #[arg(long)]
    pub capital: Option<Decimal>,

    #[command(flatten)]
    pub costs: CostArgs,
}

/// Arguments for the next dividend of a ticker
#[derive(Args)]
pub struct UpcomingArgs {
    /// Path to the consolidated snapshot JSON
    #[arg(long)]
    pub snapshot: String,

    /// SGX ticker
    #[arg(long)]
    pub ticker: String,

    /// Reference date (default: today, UTC)
    #[arg(long)]
    pub today: Option<NaiveDate>,
}

pub fn run_pnl(args: PnlArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let query: PnlQuery = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(ref path) = args.snapshot {
        let snapshot = load_snapshot(path)?;
        let ticker = args.ticker.as_deref().ok_or("--ticker is required with --snapshot")?;
        let ex_date = args.ex_date.ok_or("--ex-date is required with --snapshot")?;
        PnlQuery {
            event: snapshot.event(ticker, ex_date)?,
            buy_offset: args.buy.ok_or("--buy is required (e.g. --buy -1)")?,
            sell_offset: args.sell.ok_or("--sell is required (e.g. --sell 1)")?,
            capital: args.capital,
            parameters: Some(args.costs.to_parameters()),
        }
    } else if let Some(piped) = input::stdin::read_stdin()? {
        piped
    } else {
        return Err("--snapshot <file.json>, --input <file.json> or stdin required".into());
    };
    let result = pnl::pnl_report(&query);
    Ok(serde_json::to_value(result)?)
}

pub fn run_highlights(args: HighlightsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let request: HighlightRequest = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(ref path) = args.snapshot {
        let snapshot = load_snapshot(path)?;
        let events = match args.tickers {
            Some(ref tickers) => {
                let mut events = Vec::new();
                for ticker in tickers {
                    events.extend(snapshot.events_for(ticker)?);
                }
                events
            }
            None => snapshot.all_events(),
        };
        HighlightRequest {
            events,
            capital: args.capital,
            options: HighlightOptions {
                max_rows_per_ticker: args.max_rows,
                parameters: args.costs.to_parameters(),
            },
        }
    } else if let Some(piped) = input::stdin::read_stdin()? {
        piped
    } else {
        return Err("--snapshot <file.json>, --input <file.json> or stdin required".into());
    };
    let result = highlights::highlights_report(&request);
    Ok(serde_json::to_value(result)?)
}

pub fn run_matrix(args: MatrixArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(&args.snapshot)?;
    let event = snapshot.event(&args.ticker, args.ex_date)?;
    let result = matrix::pnl_matrix_report(&event, args.capital, &args.costs.to_parameters());
    Ok(serde_json::to_value(result)?)
}

pub fn run_upcoming(args: UpcomingArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(&args.snapshot)?;
    let today = args.today.unwrap_or_else(|| Utc::now().date_naive());
    let summary = snapshot
        .upcoming_dividend(&args.ticker, today)?
        .ok_or_else(|| format!("No dividend events recorded for {}", args.ticker))?;
    Ok(serde_json::to_value(summary)?)
}
