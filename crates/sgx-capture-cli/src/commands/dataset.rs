use clap::Args;
use serde_json::Value;
use tracing::info;

use sgx_capture_core::snapshot::dataset::DatasetSnapshot;

use crate::input;

/// Arguments for listing the tickers in a snapshot
#[derive(Args)]
pub struct TickersArgs {
    /// Path to the consolidated snapshot JSON
    #[arg(long)]
    pub snapshot: String,
}

/// Read and validate a snapshot file.
pub fn load_snapshot(path: &str) -> Result<DatasetSnapshot, Box<dyn std::error::Error>> {
    let contents = input::file::read_text(path)?;
    let snapshot = DatasetSnapshot::from_json_str(&contents)
        .map_err(|e| format!("Invalid snapshot '{}': {}", path, e))?;
    info!(path, tickers = snapshot.tickers.len(), "snapshot loaded");
    Ok(snapshot)
}

pub fn run_tickers(args: TickersArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot = load_snapshot(&args.snapshot)?;
    Ok(serde_json::to_value(snapshot.summaries())?)
}
