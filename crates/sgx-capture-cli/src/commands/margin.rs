use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use sgx_capture_core::margin::costs::{self, CostParameters, MarginCostInput};

use crate::input;

/// Arguments for round-trip margin cost calculation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct MarginCostArgs {
    /// Notional trade value in SGD
    #[arg(long)]
    pub trade_value: Option<Decimal>,

    /// Fraction of trade value borrowed (0 to 1)
    #[arg(long, default_value = "0.5")]
    pub margin_ratio: Decimal,

    /// Calendar days the position is held
    #[arg(long)]
    pub holding_days: Option<i64>,

    /// Annualised margin interest rate (e.g. 0.06 for 6%)
    #[arg(long)]
    pub margin_interest_rate: Option<Decimal>,

    /// Brokerage commission per leg (e.g. 0.00127)
    #[arg(long)]
    pub fee_rate: Option<Decimal>,

    /// Minimum brokerage per leg in SGD
    #[arg(long)]
    pub minimum_fee: Option<Decimal>,

    /// Path to JSON input file (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,
}

/// Cost-model overrides shared by the trade analysis commands
#[derive(Args, Clone)]
#[command(allow_hyphen_values = true)]
pub struct CostArgs {
    /// Fraction of capital financed on margin
    #[arg(long)]
    pub margin_ratio: Option<Decimal>,

    /// Annualised margin interest rate
    #[arg(long)]
    pub margin_interest_rate: Option<Decimal>,

    /// Brokerage commission per leg
    #[arg(long)]
    pub fee_rate: Option<Decimal>,

    /// Minimum brokerage per leg in SGD
    #[arg(long)]
    pub minimum_fee: Option<Decimal>,
}

impl CostArgs {
    pub fn to_parameters(&self) -> CostParameters {
        let defaults = CostParameters::default();
        CostParameters {
            margin_ratio: self.margin_ratio.unwrap_or(defaults.margin_ratio),
            margin_interest_rate: self
                .margin_interest_rate
                .unwrap_or(defaults.margin_interest_rate),
            fee_rate: self.fee_rate.unwrap_or(defaults.fee_rate),
            minimum_fee: self.minimum_fee.unwrap_or(defaults.minimum_fee),
            default_capital: defaults.default_capital,
        }
    }
}

pub fn run_margin_cost(args: MarginCostArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let cost_input: MarginCostInput = if let Some(ref path) = args.input {
        input::file::read_json(path)?
    } else if let Some(piped) = input::stdin::read_stdin()? {
        piped
    } else {
        MarginCostInput {
            trade_value: args
                .trade_value
                .ok_or("--trade-value is required (or provide --input)")?,
            margin_ratio: args.margin_ratio,
            holding_days: args
                .holding_days
                .ok_or("--holding-days is required (or provide --input)")?,
            margin_interest_rate: args.margin_interest_rate,
            fee_rate: args.fee_rate,
            minimum_fee: args.minimum_fee,
        }
    };
    let result = costs::margin_cost_report(&cost_input)?;
    Ok(serde_json::to_value(result)?)
}
