//! Round-trip brokerage and margin-financing costs for a single SGX trade.
//!
//! Brokerage is charged per leg as the greater of a minimum fee and a
//! percentage of trade value. Financing accrues simple interest on the
//! borrowed portion of the trade for every calendar day the position is held.
//!
//! All arithmetic uses `rust_decimal::Decimal`. No `f64`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::CaptureError;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::CaptureResult;

/// Annualised simple margin interest rate.
pub const DEFAULT_MARGIN_INTEREST_RATE: Rate = dec!(0.06);
/// Brokerage commission per leg, as a fraction of trade value.
pub const DEFAULT_FEE_RATE: Rate = dec!(0.00127);
/// Minimum brokerage charge per leg, in SGD.
pub const DEFAULT_MINIMUM_FEE: Money = dec!(4.10);
/// Fraction of capital financed on margin for dividend-capture trades.
pub const DEFAULT_MARGIN_RATIO: Rate = dec!(0.5);
/// Capital used when the caller supplies none (or a non-positive amount).
pub const DEFAULT_CAPITAL: Money = dec!(50000);

const DAYS_PER_YEAR: Decimal = dec!(365);
const CURRENCY_DP: u32 = 2;
const RATE_DP: u32 = 4;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Tunable cost model shared by the P&L formula and the highlighter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostParameters {
    pub margin_interest_rate: Rate,
    pub fee_rate: Rate,
    pub minimum_fee: Money,
    pub margin_ratio: Rate,
    pub default_capital: Money,
}

impl Default for CostParameters {
    fn default() -> Self {
        Self {
            margin_interest_rate: DEFAULT_MARGIN_INTEREST_RATE,
            fee_rate: DEFAULT_FEE_RATE,
            minimum_fee: DEFAULT_MINIMUM_FEE,
            margin_ratio: DEFAULT_MARGIN_RATIO,
            default_capital: DEFAULT_CAPITAL,
        }
    }
}

impl CostParameters {
    /// Capital to trade with: the caller's amount when positive, else the default.
    pub fn resolve_capital(&self, capital: Option<Money>) -> Money {
        match capital {
            Some(c) if c > Decimal::ZERO => c,
            _ => self.default_capital,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarginCostInput {
    /// Notional value of the trade in SGD.
    pub trade_value: Money,
    /// Fraction of trade value borrowed, 0..=1.
    pub margin_ratio: Rate,
    /// Calendar days the position is held. Signed so negatives can be rejected.
    pub holding_days: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub margin_interest_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fee_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_fee: Option<Money>,
}

impl MarginCostInput {
    /// Build an input for `trade_value` using the rates in `params`.
    pub fn with_parameters(
        trade_value: Money,
        holding_days: i64,
        params: &CostParameters,
    ) -> Self {
        Self {
            trade_value,
            margin_ratio: params.margin_ratio,
            holding_days,
            margin_interest_rate: Some(params.margin_interest_rate),
            fee_rate: Some(params.fee_rate),
            minimum_fee: Some(params.minimum_fee),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarginCostBreakdown {
    pub trade_value: Money,
    pub margin_ratio: Rate,
    /// trade_value * margin_ratio
    pub borrowed: Money,
    pub holding_days: i64,
    /// borrowed * margin_interest_rate / 365
    pub daily_interest: Money,
    /// daily_interest * holding_days
    pub financing_cost: Money,
    pub open_fees: Money,
    pub close_fees: Money,
    pub total_fees: Money,
    /// total_fees + financing_cost
    pub total_cost: Money,
    /// total_cost / trade_value * 100
    pub total_cost_percentage: Decimal,
}

impl MarginCostBreakdown {
    /// Display copy: currency amounts at 2 dp, rates and interest accruals at 4 dp.
    ///
    /// Never feed the rounded copy back into further arithmetic.
    pub fn rounded(&self) -> Self {
        Self {
            trade_value: self.trade_value.round_dp(CURRENCY_DP),
            margin_ratio: self.margin_ratio.round_dp(RATE_DP),
            borrowed: self.borrowed.round_dp(CURRENCY_DP),
            holding_days: self.holding_days,
            daily_interest: self.daily_interest.round_dp(RATE_DP),
            financing_cost: self.financing_cost.round_dp(RATE_DP),
            open_fees: self.open_fees.round_dp(CURRENCY_DP),
            close_fees: self.close_fees.round_dp(CURRENCY_DP),
            total_fees: self.total_fees.round_dp(CURRENCY_DP),
            total_cost: self.total_cost.round_dp(CURRENCY_DP),
            total_cost_percentage: self.total_cost_percentage.round_dp(RATE_DP),
        }
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn invalid(field: &str, reason: &str) -> CaptureError {
    CaptureError::InvalidInput {
        field: field.into(),
        reason: reason.into(),
    }
}

fn validate_margin_cost_input(input: &MarginCostInput) -> CaptureResult<()> {
    if input.trade_value <= Decimal::ZERO {
        return Err(invalid("trade_value", "Trade value must be positive"));
    }
    if input.margin_ratio < Decimal::ZERO || input.margin_ratio > Decimal::ONE {
        return Err(invalid("margin_ratio", "Margin ratio must be between 0 and 1"));
    }
    if input.holding_days < 0 {
        return Err(invalid("holding_days", "Holding days cannot be negative"));
    }
    if input.margin_interest_rate.is_some_and(|r| r < Decimal::ZERO) {
        return Err(invalid(
            "margin_interest_rate",
            "Margin interest rate cannot be negative",
        ));
    }
    if input.fee_rate.is_some_and(|r| r < Decimal::ZERO) {
        return Err(invalid("fee_rate", "Fee rate cannot be negative"));
    }
    if input.minimum_fee.is_some_and(|f| f < Decimal::ZERO) {
        return Err(invalid("minimum_fee", "Minimum fee cannot be negative"));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Main functions
// ---------------------------------------------------------------------------

/// Brokerage charged on one leg of a trade. `None` on overflow.
pub fn per_leg_fee(trade_value: Money, fee_rate: Rate, minimum_fee: Money) -> Option<Money> {
    Some(trade_value.checked_mul(fee_rate)?.max(minimum_fee))
}

fn overflow() -> CaptureError {
    invalid("trade_value", "Cost arithmetic exceeds decimal range")
}

/// Full-precision round-trip cost of a margin-financed trade.
pub fn calculate_margin_costs(input: &MarginCostInput) -> CaptureResult<MarginCostBreakdown> {
    validate_margin_cost_input(input)?;

    let rate = input
        .margin_interest_rate
        .unwrap_or(DEFAULT_MARGIN_INTEREST_RATE);
    let fee_rate = input.fee_rate.unwrap_or(DEFAULT_FEE_RATE);
    let minimum_fee = input.minimum_fee.unwrap_or(DEFAULT_MINIMUM_FEE);

    let leg_fee = per_leg_fee(input.trade_value, fee_rate, minimum_fee).ok_or_else(overflow)?;
    let open_fees = leg_fee;
    let close_fees = leg_fee;

    let borrowed = input
        .trade_value
        .checked_mul(input.margin_ratio)
        .ok_or_else(overflow)?;
    let daily_interest = borrowed
        .checked_mul(rate)
        .and_then(|v| v.checked_div(DAYS_PER_YEAR))
        .ok_or_else(overflow)?;
    let financing_cost = daily_interest
        .checked_mul(Decimal::from(input.holding_days))
        .ok_or_else(overflow)?;

    let total_fees = open_fees.checked_add(close_fees).ok_or_else(overflow)?;
    let total_cost = total_fees.checked_add(financing_cost).ok_or_else(overflow)?;
    let total_cost_percentage = total_cost
        .checked_div(input.trade_value)
        .and_then(|v| v.checked_mul(dec!(100)))
        .ok_or_else(overflow)?;

    Ok(MarginCostBreakdown {
        trade_value: input.trade_value,
        margin_ratio: input.margin_ratio,
        borrowed,
        holding_days: input.holding_days,
        daily_interest,
        financing_cost,
        open_fees,
        close_fees,
        total_fees,
        total_cost,
        total_cost_percentage,
    })
}

/// Display-rounded breakdown wrapped in the standard output envelope.
pub fn margin_cost_report(
    input: &MarginCostInput,
) -> CaptureResult<ComputationOutput<MarginCostBreakdown>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let breakdown = calculate_margin_costs(input)?;

    if breakdown.open_fees == input.minimum_fee.unwrap_or(DEFAULT_MINIMUM_FEE) {
        warnings.push(format!(
            "Minimum brokerage fee applies on each leg (trade value {} below break-even)",
            breakdown.trade_value.round_dp(CURRENCY_DP)
        ));
    }
    if input.margin_ratio.is_zero() && input.holding_days > 0 {
        warnings.push("Margin ratio is zero; no financing cost accrues".into());
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Margin Cost (round-trip brokerage plus simple-interest financing)",
        &serde_json::json!({
            "margin_interest_rate": input
                .margin_interest_rate
                .unwrap_or(DEFAULT_MARGIN_INTEREST_RATE)
                .to_string(),
            "fee_rate": input.fee_rate.unwrap_or(DEFAULT_FEE_RATE).to_string(),
            "minimum_fee": input.minimum_fee.unwrap_or(DEFAULT_MINIMUM_FEE).to_string(),
            "day_count": "ACT/365",
        }),
        warnings,
        elapsed,
        breakdown.rounded(),
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn input(trade_value: Money, margin_ratio: Rate, holding_days: i64) -> MarginCostInput {
        MarginCostInput {
            trade_value,
            margin_ratio,
            holding_days,
            margin_interest_rate: None,
            fee_rate: None,
            minimum_fee: None,
        }
    }

    fn assert_field(result: CaptureResult<MarginCostBreakdown>, expected: &str) {
        match result {
            Err(CaptureError::InvalidInput { field, .. }) => assert_eq!(field, expected),
            other => panic!("Expected InvalidInput on {expected}, got {other:?}"),
        }
    }

    // 1. Small ticket: minimum fee dominates
    #[test]
    fn test_minimum_fee_small_trade() {
        let out = calculate_margin_costs(&input(dec!(1000), dec!(0.5), 1)).unwrap();
        assert_eq!(out.open_fees, dec!(4.10));
        assert_eq!(out.close_fees, dec!(4.10));
        assert_eq!(out.borrowed, dec!(500));
        // 500 * 0.06 / 365
        assert_eq!(out.financing_cost.round_dp(4), dec!(0.0822));
        assert_eq!(out.total_cost.round_dp(2), dec!(8.28));
    }

    // 2. Large ticket: percentage fee dominates
    #[test]
    fn test_percentage_fee_large_trade() {
        let out = calculate_margin_costs(&input(dec!(50000), dec!(0.5), 10)).unwrap();
        // 50000 * 0.00127 = 63.5
        assert_eq!(out.open_fees, dec!(63.5));
        assert_eq!(out.total_fees, dec!(127.0));
        // 25000 * 0.06 / 365 * 10
        assert_eq!(out.financing_cost.round_dp(4), dec!(41.0959));
    }

    // 3. Total identity holds at full precision
    #[test]
    fn test_total_identity() {
        for (tv, mr, d) in [
            (dec!(1234.56), dec!(0.3), 7),
            (dec!(99999), dec!(1), 365),
            (dec!(0.01), dec!(0), 0),
        ] {
            let out = calculate_margin_costs(&input(tv, mr, d)).unwrap();
            assert_eq!(out.total_cost, out.open_fees + out.close_fees + out.financing_cost);
            assert_eq!(out.total_cost_percentage, out.total_cost / tv * dec!(100));
        }
    }

    // 4. Zero holding days means fees only
    #[test]
    fn test_zero_holding_days() {
        let out = calculate_margin_costs(&input(dec!(10000), dec!(0.5), 0)).unwrap();
        assert_eq!(out.financing_cost, Decimal::ZERO);
        assert_eq!(out.total_cost, out.total_fees);
    }

    // 5. Custom rates override defaults
    #[test]
    fn test_custom_rates() {
        let mut inp = input(dec!(10000), dec!(1), 365);
        inp.margin_interest_rate = Some(dec!(0.10));
        inp.fee_rate = Some(dec!(0.001));
        inp.minimum_fee = Some(dec!(25));
        let out = calculate_margin_costs(&inp).unwrap();
        assert_eq!(out.open_fees, dec!(25));
        assert_eq!(out.financing_cost.round_dp(8), dec!(1000));
    }

    // 6. Invalid inputs name the offending field
    #[test]
    fn test_invalid_inputs() {
        assert_field(calculate_margin_costs(&input(dec!(0), dec!(0.5), 1)), "trade_value");
        assert_field(calculate_margin_costs(&input(dec!(-5), dec!(0.5), 1)), "trade_value");
        assert_field(calculate_margin_costs(&input(dec!(100), dec!(-0.1), 1)), "margin_ratio");
        assert_field(calculate_margin_costs(&input(dec!(100), dec!(1.1), 1)), "margin_ratio");
        assert_field(calculate_margin_costs(&input(dec!(100), dec!(0.5), -1)), "holding_days");

        let mut inp = input(dec!(100), dec!(0.5), 1);
        inp.margin_interest_rate = Some(dec!(-0.01));
        assert_field(calculate_margin_costs(&inp), "margin_interest_rate");
    }

    // Overflow is reported against trade_value rather than panicking
    #[test]
    fn test_overflow_is_invalid_input() {
        let mut inp = input(Decimal::MAX, dec!(1), 1);
        inp.margin_interest_rate = Some(dec!(2));
        assert_field(calculate_margin_costs(&inp), "trade_value");

        let mut inp = input(Decimal::MAX, dec!(0), 0);
        inp.fee_rate = Some(dec!(2));
        assert_field(calculate_margin_costs(&inp), "trade_value");
    }

    // 7. Rounded copy is display-only
    #[test]
    fn test_rounded_copy() {
        let raw = calculate_margin_costs(&input(dec!(1000), dec!(0.5), 2)).unwrap();
        let rounded = raw.rounded();
        assert_eq!(rounded.financing_cost, dec!(0.1644));
        assert_eq!(rounded.total_cost, dec!(8.36));
        assert_ne!(raw.financing_cost, rounded.financing_cost);
    }

    // 8. Report envelope carries warnings and rounded values
    #[test]
    fn test_report_envelope() {
        let report = margin_cost_report(&input(dec!(1000), dec!(0.5), 1)).unwrap();
        assert_eq!(report.result.total_cost, dec!(8.28));
        assert!(report.warnings.iter().any(|w| w.contains("Minimum brokerage")));
    }

    #[test]
    fn test_resolve_capital() {
        let params = CostParameters::default();
        assert_eq!(params.resolve_capital(None), dec!(50000));
        assert_eq!(params.resolve_capital(Some(dec!(-1))), dec!(50000));
        assert_eq!(params.resolve_capital(Some(dec!(1000))), dec!(1000));
    }
}
