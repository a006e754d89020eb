use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, warn};

use crate::capture::event::DividendEvent;
use crate::margin::costs::{
    calculate_margin_costs, CostParameters, MarginCostInput,
    DEFAULT_FEE_RATE, DEFAULT_MARGIN_INTEREST_RATE, DEFAULT_MARGIN_RATIO, DEFAULT_MINIMUM_FEE,
};
use crate::types::*;

const DAYS_PER_YEAR: Decimal = dec!(365);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Outcome of buying at `buy_offset` and selling at `sell_offset` around one
/// ex-dividend date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradePnl {
    pub event_id: String,
    pub buy_offset: Offset,
    pub sell_offset: Offset,
    pub buy_price: Price,
    pub sell_price: Price,
    pub capital: Money,
    /// Whole shares affordable: floor(capital / buy_price)
    pub quantity: Decimal,
    /// |sell_offset - buy_offset|
    pub holding_days: i64,
    pub dividend_received: Money,
    /// (sell_price - buy_price) * quantity; negative on a price loss
    pub price_difference_value: Money,
    /// Open plus close brokerage
    pub trade_fee: Money,
    /// Financing cost on the margin-funded portion
    pub margin_fee: Money,
    /// Net result: dividend - fees - financing + price difference
    pub total_cost: Money,
    /// total_cost / capital * 100
    pub net_percentage: Decimal,
}

/// Request shape for callers that submit a P&L query as one JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PnlQuery {
    pub event: DividendEvent,
    pub buy_offset: Offset,
    pub sell_offset: Offset,
    #[serde(default)]
    pub capital: Option<Money>,
    #[serde(default)]
    pub parameters: Option<CostParameters>,
}

// ---------------------------------------------------------------------------
// Cost resolution
// ---------------------------------------------------------------------------

/// Fees and financing for a round trip of `capital` held `holding_days`.
///
/// Falls back to the default-rate formula when the calculator rejects the
/// parameters. `None` only when both overflow.
fn resolve_costs(
    capital: Money,
    holding_days: i64,
    params: &CostParameters,
) -> Option<(Money, Money)> {
    let input = MarginCostInput::with_parameters(capital, holding_days, params);
    match calculate_margin_costs(&input) {
        Ok(costs) => Some((costs.total_fees, costs.financing_cost)),
        Err(e) => {
            warn!(error = %e, "margin cost calculator rejected inputs; using default-rate fallback");
            fallback_costs(capital, holding_days)
        }
    }
}

/// `capital * 0.5 * 0.06 * days / 365` financing plus two minimum-floored legs.
pub fn fallback_costs(capital: Money, holding_days: i64) -> Option<(Money, Money)> {
    let leg = capital
        .checked_mul(DEFAULT_FEE_RATE)?
        .max(DEFAULT_MINIMUM_FEE);
    let financing = capital
        .checked_mul(DEFAULT_MARGIN_RATIO * DEFAULT_MARGIN_INTEREST_RATE)?
        .checked_mul(Decimal::from(holding_days.max(0)))?
        .checked_div(DAYS_PER_YEAR)?;
    Some((leg.checked_add(leg)?, financing))
}

// ---------------------------------------------------------------------------
// Main functions
// ---------------------------------------------------------------------------

/// P&L for one buy/sell offset pair using the default cost model.
///
/// `None` means no tradeable combination: a non-negative buy offset, a
/// non-positive sell offset, a missing price, a non-positive buy price,
/// capital too small for one share, or a result outside `Decimal` range.
pub fn calculate_pnl_for_offsets(
    event: &DividendEvent,
    buy_offset: Offset,
    sell_offset: Offset,
    capital: Option<Money>,
) -> Option<TradePnl> {
    calculate_pnl_with_parameters(
        event,
        buy_offset,
        sell_offset,
        capital,
        &CostParameters::default(),
    )
}

/// P&L for one buy/sell offset pair under an explicit cost model.
pub fn calculate_pnl_with_parameters(
    event: &DividendEvent,
    buy_offset: Offset,
    sell_offset: Offset,
    capital: Option<Money>,
    params: &CostParameters,
) -> Option<TradePnl> {
    if buy_offset >= 0 || sell_offset <= 0 {
        return None;
    }

    let buy_price = event.price_at(buy_offset)?;
    let sell_price = event.price_at(sell_offset)?;
    if buy_price <= Decimal::ZERO {
        debug!(event = %event.id, buy_offset, "non-positive buy price; no trade");
        return None;
    }

    let capital = params.resolve_capital(capital);
    let quantity = capital.checked_div(buy_price)?.floor();
    if quantity <= Decimal::ZERO {
        return None;
    }

    let holding_days = (i64::from(sell_offset) - i64::from(buy_offset)).abs();
    let dividend_received = event.dividend_per_share.checked_mul(quantity)?;
    let price_difference_value = sell_price.checked_sub(buy_price)?.checked_mul(quantity)?;

    let (trade_fee, margin_fee) = resolve_costs(capital, holding_days, params)?;

    let total_cost = dividend_received
        .checked_sub(trade_fee)?
        .checked_sub(margin_fee)?
        .checked_add(price_difference_value)?;
    let net_percentage = total_cost.checked_div(capital)?.checked_mul(dec!(100))?;

    Some(TradePnl {
        event_id: event.id.clone(),
        buy_offset,
        sell_offset,
        buy_price,
        sell_price,
        capital,
        quantity,
        holding_days,
        dividend_received,
        price_difference_value,
        trade_fee,
        margin_fee,
        total_cost,
        net_percentage,
    })
}

/// Run a [`PnlQuery`] and wrap the outcome in the standard envelope. A
/// no-trade outcome is reported as a `null` result with a warning.
pub fn pnl_report(query: &PnlQuery) -> ComputationOutput<Option<TradePnl>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let params = query.parameters.clone().unwrap_or_default();
    let result = calculate_pnl_with_parameters(
        &query.event,
        query.buy_offset,
        query.sell_offset,
        query.capital,
        &params,
    );

    match &result {
        None => warnings.push(format!(
            "No tradeable combination for {} at D{:+} / D{:+}",
            query.event.id, query.buy_offset, query.sell_offset
        )),
        Some(pnl) if pnl.total_cost < Decimal::ZERO => {
            warnings.push("Trade loses money after costs".into())
        }
        Some(_) => {}
    }

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Dividend Capture P&L (dividend plus price move, less brokerage and margin financing)",
        &serde_json::json!({
            "capital": params.resolve_capital(query.capital).to_string(),
            "margin_ratio": params.margin_ratio.to_string(),
            "margin_interest_rate": params.margin_interest_rate.to_string(),
            "fee_rate": params.fee_rate.to_string(),
            "minimum_fee": params.minimum_fee.to_string(),
        }),
        warnings,
        elapsed,
        result,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::event::PriceWindow;
    use chrono::NaiveDate;

    fn event(dividend: Decimal, prices: &[(Offset, Decimal)]) -> DividendEvent {
        DividendEvent::new(
            "C38U",
            NaiveDate::from_ymd_opt(2024, 7, 30).unwrap(),
            Some(dividend),
            prices.iter().copied().collect::<PriceWindow>(),
        )
    }

    // 1. Reference scenario: 0.10 dividend, 1.00 -> 1.05, capital 1000
    #[test]
    fn test_reference_scenario() {
        let ev = event(dec!(0.10), &[(-1, dec!(1.00)), (1, dec!(1.05))]);
        let pnl = calculate_pnl_for_offsets(&ev, -1, 1, Some(dec!(1000))).unwrap();

        assert_eq!(pnl.quantity, dec!(1000));
        assert_eq!(pnl.holding_days, 2);
        assert_eq!(pnl.dividend_received, dec!(100));
        assert_eq!(pnl.price_difference_value, dec!(50));
        assert_eq!(pnl.trade_fee, dec!(8.20));
        assert_eq!(pnl.margin_fee.round_dp(3), dec!(0.164));
        assert_eq!(pnl.total_cost.round_dp(2), dec!(141.64));
        assert_eq!(pnl.net_percentage.round_dp(2), dec!(14.16));
    }

    // 2. Sign constraints on offsets
    #[test]
    fn test_offset_sign_constraints() {
        let ev = event(dec!(0.10), &[(-1, dec!(1)), (0, dec!(1)), (1, dec!(1))]);
        assert!(calculate_pnl_for_offsets(&ev, 0, 1, None).is_none());
        assert!(calculate_pnl_for_offsets(&ev, 1, 2, None).is_none());
        assert!(calculate_pnl_for_offsets(&ev, -1, 0, None).is_none());
        assert!(calculate_pnl_for_offsets(&ev, -1, -2, None).is_none());
    }

    // 3. Missing prices and non-positive buy price
    #[test]
    fn test_missing_or_bad_prices() {
        let ev = event(dec!(0.10), &[(-2, dec!(0)), (-1, dec!(1)), (3, dec!(1.1))]);
        assert!(calculate_pnl_for_offsets(&ev, -1, 1, None).is_none());
        assert!(calculate_pnl_for_offsets(&ev, -3, 3, None).is_none());
        assert!(calculate_pnl_for_offsets(&ev, -2, 3, None).is_none());
        assert!(calculate_pnl_for_offsets(&ev, -1, 3, None).is_some());
    }

    // 4. Capital too small for one share
    #[test]
    fn test_zero_quantity() {
        let ev = event(dec!(0.10), &[(-1, dec!(60000)), (1, dec!(61000))]);
        assert!(calculate_pnl_for_offsets(&ev, -1, 1, None).is_none());
        assert!(calculate_pnl_for_offsets(&ev, -1, 1, Some(dec!(59999))).is_none());
    }

    // 5. Invalid capital falls back to 50,000
    #[test]
    fn test_default_capital() {
        let ev = event(dec!(0), &[(-1, dec!(2)), (1, dec!(2))]);
        let a = calculate_pnl_for_offsets(&ev, -1, 1, None).unwrap();
        let b = calculate_pnl_for_offsets(&ev, -1, 1, Some(dec!(-10))).unwrap();
        assert_eq!(a.capital, dec!(50000));
        assert_eq!(a.quantity, dec!(25000));
        assert_eq!(a, b);
    }

    // 6. Price loss is subtracted
    #[test]
    fn test_price_loss() {
        let ev = event(dec!(0.02), &[(-5, dec!(2.00)), (5, dec!(1.90))]);
        let pnl = calculate_pnl_for_offsets(&ev, -5, 5, Some(dec!(10000))).unwrap();
        assert_eq!(pnl.quantity, dec!(5000));
        assert_eq!(pnl.price_difference_value, dec!(-500));
        assert_eq!(
            pnl.total_cost,
            pnl.dividend_received - pnl.trade_fee - pnl.margin_fee - dec!(500)
        );
        assert!(pnl.total_cost < Decimal::ZERO);
    }

    // 7. Fractional shares are floored
    #[test]
    fn test_quantity_floor() {
        let ev = event(dec!(0.05), &[(-1, dec!(3)), (2, dec!(3))]);
        let pnl = calculate_pnl_for_offsets(&ev, -1, 2, Some(dec!(1000))).unwrap();
        assert_eq!(pnl.quantity, dec!(333));
        assert_eq!(pnl.dividend_received, dec!(16.65));
        assert_eq!(pnl.holding_days, 3);
    }

    // 8. Idempotent
    #[test]
    fn test_idempotent() {
        let ev = event(dec!(0.10), &[(-1, dec!(1.00)), (1, dec!(1.05))]);
        let a = calculate_pnl_for_offsets(&ev, -1, 1, Some(dec!(1000)));
        let b = calculate_pnl_for_offsets(&ev, -1, 1, Some(dec!(1000)));
        assert_eq!(a, b);
    }

    // 9. Rejected cost parameters use the fallback formula
    #[test]
    fn test_fallback_costs() {
        let ev = event(dec!(0.10), &[(-1, dec!(1.00)), (1, dec!(1.05))]);
        let params = CostParameters {
            margin_ratio: dec!(1.5),
            ..CostParameters::default()
        };
        let fallback =
            calculate_pnl_with_parameters(&ev, -1, 1, Some(dec!(1000)), &params).unwrap();
        let primary = calculate_pnl_for_offsets(&ev, -1, 1, Some(dec!(1000))).unwrap();
        assert_eq!(fallback.trade_fee, primary.trade_fee);
        assert_eq!(fallback.margin_fee.round_dp(10), primary.margin_fee.round_dp(10));
    }

    #[test]
    fn test_fallback_formula() {
        let (fees, financing) = fallback_costs(dec!(36500), 10).unwrap();
        // 36500 * 0.00127 = 46.355 per leg
        assert_eq!(fees, dec!(92.71));
        // 36500 * 0.5 * 0.06 * 10 / 365 = 30
        assert_eq!(financing, dec!(30));
    }

    #[test]
    fn test_tiny_buy_price_is_no_trade() {
        // capital / 1e-25 exceeds Decimal range
        let ev = event(dec!(0.10), &[(-1, dec!(0.0000000000000000000000001)), (1, dec!(1))]);
        assert!(calculate_pnl_for_offsets(&ev, -1, 1, Some(dec!(50000))).is_none());
    }

    #[test]
    fn test_quantity_beyond_u64() {
        let ev = event(dec!(0), &[(-1, dec!(0.01)), (1, dec!(0.01))]);
        let pnl = calculate_pnl_for_offsets(&ev, -1, 1, Some(dec!(1000000000000000000))).unwrap();
        assert_eq!(pnl.quantity, dec!(100000000000000000000));
        assert_eq!(pnl.price_difference_value, Decimal::ZERO);
        assert!(pnl.total_cost < Decimal::ZERO);
    }

    #[test]
    fn test_report_no_trade_warning() {
        let query = PnlQuery {
            event: event(dec!(0.10), &[(-1, dec!(1.00))]),
            buy_offset: -1,
            sell_offset: 1,
            capital: None,
            parameters: None,
        };
        let report = pnl_report(&query);
        assert!(report.result.is_none());
        assert_eq!(report.warnings.len(), 1);
    }
}
