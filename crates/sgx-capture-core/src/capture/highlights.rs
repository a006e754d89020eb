//! Auto-trade highlighting.
//!
//! For every ex-dividend event the highlighter picks the cheapest day in the
//! ten trading days before the ex-date and the richest day in the thirty
//! trading days after it, prices that single pair, and then ranks events per
//! ticker and across the whole selection. It is a greedy heuristic: the pair
//! is chosen on price alone, not by searching every buy/sell combination
//! (see [`crate::capture::matrix`] for the exhaustive grid).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::time::Instant;
use tracing::debug;

use crate::capture::event::{DividendEvent, BUY_OFFSETS, SELL_OFFSETS};
use crate::capture::pnl::{calculate_pnl_with_parameters, TradePnl};
use crate::margin::costs::CostParameters;
use crate::types::*;

/// Number of trades surfaced in `top_trades`.
pub const TOP_TRADES_LIMIT: usize = 3;
/// Default cap on highlighted events per ticker.
pub const DEFAULT_MAX_ROWS_PER_TICKER: usize = 3;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HighlightOptions {
    pub max_rows_per_ticker: usize,
    pub parameters: CostParameters,
}

impl Default for HighlightOptions {
    fn default() -> Self {
        Self {
            max_rows_per_ticker: DEFAULT_MAX_ROWS_PER_TICKER,
            parameters: CostParameters::default(),
        }
    }
}

/// Best greedy trade for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub event_id: String,
    pub ticker: String,
    pub ex_date: NaiveDate,
    pub buy_offset: Offset,
    pub sell_offset: Offset,
    pub buy_price: Price,
    pub sell_price: Price,
    pub total_cost: Money,
    pub net_percentage: Decimal,
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopTrade {
    pub event_id: String,
    pub ticker: String,
    pub ex_date: NaiveDate,
    pub buy_offset: Offset,
    pub sell_offset: Offset,
    pub total_cost: Money,
    pub net_percentage: Decimal,
    pub quantity: Decimal,
    pub dividend_per_share: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoTradeHighlights {
    /// Kept highlights keyed by event id.
    pub highlight_map: BTreeMap<String, Highlight>,
    /// Best trades across all tickers, at most three.
    pub top_trades: Vec<TopTrade>,
    /// Mean buy offset over every kept highlight; `None` when there are none.
    pub average_buy_offset: Option<Decimal>,
    pub average_sell_offset: Option<Decimal>,
    pub events_scanned: usize,
    pub events_without_trade: usize,
}

/// Request shape for callers that submit a highlight run as one JSON document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HighlightRequest {
    pub events: Vec<DividendEvent>,
    #[serde(default)]
    pub capital: Option<Money>,
    #[serde(default)]
    pub options: HighlightOptions,
}

struct Candidate<'a> {
    /// Position in the caller's event list; breaks ranking ties.
    index: usize,
    event: &'a DividendEvent,
    pnl: TradePnl,
}

// ---------------------------------------------------------------------------
// Point selection
// ---------------------------------------------------------------------------

/// Lowest price before the ex-date. Ties go to the day closest to the ex-date.
pub fn select_buy_point(event: &DividendEvent) -> Option<(Offset, Price)> {
    let mut best: Option<(Offset, Price)> = None;
    for offset in BUY_OFFSETS.rev() {
        if let Some(price) = event.price_at(offset) {
            match best {
                Some((_, low)) if price >= low => {}
                _ => best = Some((offset, price)),
            }
        }
    }
    best
}

/// Highest price after the ex-date. Ties go to the day closest to the ex-date.
pub fn select_sell_point(event: &DividendEvent) -> Option<(Offset, Price)> {
    let mut best: Option<(Offset, Price)> = None;
    for offset in SELL_OFFSETS {
        if let Some(price) = event.price_at(offset) {
            match best {
                Some((_, high)) if price <= high => {}
                _ => best = Some((offset, price)),
            }
        }
    }
    best
}

/// Greedy best trade for a single event, if one is realizable.
pub fn best_trade_for_event(
    event: &DividendEvent,
    capital: Option<Money>,
    params: &CostParameters,
) -> Option<TradePnl> {
    let (buy_offset, _) = select_buy_point(event)?;
    let (sell_offset, _) = select_sell_point(event)?;
    calculate_pnl_with_parameters(event, buy_offset, sell_offset, capital, params)
}

// ---------------------------------------------------------------------------
// Main function
// ---------------------------------------------------------------------------

fn mean_offset<'a>(offsets: impl Iterator<Item = &'a Offset>, count: usize) -> Option<Decimal> {
    if count == 0 {
        return None;
    }
    let sum: i64 = offsets.map(|o| i64::from(*o)).sum();
    Some(Decimal::from(sum) / Decimal::from(count as u64))
}

pub fn compute_auto_trade_highlights(
    events: &[DividendEvent],
    capital: Option<Money>,
    options: &HighlightOptions,
) -> AutoTradeHighlights {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut by_ticker: BTreeMap<&str, Vec<Candidate<'_>>> = BTreeMap::new();
    let mut events_without_trade = 0usize;

    for (index, event) in events.iter().enumerate() {
        if !seen.insert(event.id.as_str()) {
            debug!(event = %event.id, "duplicate event id skipped");
            continue;
        }
        match best_trade_for_event(event, capital, &options.parameters) {
            Some(pnl) => by_ticker
                .entry(event.ticker())
                .or_default()
                .push(Candidate { index, event, pnl }),
            None => {
                debug!(event = %event.id, "no realizable buy/sell pair");
                events_without_trade += 1;
            }
        }
    }

    let mut kept: Vec<Candidate<'_>> = Vec::new();
    for (_, mut candidates) in by_ticker {
        candidates.sort_by(|a, b| b.pnl.total_cost.cmp(&a.pnl.total_cost));
        candidates.truncate(options.max_rows_per_ticker);
        kept.extend(candidates);
    }
    kept.sort_by(|a, b| {
        b.pnl
            .total_cost
            .cmp(&a.pnl.total_cost)
            .then(a.index.cmp(&b.index))
    });

    let average_buy_offset = mean_offset(kept.iter().map(|c| &c.pnl.buy_offset), kept.len());
    let average_sell_offset = mean_offset(kept.iter().map(|c| &c.pnl.sell_offset), kept.len());

    let top_trades = kept
        .iter()
        .take(TOP_TRADES_LIMIT)
        .map(|c| TopTrade {
            event_id: c.event.id.clone(),
            ticker: c.event.ticker().to_string(),
            ex_date: c.event.ex_date,
            buy_offset: c.pnl.buy_offset,
            sell_offset: c.pnl.sell_offset,
            total_cost: c.pnl.total_cost,
            net_percentage: c.pnl.net_percentage,
            quantity: c.pnl.quantity,
            dividend_per_share: c.event.dividend_per_share,
        })
        .collect();

    let highlight_map = kept
        .iter()
        .map(|c| {
            (
                c.event.id.clone(),
                Highlight {
                    event_id: c.event.id.clone(),
                    ticker: c.event.ticker().to_string(),
                    ex_date: c.event.ex_date,
                    buy_offset: c.pnl.buy_offset,
                    sell_offset: c.pnl.sell_offset,
                    buy_price: c.pnl.buy_price,
                    sell_price: c.pnl.sell_price,
                    total_cost: c.pnl.total_cost,
                    net_percentage: c.pnl.net_percentage,
                    quantity: c.pnl.quantity,
                },
            )
        })
        .collect();

    AutoTradeHighlights {
        highlight_map,
        top_trades,
        average_buy_offset,
        average_sell_offset,
        events_scanned: seen.len(),
        events_without_trade,
    }
}

/// Run a [`HighlightRequest`] and wrap the result in the standard envelope.
pub fn highlights_report(request: &HighlightRequest) -> ComputationOutput<AutoTradeHighlights> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let result = compute_auto_trade_highlights(&request.events, request.capital, &request.options);

    if result.highlight_map.is_empty() {
        warnings.push("No event has both a buy and a sell price in its window".into());
    }
    if result.events_without_trade > 0 {
        warnings.push(format!(
            "{} of {} events had no realizable trade",
            result.events_without_trade, result.events_scanned
        ));
    }

    let params = &request.options.parameters;
    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Auto Trade Highlights (lowest pre-ex buy vs highest post-ex sell per event)",
        &serde_json::json!({
            "capital": params.resolve_capital(request.capital).to_string(),
            "max_rows_per_ticker": request.options.max_rows_per_ticker,
            "top_trades": TOP_TRADES_LIMIT,
            "buy_window": "D-10..D-1",
            "sell_window": "D+1..D+30",
            "margin_ratio": params.margin_ratio.to_string(),
        }),
        warnings,
        elapsed,
        result,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
