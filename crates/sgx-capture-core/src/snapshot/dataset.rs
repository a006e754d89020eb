//! The consolidated offline dataset: every tracked ticker with its
//! historical dividend events and the next announced dividend.
//!
//! A snapshot is loaded once and passed explicitly to whatever needs it;
//! nothing here caches state between calls.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::capture::event::{parse_offset_key, price_from_json, DividendEvent, PriceWindow};
use crate::capture::upcoming::{amount_label, summarize_upcoming, yield_label, UpcomingDividend};
use crate::error::CaptureError;
use crate::snapshot::labels::{parse_amount, parse_percentage};
use crate::types::*;
use crate::CaptureResult;

/// Highest snapshot format version this crate understands.
pub const SNAPSHOT_VERSION: u32 = 1;

const DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSnapshot {
    #[serde(default)]
    pub version: u32,
    #[serde(default)]
    pub generated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tickers: Vec<TickerEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerEntry {
    pub ticker: String,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub events: Vec<SnapshotEvent>,
    #[serde(default)]
    pub upcoming: Option<UpcomingInfo>,
}

/// Event row as written by the data pipeline, before normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotEvent {
    pub ex_date: String,
    #[serde(default)]
    pub dividend_amount: Option<Decimal>,
    #[serde(default)]
    pub dividend_amount_label: Option<String>,
    #[serde(default)]
    pub ex_date_price: Option<Decimal>,
    #[serde(default)]
    pub ex_date_price_label: Option<String>,
    #[serde(default)]
    pub prices: BTreeMap<String, serde_json::Value>,
}

/// Next announced dividend as scraped from the exchange feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingInfo {
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub ex_date: Option<String>,
    #[serde(default)]
    pub pay_date: Option<String>,
    #[serde(default)]
    pub amount_label: Option<String>,
    #[serde(default)]
    pub amount_value: Option<Decimal>,
    #[serde(default)]
    pub yield_label: Option<String>,
    #[serde(default)]
    pub yield_value: Option<Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickerSummary {
    pub ticker: String,
    pub company_name: Option<String>,
    pub event_count: usize,
    pub first_ex_date: Option<NaiveDate>,
    pub last_ex_date: Option<NaiveDate>,
}

// ---------------------------------------------------------------------------
// Normalization
// ---------------------------------------------------------------------------

/// Upper-case, trimmed, without the `.SI` exchange suffix.
pub fn normalize_symbol(symbol: &str) -> String {
    let upper = symbol.trim().to_ascii_uppercase();
    match upper.strip_suffix(".SI") {
        Some(base) => base.to_string(),
        None => upper,
    }
}

impl SnapshotEvent {
    /// Normalize into a [`DividendEvent`] for `ticker`. `None` when the
    /// ex-date cannot be parsed.
    pub fn to_event(&self, ticker: &str) -> Option<DividendEvent> {
        let ex_date = match NaiveDate::parse_from_str(self.ex_date.trim(), DATE_FORMAT) {
            Ok(d) => d,
            Err(e) => {
                warn!(ticker, ex_date = %self.ex_date, error = %e, "skipping event with unparseable ex-date");
                return None;
            }
        };

        let dividend = self.dividend_amount.or_else(|| {
            self.dividend_amount_label
                .as_deref()
                .and_then(parse_amount)
        });

        let mut prices = PriceWindow::new();
        for (key, value) in &self.prices {
            match parse_offset_key(key) {
                Some(offset) => {
                    if let Some(price) = price_from_json(value) {
                        prices.insert(offset, price);
                    }
                }
                None => debug!(ticker, key = %key, "ignoring unrecognised price column"),
            }
        }
        if prices.get(0).is_none() {
            if let Some(ex_price) = self.ex_date_price {
                prices.insert(0, ex_price);
            }
        }

        Some(DividendEvent::new(ticker, ex_date, dividend, prices))
    }
}

fn parse_date(raw: Option<&str>) -> Option<NaiveDate> {
    let raw = raw?.trim();
    if raw.is_empty() {
        return None;
    }
    match NaiveDate::parse_from_str(raw, DATE_FORMAT) {
        Ok(d) => Some(d),
        Err(e) => {
            warn!(date = raw, error = %e, "ignoring unparseable announced date");
            None
        }
    }
}

fn non_empty(label: Option<&str>) -> Option<&str> {
    label.map(str::trim).filter(|l| !l.is_empty())
}

/// Overlay the exchange announcement on a summary computed from history.
///
/// The announcement only fills a missing ex-date or pay date, but its
/// amount and yield replace the computed ones. Labels are kept verbatim;
/// values come from the announced number, else from parsing the label.
pub fn merge_announced(
    computed: Option<UpcomingDividend>,
    announced: Option<&UpcomingInfo>,
    ticker: &str,
    today: NaiveDate,
) -> Option<UpcomingDividend> {
    let Some(info) = announced else {
        return computed;
    };

    let mut summary = match computed {
        Some(s) => s,
        None => {
            let date = parse_date(info.ex_date.as_deref())?;
            UpcomingDividend::announced(ticker, date, today)
        }
    };

    if summary.pay_date.is_none() {
        summary.pay_date = parse_date(info.pay_date.as_deref());
    }

    match non_empty(info.amount_label.as_deref()) {
        Some(label) => {
            summary.amount_label = Some(label.to_string());
            if let Some(value) = info.amount_value.or_else(|| parse_amount(label)) {
                summary.dividend_per_share = value;
            }
        }
        None => {
            if let Some(value) = info.amount_value {
                summary.dividend_per_share = value;
                summary.amount_label = Some(amount_label(value));
            }
        }
    }

    match non_empty(info.yield_label.as_deref()) {
        Some(label) => {
            summary.yield_label = Some(label.to_string());
            if let Some(value) = info.yield_value.or_else(|| parse_percentage(label)) {
                summary.dividend_yield = Some(value);
            }
        }
        None => {
            if let Some(value) = info.yield_value {
                summary.dividend_yield = Some(value);
                summary.yield_label = Some(yield_label(value));
            }
        }
    }

    Some(summary)
}

impl TickerEntry {
    pub fn symbol(&self) -> String {
        normalize_symbol(&self.ticker)
    }

    /// Normalized events in ascending ex-date order.
    pub fn to_events(&self) -> Vec<DividendEvent> {
        let symbol = self.symbol();
        let mut events: Vec<DividendEvent> = self
            .events
            .iter()
            .filter_map(|e| e.to_event(&symbol))
            .collect();
        events.sort_by_key(|e| e.ex_date);
        events
    }

    /// Next dividend from history, overlaid with the announced one.
    pub fn upcoming_dividend(&self, today: NaiveDate) -> Option<UpcomingDividend> {
        let symbol = self.symbol();
        let computed = summarize_upcoming(&self.to_events(), today);
        merge_announced(computed, self.upcoming.as_ref(), &symbol, today)
    }

    pub fn summary(&self) -> TickerSummary {
        let events = self.to_events();
        TickerSummary {
            ticker: self.symbol(),
            company_name: self.company_name.clone().filter(|n| !n.trim().is_empty()),
            event_count: events.len(),
            first_ex_date: events.first().map(|e| e.ex_date),
            last_ex_date: events.last().map(|e| e.ex_date),
        }
    }
}

impl DatasetSnapshot {
    pub fn from_json_str(json: &str) -> CaptureResult<Self> {
        let snapshot: DatasetSnapshot = serde_json::from_str(json)?;
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(CaptureError::InvalidInput {
                field: "version".into(),
                reason: format!(
                    "Snapshot version {} is newer than supported version {}",
                    snapshot.version, SNAPSHOT_VERSION
                ),
            });
        }
        debug!(
            version = snapshot.version,
            tickers = snapshot.tickers.len(),
            "loaded dataset snapshot"
        );
        Ok(snapshot)
    }

    /// Case-insensitive lookup; `"d05.si"` finds `D05`.
    pub fn ticker(&self, symbol: &str) -> Option<&TickerEntry> {
        let wanted = normalize_symbol(symbol);
        self.tickers.iter().find(|t| t.symbol() == wanted)
    }

    /// Events for one ticker in ascending ex-date order.
    pub fn events_for(&self, symbol: &str) -> CaptureResult<Vec<DividendEvent>> {
        let entry = self.ticker(symbol).ok_or_else(|| {
            CaptureError::InsufficientData(format!(
                "No dividend data found for {}",
                normalize_symbol(symbol)
            ))
        })?;
        Ok(entry.to_events())
    }

    /// A single event identified by ticker and ex-date.
    pub fn event(&self, symbol: &str, ex_date: NaiveDate) -> CaptureResult<DividendEvent> {
        self.events_for(symbol)?
            .into_iter()
            .find(|e| e.ex_date == ex_date)
            .ok_or_else(|| {
                CaptureError::InsufficientData(format!(
                    "No ex-dividend event for {} on {}",
                    normalize_symbol(symbol),
                    ex_date.format(DATE_FORMAT)
                ))
            })
    }

    /// Every event across every ticker, grouped by ticker in snapshot order.
    pub fn all_events(&self) -> Vec<DividendEvent> {
        self.tickers.iter().flat_map(|t| t.to_events()).collect()
    }

    pub fn upcoming_dividend(
        &self,
        symbol: &str,
        today: NaiveDate,
    ) -> CaptureResult<Option<UpcomingDividend>> {
        let entry = self.ticker(symbol).ok_or_else(|| {
            CaptureError::InsufficientData(format!(
                "No dividend data found for {}",
                normalize_symbol(symbol)
            ))
        })?;
        Ok(entry.upcoming_dividend(today))
    }

    pub fn summaries(&self) -> Vec<TickerSummary> {
        let mut out: Vec<TickerSummary> = self.tickers.iter().map(|t| t.summary()).collect();
        out.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        out
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
