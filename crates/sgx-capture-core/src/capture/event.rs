//! Normalized dividend events and the relative-day price window around each
//! ex-dividend date.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::str::FromStr;

use crate::types::{Money, Offset, Price};

/// Earliest trading day captured before the ex-date.
pub const MIN_OFFSET: Offset = -10;
/// Latest trading day captured after the ex-date.
pub const MAX_OFFSET: Offset = 30;
/// Offsets eligible as a buy point.
pub const BUY_OFFSETS: RangeInclusive<Offset> = MIN_OFFSET..=-1;
/// Offsets eligible as a sell point.
pub const SELL_OFFSETS: RangeInclusive<Offset> = 1..=MAX_OFFSET;

/// Separator between ticker and ex-date in an event id.
pub const EVENT_ID_SEPARATOR: char = '|';

// ---------------------------------------------------------------------------
// PriceWindow
// ---------------------------------------------------------------------------

/// Prices keyed by trading-day offset from the ex-date.
///
/// Missing days are absent rather than zero. Serialized with `"D-10"` ..
/// `"D+30"` keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceWindow {
    prices: BTreeMap<Offset, Price>,
}

impl PriceWindow {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a price. Offsets outside -10..=+30 are ignored.
    pub fn insert(&mut self, offset: Offset, price: Price) {
        if (MIN_OFFSET..=MAX_OFFSET).contains(&offset) {
            self.prices.insert(offset, price);
        }
    }

    pub fn get(&self, offset: Offset) -> Option<Price> {
        self.prices.get(&offset).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Present prices in ascending offset order.
    pub fn iter(&self) -> impl Iterator<Item = (Offset, Price)> + '_ {
        self.prices.iter().map(|(o, p)| (*o, *p))
    }
}

impl FromIterator<(Offset, Price)> for PriceWindow {
    fn from_iter<I: IntoIterator<Item = (Offset, Price)>>(iter: I) -> Self {
        let mut window = PriceWindow::new();
        for (offset, price) in iter {
            window.insert(offset, price);
        }
        window
    }
}

/// `-3` -> `"D-3"`, `0` -> `"D+0"`, `5` -> `"D+5"`.
pub fn offset_key(offset: Offset) -> String {
    if offset >= 0 {
        format!("D+{offset}")
    } else {
        format!("D{offset}")
    }
}

/// Parse `"D-3"`, `"D+5"`, `"D5"`, `"D0"` (case-insensitive) into an offset.
pub fn parse_offset_key(key: &str) -> Option<Offset> {
    let trimmed = key.trim();
    let rest = trimmed
        .strip_prefix('D')
        .or_else(|| trimmed.strip_prefix('d'))?;
    let rest = rest.strip_prefix('+').unwrap_or(rest);
    rest.parse::<Offset>().ok()
}

/// Coerce a loosely typed JSON price into a decimal. Blank, null or
/// unparseable values are treated as absent.
pub fn price_from_json(value: &serde_json::Value) -> Option<Price> {
    match value {
        serde_json::Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                Decimal::from_str(s).ok()
            }
        }
        serde_json::Value::Number(n) => {
            let text = n.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .ok()
        }
        _ => None,
    }
}

impl Serialize for PriceWindow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.prices.len()))?;
        for (offset, price) in &self.prices {
            map.serialize_entry(&offset_key(*offset), price)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for PriceWindow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut window = PriceWindow::new();
        for (key, value) in &raw {
            let offset = parse_offset_key(key)
                .ok_or_else(|| D::Error::custom(format!("invalid price offset key '{key}'")))?;
            if let Some(price) = price_from_json(value) {
                window.insert(offset, price);
            }
        }
        Ok(window)
    }
}

// ---------------------------------------------------------------------------
// DividendEvent
// ---------------------------------------------------------------------------

/// Build the composite `"TICKER|YYYY-MM-DD"` identifier.
pub fn event_id(ticker: &str, ex_date: NaiveDate) -> String {
    format!(
        "{}{}{}",
        ticker.trim().to_ascii_uppercase(),
        EVENT_ID_SEPARATOR,
        ex_date.format("%Y-%m-%d")
    )
}

/// Ticker part of a composite event id. Ids without a separator are
/// treated as bare tickers.
pub fn ticker_from_event_id(id: &str) -> &str {
    match id.split_once(EVENT_ID_SEPARATOR) {
        Some((ticker, _)) => ticker,
        None => id,
    }
}

/// One historical ex-dividend event for a ticker. Identity is
/// `(ticker, ex_date)`, carried in `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DividendEvent {
    pub id: String,
    pub ex_date: NaiveDate,
    /// Cash paid per share; zero when unknown.
    #[serde(default)]
    pub dividend_per_share: Money,
    #[serde(default)]
    pub prices: PriceWindow,
}

impl DividendEvent {
    pub fn new(
        ticker: &str,
        ex_date: NaiveDate,
        dividend_per_share: Option<Money>,
        prices: PriceWindow,
    ) -> Self {
        Self {
            id: event_id(ticker, ex_date),
            ex_date,
            dividend_per_share: dividend_per_share
                .filter(|d| *d >= Decimal::ZERO)
                .unwrap_or(Decimal::ZERO),
            prices,
        }
    }

    pub fn ticker(&self) -> &str {
        ticker_from_event_id(&self.id)
    }

    pub fn price_at(&self, offset: Offset) -> Option<Price> {
        self.prices.get(offset)
    }

    /// Closing price on the ex-date itself.
    pub fn ex_date_price(&self) -> Option<Price> {
        self.prices.get(0)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_offset_keys() {
        assert_eq!(offset_key(-10), "D-10");
        assert_eq!(offset_key(0), "D+0");
        assert_eq!(offset_key(30), "D+30");
        assert_eq!(parse_offset_key("D-10"), Some(-10));
        assert_eq!(parse_offset_key("D+5"), Some(5));
        assert_eq!(parse_offset_key("D5"), Some(5));
        assert_eq!(parse_offset_key("D0"), Some(0));
        assert_eq!(parse_offset_key("d+0"), Some(0));
        assert_eq!(parse_offset_key("X5"), None);
        assert_eq!(parse_offset_key("D+"), None);
    }

    #[test]
    fn test_window_ignores_out_of_range() {
        let window: PriceWindow = vec![(-11, dec!(1)), (-10, dec!(2)), (31, dec!(3))]
            .into_iter()
            .collect();
        assert_eq!(window.len(), 1);
        assert_eq!(window.get(-10), Some(dec!(2)));
    }

    #[test]
    fn test_window_deserialize_mixed_values() {
        let json = r#"{"D-2": "1.25", "D-1": 1.3, "D+0": null, "D0": "", "D+1": "n/a", "D+2": 2}"#;
        let window: PriceWindow = serde_json::from_str(json).unwrap();
        assert_eq!(window.get(-2), Some(dec!(1.25)));
        assert_eq!(window.get(-1), Some(dec!(1.3)));
        assert_eq!(window.get(0), None);
        assert_eq!(window.get(1), None);
        assert_eq!(window.get(2), Some(dec!(2)));
    }

    #[test]
    fn test_window_rejects_bad_key() {
        let json = r#"{"price": "1.0"}"#;
        assert!(serde_json::from_str::<PriceWindow>(json).is_err());
    }

    #[test]
    fn test_window_serializes_offset_keys() {
        let window: PriceWindow = vec![(-1, dec!(1.00)), (1, dec!(1.05))].into_iter().collect();
        let value = serde_json::to_value(&window).unwrap();
        assert_eq!(value, serde_json::json!({ "D-1": "1.00", "D+1": "1.05" }));
    }

    #[test]
    fn test_event_identity() {
        let event = DividendEvent::new("d05", date(2024, 5, 2), Some(dec!(0.54)), PriceWindow::new());
        assert_eq!(event.id, "D05|2024-05-02");
        assert_eq!(event.ticker(), "D05");
        assert_eq!(ticker_from_event_id("Z74"), "Z74");
    }

    #[test]
    fn test_negative_dividend_defaults_to_zero() {
        let event = DividendEvent::new("O39", date(2024, 8, 9), Some(dec!(-1)), PriceWindow::new());
        assert_eq!(event.dividend_per_share, Decimal::ZERO);
        let event = DividendEvent::new("O39", date(2024, 8, 9), None, PriceWindow::new());
        assert_eq!(event.dividend_per_share, Decimal::ZERO);
    }
}
