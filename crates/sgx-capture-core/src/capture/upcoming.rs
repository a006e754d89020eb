use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::capture::event::DividendEvent;
use crate::types::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpcomingDividend {
    pub ticker: String,
    pub ex_date: NaiveDate,
    /// True when `ex_date` is on or after the reference date.
    pub is_future: bool,
    pub days_until: i64,
    pub pay_date: Option<NaiveDate>,
    pub dividend_per_share: Money,
    pub amount_label: Option<String>,
    pub ex_date_price: Option<Price>,
    /// Dividend as a percentage of the ex-date price.
    pub dividend_yield: Option<Decimal>,
    pub yield_label: Option<String>,
}

impl UpcomingDividend {
    /// Summary for a date known only from an announcement.
    pub fn announced(ticker: &str, ex_date: NaiveDate, today: NaiveDate) -> Self {
        Self {
            ticker: ticker.to_string(),
            ex_date,
            is_future: ex_date >= today,
            days_until: (ex_date - today).num_days(),
            pay_date: None,
            dividend_per_share: Decimal::ZERO,
            amount_label: None,
            ex_date_price: None,
            dividend_yield: None,
            yield_label: None,
        }
    }
}

/// `0.06` -> `"0.0600"`.
pub fn amount_label(amount: Money) -> String {
    format!("{:.4}", amount.round_dp(4))
}

/// `1.4118` -> `"1.41%"`.
pub fn yield_label(yield_pct: Decimal) -> String {
    format!("{:.2}%", yield_pct.round_dp(2))
}

/// Earliest ex-date on or after `today`; failing that, the most recent one.
pub fn next_ex_date(events: &[DividendEvent], today: NaiveDate) -> Option<NaiveDate> {
    events
        .iter()
        .map(|e| e.ex_date)
        .filter(|d| *d >= today)
        .min()
        .or_else(|| events.iter().map(|e| e.ex_date).max())
}

/// `dividend / ex-date price * 100`, when the ex-date price is positive.
pub fn dividend_yield(event: &DividendEvent) -> Option<Decimal> {
    let price = event.ex_date_price().filter(|p| *p > Decimal::ZERO)?;
    Some(event.dividend_per_share / price * dec!(100))
}

pub fn summarize_upcoming(events: &[DividendEvent], today: NaiveDate) -> Option<UpcomingDividend> {
    let date = next_ex_date(events, today)?;
    let event = events.iter().find(|e| e.ex_date == date)?;
    let yield_pct = dividend_yield(event);
    Some(UpcomingDividend {
        ticker: event.ticker().to_string(),
        ex_date: date,
        is_future: date >= today,
        days_until: (date - today).num_days(),
        pay_date: None,
        dividend_per_share: event.dividend_per_share,
        amount_label: Some(amount_label(event.dividend_per_share)),
        ex_date_price: event.ex_date_price(),
        dividend_yield: yield_pct,
        yield_label: yield_pct.map(yield_label),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::event::PriceWindow;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn event(ex: NaiveDate, dividend: Decimal, ex_price: Option<Decimal>) -> DividendEvent {
        let prices: PriceWindow = ex_price.map(|p| (0, p)).into_iter().collect();
        DividendEvent::new("BN4", ex, Some(dividend), prices)
    }

    #[test]
    fn test_next_future_date() {
        let events = vec![
            event(date(2025, 1, 10), dec!(0.1), None),
            event(date(2025, 11, 3), dec!(0.1), None),
            event(date(2025, 10, 20), dec!(0.1), None),
        ];
        assert_eq!(next_ex_date(&events, date(2025, 10, 18)), Some(date(2025, 10, 20)));
        assert_eq!(next_ex_date(&events, date(2025, 10, 20)), Some(date(2025, 10, 20)));
    }

    #[test]
    fn test_falls_back_to_latest_past() {
        let events = vec![
            event(date(2023, 5, 1), dec!(0.1), None),
            event(date(2024, 5, 1), dec!(0.1), None),
        ];
        assert_eq!(next_ex_date(&events, date(2025, 1, 1)), Some(date(2024, 5, 1)));
        assert_eq!(next_ex_date(&[], date(2025, 1, 1)), None);
    }

    #[test]
    fn test_yield() {
        assert_eq!(
            dividend_yield(&event(date(2024, 5, 1), dec!(0.06), Some(dec!(4.00)))),
            Some(dec!(1.5))
        );
        assert_eq!(dividend_yield(&event(date(2024, 5, 1), dec!(0.06), Some(dec!(0)))), None);
        assert_eq!(dividend_yield(&event(date(2024, 5, 1), dec!(0.06), None)), None);
    }

    #[test]
    fn test_summary() {
        let events = vec![event(date(2025, 10, 22), dec!(0.06), Some(dec!(4.25)))];
        let s = summarize_upcoming(&events, date(2025, 10, 18)).unwrap();
        assert_eq!(s.ticker, "BN4");
        assert!(s.is_future);
        assert_eq!(s.days_until, 4);
        assert_eq!(s.dividend_yield.unwrap().round_dp(2), dec!(1.41));
        assert_eq!(s.amount_label.as_deref(), Some("0.0600"));
        assert_eq!(s.yield_label.as_deref(), Some("1.41%"));
        assert_eq!(s.pay_date, None);
    }
}
