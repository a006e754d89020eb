#![cfg(feature = "snapshot")]

use chrono::NaiveDate;
use rust_decimal_macros::dec;
use sgx_capture_core::capture::highlights::{self, HighlightOptions};
use sgx_capture_core::capture::{matrix, upcoming};
use sgx_capture_core::margin::costs::CostParameters;
use sgx_capture_core::snapshot::dataset::DatasetSnapshot;

// ===========================================================================
// End-to-end: snapshot JSON -> normalized events -> highlights
// ===========================================================================

const SNAPSHOT: &str = r#"{
  "version": 1,
  "generatedAt": "2025-10-14T00:00:00Z",
  "tickers": [
    {
      "ticker": "BN4",
      "companyName": "Keppel Ltd",
      "events": [
        {
          "exDate": "2024-05-03",
          "dividendAmount": 0.18,
          "exDatePrice": 6.80,
          "prices": {
            "D-10": "6.95", "D-5": "6.90", "D-2": "6.88", "D-1": "6.92",
            "D+0": "6.80", "D+1": "6.78", "D+5": "6.85", "D+12": "7.02", "D+30": null
          }
        },
        {
          "exDate": "2024-08-09",
          "dividendAmount": 0.15,
          "exDatePrice": 6.60,
          "prices": { "D-3": "6.70", "D+4": "6.65" }
        },
        {
          "exDate": "2025-10-22",
          "dividendAmount": 0.06,
          "exDatePrice": 7.40,
          "prices": { "D0": "7.40" }
        }
      ],
      "upcoming": null
    },
    {
      "ticker": "S68.SI",
      "companyName": "Singapore Exchange Ltd",
      "events": [
        {
          "exDate": "2024-10-25",
          "dividendAmountLabel": "SGD 0.090",
          "prices": { "D-1": 11.20, "D+2": 11.45 }
        }
      ]
    }
  ]
}"#;

#[test]
fn test_snapshot_to_highlights() {
    let snapshot = DatasetSnapshot::from_json_str(SNAPSHOT).unwrap();
    let events = snapshot.all_events();
    assert_eq!(events.len(), 4);

    let out = highlights::compute_auto_trade_highlights(&events, Some(dec!(50000)), &HighlightOptions::default());

    // The 2025 event has only an ex-date price and cannot trade.
    assert_eq!(out.events_without_trade, 1);
    assert_eq!(out.highlight_map.len(), 3);

    let bn4 = &out.highlight_map["BN4|2024-05-03"];
    assert_eq!((bn4.buy_offset, bn4.sell_offset), (-2, 12));
    assert_eq!(bn4.buy_price, dec!(6.88));
    assert_eq!(bn4.sell_price, dec!(7.02));

    let s68 = &out.highlight_map["S68|2024-10-25"];
    assert_eq!((s68.buy_offset, s68.sell_offset), (-1, 2));
    // 50000 / 11.20 = 4464.28 -> 4464 shares
    assert_eq!(s68.quantity, dec!(4464));
}

#[test]
fn test_snapshot_matrix_and_upcoming() {
    let snapshot = DatasetSnapshot::from_json_str(SNAPSHOT).unwrap();
    let event = snapshot
        .event("bn4", NaiveDate::from_ymd_opt(2024, 5, 3).unwrap())
        .unwrap();
    let grid = matrix::build_pnl_matrix(&event, None, &CostParameters::default());
    // 4 buy days x 3 priced sell days
    assert_eq!(grid.tradeable_cells, 12);
    let best = grid.best.unwrap();
    assert!(best.total_cost >= grid.greedy.unwrap().total_cost);

    let events = snapshot.events_for("BN4").unwrap();
    let next = upcoming::summarize_upcoming(&events, NaiveDate::from_ymd_opt(2025, 10, 18).unwrap())
        .unwrap();
    assert_eq!(next.ex_date, NaiveDate::from_ymd_opt(2025, 10, 22).unwrap());
    assert_eq!(next.dividend_yield.unwrap().round_dp(4), dec!(0.8108));
}
