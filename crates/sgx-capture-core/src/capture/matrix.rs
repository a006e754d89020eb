use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::capture::event::{DividendEvent, BUY_OFFSETS, SELL_OFFSETS};
use crate::capture::highlights::best_trade_for_event;
use crate::capture::pnl::{calculate_pnl_with_parameters, TradePnl};
use crate::margin::costs::CostParameters;
use crate::types::*;

/// One buy-offset row of the grid; `cells[i]` pairs with `sell_offsets[i]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlMatrixRow {
    pub buy_offset: Offset,
    pub cells: Vec<Option<Money>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PnlMatrix {
    pub event_id: String,
    pub ex_date: NaiveDate,
    pub capital: Money,
    pub sell_offsets: Vec<Offset>,
    pub rows: Vec<PnlMatrixRow>,
    /// Most profitable cell over the whole grid.
    pub best: Option<TradePnl>,
    /// The highlighter's greedy pick, for comparison with `best`.
    pub greedy: Option<TradePnl>,
    pub tradeable_cells: usize,
}

/// Net result of every buy/sell offset pair for one event.
///
/// Ties for `best` go to the earliest buy offset, then the earliest sell
/// offset, matching the grid's row-major scan.
pub fn build_pnl_matrix(
    event: &DividendEvent,
    capital: Option<Money>,
    params: &CostParameters,
) -> PnlMatrix {
    let sell_offsets: Vec<Offset> = SELL_OFFSETS.collect();
    let mut rows = Vec::with_capacity(BUY_OFFSETS.count());
    let mut best: Option<TradePnl> = None;
    let mut tradeable_cells = 0usize;

    for buy_offset in BUY_OFFSETS {
        let mut cells = Vec::with_capacity(sell_offsets.len());
        for &sell_offset in &sell_offsets {
            let pnl = calculate_pnl_with_parameters(event, buy_offset, sell_offset, capital, params);
            cells.push(pnl.as_ref().map(|p| p.total_cost));
            if let Some(pnl) = pnl {
                tradeable_cells += 1;
                let better = match &best {
                    Some(current) => pnl.total_cost > current.total_cost,
                    None => true,
                };
                if better {
                    best = Some(pnl);
                }
            }
        }
        rows.push(PnlMatrixRow { buy_offset, cells });
    }

    PnlMatrix {
        event_id: event.id.clone(),
        ex_date: event.ex_date,
        capital: params.resolve_capital(capital),
        sell_offsets,
        rows,
        best,
        greedy: best_trade_for_event(event, capital, params),
        tradeable_cells,
    }
}

/// Grid wrapped in the standard envelope, with a warning when the greedy
/// highlight leaves money on the table.
pub fn pnl_matrix_report(
    event: &DividendEvent,
    capital: Option<Money>,
    params: &CostParameters,
) -> ComputationOutput<PnlMatrix> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let matrix = build_pnl_matrix(event, capital, params);

    if matrix.tradeable_cells == 0 {
        warnings.push(format!("No tradeable offset pair for {}", event.id));
    }
    if let (Some(best), Some(greedy)) = (&matrix.best, &matrix.greedy) {
        if best.total_cost > greedy.total_cost {
            warnings.push(format!(
                "Greedy highlight D{:+}/D{:+} trails the best pair D{:+}/D{:+} by {}",
                greedy.buy_offset,
                greedy.sell_offset,
                best.buy_offset,
                best.sell_offset,
                (best.total_cost - greedy.total_cost).round_dp(2)
            ));
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        "Offset P&L Matrix (every D-10..D-1 buy against every D+1..D+30 sell)",
        &serde_json::json!({
            "capital": matrix.capital.to_string(),
            "margin_ratio": params.margin_ratio.to_string(),
        }),
        warnings,
        elapsed,
        matrix,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::event::PriceWindow;
    use rust_decimal_macros::dec;

    fn event(prices: &[(Offset, Money)]) -> DividendEvent {
        DividendEvent::new(
            "N2IU",
            NaiveDate::from_ymd_opt(2024, 10, 29).unwrap(),
            Some(dec!(0.03)),
            prices.iter().copied().collect::<PriceWindow>(),
        )
    }

    #[test]
    fn test_grid_shape() {
        let m = build_pnl_matrix(&event(&[]), None, &CostParameters::default());
        assert_eq!(m.rows.len(), 10);
        assert_eq!(m.sell_offsets.len(), 30);
        assert_eq!(m.rows[0].buy_offset, -10);
        assert!(m.rows.iter().all(|r| r.cells.len() == 30));
        assert_eq!(m.tradeable_cells, 0);
        assert!(m.best.is_none());
    }

    #[test]
    fn test_cells_match_pnl_formula() {
        let ev = event(&[(-3, dec!(1.20)), (-1, dec!(1.25)), (2, dec!(1.22)), (5, dec!(1.30))]);
        let params = CostParameters::default();
        let m = build_pnl_matrix(&ev, Some(dec!(20000)), &params);
        assert_eq!(m.tradeable_cells, 4);

        let row = m.rows.iter().find(|r| r.buy_offset == -3).unwrap();
        let expected = calculate_pnl_with_parameters(&ev, -3, 5, Some(dec!(20000)), &params)
            .map(|p| p.total_cost);
        assert_eq!(row.cells[4], expected);
        assert_eq!(row.cells[0], None);
    }

    #[test]
    fn test_best_beats_greedy_when_holding_costs_bite() {
        // Greedy sells at D+30 for a tiny premium; selling at D+1 nets more
        // once thirty days of financing is charged.
        let ev = event(&[(-1, dec!(1.000)), (1, dec!(1.000)), (30, dec!(1.001))]);
        let m = build_pnl_matrix(&ev, Some(dec!(50000)), &CostParameters::default());
        let best = m.best.unwrap();
        let greedy = m.greedy.unwrap();
        assert_eq!((best.buy_offset, best.sell_offset), (-1, 1));
        assert_eq!(greedy.sell_offset, 30);
        assert!(best.total_cost > greedy.total_cost);

        let report = pnl_matrix_report(&ev, Some(dec!(50000)), &CostParameters::default());
        assert!(report.warnings.iter().any(|w| w.contains("trails")));
    }
}
