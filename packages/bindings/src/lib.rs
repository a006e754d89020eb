use chrono::NaiveDate;
use napi::Result as NapiResult;
use napi_derive::napi;
use serde::Deserialize;

use sgx_capture_core::capture::event::DividendEvent;
use sgx_capture_core::margin::costs::CostParameters;
use sgx_capture_core::snapshot::dataset::{merge_announced, normalize_symbol, UpcomingInfo};
use sgx_capture_core::Money;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

#[derive(Deserialize)]
struct MatrixRequest {
    event: DividendEvent,
    #[serde(default)]
    capital: Option<Money>,
    #[serde(default)]
    parameters: CostParameters,
}

#[derive(Deserialize)]
struct UpcomingRequest {
    events: Vec<DividendEvent>,
    today: NaiveDate,
    /// Exchange announcement, in snapshot (camelCase) form.
    #[serde(default)]
    announced: Option<UpcomingInfo>,
    #[serde(default)]
    ticker: Option<String>,
}

// ---------------------------------------------------------------------------
// Margin
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_margin_costs(input_json: String) -> NapiResult<String> {
    let input: sgx_capture_core::margin::costs::MarginCostInput =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output =
        sgx_capture_core::margin::costs::margin_cost_report(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Capture
// ---------------------------------------------------------------------------

/// `result` is `null` when either offset has no usable price.
#[napi]
pub fn calculate_pnl_for_offsets(input_json: String) -> NapiResult<String> {
    let query: sgx_capture_core::capture::pnl::PnlQuery =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = sgx_capture_core::capture::pnl::pnl_report(&query);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn compute_auto_trade_highlights(input_json: String) -> NapiResult<String> {
    let request: sgx_capture_core::capture::highlights::HighlightRequest =
        serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = sgx_capture_core::capture::highlights::highlights_report(&request);
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn build_pnl_matrix(input_json: String) -> NapiResult<String> {
    let request: MatrixRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = sgx_capture_core::capture::matrix::pnl_matrix_report(
        &request.event,
        request.capital,
        &request.parameters,
    );
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn summarize_upcoming(input_json: String) -> NapiResult<String> {
    let request: UpcomingRequest = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let ticker = match (&request.ticker, request.events.first()) {
        (Some(t), _) => normalize_symbol(t),
        (None, Some(event)) => event.ticker().to_string(),
        (None, None) => String::new(),
    };
    let computed =
        sgx_capture_core::capture::upcoming::summarize_upcoming(&request.events, request.today);
    let output = merge_announced(
        computed,
        request.announced.as_ref(),
        &ticker,
        request.today,
    );
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// Normalized events for `ticker`, or for every ticker when it is omitted.
#[napi]
pub fn load_snapshot_events(snapshot_json: String, ticker: Option<String>) -> NapiResult<String> {
    let snapshot =
        sgx_capture_core::snapshot::dataset::DatasetSnapshot::from_json_str(&snapshot_json)
            .map_err(to_napi_error)?;
    let events = match ticker {
        Some(symbol) => snapshot.events_for(&symbol).map_err(to_napi_error)?,
        None => snapshot.all_events(),
    };
    serde_json::to_string(&events).map_err(to_napi_error)
}
