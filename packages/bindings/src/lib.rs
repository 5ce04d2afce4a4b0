use napi::Result as NapiResult;
use napi_derive::napi;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use proforma_core::config::EngineConfig;
use proforma_core::snapshot::AssumptionSnapshot;
use proforma_core::types::IrrOutcome;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse_snapshot(input_json: &str) -> NapiResult<AssumptionSnapshot> {
    serde_json::from_str(input_json).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Underwriting
// ---------------------------------------------------------------------------

/// Full analysis. `config_json` replaces the built-in benchmark and scoring
/// tables; omitted fields keep their defaults.
#[napi]
pub fn analyze_property(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let snapshot = parse_snapshot(&input_json)?;
    let config: EngineConfig = match config_json {
        Some(json) => serde_json::from_str(&json).map_err(to_napi_error)?,
        None => EngineConfig::default(),
    };
    let output = proforma_core::analysis::analyze(&snapshot, &config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn project_cash_flows(input_json: String) -> NapiResult<String> {
    let snapshot = parse_snapshot(&input_json)?;
    let output =
        proforma_core::projection::project_cash_flows(&snapshot).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn calculate_returns(input_json: String) -> NapiResult<String> {
    let snapshot = parse_snapshot(&input_json)?;
    let output = proforma_core::returns::calculate_returns(&snapshot).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn run_sensitivity(input_json: String) -> NapiResult<String> {
    let snapshot = parse_snapshot(&input_json)?;
    let output = proforma_core::sensitivity::run_sensitivity(&snapshot).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Solvers
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct PaymentInput {
    principal: Decimal,
    annual_rate_pct: Decimal,
    term_years: u32,
}

#[derive(Serialize)]
struct PaymentOutput {
    monthly_payment: Decimal,
    annual_debt_service: Decimal,
}

#[napi]
pub fn monthly_payment(input_json: String) -> NapiResult<String> {
    let input: PaymentInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    proforma_core::amortization::validate_loan(
        input.principal,
        input.annual_rate_pct,
        input.term_years,
    )
    .map_err(to_napi_error)?;
    let monthly_payment = proforma_core::amortization::compute_payment(
        input.principal,
        input.annual_rate_pct,
        input.term_years,
    );
    let output = PaymentOutput {
        monthly_payment,
        annual_debt_service: monthly_payment * Decimal::from(12),
    };
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct IrrInput {
    cash_flows: Vec<Decimal>,
}

#[derive(Serialize)]
struct IrrOutput {
    irr: IrrOutcome,
}

#[napi]
pub fn irr(input_json: String) -> NapiResult<String> {
    let input: IrrInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = IrrOutput {
        irr: proforma_core::returns::compute_irr(&input.cash_flows),
    };
    serde_json::to_string(&output).map_err(to_napi_error)
}
