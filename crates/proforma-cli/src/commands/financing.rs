use std::time::Instant;

use clap::Args;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use proforma_core::amortization::{self, AmortizationYear};
use proforma_core::projection;
use proforma_core::returns::compute_irr;
use proforma_core::snapshot::AssumptionSnapshot;
use proforma_core::time_value;
use proforma_core::types::{pct_to_rate, with_metadata, IrrOutcome};

use crate::input;

// ---------------------------------------------------------------------------
// payment
// ---------------------------------------------------------------------------

/// Arguments for a level mortgage payment
#[derive(Args)]
pub struct PaymentArgs {
    /// Loan principal
    #[arg(long)]
    pub principal: Decimal,

    /// Annual interest rate in percent (7.0 = 7%)
    #[arg(long)]
    pub rate: Decimal,

    /// Amortization term in years
    #[arg(long)]
    pub term_years: u32,

    /// Include an annual amortization schedule for this many years
    #[arg(long)]
    pub schedule_years: Option<u32>,
}

#[derive(Debug, Serialize)]
struct PaymentResult {
    monthly_payment: Decimal,
    annual_debt_service: Decimal,
    total_interest: Decimal,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    schedule: Vec<AmortizationYear>,
}

pub fn run_payment(args: PaymentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    amortization::validate_loan(args.principal, args.rate, args.term_years)?;
    if args
        .schedule_years
        .is_some_and(|years| years > amortization::MAX_LOAN_TERM_YEARS)
    {
        return Err(format!(
            "--schedule-years must not exceed {} years",
            amortization::MAX_LOAN_TERM_YEARS
        )
        .into());
    }
    let mut warnings = Vec::new();
    if args.rate == Decimal::ZERO {
        warnings.push("Zero interest rate: principal repaid straight-line".to_string());
    }

    let monthly_payment = amortization::compute_payment(args.principal, args.rate, args.term_years);
    let total_paid = monthly_payment * Decimal::from(args.term_years) * dec!(12);
    let schedule = args
        .schedule_years
        .map(|years| amortization::annual_schedule(args.principal, args.rate, args.term_years, years))
        .unwrap_or_default();

    let result = PaymentResult {
        monthly_payment,
        annual_debt_service: monthly_payment * dec!(12),
        total_interest: (total_paid - args.principal).max(Decimal::ZERO),
        schedule,
    };

    let assumptions = serde_json::json!({
        "principal": args.principal,
        "annual_rate_pct": args.rate,
        "term_years": args.term_years,
    });
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(serde_json::to_value(with_metadata(
        "Level monthly payment (standard amortization)",
        &assumptions,
        warnings,
        elapsed,
        result,
    ))?)
}

// ---------------------------------------------------------------------------
// breakeven-rate
// ---------------------------------------------------------------------------

/// Arguments for the breakeven interest rate scan
#[derive(Args)]
pub struct BreakevenRateArgs {
    /// Path to an assumption snapshot (overrides individual flags)
    #[arg(long)]
    pub input: Option<String>,

    /// Loan amount
    #[arg(long)]
    pub loan: Option<Decimal>,

    /// Amortization term in years
    #[arg(long)]
    pub term_years: Option<u32>,

    /// Annual NOI the debt service is tested against
    #[arg(long)]
    pub noi: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct BreakevenRateResult {
    loan_amount: Decimal,
    target_noi: Decimal,
    breakeven_rate_pct: Option<Decimal>,
}

pub fn run_breakeven_rate(args: BreakevenRateArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let (loan, term, noi) = if let Some(ref path) = args.input {
        let snapshot: AssumptionSnapshot = input::file::read_structured(path)?;
        snapshot.validate(&mut Vec::new())?;
        let rows = projection::project(&snapshot);
        let noi = rows.get(1).map(|y| y.noi).unwrap_or_default();
        (snapshot.loan_amount(), snapshot.loan_term_years, noi)
    } else {
        let loan = args.loan.ok_or("--loan is required (or provide --input)")?;
        let term = args
            .term_years
            .ok_or("--term-years is required (or provide --input)")?;
        let noi = args.noi.ok_or("--noi is required (or provide --input)")?;
        amortization::validate_loan(loan, amortization::BREAKEVEN_SCAN_END, term)?;
        (loan, term, noi)
    };

    let breakeven_rate_pct = amortization::find_rate_breakeven(loan, term, noi);
    let mut warnings = Vec::new();
    if breakeven_rate_pct.is_none() {
        warnings.push(
            "No breakeven inside the 1%-15% scan: NOI covers debt service throughout, or there is no loan"
                .to_string(),
        );
    }

    let assumptions = serde_json::json!({ "term_years": term });
    let elapsed = start.elapsed().as_micros() as u64;
    Ok(serde_json::to_value(with_metadata(
        "Breakeven interest rate (quarter-point scan, 1%-15%)",
        &assumptions,
        warnings,
        elapsed,
        BreakevenRateResult {
            loan_amount: loan,
            target_noi: noi,
            breakeven_rate_pct,
        },
    ))?)
}

// ---------------------------------------------------------------------------
// irr
// ---------------------------------------------------------------------------

/// Arguments for IRR / NPV on an arbitrary cash-flow series
#[derive(Args)]
pub struct IrrArgs {
    /// Path to a JSON file with `cash_flows` and optional `discount_rate_pct`
    #[arg(long)]
    pub input: Option<String>,

    /// Periodic cash flows starting at t=0 (comma-separated, e.g. "-100,30,30,130")
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub cash_flows: Option<Vec<Decimal>>,

    /// Discount rate in percent for NPV
    #[arg(long)]
    pub discount_rate: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct IrrInput {
    cash_flows: Vec<Decimal>,
    #[serde(default)]
    discount_rate_pct: Option<Decimal>,
}

#[derive(Debug, Serialize)]
struct IrrResult {
    irr: IrrOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    npv: Option<Decimal>,
}

pub fn run_irr(args: IrrArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let start = Instant::now();
    let irr_input: IrrInput = if let Some(ref path) = args.input {
        input::file::read_structured(path)?
    } else if let Some(cash_flows) = args.cash_flows {
        IrrInput {
            cash_flows,
            discount_rate_pct: args.discount_rate,
        }
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        return Err("--cash-flows, --input <file.json> or stdin required for IRR".into());
    };

    let mut warnings = Vec::new();
    let irr = compute_irr(&irr_input.cash_flows);
    if irr == IrrOutcome::NonConvergent {
        warnings.push("IRR did not converge for this series".to_string());
    }
    let npv = irr_input
        .discount_rate_pct
        .map(|dr| time_value::npv(pct_to_rate(dr), &irr_input.cash_flows))
        .transpose()?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(serde_json::to_value(with_metadata(
        "Internal rate of return (Newton-Raphson) and NPV",
        &irr_input,
        warnings,
        elapsed,
        IrrResult { irr, npv },
    ))?)
}
