use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::amortization;
use crate::projection::{self, YearProjection};
use crate::snapshot::{AssumptionSnapshot, EquityPartner};
use crate::time_value;
use crate::types::{
    pct_to_rate, safe_div, with_metadata, ComputationOutput, Coverage, IrrOutcome, Money,
    Multiple, Percent,
};
use crate::ProformaResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Point-in-time ratios, disposition and return metrics for one snapshot.
///
/// Ratio metrics (cap rate, cash-on-cash, expense ratio) are percentages;
/// the IRR is a fractional rate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnsSummary {
    pub purchase_price: Money,
    pub loan_amount: Money,
    pub down_payment: Money,
    pub total_cash_required: Money,
    pub monthly_payment: Money,
    pub annual_debt_service: Money,
    /// Year-one NOI
    pub noi: Money,
    /// Year-one cash flow before tax
    pub cash_flow: Money,
    pub cap_rate: Percent,
    pub cash_on_cash: Percent,
    pub dscr: Coverage,
    pub grm: Multiple,
    pub expense_ratio: Percent,
    pub price_per_unit: Money,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_per_sqft: Option<Money>,
    /// NOI of the final operating year
    pub terminal_noi: Money,
    /// `None` when the exit cap rate is not positive
    pub exit_value: Option<Money>,
    pub selling_costs: Money,
    pub loan_balance_at_exit: Money,
    pub net_sale_proceeds: Money,
    /// t=0 equity outlay, operating cash flows, sale proceeds in the final year
    pub equity_cash_flows: Vec<Money>,
    pub irr: IrrOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub npv: Option<Money>,
    pub total_distributions: Money,
    pub equity_multiple: Multiple,
    pub avg_cash_on_cash: Percent,
}

/// One partner's pro-rata slice of the equity cash flows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartnerReturns {
    pub name: String,
    pub share_pct: Percent,
    pub contributed: Money,
    pub distributions: Money,
    pub equity_multiple: Multiple,
}

// ---------------------------------------------------------------------------
// Ratio helpers
// ---------------------------------------------------------------------------

pub fn cap_rate(noi: Money, price: Money) -> Percent {
    safe_div(noi, price) * dec!(100)
}

pub fn cash_on_cash(cash_flow: Money, equity: Money) -> Percent {
    safe_div(cash_flow, equity) * dec!(100)
}

pub fn gross_rent_multiplier(price: Money, annual_rent: Money) -> Multiple {
    safe_div(price, annual_rent)
}

pub fn expense_ratio(operating_expenses: Money, egi: Money) -> Percent {
    safe_div(operating_expenses, egi) * dec!(100)
}

/// Reversion value: terminal NOI capitalised at the exit cap rate. `None`
/// when the cap rate is not positive or the value leaves Decimal range.
pub fn exit_value(terminal_noi: Money, exit_cap_rate_pct: Percent) -> Option<Money> {
    if exit_cap_rate_pct <= Decimal::ZERO {
        return None;
    }
    terminal_noi.checked_div(pct_to_rate(exit_cap_rate_pct))
}

/// IRR of a cash-flow series, with solver failure kept distinct from a rate.
pub fn compute_irr(cash_flows: &[Money]) -> IrrOutcome {
    irr_outcome(cash_flows, &mut Vec::new())
}

fn irr_outcome(cash_flows: &[Money], warnings: &mut Vec<String>) -> IrrOutcome {
    match time_value::irr(cash_flows) {
        Ok(r) => IrrOutcome::Converged(r),
        Err(e) => {
            warnings.push(format!("IRR not available: {e}"));
            IrrOutcome::NonConvergent
        }
    }
}

/// Sum of positive distributions after the initial outlay over the equity.
pub fn equity_multiple(equity_cash_flows: &[Money], initial_equity: Money) -> Multiple {
    safe_div(total_distributions(equity_cash_flows), initial_equity)
}

fn total_distributions(equity_cash_flows: &[Money]) -> Money {
    equity_cash_flows
        .iter()
        .skip(1)
        .filter(|cf| **cf > Decimal::ZERO)
        .copied()
        .sum()
}

/// Mean annual operating cash flow over the equity, in percent.
pub fn average_cash_on_cash(operating_cash_flows: &[Money], initial_equity: Money) -> Percent {
    if operating_cash_flows.is_empty() {
        return Decimal::ZERO;
    }
    let total: Money = operating_cash_flows.iter().copied().sum();
    let mean = total / Decimal::from(operating_cash_flows.len() as u64);
    cash_on_cash(mean, initial_equity)
}

/// Equity series: `-equity` at close, each operating year's cash flow, with
/// net sale proceeds added to the final year.
pub fn equity_cash_flows(
    projection: &[YearProjection],
    initial_equity: Money,
    net_sale_proceeds: Money,
) -> Vec<Money> {
    let mut series = Vec::with_capacity(projection.len());
    series.push(-initial_equity);
    let last = projection.len().saturating_sub(1);
    for (i, row) in projection.iter().enumerate().skip(1) {
        if i == last {
            series.push(row.cash_flow + net_sale_proceeds);
        } else {
            series.push(row.cash_flow);
        }
    }
    series
}

/// Pro-rata split of contributions and distributions; no promote.
pub fn split_equity(partners: &[EquityPartner], equity_cash_flows: &[Money]) -> Vec<PartnerReturns> {
    let contributed_total: Money = equity_cash_flows
        .iter()
        .filter(|cf| **cf < Decimal::ZERO)
        .map(|cf| cf.abs())
        .sum();
    let distributed_total = total_distributions(equity_cash_flows);

    partners
        .iter()
        .map(|p| {
            let share = pct_to_rate(p.share_pct);
            let contributed = contributed_total * share;
            let distributions = distributed_total * share;
            PartnerReturns {
                name: p.name.clone(),
                share_pct: p.share_pct,
                contributed,
                distributions,
                equity_multiple: safe_div(distributions, contributed),
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Summary
// ---------------------------------------------------------------------------

/// Derive the returns summary from a snapshot and its projection.
pub fn summarize(
    snapshot: &AssumptionSnapshot,
    projection: &[YearProjection],
    warnings: &mut Vec<String>,
) -> ReturnsSummary {
    let price = snapshot.purchase_price;
    let loan_amount = snapshot.loan_amount();
    let equity = snapshot.total_cash_required();
    let monthly_payment =
        amortization::compute_payment(loan_amount, snapshot.interest_rate_pct, snapshot.loan_term_years);
    let annual_debt_service = monthly_payment * dec!(12);

    let year_one = projection.get(1);
    let noi = year_one.map(|y| y.noi).unwrap_or_default();
    let cash_flow = year_one.map(|y| y.cash_flow).unwrap_or_default();
    // GRM prices the rent alone; other income is excluded
    let annual_rent = year_one.map(|y| y.scheduled_rent).unwrap_or_default();
    let egi = year_one.map(|y| y.effective_gross_income).unwrap_or_default();
    let opex = year_one
        .map(|y| y.total_operating_expenses)
        .unwrap_or_default();
    let debt_service = year_one.map(|y| y.debt_service).unwrap_or_default();

    let units = snapshot.unit_count();
    let sqft = snapshot.total_sqft();

    // --- Disposition ---
    let terminal = projection.last();
    let terminal_noi = terminal.map(|y| y.noi).unwrap_or_default();
    let loan_balance_at_exit = terminal.map(|y| y.loan_balance).unwrap_or_default();
    let exit = exit_value(terminal_noi, snapshot.exit_cap_rate_pct);
    let gross_sale = exit.unwrap_or_default();
    let selling_costs = gross_sale * pct_to_rate(snapshot.selling_costs_pct);
    let net_sale_proceeds = gross_sale - selling_costs - loan_balance_at_exit;

    if exit.is_some_and(|v| v < Decimal::ZERO) {
        warnings.push("Terminal NOI is negative; exit value below zero".into());
    }
    if net_sale_proceeds < Decimal::ZERO {
        warnings.push(format!(
            "Sale proceeds do not retire the loan: shortfall of {:.2} at exit",
            net_sale_proceeds.abs()
        ));
    }

    // --- Equity returns ---
    let series = equity_cash_flows(projection, equity, net_sale_proceeds);
    let irr = irr_outcome(&series, warnings);
    let npv = snapshot.discount_rate_pct.and_then(|dr| {
        match time_value::npv(pct_to_rate(dr), &series) {
            Ok(v) => Some(v),
            Err(e) => {
                warnings.push(format!("NPV not available: {e}"));
                None
            }
        }
    });
    let operating: Vec<Money> = projection.iter().skip(1).map(|y| y.cash_flow).collect();

    if noi <= Decimal::ZERO {
        warnings.push("Year-one NOI is not positive".into());
    }

    ReturnsSummary {
        purchase_price: price,
        loan_amount,
        down_payment: snapshot.down_payment(),
        total_cash_required: equity,
        monthly_payment,
        annual_debt_service,
        noi,
        cash_flow,
        cap_rate: cap_rate(noi, price),
        cash_on_cash: cash_on_cash(cash_flow, equity),
        dscr: Coverage::from_noi(noi, debt_service),
        grm: gross_rent_multiplier(price, annual_rent),
        expense_ratio: expense_ratio(opex, egi),
        price_per_unit: safe_div(price, Decimal::from(units as u64)),
        price_per_sqft: price.checked_div(sqft).filter(|_| sqft > Decimal::ZERO),
        terminal_noi,
        exit_value: exit,
        selling_costs,
        loan_balance_at_exit,
        net_sale_proceeds,
        total_distributions: total_distributions(&series),
        equity_multiple: equity_multiple(&series, equity),
        avg_cash_on_cash: average_cash_on_cash(&operating, equity),
        equity_cash_flows: series,
        irr,
        npv,
    }
}

/// Validate, project and summarize a snapshot.
pub fn calculate_returns(
    snapshot: &AssumptionSnapshot,
) -> ProformaResult<ComputationOutput<ReturnsSummary>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    snapshot.validate(&mut warnings)?;

    let rows = projection::project(snapshot);
    let summary = summarize(snapshot, &rows, &mut warnings);

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Acquisition Returns: cap rate, DSCR, cash-on-cash, IRR, equity multiple",
        snapshot,
        warnings,
        elapsed,
        summary,
    ))
}
