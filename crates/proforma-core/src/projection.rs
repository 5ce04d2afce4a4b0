//! Multi-year operating projection.
//!
//! Year-index convention: index 0 is the acquisition close and carries no
//! operating flows. Indices 1..=hold are operating years; year 1 is the base
//! year, so growth is applied with exponent `index - 1`. The exit NOI is the
//! NOI of the last operating year.

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::amortization::{self, AmortizationYear};
use crate::snapshot::{growth_factor, AssumptionSnapshot};
use crate::types::{pct_to_rate, with_metadata, ComputationOutput, Money, Percent};
use crate::ProformaResult;

/// One row of the projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearProjection {
    pub year: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_end: Option<NaiveDate>,
    pub scheduled_rent: Money,
    pub other_income: Money,
    pub gross_potential_income: Money,
    pub vacancy_loss: Money,
    pub effective_gross_income: Money,
    /// Itemized operating expenses, management excluded
    pub operating_expenses: BTreeMap<String, Money>,
    pub fixed_expenses: Money,
    pub management_fee: Money,
    pub total_operating_expenses: Money,
    pub noi: Money,
    pub debt_service: Money,
    pub cash_flow: Money,
    /// Loan balance at the end of the year
    pub loan_balance: Money,
}

/// Income and expense lines for one operating year at a given vacancy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct OperatingLines {
    pub scheduled_rent: Money,
    pub other_income: Money,
    pub gpi: Money,
    pub vacancy_loss: Money,
    pub egi: Money,
    pub fixed_expenses: Money,
    pub management_fee: Money,
    pub total_opex: Money,
    pub noi: Money,
}

/// Operating lines `exponent` years after the base year. Shared by the
/// projection and the sensitivity grids so both produce identical figures.
pub(crate) fn operating_lines(
    snapshot: &AssumptionSnapshot,
    exponent: i64,
    vacancy_pct: Percent,
) -> OperatingLines {
    let income_factor = growth_factor(snapshot.rent_growth(), exponent);
    let expense_factor = growth_factor(snapshot.expense_growth(), exponent);

    let scheduled_rent = snapshot
        .income
        .scheduled_rent(exponent, snapshot.rent_growth());
    let other_income = snapshot.other_monthly_income * dec!(12) * income_factor;
    let gpi = scheduled_rent + other_income;
    let vacancy_loss = gpi * pct_to_rate(vacancy_pct);
    let egi = gpi - vacancy_loss;

    let fixed_expenses = snapshot.base_fixed_expenses() * expense_factor;
    let management_fee = egi * pct_to_rate(snapshot.management_pct);
    let total_opex = fixed_expenses + management_fee;

    OperatingLines {
        scheduled_rent,
        other_income,
        gpi,
        vacancy_loss,
        egi,
        fixed_expenses,
        management_fee,
        total_opex,
        noi: egi - total_opex,
    }
}

/// Annual debt service on the snapshot's loan (zero for all-cash deals).
pub fn annual_debt_service(snapshot: &AssumptionSnapshot) -> Money {
    amortization::compute_payment(
        snapshot.loan_amount(),
        snapshot.interest_rate_pct,
        snapshot.loan_term_years,
    ) * dec!(12)
}

fn period_end(acquisition: Option<NaiveDate>, year: u32) -> Option<NaiveDate> {
    acquisition.and_then(|d| d.checked_add_months(Months::new(year * 12)))
}

/// Project the snapshot over its hold period: `hold_period_years + 1` rows.
pub fn project(snapshot: &AssumptionSnapshot) -> Vec<YearProjection> {
    let horizon = snapshot.hold_period_years;
    let loan = snapshot.loan_amount();
    let debt_service = annual_debt_service(snapshot);
    let expense_growth = snapshot.expense_growth();

    let mut rows = Vec::with_capacity(horizon as usize + 1);
    rows.push(YearProjection {
        year: 0,
        period_end: snapshot.acquisition_date,
        scheduled_rent: Decimal::ZERO,
        other_income: Decimal::ZERO,
        gross_potential_income: Decimal::ZERO,
        vacancy_loss: Decimal::ZERO,
        effective_gross_income: Decimal::ZERO,
        operating_expenses: BTreeMap::new(),
        fixed_expenses: Decimal::ZERO,
        management_fee: Decimal::ZERO,
        total_operating_expenses: Decimal::ZERO,
        noi: Decimal::ZERO,
        debt_service: Decimal::ZERO,
        cash_flow: Decimal::ZERO,
        loan_balance: loan,
    });

    for year in 1..=horizon {
        let exponent = i64::from(year) - 1;
        let lines = operating_lines(snapshot, exponent, snapshot.vacancy_pct);

        let expense_factor = growth_factor(expense_growth, exponent);
        let operating_expenses = snapshot
            .operating_expenses
            .iter()
            .map(|(k, v)| (k.clone(), *v * expense_factor))
            .collect();

        let year_debt_service = if year <= snapshot.loan_term_years {
            debt_service
        } else {
            Decimal::ZERO
        };

        rows.push(YearProjection {
            year,
            period_end: period_end(snapshot.acquisition_date, year),
            scheduled_rent: lines.scheduled_rent,
            other_income: lines.other_income,
            gross_potential_income: lines.gpi,
            vacancy_loss: lines.vacancy_loss,
            effective_gross_income: lines.egi,
            operating_expenses,
            fixed_expenses: lines.fixed_expenses,
            management_fee: lines.management_fee,
            total_operating_expenses: lines.total_opex,
            noi: lines.noi,
            debt_service: year_debt_service,
            cash_flow: lines.noi - year_debt_service,
            loan_balance: amortization::remaining_balance(
                loan,
                snapshot.interest_rate_pct,
                snapshot.loan_term_years,
                year * 12,
            ),
        });
    }

    rows
}

/// Projection plus the financing figures behind its debt service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionOutput {
    pub loan_amount: Money,
    pub monthly_payment: Money,
    pub annual_debt_service: Money,
    pub years: Vec<YearProjection>,
    pub amortization: Vec<AmortizationYear>,
}

/// Validate a snapshot and project it, wrapped in the standard envelope.
pub fn project_cash_flows(
    snapshot: &AssumptionSnapshot,
) -> ProformaResult<ComputationOutput<ProjectionOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    snapshot.validate(&mut warnings)?;

    let loan_amount = snapshot.loan_amount();
    let monthly_payment = amortization::compute_payment(
        loan_amount,
        snapshot.interest_rate_pct,
        snapshot.loan_term_years,
    );
    let output = ProjectionOutput {
        loan_amount,
        monthly_payment,
        annual_debt_service: monthly_payment * dec!(12),
        years: project(snapshot),
        amortization: amortization::annual_schedule(
            loan_amount,
            snapshot.interest_rate_pct,
            snapshot.loan_term_years,
            snapshot.hold_period_years,
        ),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Operating Projection (geometric growth from base year)",
        snapshot,
        warnings,
        elapsed,
        output,
    ))
}
