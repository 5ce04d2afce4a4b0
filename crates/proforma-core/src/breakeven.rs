use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::amortization;
use crate::projection::YearProjection;
use crate::snapshot::AssumptionSnapshot;
use crate::types::{pct_to_rate, safe_div, Money, Percent, Rate};

/// Points at which the deal stops paying for itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreakevenFigures {
    /// Lowest rate at which debt service consumes year-one NOI
    pub breakeven_rate_pct: Option<Percent>,
    /// Breakeven rate minus the contract rate
    pub rate_cushion_pct: Option<Percent>,
    /// Occupancy at which year-one cash flow is zero
    pub breakeven_occupancy_pct: Percent,
    /// Gross potential income needed for zero cash flow at the underwritten vacancy
    pub breakeven_gross_income: Money,
    pub breakeven_rent_per_unit_monthly: Money,
    /// Years of NOI growth until cash flow turns positive (0 when already positive)
    pub years_to_positive_cash_flow: Option<u32>,
}

/// Occupancy at which EGI covers fixed expenses, management and debt service.
///
/// Management is charged on collected income, so the break-even EGI is
/// `(fixed + debt service) / (1 - management)`.
pub fn breakeven_occupancy(
    fixed_expenses: Money,
    debt_service: Money,
    gpi: Money,
    management_pct: Percent,
) -> Percent {
    let retained = Decimal::ONE - pct_to_rate(management_pct);
    safe_div(fixed_expenses + debt_service, gpi * retained) * dec!(100)
}

/// Solve `NOI * (1+g)^n >= debt service` for the smallest whole `n`, with
/// `g = (1 + rent growth) / (1 + expense growth) - 1`.
///
/// `Some(0)` when cash flow is already non-negative. `None` when NOI is not
/// positive, `g <= 0`, or the answer exceeds `max_years`.
pub fn years_to_positive_cash_flow(
    noi: Money,
    debt_service: Money,
    rent_growth: Rate,
    expense_growth: Rate,
    max_years: u32,
) -> Option<u32> {
    if noi >= debt_service {
        return Some(0);
    }
    if noi <= Decimal::ZERO {
        return None;
    }

    let g = safe_div(Decimal::ONE + rent_growth, Decimal::ONE + expense_growth) - Decimal::ONE;
    if g <= Decimal::ZERO {
        return None;
    }

    let numerator = debt_service.checked_div(noi)?.checked_ln()?;
    let denominator = (Decimal::ONE + g).checked_ln()?;
    if denominator <= Decimal::ZERO {
        return None;
    }
    let years = (numerator / denominator).ceil().to_u32()?;
    (years <= max_years).then_some(years)
}

pub fn compute_breakevens(
    snapshot: &AssumptionSnapshot,
    projection: &[YearProjection],
    max_years: u32,
) -> BreakevenFigures {
    let year_one = projection.get(1);
    let noi = year_one.map(|y| y.noi).unwrap_or_default();
    let gpi = year_one
        .map(|y| y.gross_potential_income)
        .unwrap_or_default();
    let fixed = year_one.map(|y| y.fixed_expenses).unwrap_or_default();
    let debt_service = year_one.map(|y| y.debt_service).unwrap_or_default();

    let breakeven_rate_pct = amortization::find_rate_breakeven(
        snapshot.loan_amount(),
        snapshot.loan_term_years,
        noi,
    );

    let retained = (Decimal::ONE - pct_to_rate(snapshot.vacancy_pct))
        * (Decimal::ONE - pct_to_rate(snapshot.management_pct));
    let breakeven_gross_income = safe_div(fixed + debt_service, retained);
    let units = Decimal::from(snapshot.unit_count() as u64);

    BreakevenFigures {
        breakeven_rate_pct,
        rate_cushion_pct: breakeven_rate_pct.map(|r| r - snapshot.interest_rate_pct),
        breakeven_occupancy_pct: breakeven_occupancy(
            fixed,
            debt_service,
            gpi,
            snapshot.management_pct,
        ),
        breakeven_gross_income,
        breakeven_rent_per_unit_monthly: safe_div(breakeven_gross_income, units * dec!(12)),
        years_to_positive_cash_flow: years_to_positive_cash_flow(
            noi,
            debt_service,
            snapshot.rent_growth(),
            snapshot.expense_growth(),
            max_years,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::project;
    use crate::snapshot::tests::sample_snapshot;
    use rust_decimal_macros::dec;

    #[test]
    fn test_years_to_positive_already_positive() {
        assert_eq!(
            years_to_positive_cash_flow(dec!(120000), dec!(100000), dec!(0.03), dec!(0.02), 30),
            Some(0)
        );
    }

    #[test]
    fn test_years_to_positive_solves_growth() {
        // g = 1.03/1.02 - 1 ≈ 0.0098; ln(1.04)/ln(1.0098) ≈ 4.02 -> 5
        let n =
            years_to_positive_cash_flow(dec!(100000), dec!(104000), dec!(0.03), dec!(0.02), 30);
        assert_eq!(n, Some(5));
    }

    #[test]
    fn test_years_to_positive_undefined_without_growth() {
        assert_eq!(
            years_to_positive_cash_flow(dec!(100000), dec!(105000), dec!(0.02), dec!(0.03), 30),
            None
        );
        assert_eq!(
            years_to_positive_cash_flow(dec!(100000), dec!(105000), dec!(0.02), dec!(0.02), 30),
            None
        );
        assert_eq!(
            years_to_positive_cash_flow(dec!(-1), dec!(105000), dec!(0.05), dec!(0.02), 30),
            None
        );
    }

    #[test]
    fn test_years_to_positive_beyond_ceiling() {
        // Needs ~70 years at under 1% net growth
        assert_eq!(
            years_to_positive_cash_flow(dec!(50000), dec!(100000), dec!(0.03), dec!(0.02), 30),
            None
        );
    }

    #[test]
    fn test_breakeven_occupancy_formula() {
        // (50000 + 40000) / (200000 * 0.95) = 47.37%
        let occ = breakeven_occupancy(dec!(50000), dec!(40000), dec!(200000), dec!(5));
        assert!((occ - dec!(47.368)).abs() < dec!(0.001));
    }

    #[test]
    fn test_sample_breakevens() {
        let s = sample_snapshot();
        let b = compute_breakevens(&s, &project(&s), 30);
        assert_eq!(b.breakeven_rate_pct, Some(dec!(6.5)));
        assert_eq!(b.rate_cushion_pct, Some(dec!(-0.5)));
        // (80515 + 137717.62) / (232899.96 * 0.95) ≈ 98.63%
        assert!((b.breakeven_occupancy_pct - dec!(98.63)).abs() < dec!(0.01));
        // g ≈ 0.4878%; ln(137717.62/129677.21)/ln(1.004878) ≈ 12.36 -> 13
        assert_eq!(b.years_to_positive_cash_flow, Some(13));
        assert!(b.breakeven_rent_per_unit_monthly > dec!(1600));
    }

    #[test]
    fn test_cash_deal_breakevens() {
        let mut s = sample_snapshot();
        s.down_payment_pct = dec!(100);
        let b = compute_breakevens(&s, &project(&s), 30);
        assert_eq!(b.breakeven_rate_pct, None);
        assert_eq!(b.rate_cushion_pct, None);
        assert_eq!(b.years_to_positive_cash_flow, Some(0));
    }
}
