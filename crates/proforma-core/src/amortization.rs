use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ProformaError;
use crate::types::{Money, Percent, Rate, MAX_AMOUNT};
use crate::ProformaResult;

/// Highest annual interest rate a loan may carry, in percent.
pub const MAX_INTEREST_RATE_PCT: Percent = dec!(100);
/// Longest amortization term, in years.
pub const MAX_LOAN_TERM_YEARS: u32 = 50;

/// Bounds and step of the breakeven-rate scan, in percentage points.
pub const BREAKEVEN_SCAN_START: Percent = dec!(1);
pub const BREAKEVEN_SCAN_END: Percent = dec!(15);
pub const BREAKEVEN_SCAN_STEP: Percent = dec!(0.25);

/// One year of a fixed-rate amortization schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationYear {
    pub year: u32,
    pub opening_balance: Money,
    pub payments: Money,
    pub interest: Money,
    pub principal: Money,
    pub closing_balance: Money,
}

fn monthly_rate(annual_rate_pct: Percent) -> Rate {
    annual_rate_pct / dec!(100) / dec!(12)
}

/// Reject loan terms outside the range the payment and balance formulas are
/// evaluated over.
pub fn validate_loan(principal: Money, annual_rate_pct: Percent, term_years: u32) -> ProformaResult<()> {
    if principal < Decimal::ZERO || principal > MAX_AMOUNT {
        return Err(ProformaError::invalid(
            "principal",
            format!("Principal must be between 0 and {MAX_AMOUNT}"),
        ));
    }
    if annual_rate_pct < Decimal::ZERO || annual_rate_pct > MAX_INTEREST_RATE_PCT {
        return Err(ProformaError::invalid(
            "annual_rate_pct",
            format!("Interest rate must be between 0% and {MAX_INTEREST_RATE_PCT}%"),
        ));
    }
    if term_years == 0 || term_years > MAX_LOAN_TERM_YEARS {
        return Err(ProformaError::invalid(
            "term_years",
            format!("Term must be between 1 and {MAX_LOAN_TERM_YEARS} years"),
        ));
    }
    Ok(())
}

/// Standard fixed-rate mortgage payment: P * r(1+r)^n / ((1+r)^n - 1)
///
/// Returns zero for a non-positive principal, a negative rate or a zero term,
/// and for figures too large to represent (see [`validate_loan`]). A rate of
/// exactly zero amortizes straight-line.
pub fn compute_payment(principal: Money, annual_rate_pct: Percent, term_years: u32) -> Money {
    if principal <= Decimal::ZERO || annual_rate_pct < Decimal::ZERO || term_years == 0 {
        return Decimal::ZERO;
    }

    let total_months = i64::from(term_years) * 12;
    if annual_rate_pct.is_zero() {
        return principal / Decimal::from(total_months);
    }

    let r = monthly_rate(annual_rate_pct);
    // Payment per unit of principal, so the principal multiplies last
    let factor = match (Decimal::ONE + r).checked_powi(total_months) {
        Some(compound) if compound > Decimal::ONE => r
            .checked_mul(compound)
            .and_then(|v| v.checked_div(compound - Decimal::ONE)),
        // (1+r)^n beyond Decimal range: the payment converges on interest-only
        _ => Some(r),
    };
    factor
        .and_then(|f| principal.checked_mul(f))
        .unwrap_or(Decimal::ZERO)
}

/// Outstanding principal after `months_paid` level payments.
pub fn remaining_balance(
    principal: Money,
    annual_rate_pct: Percent,
    term_years: u32,
    months_paid: u32,
) -> Money {
    if principal <= Decimal::ZERO || term_years == 0 {
        return Decimal::ZERO;
    }
    let n = i64::from(term_years) * 12;
    let k = i64::from(months_paid);
    if k >= n {
        return Decimal::ZERO;
    }

    if annual_rate_pct <= Decimal::ZERO {
        let payment = compute_payment(principal, annual_rate_pct, term_years);
        return (principal - payment * Decimal::from(k)).max(Decimal::ZERO);
    }

    let r = monthly_rate(annual_rate_pct);
    let growth = Decimal::ONE + r;
    // B_k = P * ((1+r)^n - (1+r)^k) / ((1+r)^n - 1); the ratio stays in [0, 1]
    let remaining_share = match (growth.checked_powi(n), growth.checked_powi(k)) {
        (Some(cn), Some(ck)) if cn > Decimal::ONE => (cn - ck).checked_div(cn - Decimal::ONE),
        // (1+r)^n beyond Decimal range: early payments are almost all interest
        _ => Some(Decimal::ONE),
    };
    remaining_share
        .map(|share| principal * share.min(Decimal::ONE))
        .unwrap_or(principal)
        .max(Decimal::ZERO)
}

/// Year-by-year schedule for the first `years` years of the loan. Years
/// after the loan is retired show zero payments and balance.
pub fn annual_schedule(
    principal: Money,
    annual_rate_pct: Percent,
    term_years: u32,
    years: u32,
) -> Vec<AmortizationYear> {
    let payment = compute_payment(principal, annual_rate_pct, term_years);
    let mut schedule = Vec::with_capacity(years as usize);
    let mut opening = principal.max(Decimal::ZERO);

    for year in 1..=years {
        let closing =
            remaining_balance(principal, annual_rate_pct, term_years, year.saturating_mul(12));
        let payments = if year <= term_years {
            payment * dec!(12)
        } else {
            Decimal::ZERO
        };
        let principal_paid = opening - closing;
        schedule.push(AmortizationYear {
            year,
            opening_balance: opening,
            payments,
            interest: (payments - principal_paid).max(Decimal::ZERO),
            principal: principal_paid,
            closing_balance: closing,
        });
        opening = closing;
    }

    schedule
}

/// Lowest interest rate, scanning 1%..15% in quarter-point steps, at which
/// annual debt service meets or exceeds `target_noi`.
///
/// `None` when no rate in range gets there, or when the question is
/// meaningless (no loan, or non-positive NOI).
pub fn find_rate_breakeven(loan_amount: Money, term_years: u32, target_noi: Money) -> Option<Percent> {
    if loan_amount <= Decimal::ZERO || target_noi <= Decimal::ZERO || term_years == 0 {
        return None;
    }

    let mut rate = BREAKEVEN_SCAN_START;
    while rate <= BREAKEVEN_SCAN_END {
        let annual = compute_payment(loan_amount, rate, term_years) * dec!(12);
        if annual >= target_noi {
            return Some(rate);
        }
        rate += BREAKEVEN_SCAN_STEP;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_payment_zero_principal() {
        assert_eq!(compute_payment(dec!(0), dec!(7), 30), Decimal::ZERO);
        assert_eq!(compute_payment(dec!(-5), dec!(7), 30), Decimal::ZERO);
    }

    #[test]
    fn test_payment_zero_rate_is_straight_line() {
        // 120000 over 10 years = 1000/month
        assert_eq!(compute_payment(dec!(120000), dec!(0), 10), dec!(1000));
    }

    #[test]
    fn test_payment_negative_rate_or_zero_term() {
        assert_eq!(compute_payment(dec!(100000), dec!(-1), 30), Decimal::ZERO);
        assert_eq!(compute_payment(dec!(100000), dec!(6), 0), Decimal::ZERO);
    }

    #[test]
    fn test_payment_known_answer() {
        // $1,725,000 at 7% over 30 years ≈ $11,476.47
        let pmt = compute_payment(dec!(1725000), dec!(7), 30);
        assert!((pmt - dec!(11476.47)).abs() < dec!(0.01), "got {pmt}");
    }

    #[test]
    fn test_payment_standard_mortgage() {
        // $200,000 at 6% over 30 years ≈ $1,199.10
        let pmt = compute_payment(dec!(200000), dec!(6), 30);
        assert!((pmt - dec!(1199.10)).abs() < dec!(0.01), "got {pmt}");
    }

    #[test]
    fn test_remaining_balance_bounds() {
        let p = dec!(1725000);
        assert!((remaining_balance(p, dec!(7), 30, 0) - p).abs() < dec!(0.000001));
        assert_eq!(remaining_balance(p, dec!(7), 30, 360), Decimal::ZERO);
        let after_five = remaining_balance(p, dec!(7), 30, 60);
        assert!(after_five < p && after_five > dec!(1600000), "got {after_five}");
    }

    #[test]
    fn test_remaining_balance_zero_rate() {
        // 120000 over 10 years, 24 payments of 1000 made
        assert_eq!(remaining_balance(dec!(120000), dec!(0), 10, 24), dec!(96000));
    }

    #[test]
    fn test_schedule_principal_sums_to_paydown() {
        let p = dec!(500000);
        let schedule = annual_schedule(p, dec!(6.5), 30, 5);
        assert_eq!(schedule.len(), 5);
        let paid: Decimal = schedule.iter().map(|y| y.principal).sum();
        let closing = schedule.last().unwrap().closing_balance;
        assert!((paid - (p - closing)).abs() < dec!(0.000001));
        // Interest dominates early payments
        assert!(schedule[0].interest > schedule[0].principal);
    }

    #[test]
    fn test_schedule_after_payoff() {
        let schedule = annual_schedule(dec!(100000), dec!(5), 3, 5);
        assert_eq!(schedule[2].closing_balance, Decimal::ZERO);
        assert_eq!(schedule[3].payments, Decimal::ZERO);
        assert_eq!(schedule[4].principal, Decimal::ZERO);
    }

    #[test]
    fn test_breakeven_rate_found() {
        let loan = dec!(1725000);
        let noi = dec!(129677.21);
        let rate = find_rate_breakeven(loan, 30, noi).unwrap();
        let at_rate = compute_payment(loan, rate, 30) * dec!(12);
        let below = compute_payment(loan, rate - BREAKEVEN_SCAN_STEP, 30) * dec!(12);
        assert!(at_rate >= noi);
        assert!(below < noi);
        // Within one step's payment delta of target
        assert!(at_rate - noi <= at_rate - below);
    }

    #[test]
    fn test_breakeven_rate_not_found() {
        // NOI so large no rate up to 15% consumes it
        assert_eq!(find_rate_breakeven(dec!(100000), 30, dec!(1000000)), None);
    }

    #[test]
    fn test_breakeven_rate_meaningless_inputs() {
        assert_eq!(find_rate_breakeven(dec!(0), 30, dec!(50000)), None);
        assert_eq!(find_rate_breakeven(dec!(100000), 30, dec!(-10)), None);
    }

    #[test]
    fn test_payment_out_of_range_rate_does_not_overflow() {
        assert_eq!(
            compute_payment(dec!(1725000), dec!(100000000000000000000000000), 30),
            Decimal::ZERO
        );
        // Highest accepted rate still prices a payment
        let pmt = compute_payment(dec!(1000000000000), MAX_INTEREST_RATE_PCT, MAX_LOAN_TERM_YEARS);
        assert!(pmt > dec!(83333333333), "got {pmt}");
    }

    #[test]
    fn test_remaining_balance_huge_term_does_not_overflow() {
        let balance = remaining_balance(dec!(1725000), dec!(7), 400_000_000, 60);
        assert!(balance > Decimal::ZERO && balance <= dec!(1725000));
    }

    #[test]
    fn test_remaining_balance_at_highest_rate_and_term() {
        let p = dec!(1000000000000);
        let balance = remaining_balance(p, MAX_INTEREST_RATE_PCT, MAX_LOAN_TERM_YEARS, 120);
        assert!(balance > dec!(999000000000) && balance < p, "got {balance}");
    }

    #[test]
    fn test_validate_loan_bounds() {
        validate_loan(dec!(1725000), dec!(7), 30).unwrap();
        assert!(validate_loan(dec!(1725000), dec!(100.01), 30).is_err());
        assert!(validate_loan(dec!(1725000), dec!(7), 51).is_err());
        assert!(validate_loan(dec!(1725000), dec!(7), 0).is_err());
        assert!(validate_loan(dec!(-1), dec!(7), 30).is_err());
        assert!(validate_loan(dec!(1000000000001), dec!(7), 30).is_err());
    }

    #[test]
    fn test_breakeven_rate_lowest_when_noi_tiny() {
        assert_eq!(find_rate_breakeven(dec!(1000000), 30, dec!(1)), Some(dec!(1)));
    }
}
