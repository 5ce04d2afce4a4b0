use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tracing::{debug, warn};

use crate::error::ProformaError;
use crate::types::{Money, Rate};
use crate::ProformaResult;

/// Stop once |NPV| falls below a cent.
const NPV_TOLERANCE: Decimal = dec!(0.01);
const MAX_IRR_ITERATIONS: u32 = 100;
const IRR_INITIAL_GUESS: Rate = dec!(0.10);
/// The solver gives up once the rate leaves (-99%, 1000%).
const IRR_LOWER_BOUND: Rate = dec!(-0.99);
const IRR_UPPER_BOUND: Rate = dec!(10);

/// Net Present Value of a series of cash flows
pub fn npv(rate: Rate, cash_flows: &[Money]) -> ProformaResult<Money> {
    if rate <= dec!(-1) {
        return Err(ProformaError::InvalidInput {
            field: "rate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let mut result = Decimal::ZERO;
    let one_plus_r = Decimal::ONE + rate;
    let mut discount = Decimal::ONE;

    for (t, cf) in cash_flows.iter().enumerate() {
        if t > 0 {
            discount = discount
                .checked_mul(one_plus_r)
                .ok_or_else(|| ProformaError::DivisionByZero {
                    context: format!("NPV discount factor overflow at period {t}"),
                })?;
        }
        if discount.is_zero() {
            return Err(ProformaError::DivisionByZero {
                context: format!("NPV discount factor at period {t}"),
            });
        }
        result = cf
            .checked_div(discount)
            .and_then(|pv| result.checked_add(pv))
            .ok_or_else(|| ProformaError::DivisionByZero {
                context: format!("NPV present value overflow at period {t}"),
            })?;
    }

    Ok(result)
}

/// True when the series has at least one strictly negative and one strictly
/// positive flow.
pub fn has_sign_change(cash_flows: &[Money]) -> bool {
    let negative = cash_flows.iter().any(|cf| cf.is_sign_negative() && !cf.is_zero());
    let positive = cash_flows.iter().any(|cf| cf.is_sign_positive() && !cf.is_zero());
    negative && positive
}

/// NPV(r) = Σ CF_t / (1+r)^t and dNPV/dr = -Σ t·CF_t / (1+r)^(t+1).
///
/// `None` when an intermediate value leaves the Decimal range.
fn npv_and_derivative(cash_flows: &[Money], rate: Rate) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    let mut npv = Decimal::ZERO;
    let mut dnpv = Decimal::ZERO;
    let mut discount = Decimal::ONE; // 1 / (1+r)^t

    for (t, cf) in cash_flows.iter().enumerate() {
        let pv = cf.checked_mul(discount)?;
        npv = npv.checked_add(pv)?;
        if t > 0 {
            let term = pv
                .checked_mul(Decimal::from(t as i64))?
                .checked_div(one_plus_r)?;
            dnpv = dnpv.checked_sub(term)?;
        }
        discount = discount.checked_div(one_plus_r)?;
    }

    Some((npv, dnpv))
}

/// Internal Rate of Return using Newton-Raphson.
///
/// Fails with `FinancialImpossibility` when the series never changes sign and
/// with `ConvergenceFailure` when the iteration stalls, escapes the search
/// bounds or runs out of iterations. A failure is never reported as a rate.
pub fn irr(cash_flows: &[Money]) -> ProformaResult<Rate> {
    if cash_flows.len() < 2 {
        return Err(ProformaError::InsufficientData(
            "IRR requires at least 2 cash flows".into(),
        ));
    }
    if !has_sign_change(cash_flows) {
        return Err(ProformaError::FinancialImpossibility(
            "IRR is undefined for a cash-flow series without a sign change".into(),
        ));
    }

    let mut rate = IRR_INITIAL_GUESS;
    let mut last_npv = Decimal::ZERO;

    for i in 0..MAX_IRR_ITERATIONS {
        let (npv_val, dnpv) = match npv_and_derivative(cash_flows, rate) {
            Some(v) => v,
            None => return Err(convergence_failure(i, last_npv, "arithmetic overflow")),
        };
        last_npv = npv_val;

        if npv_val.abs() < NPV_TOLERANCE {
            debug!(iterations = i, %rate, "IRR converged");
            return Ok(rate);
        }

        if dnpv.is_zero() {
            return Err(convergence_failure(i, npv_val, "zero derivative"));
        }

        rate = match npv_val.checked_div(dnpv).and_then(|step| rate.checked_sub(step)) {
            Some(next) => next,
            None => return Err(convergence_failure(i + 1, npv_val, "arithmetic overflow")),
        };

        if rate <= IRR_LOWER_BOUND || rate >= IRR_UPPER_BOUND {
            return Err(convergence_failure(i + 1, npv_val, "rate left search bounds"));
        }
    }

    Err(convergence_failure(MAX_IRR_ITERATIONS, last_npv, "iteration limit"))
}

fn convergence_failure(iterations: u32, last_delta: Decimal, cause: &str) -> ProformaError {
    warn!(iterations, %last_delta, cause, "IRR did not converge");
    ProformaError::ConvergenceFailure {
        function: "IRR".into(),
        iterations,
        last_delta,
    }
}
