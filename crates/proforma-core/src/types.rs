use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Solver rates expressed as decimals (0.05 = 5%).
pub type Rate = Decimal;

/// Underwriting assumptions and ratio metrics quoted the way investors enter
/// them (7.0 = 7%).
pub type Percent = Decimal;

/// Multiples (e.g., 1.8x equity multiple, 14x GRM)
pub type Multiple = Decimal;

/// Ceiling on any single input amount or aggregate (one trillion).
pub const MAX_AMOUNT: Money = dec!(1000000000000);

/// Debt service coverage. A deal without debt has no coverage ratio at all,
/// which is kept distinct from any numeric value so it never leaks into
/// comparisons or averages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Coverage {
    Ratio(Multiple),
    NotApplicable,
}

impl Coverage {
    /// NOI over annual debt service; `NotApplicable` when there is no debt.
    /// Debt service too small to divide by saturates the ratio.
    pub fn from_noi(noi: Money, annual_debt_service: Money) -> Self {
        if annual_debt_service <= Decimal::ZERO {
            return Coverage::NotApplicable;
        }
        Coverage::Ratio(noi.checked_div(annual_debt_service).unwrap_or(
            if noi.is_sign_negative() {
                Decimal::MIN
            } else {
                Decimal::MAX
            },
        ))
    }

    pub fn ratio(&self) -> Option<Multiple> {
        match self {
            Coverage::Ratio(r) => Some(*r),
            Coverage::NotApplicable => None,
        }
    }
}

/// Outcome of the IRR root search. Solver failure is reported as its own
/// state, never as a zero rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "rate", rename_all = "snake_case")]
pub enum IrrOutcome {
    Converged(Rate),
    NonConvergent,
}

impl IrrOutcome {
    pub fn rate(&self) -> Option<Rate> {
        match self {
            IrrOutcome::Converged(r) => Some(*r),
            IrrOutcome::NonConvergent => None,
        }
    }
}

/// Sensitivity variable specification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityVariable {
    pub name: String,
    pub min: Decimal,
    pub max: Decimal,
    pub step: Decimal,
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

impl<T: Serialize> ComputationOutput<T> {
    /// Replace the result, keeping methodology, warnings and metadata.
    pub fn map<U: Serialize>(self, f: impl FnOnce(T) -> U) -> ComputationOutput<U> {
        ComputationOutput {
            result: f(self.result),
            methodology: self.methodology,
            assumptions: self.assumptions,
            warnings: self.warnings,
            metadata: self.metadata,
        }
    }
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: "rust_decimal_128bit".to_string(),
        },
    }
}

/// Percentage quoted value to a fractional rate (7.0 -> 0.07).
pub fn pct_to_rate(pct: Percent) -> Rate {
    pct / dec!(100)
}

/// `numerator / denominator`, or zero when the denominator is zero or the
/// quotient leaves Decimal range.
pub(crate) fn safe_div(numerator: Decimal, denominator: Decimal) -> Decimal {
    numerator.checked_div(denominator).unwrap_or(Decimal::ZERO)
}
