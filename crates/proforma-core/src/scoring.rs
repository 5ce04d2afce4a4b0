//! Composite 0-100 deal score and letter grade.
//!
//! Starts from a base score and adds bracketed adjustments for cash-on-cash,
//! debt coverage, cap rate and expense ratio, less a penalty per benchmark
//! outlier. All brackets come from [`ScoringConfig`].

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::{Bracket, CeilingBracket, ScoringConfig};
use crate::returns::ReturnsSummary;
use crate::types::{Coverage, Percent};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringMetrics {
    pub cash_on_cash: Percent,
    pub dscr: Coverage,
    pub cap_rate: Percent,
    pub expense_ratio: Percent,
    pub outlier_count: usize,
}

impl ScoringMetrics {
    pub fn from_returns(returns: &ReturnsSummary, outlier_count: usize) -> Self {
        Self {
            cash_on_cash: returns.cash_on_cash,
            dscr: returns.dscr,
            cap_rate: returns.cap_rate,
            expense_ratio: returns.expense_ratio,
            outlier_count,
        }
    }
}

/// Points contributed by each factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponents {
    pub base: Decimal,
    pub cash_on_cash: Decimal,
    pub debt_coverage: Decimal,
    pub cap_rate: Decimal,
    pub expense_ratio: Decimal,
    pub outlier_penalty: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DealScore {
    /// Clamped to 0..=100
    pub score: Decimal,
    pub grade: String,
    pub components: ScoreComponents,
}

fn floor_points(value: Decimal, brackets: &[Bracket], floor: Decimal) -> Decimal {
    brackets
        .iter()
        .find(|b| value >= b.min)
        .map(|b| b.points)
        .unwrap_or(floor)
}

fn ceiling_points(value: Decimal, brackets: &[CeilingBracket], ceiling: Decimal) -> Decimal {
    brackets
        .iter()
        .find(|b| value <= b.max)
        .map(|b| b.points)
        .unwrap_or(ceiling)
}

pub fn grade_for(score: Decimal, config: &ScoringConfig) -> String {
    config
        .grades
        .iter()
        .find(|g| score >= g.min_score)
        .map(|g| g.grade.clone())
        .unwrap_or_else(|| config.fallback_grade.clone())
}

pub fn score_deal(metrics: &ScoringMetrics, config: &ScoringConfig) -> DealScore {
    let debt_coverage = match metrics.dscr {
        Coverage::Ratio(r) => floor_points(r, &config.dscr, config.dscr_floor),
        Coverage::NotApplicable => config.cash_deal_bonus,
    };

    let components = ScoreComponents {
        base: config.base_score,
        cash_on_cash: floor_points(
            metrics.cash_on_cash,
            &config.cash_on_cash,
            config.cash_on_cash_floor,
        ),
        debt_coverage,
        cap_rate: floor_points(metrics.cap_rate, &config.cap_rate, config.cap_rate_floor),
        expense_ratio: ceiling_points(
            metrics.expense_ratio,
            &config.expense_ratio,
            config.expense_ratio_ceiling,
        ),
        outlier_penalty: -(config.outlier_penalty * Decimal::from(metrics.outlier_count as u64)),
    };

    let raw = components.base
        + components.cash_on_cash
        + components.debt_coverage
        + components.cap_rate
        + components.expense_ratio
        + components.outlier_penalty;
    let score = raw.max(Decimal::ZERO).min(dec!(100));

    DealScore {
        score,
        grade: grade_for(score, config),
        components,
    }
}
