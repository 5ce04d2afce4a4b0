//! Engine calibration: expense benchmark bands, scoring brackets and insight
//! thresholds. Everything here is plain data so a caller can load a regional
//! table from a file and inject it.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ProformaError;
use crate::types::{Money, Multiple, Percent};
use crate::ProformaResult;

/// Acceptable per-unit annual range for one expense category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkBand {
    pub low: Money,
    pub high: Money,
    /// Values beyond `high * m` or below `low / m` are outliers
    pub outlier_multiplier: Multiple,
}

impl BenchmarkBand {
    pub fn new(low: Money, high: Money, outlier_multiplier: Multiple) -> Self {
        Self {
            low,
            high,
            outlier_multiplier,
        }
    }
}

/// A score adjustment applied when a metric is at or above `min`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bracket {
    pub min: Decimal,
    pub points: Decimal,
}

/// A score adjustment applied when a metric is at or below `max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CeilingBracket {
    pub max: Decimal,
    pub points: Decimal,
}

/// Minimum score for a letter grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeBreakpoint {
    pub min_score: Decimal,
    pub grade: String,
}

fn bracket(min: Decimal, points: Decimal) -> Bracket {
    Bracket { min, points }
}

fn ceiling(max: Decimal, points: Decimal) -> CeilingBracket {
    CeilingBracket { max, points }
}

fn grade(min_score: Decimal, grade: &str) -> GradeBreakpoint {
    GradeBreakpoint {
        min_score,
        grade: grade.into(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub base_score: Decimal,
    /// Cash-on-cash % brackets, highest threshold first
    pub cash_on_cash: Vec<Bracket>,
    /// Points for metrics below the last cash-on-cash bracket
    pub cash_on_cash_floor: Decimal,
    pub dscr: Vec<Bracket>,
    pub dscr_floor: Decimal,
    /// Replaces the DSCR adjustment for all-cash purchases
    pub cash_deal_bonus: Decimal,
    pub cap_rate: Vec<Bracket>,
    pub cap_rate_floor: Decimal,
    /// Expense ratio % brackets, lowest ceiling first
    pub expense_ratio: Vec<CeilingBracket>,
    pub expense_ratio_ceiling: Decimal,
    pub outlier_penalty: Decimal,
    /// Grade breakpoints, highest first; scores below all of them get `fallback_grade`
    pub grades: Vec<GradeBreakpoint>,
    pub fallback_grade: String,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            base_score: dec!(50),
            cash_on_cash: vec![
                bracket(dec!(10), dec!(15)),
                bracket(dec!(8), dec!(10)),
                bracket(dec!(6), dec!(5)),
                bracket(dec!(4), dec!(0)),
                bracket(dec!(0), dec!(-5)),
            ],
            cash_on_cash_floor: dec!(-15),
            dscr: vec![
                bracket(dec!(1.5), dec!(10)),
                bracket(dec!(1.25), dec!(5)),
                bracket(dec!(1.0), dec!(-5)),
            ],
            dscr_floor: dec!(-15),
            cash_deal_bonus: dec!(10),
            cap_rate: vec![
                bracket(dec!(8), dec!(10)),
                bracket(dec!(6), dec!(5)),
                bracket(dec!(5), dec!(0)),
            ],
            cap_rate_floor: dec!(-5),
            expense_ratio: vec![
                ceiling(dec!(35), dec!(5)),
                ceiling(dec!(50), dec!(0)),
                ceiling(dec!(60), dec!(-5)),
            ],
            expense_ratio_ceiling: dec!(-10),
            outlier_penalty: dec!(3),
            grades: vec![
                grade(dec!(80), "A"),
                grade(dec!(70), "B+"),
                grade(dec!(60), "B"),
                grade(dec!(50), "C+"),
                grade(dec!(40), "C"),
                grade(dec!(30), "D"),
            ],
            fallback_grade: "F".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightThresholds {
    /// Lender-style minimum coverage
    pub min_dscr: Multiple,
    /// Cap rate minus interest rate below this many points is a thin spread
    pub thin_spread_pct: Percent,
    /// Breakeven rate minus interest rate below this is a thin cushion
    pub rate_cushion_pct: Percent,
    /// Breakeven occupancy above this is flagged
    pub breakeven_occupancy_pct: Percent,
    /// Property taxes as a share of purchase price
    pub effective_tax_rate_pct: Percent,
    /// Expense category holding property taxes
    pub tax_category: String,
    /// Longest horizon for the years-to-positive-cash-flow solve
    pub max_years_to_positive: u32,
}

impl Default for InsightThresholds {
    fn default() -> Self {
        Self {
            min_dscr: dec!(1.25),
            thin_spread_pct: dec!(1.0),
            rate_cushion_pct: dec!(1.5),
            breakeven_occupancy_pct: dec!(85),
            effective_tax_rate_pct: dec!(2.0),
            tax_category: "taxes".into(),
            max_years_to_positive: 30,
        }
    }
}

/// Full engine calibration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-unit annual expense bands keyed by expense category
    pub benchmarks: BTreeMap<String, BenchmarkBand>,
    /// Purchase price per square foot band
    pub price_per_sqft: BenchmarkBand,
    pub scoring: ScoringConfig,
    pub insights: InsightThresholds,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let benchmarks = BTreeMap::from([
            (
                "taxes".to_string(),
                BenchmarkBand::new(dec!(800), dec!(2500), dec!(1.5)),
            ),
            (
                "insurance".to_string(),
                BenchmarkBand::new(dec!(300), dec!(900), dec!(1.5)),
            ),
            (
                "utilities".to_string(),
                BenchmarkBand::new(dec!(600), dec!(1800), dec!(1.5)),
            ),
            (
                "repairs".to_string(),
                BenchmarkBand::new(dec!(400), dec!(1200), dec!(1.5)),
            ),
            (
                "grounds".to_string(),
                BenchmarkBand::new(dec!(100), dec!(500), dec!(1.5)),
            ),
        ]);

        Self {
            benchmarks,
            price_per_sqft: BenchmarkBand::new(dec!(75), dec!(350), dec!(1.5)),
            scoring: ScoringConfig::default(),
            insights: InsightThresholds::default(),
        }
    }
}

impl EngineConfig {
    /// Reject tables that would make classification or grading ambiguous.
    pub fn validate(&self) -> ProformaResult<()> {
        let bands = self
            .benchmarks
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .chain(std::iter::once(("price_per_sqft", &self.price_per_sqft)));
        for (name, band) in bands {
            if band.low < Decimal::ZERO || band.low > band.high {
                return Err(ProformaError::invalid(
                    "benchmarks",
                    format!("Band '{name}' must satisfy 0 <= low <= high"),
                ));
            }
            if band.outlier_multiplier < Decimal::ONE {
                return Err(ProformaError::invalid(
                    "benchmarks",
                    format!("Band '{name}' outlier multiplier must be at least 1"),
                ));
            }
        }

        let s = &self.scoring;
        for (name, brackets) in [
            ("cash_on_cash", &s.cash_on_cash),
            ("dscr", &s.dscr),
            ("cap_rate", &s.cap_rate),
        ] {
            if brackets.windows(2).any(|w| w[0].min < w[1].min) {
                return Err(ProformaError::invalid(
                    "scoring",
                    format!("'{name}' brackets must be ordered highest threshold first"),
                ));
            }
        }
        if s.expense_ratio.windows(2).any(|w| w[0].max > w[1].max) {
            return Err(ProformaError::invalid(
                "scoring",
                "'expense_ratio' brackets must be ordered lowest ceiling first",
            ));
        }
        if s.grades.windows(2).any(|w| w[0].min_score < w[1].min_score) {
            return Err(ProformaError::invalid(
                "scoring",
                "Grade breakpoints must be ordered highest first",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn test_default_benchmark_categories() {
        let cfg = EngineConfig::default();
        let keys: Vec<&str> = cfg.benchmarks.keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["grounds", "insurance", "repairs", "taxes", "utilities"]);
    }

    #[test]
    fn test_partial_json_falls_back_to_defaults() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{ "insights": { "min_dscr": "1.30" } }"#).unwrap();
        assert_eq!(cfg.insights.min_dscr, dec!(1.30));
        assert_eq!(cfg.insights.rate_cushion_pct, dec!(1.5));
        assert_eq!(cfg.scoring, ScoringConfig::default());
        assert_eq!(cfg.benchmarks.len(), 5);
    }

    #[test]
    fn test_rejects_inverted_band() {
        let mut cfg = EngineConfig::default();
        cfg.benchmarks.insert(
            "taxes".into(),
            BenchmarkBand::new(dec!(3000), dec!(1000), dec!(1.5)),
        );
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_rejects_unordered_brackets() {
        let mut cfg = EngineConfig::default();
        cfg.scoring.cap_rate.reverse();
        assert!(cfg.validate().is_err());
    }
}
