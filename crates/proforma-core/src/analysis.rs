//! Full underwriting pass: projection, returns, breakevens, sensitivity,
//! benchmarks, insights and score in one result.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::amortization::{self, AmortizationYear};
use crate::benchmarks::{benchmark_expenses, BenchmarkEntry, Classification};
use crate::breakeven::{compute_breakevens, BreakevenFigures};
use crate::config::EngineConfig;
use crate::insights::{generate_insights, Insight, InsightContext};
use crate::projection::{project, YearProjection};
use crate::returns::{split_equity, summarize, PartnerReturns, ReturnsSummary};
use crate::scoring::{score_deal, DealScore, ScoringMetrics};
use crate::sensitivity::{sensitivity_set, SensitivitySet};
use crate::snapshot::AssumptionSnapshot;
use crate::types::{with_metadata, ComputationOutput};
use crate::ProformaResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvestmentAnalysis {
    pub property_name: String,
    /// Year 0 is the closing row
    pub projection: Vec<YearProjection>,
    pub amortization: Vec<AmortizationYear>,
    pub returns: ReturnsSummary,
    pub breakevens: BreakevenFigures,
    pub sensitivity: SensitivitySet,
    pub benchmarks: Vec<BenchmarkEntry>,
    pub insights: Vec<Insight>,
    pub score: DealScore,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub equity_split: Vec<PartnerReturns>,
}

/// Run every stage against one snapshot. Stages read the same immutable
/// snapshot and each other's outputs, never shared state.
pub fn analyze(
    snapshot: &AssumptionSnapshot,
    config: &EngineConfig,
) -> ProformaResult<ComputationOutput<InvestmentAnalysis>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    snapshot.validate(&mut warnings)?;
    config.validate()?;

    let projection = project(snapshot);
    let amortization = amortization::annual_schedule(
        snapshot.loan_amount(),
        snapshot.interest_rate_pct,
        snapshot.loan_term_years,
        snapshot.hold_period_years,
    );
    let returns = summarize(snapshot, &projection, &mut warnings);
    let breakevens =
        compute_breakevens(snapshot, &projection, config.insights.max_years_to_positive);
    let sensitivity = sensitivity_set(snapshot)?;

    let egi = projection
        .get(1)
        .map(|y| y.effective_gross_income)
        .unwrap_or_default();
    let benchmarks = benchmark_expenses(snapshot, egi, config);

    // Only expense categories weigh on the score; price/SF has its own insight
    let outlier_count = benchmarks
        .iter()
        .filter(|e| e.classification == Classification::Outlier)
        .count();

    let insights = {
        let ctx = InsightContext {
            snapshot,
            projection: &projection,
            returns: &returns,
            breakevens: &breakevens,
            sensitivity: &sensitivity,
            benchmarks: &benchmarks,
            config,
        };
        generate_insights(&ctx, &mut warnings)
    };

    let score = score_deal(
        &ScoringMetrics::from_returns(&returns, outlier_count),
        &config.scoring,
    );
    let equity_split = split_equity(&snapshot.equity_partners, &returns.equity_cash_flows);

    debug!(
        property = %snapshot.property_name,
        score = %score.score,
        grade = %score.grade,
        insights = insights.len(),
        "analysis complete"
    );

    let analysis = InvestmentAnalysis {
        property_name: snapshot.property_name.clone(),
        projection,
        amortization,
        returns,
        breakevens,
        sensitivity,
        benchmarks,
        insights,
        score,
        equity_split,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Acquisition Underwriting: projection, returns, sensitivity, benchmarks, insights, score",
        snapshot,
        warnings,
        elapsed,
        analysis,
    ))
}

/// [`analyze`] with the built-in benchmark and scoring tables.
pub fn analyze_with_defaults(
    snapshot: &AssumptionSnapshot,
) -> ProformaResult<ComputationOutput<InvestmentAnalysis>> {
    analyze(snapshot, &EngineConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::tests::sample_snapshot;
    use crate::insights::InsightCategory;
    use crate::snapshot::{EquityPartner, IncomeSource};
    use crate::types::IrrOutcome;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    #[test]
    fn test_analyze_sample() {
        let out = analyze_with_defaults(&sample_snapshot()).unwrap();
        let a = &out.result;
        assert_eq!(a.property_name, sample_snapshot().property_name);
        assert_eq!(a.projection.len(), 6);
        assert_eq!(a.amortization.len(), 5);
        assert!(matches!(a.returns.irr, IrrOutcome::Converged(_)));
        assert_eq!(a.score.grade, "F");
        assert!(a.equity_split.is_empty());
        assert!(!a.insights.is_empty());
    }

    #[test]
    fn test_analysis_is_deterministic() {
        let s = sample_snapshot();
        let a = analyze_with_defaults(&s).unwrap().result;
        let b = analyze_with_defaults(&s).unwrap().result;
        assert_eq!(a, b);
    }

    #[test]
    fn test_invalid_snapshot_rejected() {
        let mut s = sample_snapshot();
        s.purchase_price = dec!(0);
        assert!(analyze_with_defaults(&s).is_err());
    }

    #[test]
    fn test_outlier_lowers_score() {
        let base = analyze_with_defaults(&sample_snapshot()).unwrap().result;
        let mut s = sample_snapshot();
        s.operating_expenses.insert("grounds".into(), dec!(100));
        let flagged = analyze_with_defaults(&s).unwrap().result;
        assert_eq!(
            flagged.score.components.outlier_penalty,
            dec!(-3),
            "grounds at $8/unit sits below 100/1.5"
        );
        assert!(flagged.score.components.outlier_penalty < base.score.components.outlier_penalty);
    }

    #[test]
    fn test_price_per_sqft_outlier_not_scored() {
        let mut s = sample_snapshot();
        if let IncomeSource::RentRoll { units } = &mut s.income {
            for u in units.iter_mut() {
                u.sqft = dec!(100);
            }
        }
        let a = analyze_with_defaults(&s).unwrap().result;
        assert!(a.returns.price_per_sqft.unwrap() > dec!(1900));
        assert!(a
            .benchmarks
            .iter()
            .all(|e| e.classification != Classification::Outlier));
        assert_eq!(a.score.components.outlier_penalty, Decimal::ZERO);
        let pps = a.insights.iter().find(|i| i.rule == "price_per_sqft").unwrap();
        assert_eq!(pps.category, InsightCategory::Outlier);
    }

    #[test]
    fn test_equity_split_included() {
        let mut s = sample_snapshot();
        s.equity_partners = vec![
            EquityPartner {
                name: "GP".into(),
                share_pct: dec!(10),
            },
            EquityPartner {
                name: "LP".into(),
                share_pct: dec!(90),
            },
        ];
        let a = analyze_with_defaults(&s).unwrap().result;
        assert_eq!(a.equity_split.len(), 2);
        assert_eq!(a.equity_split[0].contributed, dec!(64600));
    }
}
