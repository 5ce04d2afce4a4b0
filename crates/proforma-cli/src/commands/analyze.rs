use clap::Args;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use proforma_core::analysis::{self, InvestmentAnalysis};
use proforma_core::insights::InsightCategory;
use proforma_core::snapshot::AssumptionSnapshot;
use proforma_core::types::{Coverage, IrrOutcome};

use crate::input;

/// Arguments for a full underwriting analysis
#[derive(Args)]
pub struct AnalyzeArgs {
    /// Path to the assumption snapshot (JSON or YAML)
    #[arg(long)]
    pub input: Option<String>,

    /// Engine configuration file replacing the built-in benchmark and scoring tables
    #[arg(long)]
    pub config: Option<String>,

    /// Report headline metrics and insights only
    #[arg(long)]
    pub summary: bool,
}

/// Flat view of an analysis for quick reads and table output.
#[derive(Debug, Serialize)]
struct AnalysisSummary {
    property_name: String,
    grade: String,
    score: Decimal,
    monthly_payment: Decimal,
    noi: Decimal,
    cash_flow: Decimal,
    cap_rate: Decimal,
    cash_on_cash: Decimal,
    dscr: Coverage,
    irr: IrrOutcome,
    equity_multiple: Decimal,
    breakeven_rate_pct: Option<Decimal>,
    breakeven_occupancy_pct: Decimal,
    critical_insights: usize,
    insights: Vec<String>,
}

impl From<InvestmentAnalysis> for AnalysisSummary {
    fn from(a: InvestmentAnalysis) -> Self {
        let critical_insights = a
            .insights
            .iter()
            .filter(|i| i.category == InsightCategory::Critical)
            .count();
        Self {
            property_name: a.property_name,
            grade: a.score.grade,
            score: a.score.score,
            monthly_payment: a.returns.monthly_payment,
            noi: a.returns.noi,
            cash_flow: a.returns.cash_flow,
            cap_rate: a.returns.cap_rate,
            cash_on_cash: a.returns.cash_on_cash,
            dscr: a.returns.dscr,
            irr: a.returns.irr,
            equity_multiple: a.returns.equity_multiple,
            breakeven_rate_pct: a.breakevens.breakeven_rate_pct,
            breakeven_occupancy_pct: a.breakevens.breakeven_occupancy_pct,
            critical_insights,
            insights: a.insights.into_iter().map(|i| i.title).collect(),
        }
    }
}

pub fn run_analyze(args: AnalyzeArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot: AssumptionSnapshot = input::read_input(args.input.as_deref(), "analysis")?;
    let config = input::read_config(args.config.as_deref())?;
    let result = analysis::analyze(&snapshot, &config)?;

    if args.summary {
        Ok(serde_json::to_value(result.map(AnalysisSummary::from))?)
    } else {
        Ok(serde_json::to_value(result)?)
    }
}
