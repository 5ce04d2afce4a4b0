//! Rule-based narrative insights.
//!
//! Each rule inspects the finished analysis and emits zero or more insights.
//! Rules are independent: a rule that errors is logged and skipped, the rest
//! still run. Output is ordered by category priority, preserving rule order
//! within a category.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::benchmarks::{classify, BenchmarkEntry, Classification};
use crate::breakeven::BreakevenFigures;
use crate::config::EngineConfig;
use crate::error::ProformaError;
use crate::projection::YearProjection;
use crate::returns::ReturnsSummary;
use crate::sensitivity::SensitivitySet;
use crate::snapshot::AssumptionSnapshot;
use crate::types::{safe_div, Coverage};
use crate::ProformaResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Declared in priority order; sorting uses the derived `Ord`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightCategory {
    Critical,
    Outlier,
    Sensitivity,
    Benchmark,
    Opportunity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub category: InsightCategory,
    /// Id of the rule that produced this insight
    pub rule: String,
    pub title: String,
    pub detail: String,
    /// Headline figure, already formatted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Insight {
    fn new(
        category: InsightCategory,
        rule: &str,
        title: impl Into<String>,
        detail: impl Into<String>,
        value: Option<String>,
    ) -> Self {
        Self {
            category,
            rule: rule.into(),
            title: title.into(),
            detail: detail.into(),
            value,
        }
    }
}

/// Everything a rule may look at.
pub struct InsightContext<'a> {
    pub snapshot: &'a AssumptionSnapshot,
    pub projection: &'a [YearProjection],
    pub returns: &'a ReturnsSummary,
    pub breakevens: &'a BreakevenFigures,
    pub sensitivity: &'a SensitivitySet,
    pub benchmarks: &'a [BenchmarkEntry],
    pub config: &'a EngineConfig,
}

pub struct InsightRule {
    pub id: &'static str,
    pub evaluate: fn(&InsightContext) -> ProformaResult<Vec<Insight>>,
}

pub const RULES: &[InsightRule] = &[
    InsightRule { id: "financing_structure", evaluate: financing_structure },
    InsightRule { id: "debt_coverage", evaluate: debt_coverage },
    InsightRule { id: "negative_leverage", evaluate: negative_leverage },
    InsightRule { id: "leverage_spread", evaluate: leverage_spread },
    InsightRule { id: "rate_cushion", evaluate: rate_cushion },
    InsightRule { id: "breakeven_occupancy", evaluate: breakeven_occupancy },
    InsightRule { id: "years_to_positive", evaluate: years_to_positive },
    InsightRule { id: "expense_outliers", evaluate: expense_outliers },
    InsightRule { id: "price_per_sqft", evaluate: price_per_sqft },
    InsightRule { id: "effective_tax_rate", evaluate: effective_tax_rate },
    InsightRule { id: "growth_differential", evaluate: growth_differential },
    InsightRule { id: "exit_cap", evaluate: exit_cap },
];

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

/// Run the built-in rule set.
pub fn generate_insights(ctx: &InsightContext, warnings: &mut Vec<String>) -> Vec<Insight> {
    evaluate_rules(RULES, ctx, warnings)
}

/// Run `rules` in order and sort the result by category priority.
pub fn evaluate_rules(
    rules: &[InsightRule],
    ctx: &InsightContext,
    warnings: &mut Vec<String>,
) -> Vec<Insight> {
    let mut insights = Vec::new();
    for rule in rules {
        match (rule.evaluate)(ctx) {
            Ok(found) => insights.extend(found),
            Err(e) => {
                warn!(rule = rule.id, error = %e, "insight rule skipped");
                warnings.push(format!("Insight rule '{}' skipped: {e}", rule.id));
            }
        }
    }
    // sort_by_key is stable
    insights.sort_by_key(|i| i.category);
    insights
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// `$1,234` with negatives as `-$1,234`.
pub fn fmt_money(value: Decimal) -> String {
    let rounded = value.round_dp(0);
    let digits = group_thousands(&rounded.abs().trunc().to_string());
    if rounded < Decimal::ZERO {
        format!("-${digits}")
    } else {
        format!("${digits}")
    }
}

pub fn fmt_pct(value: Decimal) -> String {
    format!("{:.2}%", value.round_dp(2))
}

pub fn fmt_multiple(value: Decimal) -> String {
    format!("{:.2}x", value.round_dp(2))
}

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

fn financing_structure(ctx: &InsightContext) -> ProformaResult<Vec<Insight>> {
    let s = ctx.snapshot;
    if !s.is_leveraged() {
        return Ok(vec![Insight::new(
            InsightCategory::Opportunity,
            "financing_structure",
            "All-cash purchase",
            format!(
                "No debt service; all {} of year-one NOI is distributable and coverage ratios do not apply.",
                fmt_money(ctx.returns.noi)
            ),
            Some(fmt_money(ctx.returns.noi)),
        )]);
    }

    let ltv = dec!(100) - s.down_payment_pct;
    if ltv >= dec!(80) {
        return Ok(vec![Insight::new(
            InsightCategory::Sensitivity,
            "financing_structure",
            "High leverage",
            format!(
                "Loan covers {} of the price; small NOI or rate moves swing equity returns sharply.",
                fmt_pct(ltv)
            ),
            Some(fmt_pct(ltv)),
        )]);
    }
    Ok(Vec::new())
}

fn debt_coverage(ctx: &InsightContext) -> ProformaResult<Vec<Insight>> {
    let min = ctx.config.insights.min_dscr;
    match ctx.returns.dscr {
        Coverage::Ratio(r) if r < min => Ok(vec![Insight::new(
            InsightCategory::Critical,
            "debt_coverage",
            "Debt coverage below lender minimum",
            format!(
                "Year-one DSCR of {} is under the {} most lenders require.",
                fmt_multiple(r),
                fmt_multiple(min)
            ),
            Some(fmt_multiple(r)),
        )]),
        _ => Ok(Vec::new()),
    }
}

fn negative_leverage(ctx: &InsightContext) -> ProformaResult<Vec<Insight>> {
    let s = ctx.snapshot;
    let cap = ctx.returns.cap_rate;
    if !s.is_leveraged() || cap >= s.interest_rate_pct {
        return Ok(Vec::new());
    }
    Ok(vec![Insight::new(
        InsightCategory::Critical,
        "negative_leverage",
        "Negative leverage",
        format!(
            "Going-in cap rate of {} is below the {} loan rate; every borrowed dollar dilutes equity returns.",
            fmt_pct(cap),
            fmt_pct(s.interest_rate_pct)
        ),
        Some(fmt_pct(cap - s.interest_rate_pct)),
    )])
}

fn leverage_spread(ctx: &InsightContext) -> ProformaResult<Vec<Insight>> {
    let s = ctx.snapshot;
    let spread = ctx.returns.cap_rate - s.interest_rate_pct;
    if !s.is_leveraged() || spread < Decimal::ZERO || spread >= ctx.config.insights.thin_spread_pct
    {
        return Ok(Vec::new());
    }
    Ok(vec![Insight::new(
        InsightCategory::Sensitivity,
        "leverage_spread",
        "Thin leverage spread",
        format!(
            "Cap rate exceeds the loan rate by only {}; leverage adds little return for its risk.",
            fmt_pct(spread)
        ),
        Some(fmt_pct(spread)),
    )])
}

fn rate_cushion(ctx: &InsightContext) -> ProformaResult<Vec<Insight>> {
    let s = ctx.snapshot;
    if !s.is_leveraged() {
        return Ok(Vec::new());
    }

    let insight = match (ctx.breakevens.breakeven_rate_pct, ctx.breakevens.rate_cushion_pct) {
        (Some(breakeven), Some(cushion)) if cushion <= Decimal::ZERO => Insight::new(
            InsightCategory::Sensitivity,
            "rate_cushion",
            "No interest rate cushion",
            format!(
                "Debt service already exceeds NOI from a {} rate, at or below the {} contract rate.",
                fmt_pct(breakeven),
                fmt_pct(s.interest_rate_pct)
            ),
            Some(fmt_pct(breakeven)),
        ),
        (Some(breakeven), Some(cushion)) if cushion < ctx.config.insights.rate_cushion_pct => {
            Insight::new(
                InsightCategory::Sensitivity,
                "rate_cushion",
                "Thin interest rate cushion",
                format!(
                    "A refinance above {} would push debt service past NOI; cushion is {}.",
                    fmt_pct(breakeven),
                    fmt_pct(cushion)
                ),
                Some(fmt_pct(cushion)),
            )
        }
        (Some(breakeven), Some(cushion)) => Insight::new(
            InsightCategory::Opportunity,
            "rate_cushion",
            "Comfortable interest rate cushion",
            format!(
                "NOI covers debt service up to a {} rate, {} above the contract rate.",
                fmt_pct(breakeven),
                fmt_pct(cushion)
            ),
            Some(fmt_pct(cushion)),
        ),
        _ if ctx.returns.noi > Decimal::ZERO => Insight::new(
            InsightCategory::Opportunity,
            "rate_cushion",
            "Debt service covered at any scanned rate",
            "Year-one NOI exceeds debt service even at a 15% interest rate.",
            None,
        ),
        _ => return Ok(Vec::new()),
    };
    Ok(vec![insight])
}

fn breakeven_occupancy(ctx: &InsightContext) -> ProformaResult<Vec<Insight>> {
    let occupancy = ctx.breakevens.breakeven_occupancy_pct;
    let underwritten = dec!(100) - ctx.snapshot.vacancy_pct;

    if occupancy >= underwritten {
        return Ok(vec![Insight::new(
            InsightCategory::Critical,
            "breakeven_occupancy",
            "Cash flow negative at underwritten occupancy",
            format!(
                "Breakeven occupancy is {} against {} underwritten; rents would need to average {} per unit per month.",
                fmt_pct(occupancy),
                fmt_pct(underwritten),
                fmt_money(ctx.breakevens.breakeven_rent_per_unit_monthly)
            ),
            Some(fmt_pct(occupancy)),
        )]);
    }

    if occupancy > ctx.config.insights.breakeven_occupancy_pct {
        let mut detail = format!(
            "Cash flow breaks even at {} occupancy, leaving little room for lease-up or turnover.",
            fmt_pct(occupancy)
        );
        if let Some(point) = ctx
            .sensitivity
            .vacancy
            .points
            .iter()
            .find(|p| p.cash_flow < Decimal::ZERO)
        {
            detail.push_str(&format!(
                " Cash flow turns negative by {} vacancy.",
                fmt_pct(point.value)
            ));
        }
        return Ok(vec![Insight::new(
            InsightCategory::Sensitivity,
            "breakeven_occupancy",
            "High breakeven occupancy",
            detail,
            Some(fmt_pct(occupancy)),
        )]);
    }
    Ok(Vec::new())
}

fn years_to_positive(ctx: &InsightContext) -> ProformaResult<Vec<Insight>> {
    if ctx.returns.cash_flow >= Decimal::ZERO {
        return Ok(Vec::new());
    }
    let max_years = ctx.config.insights.max_years_to_positive;
    let hold = ctx.snapshot.hold_period_years;
    // First operating year the projection itself shows non-negative cash flow
    let first_positive_year = ctx
        .projection
        .iter()
        .skip(1)
        .find(|y| y.cash_flow >= Decimal::ZERO)
        .map(|y| y.year);

    let insight = match (ctx.breakevens.years_to_positive_cash_flow, first_positive_year) {
        (Some(n), _) => {
            let mut detail = format!(
                "Year-one cash flow is {}; at the assumed growth spread it turns positive in about {} years.",
                fmt_money(ctx.returns.cash_flow),
                n
            );
            match first_positive_year {
                Some(year) => detail.push_str(&format!(
                    " The projection first shows positive cash flow in year {year}."
                )),
                None => detail.push_str(&format!(" That is beyond the {hold}-year hold.")),
            }
            Insight::new(
                InsightCategory::Sensitivity,
                "years_to_positive",
                "Negative early cash flow",
                detail,
                Some(format!("{n} years")),
            )
        }
        (None, Some(year)) => Insight::new(
            InsightCategory::Sensitivity,
            "years_to_positive",
            "Negative early cash flow",
            format!(
                "Year-one cash flow is {}; the projection first shows positive cash flow in year {year}.",
                fmt_money(ctx.returns.cash_flow)
            ),
            Some(format!("year {year}")),
        ),
        (None, None) => Insight::new(
            InsightCategory::Critical,
            "years_to_positive",
            "Cash flow does not recover",
            format!(
                "Year-one cash flow is {} and rent growth does not outpace expenses enough to turn it positive within {} years.",
                fmt_money(ctx.returns.cash_flow),
                max_years
            ),
            None,
        ),
    };
    Ok(vec![insight])
}

fn expense_outliers(ctx: &InsightContext) -> ProformaResult<Vec<Insight>> {
    Ok(ctx
        .benchmarks
        .iter()
        .filter(|e| e.classification == Classification::Outlier)
        .map(|e| {
            Insight::new(
                InsightCategory::Outlier,
                "expense_outliers",
                format!("{} expense outside market range", e.category),
                format!(
                    "{} per unit per year against a typical {} to {}; verify before relying on the pro forma.",
                    fmt_money(e.per_unit),
                    fmt_money(e.band.low),
                    fmt_money(e.band.high)
                ),
                Some(fmt_money(e.per_unit)),
            )
        })
        .collect())
}

fn price_per_sqft(ctx: &InsightContext) -> ProformaResult<Vec<Insight>> {
    let Some(pps) = ctx.returns.price_per_sqft else {
        return Ok(Vec::new());
    };
    let band = &ctx.config.price_per_sqft;
    let (category, title) = match classify(pps, band) {
        Classification::Outlier => (InsightCategory::Outlier, "Price per square foot outlier"),
        Classification::High => (InsightCategory::Benchmark, "Price per square foot above market"),
        Classification::Low => (InsightCategory::Benchmark, "Price per square foot below market"),
        Classification::Normal => return Ok(Vec::new()),
    };
    Ok(vec![Insight::new(
        category,
        "price_per_sqft",
        title,
        format!(
            "Paying {} per square foot against a typical {} to {}.",
            fmt_money(pps),
            fmt_money(band.low),
            fmt_money(band.high)
        ),
        Some(fmt_money(pps)),
    )])
}

fn effective_tax_rate(ctx: &InsightContext) -> ProformaResult<Vec<Insight>> {
    let thresholds = &ctx.config.insights;
    let Some(taxes) = ctx
        .snapshot
        .operating_expenses
        .iter()
        .find(|(k, _)| k.trim().eq_ignore_ascii_case(&thresholds.tax_category))
        .map(|(_, v)| *v)
    else {
        return Ok(Vec::new());
    };
    if ctx.snapshot.purchase_price <= Decimal::ZERO {
        return Err(ProformaError::DivisionByZero {
            context: "effective tax rate on purchase price".into(),
        });
    }

    let rate = safe_div(taxes, ctx.snapshot.purchase_price) * dec!(100);
    if rate <= thresholds.effective_tax_rate_pct {
        return Ok(Vec::new());
    }
    Ok(vec![Insight::new(
        InsightCategory::Benchmark,
        "effective_tax_rate",
        "High effective property tax rate",
        format!(
            "Taxes run {} of the purchase price; a post-sale reassessment could raise them further.",
            fmt_pct(rate)
        ),
        Some(fmt_pct(rate)),
    )])
}

fn growth_differential(ctx: &InsightContext) -> ProformaResult<Vec<Insight>> {
    let s = ctx.snapshot;
    let diff = s.rent_growth_pct - s.expense_growth_pct;
    let insight = if diff < Decimal::ZERO {
        Insight::new(
            InsightCategory::Sensitivity,
            "growth_differential",
            "Expenses outpacing rents",
            format!(
                "Expenses grow {} a year against {} rent growth, compressing NOI over the hold.",
                fmt_pct(s.expense_growth_pct),
                fmt_pct(s.rent_growth_pct)
            ),
            Some(fmt_pct(diff)),
        )
    } else if diff > Decimal::ZERO {
        Insight::new(
            InsightCategory::Opportunity,
            "growth_differential",
            "Rents outpacing expenses",
            format!(
                "Rent growth of {} against {} expense growth widens margins each year.",
                fmt_pct(s.rent_growth_pct),
                fmt_pct(s.expense_growth_pct)
            ),
            Some(fmt_pct(diff)),
        )
    } else {
        return Ok(Vec::new());
    };
    Ok(vec![insight])
}

fn exit_cap(ctx: &InsightContext) -> ProformaResult<Vec<Insight>> {
    let exit = ctx.snapshot.exit_cap_rate_pct;
    let entry = ctx.returns.cap_rate;

    if ctx.returns.exit_value.is_none() {
        return Ok(vec![Insight::new(
            InsightCategory::Sensitivity,
            "exit_cap",
            "No sale value modeled",
            "Exit cap rate is not positive, so returns exclude any reversion at sale.",
            None,
        )]);
    }
    if exit < entry {
        return Ok(vec![Insight::new(
            InsightCategory::Sensitivity,
            "exit_cap",
            "Exit assumes cap rate compression",
            format!(
                "Selling at a {} cap after buying at {} relies on market appreciation.",
                fmt_pct(exit),
                fmt_pct(entry)
            ),
            Some(fmt_pct(exit - entry)),
        )]);
    }
    if exit - entry >= dec!(0.5) {
        return Ok(vec![Insight::new(
            InsightCategory::Opportunity,
            "exit_cap",
            "Conservative exit assumption",
            format!(
                "Exit cap of {} sits above the {} going-in cap, leaving upside if markets hold.",
                fmt_pct(exit),
                fmt_pct(entry)
            ),
            Some(fmt_pct(exit - entry)),
        )]);
    }
    Ok(Vec::new())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmarks::benchmark_expenses;
    use crate::breakeven::compute_breakevens;
    use crate::projection::project;
    use crate::returns::summarize;
    use crate::sensitivity::sensitivity_set;
    use crate::snapshot::tests::sample_snapshot;
    use crate::snapshot::IncomeSource;
    use rust_decimal_macros::dec;

    fn run(snapshot: &AssumptionSnapshot, rules: &[InsightRule]) -> (Vec<Insight>, Vec<String>) {
        let config = EngineConfig::default();
        let projection = project(snapshot);
        let mut warnings = Vec::new();
        let returns = summarize(snapshot, &projection, &mut warnings);
        let breakevens = compute_breakevens(snapshot, &projection, 30);
        let sensitivity = sensitivity_set(snapshot).unwrap();
        let benchmarks = benchmark_expenses(snapshot, projection[1].effective_gross_income, &config);
        let ctx = InsightContext {
            snapshot,
            projection: &projection,
            returns: &returns,
            breakevens: &breakevens,
            sensitivity: &sensitivity,
            benchmarks: &benchmarks,
            config: &config,
        };
        let mut rule_warnings = Vec::new();
        let insights = evaluate_rules(rules, &ctx, &mut rule_warnings);
        (insights, rule_warnings)
    }

    fn run_rule(snapshot: &AssumptionSnapshot, id: &str) -> Vec<Insight> {
        let rule = RULES.iter().find(|r| r.id == id).unwrap();
        run(snapshot, std::slice::from_ref(rule)).0
    }

    fn with_unit_sqft(sqft: Decimal) -> AssumptionSnapshot {
        let mut s = sample_snapshot();
        if let IncomeSource::RentRoll { units } = &mut s.income {
            for u in units.iter_mut() {
                u.sqft = sqft;
            }
        }
        s
    }

    fn rule_ids(insights: &[Insight]) -> Vec<&str> {
        insights.iter().map(|i| i.rule.as_str()).collect()
    }

    #[test]
    fn test_fmt_money() {
        assert_eq!(fmt_money(dec!(1234567.4)), "$1,234,567");
        assert_eq!(fmt_money(dec!(999)), "$999");
        assert_eq!(fmt_money(dec!(-8040.40)), "-$8,040");
        assert_eq!(fmt_money(dec!(0)), "$0");
    }

    #[test]
    fn test_fmt_pct_and_multiple() {
        assert_eq!(fmt_pct(dec!(5.63814)), "5.64%");
        assert_eq!(fmt_multiple(dec!(0.941617)), "0.94x");
    }

    #[test]
    fn test_sample_insights_ordered_by_priority() {
        let (insights, warnings) = run(&sample_snapshot(), RULES);
        assert!(warnings.is_empty());
        assert_eq!(
            rule_ids(&insights),
            vec![
                "debt_coverage",
                "negative_leverage",
                "breakeven_occupancy",
                "rate_cushion",
                "years_to_positive",
                "growth_differential",
            ]
        );
        assert!(insights
            .windows(2)
            .all(|w| w[0].category <= w[1].category));
    }

    #[test]
    fn test_cash_deal_insights() {
        let mut s = sample_snapshot();
        s.down_payment_pct = dec!(100);
        let (insights, _) = run(&s, RULES);
        let ids = rule_ids(&insights);
        assert!(ids.contains(&"financing_structure"));
        assert!(!ids.contains(&"debt_coverage"));
        assert!(!ids.contains(&"negative_leverage"));
        assert!(!ids.contains(&"rate_cushion"));
        assert!(!ids.contains(&"years_to_positive"));
    }

    #[test]
    fn test_failing_rule_does_not_block_others() {
        fn broken(_: &InsightContext) -> ProformaResult<Vec<Insight>> {
            Err(ProformaError::InsufficientData("no data".into()))
        }
        let rules = [
            InsightRule { id: "broken", evaluate: broken },
            InsightRule { id: "debt_coverage", evaluate: debt_coverage },
        ];
        let (insights, warnings) = run(&sample_snapshot(), &rules);
        assert_eq!(rule_ids(&insights), vec!["debt_coverage"]);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("broken"));
    }

    #[test]
    fn test_expense_outlier_insight() {
        let mut s = sample_snapshot();
        s.operating_expenses.insert("insurance".into(), dec!(30000));
        let (insights, _) = run(&s, RULES);
        let outlier = insights
            .iter()
            .find(|i| i.rule == "expense_outliers")
            .unwrap();
        assert_eq!(outlier.category, InsightCategory::Outlier);
        assert_eq!(outlier.value.as_deref(), Some("$2,500"));
    }

    #[test]
    fn test_high_tax_rate_flagged() {
        let mut s = sample_snapshot();
        s.operating_expenses.insert("taxes".into(), dec!(60000));
        let (insights, _) = run(&s, RULES);
        assert!(insights.iter().any(|i| i.rule == "effective_tax_rate"));
    }

    #[test]
    fn test_expenses_outpacing_rents() {
        let mut s = sample_snapshot();
        s.rent_growth_pct = dec!(2);
        s.expense_growth_pct = dec!(3);
        let (insights, _) = run(&s, RULES);
        let growth = insights
            .iter()
            .find(|i| i.rule == "growth_differential")
            .unwrap();
        assert_eq!(growth.category, InsightCategory::Sensitivity);
        // Negative growth spread means cash flow never recovers
        let recovery = insights
            .iter()
            .find(|i| i.rule == "years_to_positive")
            .unwrap();
        assert_eq!(recovery.category, InsightCategory::Critical);
    }

    #[test]
    fn test_high_leverage_flagged() {
        let mut s = sample_snapshot();
        s.down_payment_pct = dec!(20);
        let found = run_rule(&s, "financing_structure");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category, InsightCategory::Sensitivity);
        assert_eq!(found[0].title, "High leverage");
        assert_eq!(found[0].value.as_deref(), Some("80.00%"));

        // 75% loan-to-value is unremarkable
        assert!(run_rule(&sample_snapshot(), "financing_structure").is_empty());
    }

    #[test]
    fn test_thin_leverage_spread() {
        let mut s = sample_snapshot();
        s.interest_rate_pct = dec!(5);
        let found = run_rule(&s, "leverage_spread");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category, InsightCategory::Sensitivity);
        assert_eq!(found[0].value.as_deref(), Some("0.64%"));

        // Negative spread belongs to negative_leverage, a wide one to nobody
        assert!(run_rule(&sample_snapshot(), "leverage_spread").is_empty());
        s.interest_rate_pct = dec!(4);
        assert!(run_rule(&s, "leverage_spread").is_empty());
    }

    #[test]
    fn test_rate_cushion_branches() {
        // Breakeven scan lands on 6.5% regardless of the contract rate
        let none = run_rule(&sample_snapshot(), "rate_cushion");
        assert_eq!(none[0].title, "No interest rate cushion");
        assert_eq!(none[0].value.as_deref(), Some("6.50%"));

        let mut s = sample_snapshot();
        s.interest_rate_pct = dec!(5.5);
        let thin = run_rule(&s, "rate_cushion");
        assert_eq!(thin[0].title, "Thin interest rate cushion");
        assert_eq!(thin[0].category, InsightCategory::Sensitivity);
        assert_eq!(thin[0].value.as_deref(), Some("1.00%"));

        s.interest_rate_pct = dec!(4.5);
        let comfortable = run_rule(&s, "rate_cushion");
        assert_eq!(comfortable[0].title, "Comfortable interest rate cushion");
        assert_eq!(comfortable[0].category, InsightCategory::Opportunity);
        assert_eq!(comfortable[0].value.as_deref(), Some("2.00%"));
    }

    #[test]
    fn test_rate_cushion_covered_at_any_rate() {
        let mut s = sample_snapshot();
        s.down_payment_pct = dec!(90);
        let found = run_rule(&s, "rate_cushion");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "Debt service covered at any scanned rate");
        assert_eq!(found[0].category, InsightCategory::Opportunity);
        assert_eq!(found[0].value, None);
    }

    #[test]
    fn test_price_per_sqft_classifications() {
        // 2.3M over 1,200 sqft
        let outlier = run_rule(&with_unit_sqft(dec!(100)), "price_per_sqft");
        assert_eq!(outlier[0].category, InsightCategory::Outlier);
        assert_eq!(outlier[0].value.as_deref(), Some("$1,917"));

        // 2.3M over 4,800 sqft = $479, between 350 and 525
        let high = run_rule(&with_unit_sqft(dec!(400)), "price_per_sqft");
        assert_eq!(high[0].category, InsightCategory::Benchmark);
        assert_eq!(high[0].title, "Price per square foot above market");

        // 2.3M over 42,000 sqft = $55, between 50 and 75
        let low = run_rule(&with_unit_sqft(dec!(3500)), "price_per_sqft");
        assert_eq!(low[0].category, InsightCategory::Benchmark);
        assert_eq!(low[0].title, "Price per square foot below market");

        assert!(run_rule(&sample_snapshot(), "price_per_sqft").is_empty());
        assert!(run_rule(&with_unit_sqft(Decimal::ZERO), "price_per_sqft").is_empty());
    }

    #[test]
    fn test_exit_cap_branches() {
        let mut s = sample_snapshot();
        s.exit_cap_rate_pct = Decimal::ZERO;
        let none = run_rule(&s, "exit_cap");
        assert_eq!(none[0].title, "No sale value modeled");

        s.exit_cap_rate_pct = dec!(5);
        let compression = run_rule(&s, "exit_cap");
        assert_eq!(compression[0].title, "Exit assumes cap rate compression");
        assert_eq!(compression[0].value.as_deref(), Some("-0.64%"));

        s.exit_cap_rate_pct = dec!(7);
        let conservative = run_rule(&s, "exit_cap");
        assert_eq!(conservative[0].category, InsightCategory::Opportunity);
        assert_eq!(conservative[0].value.as_deref(), Some("1.36%"));

        // 6% exit against a 5.64% entry is within half a point
        assert!(run_rule(&sample_snapshot(), "exit_cap").is_empty());
    }

    #[test]
    fn test_years_to_positive_reads_projection() {
        // The blended-growth estimate says 13 years; the line items recover by year 3
        let sample = run_rule(&sample_snapshot(), "years_to_positive");
        assert_eq!(sample[0].value.as_deref(), Some("13 years"));
        assert!(
            sample[0].detail.contains("positive cash flow in year 3"),
            "{}",
            sample[0].detail
        );

        let mut s = sample_snapshot();
        s.hold_period_years = 1;
        let beyond = run_rule(&s, "years_to_positive");
        assert!(beyond[0].detail.contains("beyond the 1-year hold"), "{}", beyond[0].detail);

        let mut s = sample_snapshot();
        s.rent_growth_pct = dec!(10);
        let found = run_rule(&s, "years_to_positive");
        assert!(
            found[0].detail.contains("positive cash flow in year 2"),
            "{}",
            found[0].detail
        );
    }
}
