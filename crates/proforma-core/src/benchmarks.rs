//! Expense benchmarking against per-unit industry bands.

use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::config::{BenchmarkBand, EngineConfig};
use crate::projection::operating_lines;
use crate::snapshot::AssumptionSnapshot;
use crate::types::{safe_div, with_metadata, ComputationOutput, Money, Percent};
use crate::ProformaResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Low,
    Normal,
    High,
    Outlier,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkEntry {
    pub category: String,
    pub annual_amount: Money,
    pub per_unit: Money,
    pub pct_of_egi: Percent,
    pub band: BenchmarkBand,
    pub classification: Classification,
}

/// Place a value against a band. Outliers sit beyond `high * multiplier`
/// or below `low / multiplier`.
pub fn classify(value: Decimal, band: &BenchmarkBand) -> Classification {
    let multiplier = band.outlier_multiplier.max(Decimal::ONE);
    let above_ceiling = band
        .high
        .checked_mul(multiplier)
        .is_some_and(|ceiling| value > ceiling);
    if above_ceiling || value < band.low / multiplier {
        Classification::Outlier
    } else if value > band.high {
        Classification::High
    } else if value < band.low {
        Classification::Low
    } else {
        Classification::Normal
    }
}

/// Compare each benchmarked category present in the snapshot's expenses
/// with its band. Categories without a band, or missing from the snapshot,
/// are skipped.
pub fn benchmark_expenses(
    snapshot: &AssumptionSnapshot,
    egi: Money,
    config: &EngineConfig,
) -> Vec<BenchmarkEntry> {
    let units = Decimal::from(snapshot.unit_count() as u64);

    config
        .benchmarks
        .iter()
        .filter_map(|(category, band)| {
            let annual = snapshot
                .operating_expenses
                .iter()
                .find(|(k, _)| k.trim().eq_ignore_ascii_case(category))
                .map(|(_, v)| *v)?;
            let per_unit = safe_div(annual, units);
            Some(BenchmarkEntry {
                category: category.clone(),
                annual_amount: annual,
                per_unit,
                pct_of_egi: safe_div(annual, egi) * dec!(100),
                band: band.clone(),
                classification: classify(per_unit, band),
            })
        })
        .collect()
}

/// Validate a snapshot and benchmark its year-one expenses.
pub fn run_benchmarks(
    snapshot: &AssumptionSnapshot,
    config: &EngineConfig,
) -> ProformaResult<ComputationOutput<Vec<BenchmarkEntry>>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    snapshot.validate(&mut warnings)?;
    config.validate()?;

    let egi = operating_lines(snapshot, 0, snapshot.vacancy_pct).egi;
    let entries = benchmark_expenses(snapshot, egi, config);
    for category in config.benchmarks.keys() {
        if !entries.iter().any(|e| &e.category == category) {
            warnings.push(format!("No '{category}' expense provided; not benchmarked"));
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Per-Unit Expense Benchmarking",
        &config.benchmarks,
        warnings,
        elapsed,
        entries,
    ))
}
