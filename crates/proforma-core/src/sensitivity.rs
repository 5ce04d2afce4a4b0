use std::time::Instant;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ProformaError;
use crate::projection::{annual_debt_service, operating_lines};
use crate::returns::{cap_rate, cash_on_cash};
use crate::snapshot::AssumptionSnapshot;
use crate::types::*;
use crate::ProformaResult;

/// Which assumption a grid perturbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensitivityDimension {
    /// Interest rate, percentage points
    InterestRate,
    /// Vacancy, percentage points
    Vacancy,
    /// Purchase price change from the base, percent
    PurchasePrice,
}

/// Year-one figures at one perturbed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityPoint {
    pub value: Decimal,
    pub noi: Money,
    pub debt_service: Money,
    pub cash_flow: Money,
    pub dscr: Coverage,
    pub cap_rate: Percent,
    pub cash_on_cash: Percent,
    pub is_base_case: bool,
}

/// One single-variable grid; all other assumptions stay at the base case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityGrid {
    pub dimension: SensitivityDimension,
    pub variable: SensitivityVariable,
    pub base_value: Decimal,
    pub points: Vec<SensitivityPoint>,
}

impl SensitivityGrid {
    pub fn base_point(&self) -> Option<&SensitivityPoint> {
        self.points.iter().find(|p| p.is_base_case)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivitySet {
    pub interest_rate: SensitivityGrid,
    pub vacancy: SensitivityGrid,
    pub purchase_price: SensitivityGrid,
}

/// Generate the sweep values for a sensitivity variable from min to max with step.
fn generate_sweep_values(var: &SensitivityVariable) -> ProformaResult<Vec<Decimal>> {
    if var.step <= Decimal::ZERO {
        return Err(ProformaError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Step must be positive".into(),
        });
    }
    if var.min > var.max {
        return Err(ProformaError::InvalidInput {
            field: format!("variable:{}", var.name),
            reason: "Min must be <= max".into(),
        });
    }

    let mut values = Vec::new();
    let mut current = var.min;
    while current <= var.max {
        values.push(current);
        current += var.step;
    }
    // Ensure max is included if step doesn't land exactly on it
    if let Some(&last) = values.last() {
        if last < var.max {
            values.push(var.max);
        }
    }

    if values.is_empty() {
        values.push(var.min);
    }

    Ok(values)
}

/// Sweep values with the base value present, in ascending order.
fn sweep_with_base(var: &SensitivityVariable, base: Decimal) -> ProformaResult<Vec<Decimal>> {
    let mut values = generate_sweep_values(var)?;
    if !values.contains(&base) {
        let pos = values.partition_point(|v| *v < base);
        values.insert(pos, base);
    }
    Ok(values)
}

/// Year-one figures for a perturbed snapshot. Uses the same operating lines
/// and debt service as the projection, so the base case matches it exactly.
fn year_one_point(perturbed: &AssumptionSnapshot, value: Decimal, is_base_case: bool) -> SensitivityPoint {
    let lines = operating_lines(perturbed, 0, perturbed.vacancy_pct);
    let debt_service = annual_debt_service(perturbed);
    let cash_flow = lines.noi - debt_service;
    SensitivityPoint {
        value,
        noi: lines.noi,
        debt_service,
        cash_flow,
        dscr: Coverage::from_noi(lines.noi, debt_service),
        cap_rate: cap_rate(lines.noi, perturbed.purchase_price),
        cash_on_cash: cash_on_cash(cash_flow, perturbed.total_cash_required()),
        is_base_case,
    }
}

fn build_grid<F>(
    snapshot: &AssumptionSnapshot,
    dimension: SensitivityDimension,
    variable: SensitivityVariable,
    base_value: Decimal,
    perturb: F,
) -> ProformaResult<SensitivityGrid>
where
    F: Fn(Decimal) -> AssumptionSnapshot,
{
    let points = sweep_with_base(&variable, base_value)?
        .into_iter()
        .map(|v| {
            if v == base_value {
                year_one_point(snapshot, v, true)
            } else {
                year_one_point(&perturb(v), v, false)
            }
        })
        .collect();

    Ok(SensitivityGrid {
        dimension,
        variable,
        base_value,
        points,
    })
}

/// Rate grid: `max(4, base - 2)` to `base + 2` in half-point steps. Only debt
/// service moves.
pub fn rate_grid(snapshot: &AssumptionSnapshot) -> ProformaResult<SensitivityGrid> {
    let base = snapshot.interest_rate_pct;
    let variable = SensitivityVariable {
        name: "Interest Rate (%)".into(),
        min: (base - dec!(2)).max(dec!(4)).min(base),
        max: base + dec!(2),
        step: dec!(0.5),
    };
    build_grid(snapshot, SensitivityDimension::InterestRate, variable, base, |rate| {
        AssumptionSnapshot {
            interest_rate_pct: rate,
            ..snapshot.clone()
        }
    })
}

/// Vacancy grid: 0% to 15% in 2.5-point steps. EGI and the management fee
/// move; fixed expenses do not.
pub fn vacancy_grid(snapshot: &AssumptionSnapshot) -> ProformaResult<SensitivityGrid> {
    let variable = SensitivityVariable {
        name: "Vacancy (%)".into(),
        min: Decimal::ZERO,
        max: dec!(15),
        step: dec!(2.5),
    };
    build_grid(
        snapshot,
        SensitivityDimension::Vacancy,
        variable,
        snapshot.vacancy_pct,
        |vacancy| AssumptionSnapshot {
            vacancy_pct: vacancy,
            ..snapshot.clone()
        },
    )
}

/// Price grid: -15% to +15% in 5% steps. NOI is fixed; the loan, debt
/// service and required equity scale with price.
pub fn price_grid(snapshot: &AssumptionSnapshot) -> ProformaResult<SensitivityGrid> {
    let variable = SensitivityVariable {
        name: "Purchase Price Change (%)".into(),
        min: dec!(-15),
        max: dec!(15),
        step: dec!(5),
    };
    build_grid(
        snapshot,
        SensitivityDimension::PurchasePrice,
        variable,
        Decimal::ZERO,
        |change| AssumptionSnapshot {
            purchase_price: snapshot.purchase_price * (Decimal::ONE + pct_to_rate(change)),
            ..snapshot.clone()
        },
    )
}

/// All three grids.
pub fn sensitivity_set(snapshot: &AssumptionSnapshot) -> ProformaResult<SensitivitySet> {
    Ok(SensitivitySet {
        interest_rate: rate_grid(snapshot)?,
        vacancy: vacancy_grid(snapshot)?,
        purchase_price: price_grid(snapshot)?,
    })
}

/// Validate a snapshot and build its sensitivity grids.
pub fn run_sensitivity(
    snapshot: &AssumptionSnapshot,
) -> ProformaResult<ComputationOutput<SensitivitySet>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();
    snapshot.validate(&mut warnings)?;

    let output = sensitivity_set(snapshot)?;

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Single-Variable Sensitivity (rate, vacancy, price)",
        &serde_json::json!({
            "interest_rate_pct": snapshot.interest_rate_pct,
            "vacancy_pct": snapshot.vacancy_pct,
            "purchase_price": snapshot.purchase_price,
        }),
        warnings,
        elapsed,
        output,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::projection::project;
    use crate::snapshot::tests::sample_snapshot;
    use rust_decimal_macros::dec;

    #[test]
    fn test_sweep_values() {
        let var = SensitivityVariable {
            name: "test".into(),
            min: dec!(1),
            max: dec!(5),
            step: dec!(1),
        };
        let vals = generate_sweep_values(&var).unwrap();
        assert_eq!(vals, vec![dec!(1), dec!(2), dec!(3), dec!(4), dec!(5)]);
    }

    #[test]
    fn test_sweep_with_non_exact_step() {
        let var = SensitivityVariable {
            name: "test".into(),
            min: dec!(0),
            max: dec!(1),
            step: dec!(0.3),
        };
        let vals = generate_sweep_values(&var).unwrap();
        // 0, 0.3, 0.6, 0.9, 1.0 (max appended)
        assert_eq!(vals.len(), 5);
        assert_eq!(*vals.last().unwrap(), dec!(1));
    }

    #[test]
    fn test_invalid_step() {
        let var = SensitivityVariable {
            name: "bad".into(),
            min: dec!(0),
            max: dec!(1),
            step: dec!(0),
        };
        assert!(generate_sweep_values(&var).is_err());
    }

    #[test]
    fn test_rate_grid_range() {
        let grid = rate_grid(&sample_snapshot()).unwrap();
        let values: Vec<Decimal> = grid.points.iter().map(|p| p.value).collect();
        assert_eq!(values.first(), Some(&dec!(5)));
        assert_eq!(values.last(), Some(&dec!(9)));
        assert_eq!(values.len(), 9);
    }

    #[test]
    fn test_rate_grid_floor_at_four() {
        let mut s = sample_snapshot();
        s.interest_rate_pct = dec!(5);
        let grid = rate_grid(&s).unwrap();
        assert_eq!(grid.points[0].value, dec!(4));
    }

    #[test]
    fn test_rate_grid_keeps_base_below_floor() {
        let mut s = sample_snapshot();
        s.interest_rate_pct = dec!(3);
        let grid = rate_grid(&s).unwrap();
        assert_eq!(grid.points[0].value, dec!(3));
        assert!(grid.points[0].is_base_case);
    }

    #[test]
    fn test_rate_grid_nudges_only_debt_service() {
        let grid = rate_grid(&sample_snapshot()).unwrap();
        let noi = grid.points[0].noi;
        assert!(grid.points.iter().all(|p| p.noi == noi));
        for w in grid.points.windows(2) {
            assert!(w[1].debt_service > w[0].debt_service);
            assert!(w[1].cash_flow < w[0].cash_flow);
        }
    }

    #[test]
    fn test_base_points_reproduce_projection() {
        let s = sample_snapshot();
        let y1 = project(&s)[1].clone();
        let set = sensitivity_set(&s).unwrap();
        for grid in [&set.interest_rate, &set.vacancy, &set.purchase_price] {
            let base = grid.base_point().expect("base point present");
            assert_eq!(base.noi, y1.noi);
            assert_eq!(base.cash_flow, y1.cash_flow);
            assert_eq!(base.debt_service, y1.debt_service);
        }
    }

    #[test]
    fn test_vacancy_grid_inserts_off_step_base() {
        let mut s = sample_snapshot();
        s.vacancy_pct = dec!(4);
        let grid = vacancy_grid(&s).unwrap();
        let values: Vec<Decimal> = grid.points.iter().map(|p| p.value).collect();
        assert_eq!(values.len(), 8);
        assert_eq!(values[2], dec!(4));
        assert!(grid.points[2].is_base_case);
        assert!(values.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_vacancy_grid_moves_management_not_fixed() {
        let s = sample_snapshot();
        let grid = vacancy_grid(&s).unwrap();
        let zero = &grid.points[0];
        let fifteen = grid.points.last().unwrap();
        // 15 points of vacancy on 232899.96 GPI, less 5% management savings
        let expected_drop = dec!(232899.96) * dec!(0.15) * dec!(0.95);
        assert!(((zero.noi - fifteen.noi) - expected_drop).abs() < dec!(0.0001));
        assert_eq!(zero.debt_service, fifteen.debt_service);
    }

    #[test]
    fn test_price_grid_holds_noi() {
        let grid = price_grid(&sample_snapshot()).unwrap();
        assert_eq!(grid.points.len(), 7);
        let noi = grid.points[0].noi;
        assert!(grid.points.iter().all(|p| p.noi == noi));
        // Cheaper price: higher cap rate and cash-on-cash
        assert!(grid.points[0].cap_rate > grid.points[6].cap_rate);
        assert!(grid.points[0].cash_on_cash > grid.points[6].cash_on_cash);
    }

    #[test]
    fn test_run_sensitivity_envelope() {
        let out = run_sensitivity(&sample_snapshot()).unwrap();
        assert_eq!(out.result.vacancy.points.len(), 7);
        assert!(out.warnings.is_empty());
    }
}
