use clap::{Args, ValueEnum};
use serde_json::Value;

use proforma_core::sensitivity::{self, SensitivityDimension};
use proforma_core::snapshot::AssumptionSnapshot;

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Dimension {
    Rate,
    Vacancy,
    Price,
}

impl From<Dimension> for SensitivityDimension {
    fn from(d: Dimension) -> Self {
        match d {
            Dimension::Rate => SensitivityDimension::InterestRate,
            Dimension::Vacancy => SensitivityDimension::Vacancy,
            Dimension::Price => SensitivityDimension::PurchasePrice,
        }
    }
}

/// Arguments for single-variable sensitivity grids
#[derive(Args)]
pub struct SensitivityArgs {
    /// Path to the assumption snapshot (JSON or YAML)
    #[arg(long)]
    pub input: Option<String>,

    /// Report a single grid instead of all three
    #[arg(long)]
    pub dimension: Option<Dimension>,
}

pub fn run_sensitivity(args: SensitivityArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot: AssumptionSnapshot = input::read_input(args.input.as_deref(), "sensitivity")?;
    let result = sensitivity::run_sensitivity(&snapshot)?;

    match args.dimension {
        Some(d) => {
            let wanted = SensitivityDimension::from(d);
            let grid = result.map(|set| match wanted {
                SensitivityDimension::InterestRate => set.interest_rate,
                SensitivityDimension::Vacancy => set.vacancy,
                SensitivityDimension::PurchasePrice => set.purchase_price,
            });
            Ok(serde_json::to_value(grid)?)
        }
        None => Ok(serde_json::to_value(result)?),
    }
}
