use clap::Args;
use serde_json::Value;

use proforma_core::projection;
use proforma_core::returns;
use proforma_core::snapshot::AssumptionSnapshot;

use crate::input;

/// Arguments for the operating projection
#[derive(Args)]
pub struct ProjectArgs {
    /// Path to the assumption snapshot (JSON or YAML)
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for the returns summary
#[derive(Args)]
pub struct ReturnsArgs {
    /// Path to the assumption snapshot (JSON or YAML)
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_project(args: ProjectArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot: AssumptionSnapshot = input::read_input(args.input.as_deref(), "projection")?;
    let result = projection::project_cash_flows(&snapshot)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_returns(args: ReturnsArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot: AssumptionSnapshot = input::read_input(args.input.as_deref(), "returns")?;
    let result = returns::calculate_returns(&snapshot)?;
    Ok(serde_json::to_value(result)?)
}
