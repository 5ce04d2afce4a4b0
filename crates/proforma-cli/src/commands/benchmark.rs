use clap::Args;
use serde_json::Value;

use proforma_core::benchmarks;
use proforma_core::snapshot::AssumptionSnapshot;

use crate::input;

/// Arguments for expense benchmarking
#[derive(Args)]
pub struct BenchmarkArgs {
    /// Path to the assumption snapshot (JSON or YAML)
    #[arg(long)]
    pub input: Option<String>,

    /// Engine configuration file with regional benchmark bands
    #[arg(long)]
    pub config: Option<String>,
}

pub fn run_benchmark(args: BenchmarkArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let snapshot: AssumptionSnapshot = input::read_input(args.input.as_deref(), "benchmarking")?;
    let config = input::read_config(args.config.as_deref())?;
    let result = benchmarks::run_benchmarks(&snapshot, &config)?;
    Ok(serde_json::to_value(result)?)
}
