mod commands;
mod input;
mod output;
mod telemetry;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::analyze::AnalyzeArgs;
use commands::benchmark::BenchmarkArgs;
use commands::financing::{BreakevenRateArgs, IrrArgs, PaymentArgs};
use commands::projection::{ProjectArgs, ReturnsArgs};
use commands::sensitivity::SensitivityArgs;

/// Real-estate acquisition underwriting
#[derive(Parser)]
#[command(
    name = "proforma",
    version,
    about = "Real-estate acquisition underwriting",
    long_about = "Underwrite an income-property purchase from one set of assumptions: \
                  multi-year projection, cap rate, DSCR, cash-on-cash, IRR, breakevens, \
                  sensitivity grids, expense benchmarks, narrative insights and a letter grade. \
                  All arithmetic uses decimal precision."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log filter when RUST_LOG is unset (e.g. "debug", "proforma_core=trace")
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Full underwriting analysis with insights and score
    Analyze(AnalyzeArgs),
    /// Year-by-year operating projection and amortization
    Project(ProjectArgs),
    /// Returns summary: ratios, disposition, IRR, equity multiple
    Returns(ReturnsArgs),
    /// Level monthly mortgage payment
    Payment(PaymentArgs),
    /// Interest rate at which debt service consumes NOI
    BreakevenRate(BreakevenRateArgs),
    /// IRR and NPV of a cash-flow series
    Irr(IrrArgs),
    /// Interest rate, vacancy and price sensitivity grids
    Sensitivity(SensitivityArgs),
    /// Per-unit expense benchmarking
    Benchmark(BenchmarkArgs),
    /// Print the built-in engine configuration as YAML
    DefaultConfig,
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = telemetry::init(cli.log_level.as_deref()) {
        eprintln!("{}: {}", "error".red().bold(), e);
        process::exit(1);
    }

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Analyze(args) => commands::analyze::run_analyze(args),
        Commands::Project(args) => commands::projection::run_project(args),
        Commands::Returns(args) => commands::projection::run_returns(args),
        Commands::Payment(args) => commands::financing::run_payment(args),
        Commands::BreakevenRate(args) => commands::financing::run_breakeven_rate(args),
        Commands::Irr(args) => commands::financing::run_irr(args),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args),
        Commands::Benchmark(args) => commands::benchmark::run_benchmark(args),
        Commands::DefaultConfig => {
            match serde_yaml::to_string(&proforma_core::EngineConfig::default()) {
                Ok(yaml) => {
                    print!("{}", yaml);
                    return;
                }
                Err(e) => Err(e.into()),
            }
        }
        Commands::Version => {
            println!("proforma {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
