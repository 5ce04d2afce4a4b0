pub mod error;
pub mod time_value;
pub mod types;

pub mod amortization;
pub mod analysis;
pub mod benchmarks;
pub mod breakeven;
pub mod config;
pub mod insights;
pub mod projection;
pub mod returns;
pub mod scoring;
pub mod sensitivity;
pub mod snapshot;

pub use analysis::{analyze, analyze_with_defaults, InvestmentAnalysis};
pub use config::EngineConfig;
pub use error::ProformaError;
pub use snapshot::AssumptionSnapshot;
pub use types::*;

/// Standard result type for all underwriting operations
pub type ProformaResult<T> = Result<T, ProformaError>;
