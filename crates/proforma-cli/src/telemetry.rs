//! Diagnostics for the `proforma` binary.
//!
//! The engine reports solver progress, IRR non-convergence and skipped
//! insight rules through `tracing`. This module decides which of those reach
//! stderr; stdout stays reserved for the formatted result so it can be piped.

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Warnings only: non-convergent IRR and skipped insight rules.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid --log-level '{directive}': {source}")]
    Directive {
        directive: String,
        #[source]
        source: ParseError,
    },

    #[error("could not install log subscriber: {0}")]
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

/// Filter directive in effect: a non-empty `RUST_LOG`, then `--log-level`,
/// then [`DEFAULT_LOG_LEVEL`].
pub fn resolve_directive(rust_log: Option<&str>, log_level: Option<&str>) -> String {
    rust_log
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .or(log_level)
        .unwrap_or(DEFAULT_LOG_LEVEL)
        .to_string()
}

/// Install the stderr subscriber for this run.
pub fn init(log_level: Option<&str>) -> Result<(), TelemetryError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let directive = resolve_directive(rust_log.as_deref(), log_level);
    let filter = EnvFilter::try_new(&directive)
        .map_err(|source| TelemetryError::Directive { directive, source })?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .with_target(false)
        .compact()
        .try_init()
        .map_err(TelemetryError::Subscriber)
}
