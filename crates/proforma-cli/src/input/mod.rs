pub mod file;
pub mod stdin;

use serde::de::DeserializeOwned;
use tracing::debug;

use proforma_core::config::EngineConfig;

/// Read a command's input from `--input`, falling back to piped stdin.
pub fn read_input<T: DeserializeOwned>(
    path: Option<&str>,
    what: &str,
) -> Result<T, Box<dyn std::error::Error>> {
    if let Some(path) = path {
        debug!(path, what, "reading input file");
        file::read_structured(path)
    } else if let Some(data) = stdin::read_stdin()? {
        debug!(what, "reading input from stdin");
        Ok(serde_json::from_value(data)?)
    } else {
        Err(format!("--input <file.json> or stdin required for {what}").into())
    }
}

/// Engine configuration from `--config`, or the built-in tables.
pub fn read_config(path: Option<&str>) -> Result<EngineConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => {
            debug!(path, "loading engine configuration");
            file::read_structured(path)
        }
        None => Ok(EngineConfig::default()),
    }
}
