use thiserror::Error;

use helmwork_command::CommandError;
use helmwork_core::ConfigError;

/// Error surface for planning and execution.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unknown task `{name}`{}", required_by_suffix(.required_by))]
    UnknownUnit {
        name: String,
        required_by: Option<String>,
    },

    #[error("dependency cycle: {path}")]
    Cycle { path: String },

    #[error("task `{unit}` failed: {source}")]
    UnitFailed {
        unit: String,
        #[source]
        source: CommandError,
    },

    #[error("task `{unit}` panicked: {message}")]
    UnitPanicked { unit: String, message: String },

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("runtime error: {0}")]
    Runtime(String),
}

fn required_by_suffix(required_by: &Option<String>) -> String {
    match required_by {
        Some(parent) => format!(" (required by `{parent}`)"),
        None => String::new(),
    }
}
