//! Error types for helmwork-core.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration errors. All of these are fatal and surface before any unit executes.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure (file not found, permission denied, etc.).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse project file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The project file did not exist at the expected path.
    #[error("project file not found at {path}")]
    ProjectNotFound { path: PathBuf },

    /// An entity name that cannot produce a conventional task name.
    #[error("invalid {kind} name '{name}'")]
    InvalidName { kind: &'static str, name: String },

    /// Two entities of the same kind map to the same conventional task name.
    #[error("{kind} names '{first}' and '{second}' produce the same task name")]
    NameCollision {
        kind: &'static str,
        first: String,
        second: String,
    },

    /// An entity of the same kind is already declared under this name.
    #[error("{kind} '{name}' is declared twice")]
    DuplicateName { kind: &'static str, name: String },

    /// A chart reference that does not name a declared chart.
    #[error("'{referenced_by}' references unknown chart '{chart}'")]
    UnknownChart { referenced_by: String, chart: String },

    /// A user task alias that would shadow or loop back into a library task.
    #[error("task alias '{alias}' is invalid: {reason}")]
    AliasConflict { alias: String, reason: String },

    /// Linking a config node to a parent would make it its own ancestor.
    #[error("config node parent chain would form a cycle")]
    ParentCycle,
}
