//! Error types for helmwork-command.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while building or running a helm invocation.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A declared value file is missing or is not a YAML mapping.
    #[error("value source {path} is unreadable: {reason}")]
    SourceUnreadable { path: PathBuf, reason: String },

    /// A required positional argument resolved to nothing.
    #[error("`{subcommand}` requires a value for <{argument}>")]
    MissingRequiredArgument {
        subcommand: String,
        argument: String,
    },

    /// The process ran and exited unsuccessfully. `stderr` is passed through verbatim.
    #[error("`{command}` failed ({status}): {stderr}")]
    ExternalProcess {
        command: String,
        status: String,
        stderr: String,
    },

    /// The process could not be started at all.
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (materialized values files).
    #[error("values serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Convenience constructor for [`CommandError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CommandError {
    CommandError::Io {
        path: path.into(),
        source,
    }
}
