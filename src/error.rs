//! Error types for the bootstrap library.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can stop a bootstrap run.
#[derive(Debug, Error)]
pub enum Error {
    /// Required plain variables are absent. Placeholders have been appended.
    #[error("required variables are not set: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    /// Required plain variables are present but hold no value.
    #[error("required variables are empty: {}", .0.join(", "))]
    EmptyVariables(Vec<String>),

    /// The configuration cannot be used as given.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The delegated command could not be started.
    #[error("failed to start `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Names of the variables behind a missing/empty failure, if any.
    pub fn variables(&self) -> &[String] {
        match self {
            Self::MissingVariables(names) | Self::EmptyVariables(names) => names,
            _ => &[],
        }
    }
}
