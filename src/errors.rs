// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

use crate::hub::Topic;

#[derive(Error, Debug)]
pub enum QuickscopeError {
    /// A public operation was called with a missing or empty argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The dependency resolver could not read or parse a file.
    #[error("Failed to resolve dependencies of {path:?}: {source}")]
    ParseFailure {
        path: PathBuf,
        #[source]
        source: anyhow::Error,
    },

    /// A target-as-dependency node was asked to serve a second target.
    #[error(
        "Dependency {dependency:?} is already a target; it cannot also be a dependency of {target:?}"
    )]
    TargetConflict { dependency: PathBuf, target: PathBuf },

    /// A bus handler reached a component that is still publishing.
    #[error("Handler for {0} re-entered a component that is still publishing")]
    Reentrant(Topic),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("File watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("Command exited with code {0}")]
    RunFailed(i32),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl QuickscopeError {
    pub fn parse_failure(path: impl Into<PathBuf>, source: impl Into<anyhow::Error>) -> Self {
        QuickscopeError::ParseFailure {
            path: path.into(),
            source: source.into(),
        }
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, QuickscopeError>;
