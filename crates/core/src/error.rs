//! Error types shared by the wxdoc crates.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for wxdoc.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// A config file could not be read or written.
    #[error("Config file {path}: {source}")]
    ConfigFile {
        /// File that failed.
        path: PathBuf,
        /// Underlying failure.
        source: std::io::Error,
    },
    /// Malformed TOML.
    #[error("Invalid config: {0}")]
    ConfigSyntax(#[from] toml::de::Error),
    /// Config could not be serialized.
    #[error("Config serialization failed: {0}")]
    ConfigWrite(#[from] toml::ser::Error),
    /// Date, month or time text did not parse.
    #[error("Parse error: {0}")]
    Parse(String),
    /// A value is out of range.
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type for wxdoc operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}
