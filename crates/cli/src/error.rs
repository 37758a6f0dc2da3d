//! Error types for CLI operations.

use thiserror::Error;

/// Main error type for CLI operations.
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Core library error.
    #[error(transparent)]
    Core(#[from] wxdoc_core::Error),

    /// Export failed during setup or document save.
    #[error("Export error: {0}")]
    Export(#[from] wxdoc_export::ExportError),

    /// Statistics job failed.
    #[error("Analysis error: {0}")]
    Analysis(#[from] wxdoc_analysis::AnalysisError),

    /// Output serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid argument error.
    #[error("Invalid argument: {0}")]
    Argument(String),
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;
