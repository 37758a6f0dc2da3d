use thiserror::Error;
use wxdoc_wechat::WeChatError;

/// Errors that can occur while computing statistics.
#[derive(Error, Debug)]
pub enum AnalysisError {
    /// Store access error.
    #[error(transparent)]
    WeChat(#[from] WeChatError),
    /// Window or configuration error.
    #[error(transparent)]
    Core(#[from] wxdoc_core::Error),
    /// I/O operation error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Chart rendering error.
    #[error("Chart error: {0}")]
    Chart(String),
    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for analysis operations.
pub type AnalysisResult<T> = Result<T, AnalysisError>;
