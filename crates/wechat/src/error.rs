//! Error types for WeChat store access and side-file handling.

use thiserror::Error;

/// Main error type for WeChat operations.
#[derive(Error, Debug)]
pub enum WeChatError {
    /// I/O error (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// A store file is missing or lacks the expected tables
    #[error("Invalid message store: {0}")]
    Store(String),

    /// No contact carries the requested label
    #[error("No contact labelled '{0}'")]
    UnknownContact(String),

    /// Side-file could not be located
    #[error("Side-file not found: {0}")]
    SideFileMissing(String),

    /// Remote fetch failed or is disabled
    #[error("Remote fetch failed: {0}")]
    Remote(String),

    /// ffmpeg ran but did not produce output
    #[error("Transcoding failed: {0}")]
    Transcode(String),

    /// Other errors wrapped in anyhow
    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<reqwest::Error> for WeChatError {
    fn from(err: reqwest::Error) -> Self {
        WeChatError::Remote(err.to_string())
    }
}

/// Result alias for WeChat operations.
pub type WeChatResult<T> = Result<T, WeChatError>;
