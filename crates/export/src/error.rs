//! Error types for transcript export.

use thiserror::Error;
use wxdoc_wechat::WeChatError;

/// Errors raised while exporting transcripts.
#[derive(Error, Debug)]
pub enum ExportError {
    /// I/O error (output folders, side-file copies)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Store, side-file or remote error
    #[error(transparent)]
    WeChat(#[from] WeChatError),

    /// Core configuration or window error
    #[error(transparent)]
    Core(#[from] wxdoc_core::Error),

    /// Picture bytes could not be decoded
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// The document could not be packed
    #[error("Document error: {0}")]
    Document(String),
}

/// Result alias for export operations.
pub type ExportResult<T> = Result<T, ExportError>;
