//! Core types, errors, and configuration for wxdoc
//!
//! This crate provides the message record model, the type-tag table and the
//! time-window helpers shared by the store, export and analysis crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod types;
pub mod window;

// Re-exports for convenience
pub use config::WxdocConfig;
pub use error::{Error, Result};
pub use types::*;
pub use window::ExportWindow;
