//! Command-line interface for wxdoc.
//!
//! Turns a decrypted chat store into monthly Word transcripts and prints
//! conversation statistics as text or JSON.

#![deny(missing_docs, unsafe_code)]

/// CLI command definitions and parsing.
pub mod commands;

/// CLI application entry point and configuration.
pub mod app;

/// Error types for CLI operations.
pub mod error;
