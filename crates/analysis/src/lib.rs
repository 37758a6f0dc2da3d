//! Descriptive conversation statistics for wxdoc.
//!
//! Every job is an independent query plus a linear scan over the result:
//! phrase counts, summed call durations, late-night activity and a
//! per-interval message count with its line chart.

#![deny(missing_docs, unsafe_code)]

/// Error types for analysis operations.
pub mod error;

/// Phrase, call and night-activity jobs.
pub mod stats;

/// Interval counts and the SVG chart.
pub mod timeline;

pub use error::{AnalysisError, AnalysisResult};
pub use stats::{CallTime, NightActivity, PhraseUsage, Statistics};
pub use timeline::{render_timeline_svg, Timeline, TimelinePoint};
