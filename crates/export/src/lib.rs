//! Monthly conversation transcripts for wxdoc.
//!
//! Records fetched for one contact and one calendar month are sequenced
//! into timestamp separators and speaker-change spacing, drawn by per-kind
//! renderers into an in-memory [`Transcript`], and packed into a `.docx`
//! next to folders holding the copied voice notes, files and videos.

#![deny(missing_docs)]
#![warn(unsafe_code)]

pub mod assembler;
pub mod docx;
pub mod document;
pub mod error;
pub mod render;
pub mod workdir;

pub use assembler::{Exporter, MonthSummary, Sequencer, TranscriptOutcome};
pub use docx::{write_docx, Avatars};
pub use document::{Align, Block, Bubble, Line, Picture, Span, TextStyle, Transcript};
pub use error::{ExportError, ExportResult};
pub use render::{Dispatch, RenderContext, Renderer, RendererRegistry};
pub use workdir::WorkDirs;
