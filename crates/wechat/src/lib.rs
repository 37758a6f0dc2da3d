//! WeChat message store access for wxdoc.
//!
//! This crate provides functionality for:
//! - Reading records from a decrypted message store with bound parameters
//! - Resolving avatars, pictures, stickers, voice notes and videos from an
//!   indexed copy of the app's media tree
//! - Extracting fields from the heterogeneous payload markup
//! - Fetching missing stickers and card icons over HTTP
//! - Transcoding voice notes with ffmpeg

#![deny(missing_docs)]
#![warn(unsafe_code)]

pub mod audio;
pub mod call;
pub mod error;
pub mod markup;
pub mod media;
pub mod notice;
pub mod quote;
pub mod remote;
pub mod store;

pub use call::CallOutcome;
pub use error::{WeChatError, WeChatResult};
pub use media::{MediaLibrary, SideFileIndex, VideoFiles};
pub use quote::{QuotedContent, ReplyParts};
pub use remote::{HttpFetcher, Offline, RemoteFetch};
pub use store::{CallRow, MessageStore, TimeScope, TimedText};
