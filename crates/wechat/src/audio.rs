//! Voice-note transcoding through an external `ffmpeg`.
//!
//! Voice notes are stored under an `.amr` name but most are SILK streams;
//! the header decides which demuxer ffmpeg is told to use.

use crate::error::{WeChatError, WeChatResult};
use anyhow::Context;
use std::ffi::OsString;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

const SILK_MAGIC: &[u8] = b"#!SILK";
const DEFAULT_FFMPEG: &str = "ffmpeg";

/// MP3 output settings.
#[derive(Debug, Clone)]
pub struct AudioTranscodeOptions {
    /// Bitrate in kbps.
    pub bitrate_kbps: u32,
    /// Sample rate in Hz.
    pub sample_rate_hz: u32,
    /// Output channels.
    pub channels: u8,
    /// Replace an existing output file.
    pub overwrite: bool,
    /// ffmpeg to run instead of the one on `PATH`.
    pub ffmpeg_binary: Option<PathBuf>,
}

impl Default for AudioTranscodeOptions {
    fn default() -> Self {
        Self {
            bitrate_kbps: 64,
            sample_rate_hz: 24_000,
            channels: 1,
            overwrite: true,
            ffmpeg_binary: None,
        }
    }
}

impl AudioTranscodeOptions {
    fn binary(&self) -> &Path {
        self.ffmpeg_binary
            .as_deref()
            .unwrap_or_else(|| Path::new(DEFAULT_FFMPEG))
    }

    /// Arguments turning `input` into an MP3 at `output`.
    fn ffmpeg_args(&self, input: &Path, output: &Path, silk: bool) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "error"]
            .iter()
            .map(OsString::from)
            .collect();
        args.push(OsString::from(if self.overwrite { "-y" } else { "-n" }));
        if silk {
            args.extend(["-f", "silk"].map(OsString::from));
        }
        args.push("-i".into());
        args.push(input.into());
        args.extend(
            [
                "-ac".to_string(),
                self.channels.to_string(),
                "-ar".to_string(),
                self.sample_rate_hz.to_string(),
                "-b:a".to_string(),
                format!("{}k", self.bitrate_kbps),
                "-codec:a".to_string(),
                "libmp3lame".to_string(),
            ]
            .map(OsString::from),
        );
        args.push(output.into());
        args
    }
}

/// Transcode the voice note at `input` to `output`.
pub fn transcode_voice_to_mp3(
    input: &Path,
    output: &Path,
    options: &AudioTranscodeOptions,
) -> WeChatResult<()> {
    if !input.is_file() {
        return Err(WeChatError::SideFileMissing(input.display().to_string()));
    }
    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let silk = read_header(input).map_or(false, |header| is_silk_header(&header));
    let binary = options.binary();
    debug!(
        "transcoding {} ({}) with {}",
        input.display(),
        if silk { "silk" } else { "amr" },
        binary.display()
    );
    let result = Command::new(binary)
        .args(options.ffmpeg_args(input, output, silk))
        .output()
        .with_context(|| format!("failed to start {}", binary.display()))?;

    if result.status.success() {
        return Ok(());
    }
    let status = result
        .status
        .code()
        .map_or_else(|| "signal".to_string(), |code| code.to_string());
    Err(WeChatError::Transcode(format!(
        "ffmpeg exited with {}: {}",
        status,
        String::from_utf8_lossy(&result.stderr).trim()
    )))
}

/// Whether `ffmpeg -version` runs successfully.
pub fn has_ffmpeg(ffmpeg_binary: Option<&Path>) -> bool {
    Command::new(ffmpeg_binary.unwrap_or_else(|| Path::new(DEFAULT_FFMPEG)))
        .arg("-version")
        .output()
        .map_or(false, |out| out.status.success())
}

/// Whether the header carries the SILK magic, optionally behind the app's
/// leading `0x02` byte.
pub fn is_silk_header(header: &[u8]) -> bool {
    let body = match header.first() {
        Some(0x02) => &header[1..],
        _ => header,
    };
    body.starts_with(SILK_MAGIC)
}

fn read_header(path: &Path) -> Option<Vec<u8>> {
    let mut header = Vec::with_capacity(10);
    File::open(path)
        .and_then(|file| file.take(10).read_to_end(&mut header))
        .ok()?;
    Some(header)
}
