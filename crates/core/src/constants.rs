//! Application constants and configuration defaults.

/// Self-sent text shorter than this is right-aligned.
pub const DEFAULT_SHORT_MESSAGE_CHARS: usize = 20;

/// Gap that triggers a timestamp separator (3 minutes).
pub const DEFAULT_SEPARATOR_GAP_SECS: i64 = 180;

/// Gap between progress log lines (8 hours).
pub const DEFAULT_PROGRESS_GAP_SECS: i64 = 8 * 60 * 60;

/// Timeout for a single sticker or icon download.
pub const DEFAULT_DOWNLOAD_TIMEOUT_SECS: u64 = 30;

/// Display name used for the account owner.
pub const SELF_DISPLAY_NAME: &str = "我";

/// Wall-clock format used in separators and stored timestamps.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
