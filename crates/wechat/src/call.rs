//! Call summary parsing shared by the transcript and the statistics.

use once_cell::sync::Lazy;
use regex::Regex;

static DURATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+):(\d{2})(?::(\d{2}))?").expect("valid regex"));

/// Shown when no known phrase occurs.
pub const DEFAULT_CALL_TEXT: &str = "语音通话";

/// How a phrase found in the buffer is summarised.
#[derive(Debug, Clone, Copy)]
enum Summary {
    /// The phrase, followed by the call length when one is present.
    WithDuration,
    /// A fixed label.
    Fixed(&'static str),
}

/// Known outcome phrases; the first present in the buffer wins.
const OUTCOMES: &[(&str, Summary)] = &[
    ("聊天时长", Summary::WithDuration),
    ("通话时长", Summary::WithDuration),
    ("呼叫失败", Summary::Fixed("呼叫失败")),
    ("通话中断", Summary::WithDuration),
    ("对方无应答", Summary::Fixed("对方无应答")),
    ("已拒绝", Summary::Fixed("对方已拒绝")),
    ("已取消", Summary::Fixed("已取消")),
    ("忙线", Summary::Fixed("忙线未接听")),
    ("连接失败", Summary::Fixed("连接失败")),
];

/// Outcome of one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallOutcome {
    /// Transcript text, such as `通话时长 05:23`.
    pub text: String,
    /// Call length when the outcome carries one.
    pub duration_secs: Option<u64>,
    /// Whether a known phrase matched.
    pub recognized: bool,
}

impl CallOutcome {
    /// Parse a call summary buffer.
    pub fn parse(buffer: &str) -> Self {
        for (phrase, summary) in OUTCOMES {
            let Some(pos) = buffer.find(phrase) else {
                continue;
            };
            let tail = &buffer[pos + phrase.len()..];
            return match summary {
                Summary::Fixed(label) => Self::fixed(label),
                Summary::WithDuration => match duration_token(tail) {
                    Some((token, secs)) => Self {
                        text: format!("{} {}", phrase, token),
                        duration_secs: Some(secs),
                        recognized: true,
                    },
                    None => Self::fixed(phrase),
                },
            };
        }
        Self {
            text: DEFAULT_CALL_TEXT.to_string(),
            duration_secs: None,
            recognized: false,
        }
    }

    fn fixed(text: &str) -> Self {
        Self {
            text: text.to_string(),
            duration_secs: None,
            recognized: true,
        }
    }
}

/// First `M:SS` or `H:MM:SS` token in `text`, with its length in seconds.
///
/// A token whose length does not fit in a `u64` is ignored.
fn duration_token(text: &str) -> Option<(&str, u64)> {
    let caps = DURATION.captures(text)?;
    let field = |i: usize| caps.get(i).map(|m| m.as_str().parse::<u64>().ok());
    let first = field(1)??;
    let second = field(2)??;
    let secs = match field(3) {
        Some(third) => first
            .checked_mul(3600)?
            .checked_add(second * 60)?
            .checked_add(third?)?,
        None => first.checked_mul(60)?.checked_add(second)?,
    };
    Some((caps.get(0)?.as_str(), secs))
}

/// `H:MM:SS` rendering of a total.
pub fn format_hms(total_secs: u64) -> String {
    let (minutes, secs) = (total_secs / 60, total_secs % 60);
    let (hours, minutes) = (minutes / 60, minutes % 60);
    format!("{}:{:02}:{:02}", hours, minutes, secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_are_parsed() {
        let outcome = CallOutcome::parse("<voipmsg>通话时长 05:23</voipmsg>");
        assert_eq!(outcome.text, "通话时长 05:23");
        assert_eq!(outcome.duration_secs, Some(323));

        let long = CallOutcome::parse("聊天时长 1:02:03");
        assert_eq!(long.duration_secs, Some(3723));
    }

    #[test]
    fn interrupted_call_with_and_without_length() {
        assert_eq!(CallOutcome::parse("通话中断 00:12").duration_secs, Some(12));
        let bare = CallOutcome::parse("通话中断");
        assert_eq!(bare.text, "通话中断");
        assert_eq!(bare.duration_secs, None);
    }

    #[test]
    fn oversized_duration_is_ignored() {
        let huge = CallOutcome::parse("通话时长 4000000:00:00");
        assert_eq!(huge.duration_secs, Some(4_000_000 * 3600));
        assert_eq!(huge.text, "通话时长 4000000:00:00");

        let overflow = CallOutcome::parse("通话时长 99999999999999999999:00:00");
        assert_eq!(overflow.duration_secs, None);
        assert_eq!(overflow.text, "通话时长");
        assert!(overflow.recognized);

        let minutes = CallOutcome::parse("聊天时长 307445734561825861:59");
        assert_eq!(minutes.duration_secs, None);
    }

    #[test]
    fn first_phrase_in_table_order_wins() {
        let outcome = CallOutcome::parse("已取消 / 对方无应答");
        assert_eq!(outcome.text, "对方无应答");
        assert_eq!(CallOutcome::parse("对方已拒绝").text, "对方已拒绝");
        assert_eq!(CallOutcome::parse("忙线中").text, "忙线未接听");
    }

    #[test]
    fn unknown_buffer_falls_back() {
        let outcome = CallOutcome::parse("something new");
        assert_eq!(outcome.text, DEFAULT_CALL_TEXT);
        assert!(!outcome.recognized);
    }

    #[test]
    fn hms_format() {
        assert_eq!(format_hms(0), "0:00:00");
        assert_eq!(format_hms(3723), "1:02:03");
        assert_eq!(format_hms(90_061), "25:01:01");
    }
}
