//! Phrase, call and late-night statistics.

use crate::error::{AnalysisError, AnalysisResult};
use chrono::{NaiveDateTime, Timelike};
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;
use wxdoc_core::constants::TIME_FORMAT;
use wxdoc_core::WxdocConfig;
use wxdoc_wechat::call::format_hms;
use wxdoc_wechat::{CallOutcome, CallRow, MessageStore, TimeScope, TimedText};

/// First messages before this second of the day count as late.
pub const LATE_CUTOFF_SECS: u32 = 6 * 3600 + 30 * 60;

/// Runs statistics jobs, each against its own store connection.
#[derive(Debug, Clone)]
pub struct Statistics {
    message_db: PathBuf,
    file_index_db: Option<PathBuf>,
}

impl Statistics {
    /// Jobs over the given store files.
    pub fn new(message_db: PathBuf, file_index_db: Option<PathBuf>) -> Self {
        Self {
            message_db,
            file_index_db,
        }
    }

    /// Jobs over the stores named in `config`.
    pub fn from_config(config: &WxdocConfig) -> Self {
        Self::new(config.message_db_path(), config.file_index_db_path())
    }

    pub(crate) fn open(&self) -> AnalysisResult<MessageStore> {
        debug!("opening {} for statistics", self.message_db.display());
        Ok(MessageStore::open(
            &self.message_db,
            self.file_index_db.as_deref(),
        )?)
    }

    /// How often `phrase` appears in text messages with `label`.
    pub fn phrase_usage(&self, label: &str, phrase: &str) -> AnalysisResult<PhraseUsage> {
        if phrase.is_empty() {
            return Err(AnalysisError::InvalidInput("empty phrase".to_string()));
        }
        let texts = self.open()?.fetch_texts_containing(label, phrase)?;
        Ok(PhraseUsage::from_texts(phrase, &texts))
    }

    /// Total call length with `label`.
    pub fn call_time(&self, label: &str) -> AnalysisResult<CallTime> {
        let rows = self.open()?.fetch_call_buffers(label)?;
        Ok(CallTime::from_rows(&rows))
    }

    /// Days on which the conversation started after midnight.
    pub fn night_activity(&self, label: &str) -> AnalysisResult<NightActivity> {
        let store = self.open()?;
        let contact = store.fetch_times(label, TimeScope::ContactOrCalls)?;
        let all = store.fetch_times(label, TimeScope::All)?;
        Ok(NightActivity::from_times(&contact, &all))
    }
}

/// Occurrences of one phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PhraseUsage {
    /// The phrase counted.
    pub phrase: String,
    /// Non-overlapping occurrences across all messages.
    pub occurrences: usize,
    /// Messages containing the phrase at least once.
    pub messages: usize,
    /// Earliest message containing it.
    pub first_seen: Option<NaiveDateTime>,
}

impl PhraseUsage {
    /// Count `phrase` over `texts`, which need not be sorted.
    pub fn from_texts(phrase: &str, texts: &[TimedText]) -> Self {
        let mut usage = Self {
            phrase: phrase.to_string(),
            occurrences: 0,
            messages: 0,
            first_seen: None,
        };
        for text in texts {
            let hits = text.content.matches(phrase).count();
            if hits == 0 {
                continue;
            }
            usage.occurrences += hits;
            usage.messages += 1;
            if usage.first_seen.map_or(true, |first| text.time < first) {
                usage.first_seen = Some(text.time);
            }
        }
        usage
    }
}

impl fmt::Display for PhraseUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} times in {} messages",
            self.phrase, self.occurrences, self.messages
        )?;
        if let Some(first) = self.first_seen {
            write!(f, ", first on {}", first.format(TIME_FORMAT))?;
        }
        Ok(())
    }
}

/// Summed call durations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallTime {
    /// Call summaries seen.
    pub calls: usize,
    /// Summaries that carried a duration.
    pub counted: usize,
    /// Sum of those durations.
    pub total_seconds: u64,
}

impl CallTime {
    /// Sum the durations found in `rows`.
    pub fn from_rows(rows: &[CallRow]) -> Self {
        let mut total = Self {
            calls: rows.len(),
            counted: 0,
            total_seconds: 0,
        };
        for row in rows {
            let outcome = CallOutcome::parse(&String::from_utf8_lossy(&row.buffer));
            if let Some(secs) = outcome.duration_secs {
                total.counted += 1;
                total.total_seconds = total.total_seconds.saturating_add(secs);
            }
        }
        total
    }

    /// `H:MM:SS`
    pub fn formatted(&self) -> String {
        format_hms(self.total_seconds)
    }
}

impl fmt::Display for CallTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({} seconds over {} of {} calls)",
            self.formatted(),
            self.total_seconds,
            self.counted,
            self.calls
        )
    }
}

/// Late-night activity counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NightActivity {
    /// Days whose first contact message or call was late.
    pub contact_late_days: usize,
    /// Days whose first message from either side was late.
    pub late_days: usize,
    /// Days whose first message fell in minute 00:00.
    pub midnight_days: usize,
    /// First late day's opening message.
    pub first_late: Option<NaiveDateTime>,
}

impl NightActivity {
    /// Scan ascending `contact` and `all` send times.
    pub fn from_times(contact: &[NaiveDateTime], all: &[NaiveDateTime]) -> Self {
        let contact_late_days = first_per_day(contact).filter(|t| is_late(*t)).count();

        let (mut late_days, mut midnight_days, mut first_late) = (0, 0, None);
        for first in first_per_day(all) {
            if is_late(first) {
                late_days += 1;
                first_late.get_or_insert(first);
            }
            if first.hour() == 0 && first.minute() == 0 {
                midnight_days += 1;
            }
        }

        Self {
            contact_late_days,
            late_days,
            midnight_days,
            first_late,
        }
    }
}

impl fmt::Display for NightActivity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "late days (contact or calls): {}", self.contact_late_days)?;
        writeln!(f, "late days (anyone): {}", self.late_days)?;
        write!(f, "days opened at 00:00: {}", self.midnight_days)?;
        if let Some(first) = self.first_late {
            write!(f, "\nfirst late day: {}", first.format(TIME_FORMAT))?;
        }
        Ok(())
    }
}

fn first_per_day(times: &[NaiveDateTime]) -> impl Iterator<Item = NaiveDateTime> + '_ {
    let mut last_day = None;
    times.iter().copied().filter(move |time| {
        let day = time.date();
        if last_day == Some(day) {
            false
        } else {
            last_day = Some(day);
            true
        }
    })
}

fn is_late(time: NaiveDateTime) -> bool {
    time.num_seconds_from_midnight() < LATE_CUTOFF_SECS
}
