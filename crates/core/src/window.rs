//! Half-open time windows and local-time conversions.

use crate::{Error, Result};
use chrono::{DateTime, Datelike, Local, NaiveDate, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// A half-open `[start, end)` range of local wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportWindow {
    /// Inclusive start.
    pub start: NaiveDateTime,
    /// Exclusive end.
    pub end: NaiveDateTime,
}

impl ExportWindow {
    /// Build a window, rejecting empty or inverted ranges.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Result<Self> {
        if end <= start {
            return Err(Error::validation(format!(
                "window end {} is not after start {}",
                end, start
            )));
        }
        Ok(Self { start, end })
    }

    /// The calendar month starting at `year`/`month`.
    pub fn month(year: i32, month: u32) -> Result<Self> {
        let start = month_start(year, month)?;
        let (next_year, next_month) = next_month(year, month);
        let end = month_start(next_year, next_month)?;
        Self::new(start, end)
    }

    /// Start as epoch milliseconds.
    pub fn start_millis(&self) -> i64 {
        local_to_millis(self.start)
    }

    /// End as epoch milliseconds.
    pub fn end_millis(&self) -> i64 {
        local_to_millis(self.end)
    }

    /// Whether `time` falls inside the window.
    pub fn contains(&self, time: NaiveDateTime) -> bool {
        time >= self.start && time < self.end
    }

    /// `YYYY` of the start.
    pub fn year_label(&self) -> String {
        self.start.format("%Y").to_string()
    }

    /// `MM` of the start.
    pub fn month_label(&self) -> String {
        self.start.format("%m").to_string()
    }

    /// `YYYY-MM` of the start.
    pub fn file_stem(&self) -> String {
        self.start.format("%Y-%m").to_string()
    }
}

/// Split `[from, to)` into whole calendar months.
///
/// Begins with the month containing `from` and stops before the month
/// containing `to`, so `2021-01 .. 2021-03` yields January and February.
pub fn month_windows(from: NaiveDate, to: NaiveDate) -> Result<Vec<ExportWindow>> {
    let mut windows = Vec::new();
    let (mut year, mut month) = (from.year(), from.month());
    let end_key = to.year() * 12 + to.month() as i32;
    while year * 12 + (month as i32) < end_key {
        windows.push(ExportWindow::month(year, month)?);
        (year, month) = next_month(year, month);
    }
    Ok(windows)
}

/// Parse `YYYY-MM` into the first day of that month.
pub fn parse_month(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d")
        .map_err(|e| Error::Parse(format!("invalid month '{}': {}", raw, e)))
}

/// Parse `YYYY-MM-DD` or `YYYY-MM-DD HH:MM:SS` as local wall-clock time.
pub fn parse_local_time(raw: &str) -> Result<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(time) = NaiveDateTime::parse_from_str(raw, crate::constants::TIME_FORMAT) {
        return Ok(time);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_hms_opt(0, 0, 0).unwrap_or_default())
        .map_err(|e| Error::Parse(format!("invalid time '{}': {}", raw, e)))
}

/// Local wall-clock time to epoch milliseconds.
pub fn local_to_millis(time: NaiveDateTime) -> i64 {
    match Local.from_local_datetime(&time).earliest() {
        Some(local) => local.timestamp_millis(),
        // inside a DST gap; treat the wall-clock value as UTC
        None => time.and_utc().timestamp_millis(),
    }
}

/// Epoch milliseconds to local wall-clock time, truncated to whole seconds.
pub fn millis_to_local(millis: i64) -> NaiveDateTime {
    let secs = millis.div_euclid(1000);
    DateTime::from_timestamp(secs, 0)
        .map(|utc| utc.with_timezone(&Local).naive_local())
        .unwrap_or_default()
}

fn month_start(year: i32, month: u32) -> Result<NaiveDateTime> {
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| Error::validation(format!("invalid month {}-{:02}", year, month)))
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month >= 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn month_windows_stop_before_end_month() {
        let windows = month_windows(date(2020, 11, 15), date(2021, 2, 1)).expect("windows");
        let stems: Vec<String> = windows.iter().map(ExportWindow::file_stem).collect();
        assert_eq!(stems, vec!["2020-11", "2020-12", "2021-01"]);
        assert_eq!(windows[1].end, windows[2].start);
    }

    #[test]
    fn same_month_range_is_empty() {
        let windows = month_windows(date(2021, 3, 1), date(2021, 3, 31)).expect("windows");
        assert!(windows.is_empty());
    }

    #[test]
    fn window_is_half_open() {
        let window = ExportWindow::month(2021, 2).expect("window");
        assert!(window.contains(window.start));
        assert!(!window.contains(window.end));
        assert_eq!(window.year_label(), "2021");
        assert_eq!(window.month_label(), "02");
    }

    #[test]
    fn inverted_window_is_rejected() {
        let start = parse_local_time("2021-01-02").expect("time");
        let end = parse_local_time("2021-01-01").expect("time");
        assert!(ExportWindow::new(start, end).is_err());
    }

    #[test]
    fn millis_round_trip_at_second_precision() {
        let time = parse_local_time("2021-06-01 13:45:07").expect("time");
        assert_eq!(millis_to_local(local_to_millis(time) + 999), time);
    }

    #[test]
    fn parse_month_accepts_year_month() {
        assert_eq!(parse_month("2021-07").expect("month"), date(2021, 7, 1));
        assert!(parse_month("2021-13").is_err());
    }
}
