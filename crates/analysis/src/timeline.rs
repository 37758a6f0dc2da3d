//! Messages per fixed-length interval, and its line chart.

use crate::error::{AnalysisError, AnalysisResult};
use crate::stats::Statistics;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use plotters::prelude::*;
use serde::Serialize;
use std::fmt;
use std::path::Path;
use tracing::info;
use wxdoc_core::window::local_to_millis;
use wxdoc_core::ExportWindow;

const CHART_SIZE: (u32, u32) = (1400, 600);
const AXIS_COLOR: RGBColor = RGBColor(0x4E, 0x61, 0x6C);
const LINE_COLOR: RGBColor = RGBColor(0x1F, 0x77, 0xB4);
const MAX_X_LABELS: usize = 20;

/// One interval's count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimelinePoint {
    /// First day of the interval.
    pub start: NaiveDate,
    /// Messages sent inside it.
    pub count: i64,
}

/// Message counts over consecutive intervals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Timeline {
    /// Interval length.
    pub interval_days: u32,
    /// One point per interval, in order.
    pub points: Vec<TimelinePoint>,
    /// Sum over all points.
    pub total: i64,
    /// Busiest interval; the later one wins a tie.
    pub peak: Option<TimelinePoint>,
}

impl Timeline {
    /// Summarize `points`.
    pub fn from_points(interval_days: u32, points: Vec<TimelinePoint>) -> Self {
        let total = points.iter().map(|p| p.count).sum();
        let peak = points
            .iter()
            .copied()
            .fold(None, |best: Option<TimelinePoint>, point| match best {
                Some(best) if best.count > point.count => Some(best),
                _ => Some(point),
            });
        Self {
            interval_days,
            points,
            total,
            peak,
        }
    }
}

impl fmt::Display for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for point in &self.points {
            writeln!(f, "{}  {}", point.start, point.count)?;
        }
        write!(f, "total: {}", self.total)?;
        if let Some(peak) = self.peak {
            write!(f, "\npeak: {} on {}", peak.count, peak.start)?;
        }
        Ok(())
    }
}

impl Statistics {
    /// Count messages with `label` in `interval_days` steps over `[from, to)`.
    ///
    /// The last interval keeps its full length even when it runs past `to`.
    pub fn timeline(
        &self,
        label: &str,
        from: NaiveDateTime,
        to: NaiveDateTime,
        interval_days: u32,
    ) -> AnalysisResult<Timeline> {
        if interval_days == 0 {
            return Err(AnalysisError::InvalidInput(
                "interval must be at least one day".to_string(),
            ));
        }
        ExportWindow::new(from, to)?;

        let store = self.open()?;
        let step = Duration::days(i64::from(interval_days));
        let mut points = Vec::new();
        let mut start = from;
        while start < to {
            let end = start + step;
            let count = store.count_between(label, local_to_millis(start), local_to_millis(end))?;
            points.push(TimelinePoint {
                start: start.date(),
                count,
            });
            start = end;
        }
        Ok(Timeline::from_points(interval_days, points))
    }
}

fn chart_error(e: impl fmt::Display) -> AnalysisError {
    AnalysisError::Chart(e.to_string())
}

/// Draw `timeline` as a line chart with point markers to an SVG file.
pub fn render_timeline_svg(timeline: &Timeline, path: &Path) -> AnalysisResult<()> {
    if timeline.points.is_empty() {
        return Err(AnalysisError::InvalidInput("timeline has no points".to_string()));
    }
    let labels: Vec<String> = timeline
        .points
        .iter()
        .map(|p| p.start.format("%Y-%m-%d").to_string())
        .collect();
    let highest = timeline.points.iter().map(|p| p.count).max().unwrap_or(0);
    let top = highest + highest / 10 + 1;

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(chart_error)?;

    let mut chart = ChartBuilder::on(&root)
        .margin(20)
        .x_label_area_size(80)
        .y_label_area_size(50)
        .build_cartesian_2d(0..timeline.points.len(), 0..top)
        .map_err(chart_error)?;

    chart
        .configure_mesh()
        .light_line_style(AXIS_COLOR.mix(0.1))
        .bold_line_style(AXIS_COLOR.mix(0.3))
        .axis_style(AXIS_COLOR)
        .x_labels(labels.len().min(MAX_X_LABELS))
        .x_label_formatter(&|i| labels.get(*i).cloned().unwrap_or_default())
        .label_style(("sans-serif", 12).into_font().color(&AXIS_COLOR))
        .draw()
        .map_err(chart_error)?;

    let coords: Vec<(usize, i64)> = timeline
        .points
        .iter()
        .enumerate()
        .map(|(i, p)| (i, p.count))
        .collect();
    chart
        .draw_series(LineSeries::new(coords.iter().copied(), LINE_COLOR.stroke_width(1)))
        .map_err(chart_error)?;
    chart
        .draw_series(
            coords
                .iter()
                .map(|&coord| Circle::new(coord, 2, WHITE.filled())),
        )
        .map_err(chart_error)?;
    chart
        .draw_series(
            coords
                .iter()
                .map(|&coord| Circle::new(coord, 2, LINE_COLOR.stroke_width(1))),
        )
        .map_err(chart_error)?;

    root.present().map_err(chart_error)?;
    info!("timeline chart written to {}", path.display());
    Ok(())
}
