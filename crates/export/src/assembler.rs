//! Document Assembler: sequences records into blocks and writes each month.

use crate::docx::{write_docx, Avatars};
use crate::document::{Block, Picture, Transcript};
use crate::error::ExportResult;
use crate::render::{Dispatch, RenderContext, RendererRegistry};
use crate::workdir::WorkDirs;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use wxdoc_core::config::RenderConfig;
use wxdoc_core::constants::TIME_FORMAT;
use wxdoc_core::window::month_windows;
use wxdoc_core::{ExportWindow, MessageRecord, Sender, WxdocConfig};
use wxdoc_wechat::audio::{has_ffmpeg, AudioTranscodeOptions};
use wxdoc_wechat::{HttpFetcher, MediaLibrary, MessageStore, Offline, RemoteFetch};

#[derive(Debug, Clone, Copy)]
enum Cursor {
    NoPrior { anchor: NaiveDateTime },
    Pending { time: NaiveDateTime, sender: Sender },
}

/// Separator and spacing decisions between consecutive records.
#[derive(Debug, Clone)]
pub struct Sequencer {
    cursor: Cursor,
    separator_gap_secs: i64,
    progress_gap_secs: i64,
    last_progress: NaiveDateTime,
}

impl Sequencer {
    /// Start a window; the first record is measured against its start.
    pub fn new(window_start: NaiveDateTime, settings: &RenderConfig) -> Self {
        Self {
            cursor: Cursor::NoPrior {
                anchor: window_start,
            },
            separator_gap_secs: settings.separator_gap_secs,
            progress_gap_secs: settings.progress_gap_secs,
            last_progress: window_start,
        }
    }

    /// Block to insert before `record`, if any.
    ///
    /// A gap of at least `separator_gap_secs` yields a timestamp separator;
    /// otherwise a change of sender yields a spacer. The first record of a
    /// window counts as a change of sender.
    pub fn advance(&mut self, record: &MessageRecord) -> Option<Block> {
        let (previous, alternated) = match self.cursor {
            Cursor::NoPrior { anchor } => (anchor, true),
            Cursor::Pending { time, sender } => (time, sender != record.sender),
        };
        self.cursor = Cursor::Pending {
            time: record.time,
            sender: record.sender,
        };

        if (record.time - previous).num_seconds() >= self.separator_gap_secs {
            Some(Block::Separator(record.time.format(TIME_FORMAT).to_string()))
        } else if alternated {
            Some(Block::Spacer)
        } else {
            None
        }
    }

    /// Whether enough time passed since the last progress line.
    pub fn progress_due(&mut self, time: NaiveDateTime) -> bool {
        if (time - self.last_progress).num_seconds() >= self.progress_gap_secs {
            self.last_progress = time;
            true
        } else {
            false
        }
    }
}

/// A rendered transcript and what could not be drawn.
#[derive(Debug)]
pub struct TranscriptOutcome {
    /// Blocks in order.
    pub transcript: Transcript,
    /// Records whose tag has no renderer.
    pub unhandled: usize,
    /// Payloads no extractor understood.
    pub unrecognized: usize,
    /// Records whose renderer failed outright.
    pub degraded: usize,
}

/// Result of one month's export.
#[derive(Debug, Clone, Serialize)]
pub struct MonthSummary {
    /// `YYYY-MM`
    pub month: String,
    /// Written document.
    pub document: PathBuf,
    /// Records fetched.
    pub records: usize,
    /// Top-level blocks written.
    pub blocks: usize,
    /// Timestamp separators.
    pub separators: usize,
    /// Placeholder substitutions.
    pub placeholders: usize,
    /// Records skipped for an unknown tag.
    pub unhandled: usize,
    /// Payloads shown raw or as a sentinel.
    pub unrecognized: usize,
}

/// Exports one contact's conversation month by month.
pub struct Exporter {
    config: WxdocConfig,
    store: MessageStore,
    media: MediaLibrary,
    fetcher: Box<dyn RemoteFetch>,
    registry: RendererRegistry,
    transcode: Option<AudioTranscodeOptions>,
}

impl Exporter {
    /// Open the stores and index the media tree described by `config`.
    pub fn new(config: WxdocConfig) -> ExportResult<Self> {
        let file_index = config.file_index_db_path();
        let store = MessageStore::open(&config.message_db_path(), file_index.as_deref())?;
        if !store.has_file_index() {
            debug!("exporting without a file index store");
        }
        let media = MediaLibrary::open(&config.data_root);
        let fetcher: Box<dyn RemoteFetch> = if config.media.download_missing {
            Box::new(HttpFetcher::new(Duration::from_secs(
                config.media.download_timeout_secs,
            ))?)
        } else {
            Box::new(Offline)
        };
        Ok(Self::with_parts(config, store, media, fetcher))
    }

    /// Assemble an exporter from already opened parts.
    pub fn with_parts(
        config: WxdocConfig,
        store: MessageStore,
        media: MediaLibrary,
        fetcher: Box<dyn RemoteFetch>,
    ) -> Self {
        let transcode = transcode_options(&config);
        Self {
            config,
            store,
            media,
            fetcher,
            registry: RendererRegistry::new(),
            transcode,
        }
    }

    /// Replace the renderer registry.
    pub fn with_registry(mut self, registry: RendererRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Sequence and render `records` without writing anything.
    pub fn build_transcript(
        &mut self,
        label: &str,
        window: &ExportWindow,
        records: &[MessageRecord],
        dirs: &WorkDirs,
    ) -> TranscriptOutcome {
        let mut sequencer = Sequencer::new(window.start, &self.config.render);
        let mut ctx = RenderContext::new(
            label,
            &self.config.render,
            &mut self.media,
            self.fetcher.as_ref(),
            dirs,
        )
        .with_transcode(self.transcode.as_ref());

        let mut transcript = Transcript::new();
        let (mut unhandled, mut degraded) = (0, 0);
        for record in records {
            if let Some(block) = sequencer.advance(record) {
                transcript.push(block);
            }
            if sequencer.progress_due(record.time) {
                info!("{} is finished", record.time.format(TIME_FORMAT));
            }

            match self.registry.dispatch(record, &mut ctx) {
                Dispatch::Rendered(block) => transcript.push(block),
                Dispatch::Degraded(block) => {
                    degraded += 1;
                    transcript.push(block);
                }
                Dispatch::Unhandled => unhandled += 1,
            }
        }

        TranscriptOutcome {
            transcript,
            unhandled,
            unrecognized: ctx.unrecognized(),
            degraded,
        }
    }

    /// Export one window to `<out>/<YYYY>/<MM>/<YYYY-MM>.docx`.
    pub fn export_month(&mut self, label: &str, window: &ExportWindow) -> ExportResult<MonthSummary> {
        let contact = self.store.contact_username(label)?;
        let records = self.store.fetch_window(label, window)?;
        let dirs = WorkDirs::create(&self.config.output_dir, window)?;
        let avatars = Avatars {
            own: self.own_avatar(),
            contact: self.avatar_for(&contact),
        };

        let outcome = self.build_transcript(label, window, &records, &dirs);
        write_docx(&outcome.transcript, &avatars, dirs.document_path())?;
        dirs.remove_unused();

        let summary = MonthSummary {
            month: window.file_stem(),
            document: dirs.document_path().to_path_buf(),
            records: records.len(),
            blocks: outcome.transcript.len(),
            separators: outcome.transcript.separator_count(),
            placeholders: outcome.transcript.placeholder_count(),
            unhandled: outcome.unhandled,
            unrecognized: outcome.unrecognized,
        };
        if outcome.degraded > 0 {
            warn!("{}: {} records could not be drawn", summary.month, outcome.degraded);
        }
        info!(
            "{} exported: {} records, {} placeholders, {} unhandled -> {}",
            summary.month,
            summary.records,
            summary.placeholders,
            summary.unhandled,
            summary.document.display()
        );
        Ok(summary)
    }

    /// Export every calendar month from the one containing `from` up to,
    /// but not including, the one containing `to`.
    pub fn export_range(
        &mut self,
        label: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ExportResult<Vec<MonthSummary>> {
        let windows = month_windows(from, to)?;
        if windows.is_empty() {
            warn!("no whole month between {} and {}", from, to);
        }
        windows
            .iter()
            .map(|window| self.export_month(label, window))
            .collect()
    }

    fn own_avatar(&self) -> Option<Picture> {
        match self.store.self_username() {
            Ok(Some(username)) => self.avatar_for(&username),
            Ok(None) => {
                debug!("store records no owner username");
                None
            }
            Err(e) => {
                warn!("owner username lookup failed: {}", e);
                None
            }
        }
    }

    fn avatar_for(&self, username: &str) -> Option<Picture> {
        let path = self.media.avatar_path(username)?;
        match Picture::load(&path) {
            Ok(picture) => Some(picture),
            Err(e) => {
                debug!("avatar {} unreadable: {}", path.display(), e);
                None
            }
        }
    }
}

fn transcode_options(config: &WxdocConfig) -> Option<AudioTranscodeOptions> {
    if !config.media.transcode_voice {
        return None;
    }
    let ffmpeg = config.media.ffmpeg_binary.clone();
    if !has_ffmpeg(ffmpeg.as_deref()) {
        warn!("voice transcoding enabled but ffmpeg is not available; keeping amr copies");
        return None;
    }
    Some(AudioTranscodeOptions {
        ffmpeg_binary: ffmpeg,
        ..AudioTranscodeOptions::default()
    })
}
