//! Per-kind renderers and the tag dispatcher.
//!
//! Each record's kind selects exactly one [`Renderer`]. Renderers degrade
//! missing side-files and odd payloads to visible placeholders; an `Err`
//! from a renderer is caught here and replaced with a generic placeholder
//! so no record can abort an export.

mod attachment;
mod card;
mod media;
mod notice;
mod text;

pub use attachment::{FileRenderer, LinkRenderer, VoiceRenderer};
pub use card::{AppMsgRenderer, CallRenderer, NameCardRenderer, RedEnvelopeRenderer, TransferRenderer};
pub use media::{ImageRenderer, StickerRenderer, VideoRenderer};
pub use notice::NoticeRenderer;
pub use text::{ReplyRenderer, TextRenderer};

use crate::document::{Align, Block, Line, Picture, Span};
use crate::error::ExportResult;
use crate::workdir::WorkDirs;
use std::collections::HashMap;
use tracing::{debug, warn};
use wxdoc_core::config::RenderConfig;
use wxdoc_core::{MessageKind, MessageRecord};
use wxdoc_wechat::audio::AudioTranscodeOptions;
use wxdoc_wechat::{MediaLibrary, RemoteFetch};

/// Picture side-file missing or unreadable.
pub const IMAGE_MISSING: &str = "您的图片已过期或被错误删除";
/// Sticker found but not decodable.
pub const STICKER_UNREADABLE: &str = "不能正确打开表情";
/// Sticker neither on disk nor downloadable.
pub const STICKER_MISSING: &str = "不能正确找到表情";
/// Voice note missing.
pub const VOICE_MISSING: &str = "您的语音已过期或被错误删除";
/// Video cover or clip missing.
pub const VIDEO_MISSING: &str = "您的视频已过期或被错误删除";
/// Appended under the title of a missing file.
pub const FILE_MISSING: &str = "(您的文件已过期或被错误删除)";
/// Renderer failed outright.
pub const RENDER_FAILED: &str = "[该消息无法显示]";
/// Quoted picture.
pub const QUOTED_PICTURE: &str = "[图片]";
/// Quoted sticker.
pub const QUOTED_STICKER: &str = "[动画表情]";
/// Quote in a format no extractor understood.
pub const QUOTE_UNRECOGNIZED: &str = "[无法识别的引用]";
/// Suffix on text whose send failed.
pub const NOT_SENT_SUFFIX: &str = "（未发出） ";

/// Everything a renderer may read or touch while drawing one record.
pub struct RenderContext<'a> {
    /// Contact label of the conversation.
    pub label: &'a str,
    /// Layout options.
    pub settings: &'a RenderConfig,
    /// Side-file lookup; stickers downloaded on the fly are registered here.
    pub media: &'a mut MediaLibrary,
    /// Remote source for missing stickers and card icons.
    pub fetcher: &'a dyn RemoteFetch,
    /// Per-export working folders.
    pub dirs: &'a WorkDirs,
    /// Voice transcoding, when enabled.
    pub transcode: Option<&'a AudioTranscodeOptions>,
    unrecognized: usize,
}

impl<'a> RenderContext<'a> {
    /// Context without voice transcoding.
    pub fn new(
        label: &'a str,
        settings: &'a RenderConfig,
        media: &'a mut MediaLibrary,
        fetcher: &'a dyn RemoteFetch,
        dirs: &'a WorkDirs,
    ) -> Self {
        Self {
            label,
            settings,
            media,
            fetcher,
            dirs,
            transcode: None,
            unrecognized: 0,
        }
    }

    /// Enable voice transcoding.
    pub fn with_transcode(mut self, options: Option<&'a AudioTranscodeOptions>) -> Self {
        self.transcode = options;
        self
    }

    /// Record payload markup nothing understood.
    pub fn report_unrecognized(&mut self, what: &str, content: &str) {
        let preview: String = content.chars().take(200).collect();
        warn!("unrecognized {} payload: {}", what, preview);
        self.unrecognized += 1;
    }

    /// Payloads reported through [`Self::report_unrecognized`].
    pub fn unrecognized(&self) -> usize {
        self.unrecognized
    }

    /// Right for self-sent records, left otherwise.
    pub fn side_align(&self, record: &MessageRecord) -> Align {
        if record.is_self() {
            Align::Right
        } else {
            Align::Left
        }
    }

    /// Right only for short self-sent text.
    pub fn text_align(&self, record: &MessageRecord, text: &str) -> Align {
        if record.is_self() && text.chars().count() < self.settings.short_message_chars {
            Align::Right
        } else {
            Align::Left
        }
    }

    /// Download and decode a picture; failures are logged and yield `None`.
    pub fn fetch_picture(&self, url: &str) -> Option<Picture> {
        match self.fetcher.fetch(url) {
            Ok(bytes) => match Picture::decode(&bytes) {
                Ok(picture) => Some(picture),
                Err(e) => {
                    debug!("undecodable picture from {}: {}", url, e);
                    None
                }
            },
            Err(e) => {
                debug!("picture fetch failed: {}", e);
                None
            }
        }
    }
}

/// Draws one record kind.
pub trait Renderer {
    /// Short name for diagnostics.
    fn name(&self) -> &str;
    /// Kinds this renderer handles.
    fn kinds(&self) -> &'static [MessageKind];
    /// Draw `record`. Missing side-files should degrade to placeholders
    /// rather than return `Err`.
    fn render(&self, record: &MessageRecord, ctx: &mut RenderContext<'_>) -> ExportResult<Block>;
}

/// What the dispatcher did with a record.
#[derive(Debug)]
pub enum Dispatch {
    /// The renderer produced a block.
    Rendered(Block),
    /// The renderer failed; the block is a generic placeholder.
    Degraded(Block),
    /// No renderer covers the record's tag.
    Unhandled,
}

/// Closed mapping from kind to renderer.
pub struct RendererRegistry {
    renderers: Vec<Box<dyn Renderer>>,
    by_kind: HashMap<MessageKind, usize>,
}

impl RendererRegistry {
    /// Creates a registry with every built-in renderer.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register_default_renderers();
        registry
    }

    /// Creates a registry with no renderers.
    pub fn empty() -> Self {
        Self {
            renderers: Vec::new(),
            by_kind: HashMap::new(),
        }
    }

    fn register_default_renderers(&mut self) {
        self.register(Box::new(TextRenderer));
        self.register(Box::new(ReplyRenderer));
        self.register(Box::new(ImageRenderer));
        self.register(Box::new(StickerRenderer));
        self.register(Box::new(VideoRenderer));
        self.register(Box::new(VoiceRenderer));
        self.register(Box::new(FileRenderer));
        self.register(Box::new(LinkRenderer));
        self.register(Box::new(NoticeRenderer));
        self.register(Box::new(CallRenderer));
        self.register(Box::new(NameCardRenderer));
        self.register(Box::new(TransferRenderer));
        self.register(Box::new(RedEnvelopeRenderer));
        self.register(Box::new(AppMsgRenderer));
    }

    /// Add a renderer; it replaces any earlier one for the same kinds.
    pub fn register(&mut self, renderer: Box<dyn Renderer>) {
        let index = self.renderers.len();
        for kind in renderer.kinds() {
            if let Some(previous) = self.by_kind.insert(*kind, index) {
                debug!(
                    "{:?} moved from {} to {}",
                    kind,
                    self.renderers[previous].name(),
                    renderer.name()
                );
            }
        }
        self.renderers.push(renderer);
    }

    /// Renderer for `kind`.
    pub fn renderer_for(&self, kind: MessageKind) -> Option<&dyn Renderer> {
        self.by_kind
            .get(&kind)
            .and_then(|index| self.renderers.get(*index))
            .map(|renderer| renderer.as_ref())
    }

    /// Whether every known kind has a renderer.
    pub fn is_complete(&self) -> bool {
        MessageKind::ALL
            .iter()
            .all(|kind| self.by_kind.contains_key(kind))
    }

    /// Render one record through its kind's renderer.
    pub fn dispatch(&self, record: &MessageRecord, ctx: &mut RenderContext<'_>) -> Dispatch {
        let Some(renderer) = record.kind().and_then(|kind| self.renderer_for(kind)) else {
            warn!(
                "no renderer for type {} (msg {} at {} from {}): {}",
                record.type_tag, record.msg_id, record.time, record.display_name, record.content
            );
            return Dispatch::Unhandled;
        };

        match renderer.render(record, ctx) {
            Ok(block) => Dispatch::Rendered(block),
            Err(e) => {
                warn!("{} renderer failed on msg {}: {}", renderer.name(), record.msg_id, e);
                Dispatch::Degraded(Block::bubble(
                    record.sender,
                    vec![Line::new(Span::placeholder(RENDER_FAILED), ctx.side_align(record))],
                ))
            }
        }
    }
}

impl Default for RendererRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// A one-line bubble holding a placeholder.
pub(crate) fn placeholder_bubble(record: &MessageRecord, ctx: &RenderContext<'_>, text: &str) -> Block {
    Block::bubble(
        record.sender,
        vec![Line::new(Span::placeholder(text), ctx.side_align(record))],
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::error::ExportError;
    use chrono::NaiveDate;
    use wxdoc_core::Sender;
    use wxdoc_wechat::Offline;

    /// Working folders plus an empty media tree inside one tempdir.
    pub(crate) struct Harness {
        pub dir: tempfile::TempDir,
        pub media: MediaLibrary,
        pub dirs: WorkDirs,
        pub settings: RenderConfig,
    }

    impl Harness {
        pub(crate) fn new() -> Self {
            let dir = tempfile::tempdir().expect("tempdir");
            Self::with_dir(dir)
        }

        pub(crate) fn with_dir(dir: tempfile::TempDir) -> Self {
            let media = MediaLibrary::open(&dir.path().join("data"));
            let window = wxdoc_core::ExportWindow::month(2021, 3).expect("window");
            let dirs = WorkDirs::create(&dir.path().join("out"), &window).expect("dirs");
            Self {
                dir,
                media,
                dirs,
                settings: RenderConfig::default(),
            }
        }

        pub(crate) fn data(&self) -> std::path::PathBuf {
            self.dir.path().join("data")
        }

        pub(crate) fn reindex(&mut self) {
            self.media = MediaLibrary::open(&self.data());
        }

        pub(crate) fn render(
            &mut self,
            renderer: &dyn Renderer,
            record: &MessageRecord,
            fetcher: &dyn RemoteFetch,
        ) -> (Block, usize) {
            let mut ctx = RenderContext::new(
                "Mia",
                &self.settings,
                &mut self.media,
                fetcher,
                &self.dirs,
            );
            let block = renderer.render(record, &mut ctx).expect("render");
            (block, ctx.unrecognized())
        }
    }

    pub(crate) fn record(kind: MessageKind, sender: Sender, content: &str) -> MessageRecord {
        MessageRecord {
            msg_id: 1,
            time: NaiveDate::from_ymd_opt(2021, 3, 1)
                .and_then(|d| d.and_hms_opt(12, 0, 0))
                .expect("time"),
            sender,
            display_name: if sender.is_self() { "我" } else { "Mia" }.to_string(),
            content: content.to_string(),
            type_tag: kind.tag(),
            status: 0,
            img_path: String::new(),
            buffer: Vec::new(),
        }
    }

    struct Failing;

    impl Renderer for Failing {
        fn name(&self) -> &str {
            "failing"
        }
        fn kinds(&self) -> &'static [MessageKind] {
            &[MessageKind::Text]
        }
        fn render(&self, _: &MessageRecord, _: &mut RenderContext<'_>) -> ExportResult<Block> {
            Err(ExportError::Document("boom".to_string()))
        }
    }

    #[test]
    fn default_registry_covers_every_kind() {
        assert!(RendererRegistry::new().is_complete());
        assert!(!RendererRegistry::empty().is_complete());
    }

    #[test]
    fn unknown_tag_is_unhandled() {
        let mut harness = Harness::new();
        let registry = RendererRegistry::new();
        let mut unknown = record(MessageKind::Text, Sender::Contact, "??");
        unknown.type_tag = 9999;
        let mut ctx = RenderContext::new(
            "Mia",
            &harness.settings,
            &mut harness.media,
            &Offline,
            &harness.dirs,
        );
        assert!(matches!(registry.dispatch(&unknown, &mut ctx), Dispatch::Unhandled));
    }

    #[test]
    fn renderer_error_degrades_to_placeholder() {
        let mut harness = Harness::new();
        let mut registry = RendererRegistry::new();
        registry.register(Box::new(Failing));
        let rec = record(MessageKind::Text, Sender::SelfUser, "hello");
        let mut ctx = RenderContext::new(
            "Mia",
            &harness.settings,
            &mut harness.media,
            &Offline,
            &harness.dirs,
        );
        match registry.dispatch(&rec, &mut ctx) {
            Dispatch::Degraded(block) => {
                assert_eq!(block.placeholder_count(), 1);
                assert_eq!(block.plain_text(), RENDER_FAILED);
            }
            other => panic!("expected degraded block, got {:?}", other),
        }
    }

    #[test]
    fn alignment_rules() {
        let mut harness = Harness::new();
        let ctx = RenderContext::new(
            "Mia",
            &harness.settings,
            &mut harness.media,
            &Offline,
            &harness.dirs,
        );
        let mine = record(MessageKind::Text, Sender::SelfUser, "");
        let theirs = record(MessageKind::Text, Sender::Contact, "");
        assert_eq!(ctx.text_align(&mine, "short"), Align::Right);
        assert_eq!(ctx.text_align(&mine, &"长".repeat(20)), Align::Left);
        assert_eq!(ctx.text_align(&theirs, "short"), Align::Left);
        assert_eq!(ctx.side_align(&mine), Align::Right);
        assert_eq!(ctx.side_align(&theirs), Align::Left);
    }
}
