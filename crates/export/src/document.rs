//! In-memory transcript: what the renderers produce and the writer packs.

use crate::error::ExportResult;
use image::{GenericImageView, ImageFormat};
use std::fmt;
use std::io::Cursor;
use std::path::Path;
use wxdoc_core::Sender;
use wxdoc_wechat::markup::strip_control_chars;

/// English Metric Units per inch.
pub const EMU_PER_INCH: u32 = 914_400;

/// Height of embedded pictures, stickers and video covers.
pub const CONTENT_IMAGE_HEIGHT_EMU: u32 = 2 * EMU_PER_INCH;

/// Width of bubble avatars.
pub const AVATAR_WIDTH_EMU: u32 = EMU_PER_INCH / 2;

/// Run formatting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextStyle {
    /// Font size in half-points.
    pub half_points: Option<usize>,
    /// RGB hex colour.
    pub color: Option<&'static str>,
    /// Bold weight.
    pub bold: bool,
    /// Strikethrough.
    pub strike: bool,
    /// Grey highlight behind the run.
    pub highlight: bool,
    /// Single underline.
    pub underline: bool,
    /// Explicit font family.
    pub font: Option<&'static str>,
}

impl TextStyle {
    /// Message text, 12pt.
    pub const BODY: Self = Self {
        half_points: Some(24),
        color: None,
        bold: false,
        strike: false,
        highlight: false,
        underline: false,
        font: None,
    };

    /// Missing side-file notice, grey struck 11pt.
    pub const PLACEHOLDER: Self = Self {
        half_points: Some(22),
        color: Some("BFBFBF"),
        strike: true,
        ..Self::BODY
    };

    /// Quoted line under a reply, dimmed 11pt on grey.
    pub const QUOTE: Self = Self {
        half_points: Some(22),
        color: Some("797979"),
        highlight: true,
        ..Self::BODY
    };

    /// System and recall notices, grey 10.5pt.
    pub const NOTICE: Self = Self {
        half_points: Some(21),
        color: Some("BFBFBF"),
        ..Self::BODY
    };

    /// Pat notices, bold dimmed.
    pub const PAT: Self = Self {
        half_points: None,
        color: Some("797979"),
        bold: true,
        ..Self::BODY
    };

    /// Timestamp separators, Times New Roman 11pt.
    pub const SEPARATOR: Self = Self {
        half_points: Some(22),
        font: Some("Times New Roman"),
        ..Self::BODY
    };

    /// Hyperlinks, 12pt underlined.
    pub const LINK: Self = Self {
        color: Some("0563C1"),
        underline: true,
        ..Self::BODY
    };
}

/// A decoded picture, re-encoded as PNG for embedding.
#[derive(Clone)]
pub struct Picture {
    png: Vec<u8>,
    width: u32,
    height: u32,
}

impl Picture {
    /// Read and decode a picture file.
    pub fn load(path: &Path) -> ExportResult<Self> {
        let bytes = std::fs::read(path)?;
        Self::decode(&bytes)
    }

    /// Decode picture bytes in any supported format.
    pub fn decode(bytes: &[u8]) -> ExportResult<Self> {
        let img = image::load_from_memory(bytes)?;
        let (width, height) = img.dimensions();
        let mut png = Vec::new();
        img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
        Ok(Self { png, width, height })
    }

    /// PNG bytes.
    pub fn png(&self) -> &[u8] {
        &self.png
    }

    /// Pixel size.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// EMU extent keeping the aspect ratio at `height_emu`.
    pub fn extent_for_height(&self, height_emu: u32) -> (u32, u32) {
        let width = u64::from(self.width) * u64::from(height_emu) / u64::from(self.height.max(1));
        (width as u32, height_emu)
    }

    /// EMU extent keeping the aspect ratio at `width_emu`.
    pub fn extent_for_width(&self, width_emu: u32) -> (u32, u32) {
        let height = u64::from(self.height) * u64::from(width_emu) / u64::from(self.width.max(1));
        (width_emu, height as u32)
    }
}

impl fmt::Debug for Picture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Picture")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("png_bytes", &self.png.len())
            .finish()
    }
}

/// Horizontal placement of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    /// Flush left.
    #[default]
    Left,
    /// Centered.
    Center,
    /// Flush right.
    Right,
}

/// One run inside a line.
#[derive(Debug, Clone)]
pub enum Span {
    /// Styled text.
    Text {
        /// Text with invalid control characters removed.
        text: String,
        /// Formatting.
        style: TextStyle,
    },
    /// A fixed substitute for a missing side-file or failed payload.
    Placeholder(String),
    /// A hyperlink, relative to the document folder or absolute.
    Link {
        /// Visible text.
        text: String,
        /// Link target.
        target: String,
    },
    /// An embedded picture at a fixed height.
    Picture {
        /// Decoded picture.
        picture: Picture,
        /// Display height.
        height_emu: u32,
    },
}

impl Span {
    /// Styled text.
    pub fn text(text: &str, style: TextStyle) -> Self {
        Span::Text {
            text: strip_control_chars(text),
            style,
        }
    }

    /// Placeholder text.
    pub fn placeholder(text: &str) -> Self {
        Span::Placeholder(strip_control_chars(text))
    }

    /// Hyperlink.
    pub fn link(text: &str, target: impl Into<String>) -> Self {
        Span::Link {
            text: strip_control_chars(text),
            target: strip_control_chars(&target.into()),
        }
    }

    /// Picture at the standard content height.
    pub fn picture(picture: Picture) -> Self {
        Span::Picture {
            picture,
            height_emu: CONTENT_IMAGE_HEIGHT_EMU,
        }
    }

    /// Visible text of the span; pictures have none.
    pub fn plain_text(&self) -> &str {
        match self {
            Span::Text { text, .. } | Span::Placeholder(text) | Span::Link { text, .. } => text,
            Span::Picture { .. } => "",
        }
    }
}

/// A paragraph.
#[derive(Debug, Clone, Default)]
pub struct Line {
    /// Runs in order.
    pub spans: Vec<Span>,
    /// Placement.
    pub align: Align,
}

impl Line {
    /// A line holding one span.
    pub fn new(span: Span, align: Align) -> Self {
        Self {
            spans: vec![span],
            align,
        }
    }

    /// Append a span.
    pub fn with(mut self, span: Span) -> Self {
        self.spans.push(span);
        self
    }

    /// Concatenated visible text.
    pub fn plain_text(&self) -> String {
        self.spans.iter().map(Span::plain_text).collect()
    }
}

/// One message drawn as avatar cell plus content cell.
#[derive(Debug, Clone)]
pub struct Bubble {
    /// Whose avatar to show and which side to anchor.
    pub sender: Sender,
    /// Content paragraphs.
    pub lines: Vec<Line>,
}

/// A top-level transcript element.
#[derive(Debug, Clone)]
pub enum Block {
    /// Centered timestamp.
    Separator(String),
    /// Vertical gap marking a change of speaker.
    Spacer,
    /// Centered notice outside any bubble.
    Notice(Line),
    /// A message bubble.
    Bubble(Bubble),
}

impl Block {
    /// Bubble with the given lines.
    pub fn bubble(sender: Sender, lines: Vec<Line>) -> Self {
        Block::Bubble(Bubble { sender, lines })
    }

    fn lines(&self) -> &[Line] {
        match self {
            Block::Bubble(bubble) => &bubble.lines,
            Block::Notice(line) => std::slice::from_ref(line),
            Block::Separator(_) | Block::Spacer => &[],
        }
    }

    /// Placeholder spans in this block.
    pub fn placeholder_count(&self) -> usize {
        self.lines()
            .iter()
            .flat_map(|line| &line.spans)
            .filter(|span| matches!(span, Span::Placeholder(_)))
            .count()
    }

    /// Visible text of all lines, newline separated.
    pub fn plain_text(&self) -> String {
        match self {
            Block::Separator(stamp) => stamp.clone(),
            _ => self
                .lines()
                .iter()
                .map(Line::plain_text)
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

/// Ordered blocks of one export.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    blocks: Vec<Block>,
}

impl Transcript {
    /// Empty transcript.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a block.
    pub fn push(&mut self, block: Block) {
        self.blocks.push(block);
    }

    /// All blocks in order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Number of blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether nothing was rendered.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Number of timestamp separators.
    pub fn separator_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Block::Separator(_)))
            .count()
    }

    /// Number of speaker-change spacers.
    pub fn spacer_count(&self) -> usize {
        self.blocks.iter().filter(|b| matches!(b, Block::Spacer)).count()
    }

    /// Number of placeholder substitutions.
    pub fn placeholder_count(&self) -> usize {
        self.blocks.iter().map(Block::placeholder_count).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::tiny_png;

    #[test]
    fn picture_keeps_aspect_ratio() {
        let picture = Picture::decode(&tiny_png(40, 20)).expect("decode");
        assert_eq!(picture.dimensions(), (40, 20));
        assert_eq!(
            picture.extent_for_height(CONTENT_IMAGE_HEIGHT_EMU),
            (2 * CONTENT_IMAGE_HEIGHT_EMU, CONTENT_IMAGE_HEIGHT_EMU)
        );
        assert_eq!(
            picture.extent_for_width(AVATAR_WIDTH_EMU),
            (AVATAR_WIDTH_EMU, AVATAR_WIDTH_EMU / 2)
        );
    }

    #[test]
    fn garbage_bytes_do_not_decode() {
        assert!(Picture::decode(b"not an image").is_err());
    }

    #[test]
    fn spans_drop_control_characters() {
        let span = Span::text("hi\u{8}there", TextStyle::BODY);
        assert_eq!(span.plain_text(), "hithere");
    }

    #[test]
    fn link_targets_drop_control_characters() {
        let span = Span::link("メモ\u{1}.pdf", "http://a.example/\u{1}x\u{b}y");
        match span {
            Span::Link { text, target } => {
                assert_eq!(text, "メモ.pdf");
                assert_eq!(target, "http://a.example/xy");
            }
            other => panic!("unexpected span {:?}", other),
        }
    }

    #[test]
    fn transcript_counts_blocks_by_kind() {
        let mut transcript = Transcript::new();
        transcript.push(Block::Separator("2021-01-01 08:00:00".to_string()));
        transcript.push(Block::bubble(
            Sender::Contact,
            vec![Line::new(Span::placeholder("gone"), Align::Left)],
        ));
        transcript.push(Block::Spacer);
        transcript.push(Block::Notice(Line::new(
            Span::text("notice", TextStyle::NOTICE),
            Align::Center,
        )));

        assert_eq!(transcript.len(), 4);
        assert_eq!(transcript.separator_count(), 1);
        assert_eq!(transcript.spacer_count(), 1);
        assert_eq!(transcript.placeholder_count(), 1);
        assert_eq!(transcript.blocks()[1].plain_text(), "gone");
    }
}
