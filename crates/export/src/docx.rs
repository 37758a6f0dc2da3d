//! `.docx` packing for a finished [`Transcript`].

use crate::document::{
    Align, Block, Bubble, Line, Picture, Span, TextStyle, Transcript, AVATAR_WIDTH_EMU,
};
use crate::error::{ExportError, ExportResult};
use docx_rs::{
    AlignmentType, BreakType, Docx, Hyperlink, HyperlinkType, LineSpacing, Paragraph, Pic, Run,
    RunFonts, Table, TableAlignmentType, TableBorders, TableCell, TableRow, VAlignType, WidthType,
};
use std::fs::File;
use std::path::Path;
use tracing::debug;

const LATIN_FONT: &str = "Times New Roman";
const EAST_ASIAN_FONT: &str = "楷体";

// twentieths of a point
const SEPARATOR_SPACING: u32 = 200;
const SPACER_SPACING: u32 = 100;
const AVATAR_CELL_WIDTH: usize = 864;
const CONTENT_CELL_WIDTH: usize = 7200;

/// Avatars shown beside each bubble.
#[derive(Debug, Clone, Default)]
pub struct Avatars {
    /// The account owner's avatar.
    pub own: Option<Picture>,
    /// The contact's avatar.
    pub contact: Option<Picture>,
}

impl Avatars {
    fn for_bubble(&self, bubble: &Bubble) -> Option<&Picture> {
        if bubble.sender.is_self() {
            self.own.as_ref()
        } else {
            self.contact.as_ref()
        }
    }
}

/// Pack `transcript` into a Word document at `path`.
pub fn write_docx(transcript: &Transcript, avatars: &Avatars, path: &Path) -> ExportResult<()> {
    let mut docx = Docx::new().default_fonts(
        RunFonts::new()
            .ascii(LATIN_FONT)
            .hi_ansi(LATIN_FONT)
            .east_asia(EAST_ASIAN_FONT),
    );

    for block in transcript.blocks() {
        docx = match block {
            Block::Separator(stamp) => docx.add_paragraph(
                Paragraph::new()
                    .add_run(styled_run(stamp, &TextStyle::SEPARATOR))
                    .align(AlignmentType::Center)
                    .line_spacing(spacing(SEPARATOR_SPACING)),
            ),
            Block::Spacer => docx.add_paragraph(Paragraph::new().line_spacing(spacing(SPACER_SPACING))),
            Block::Notice(line) => docx.add_paragraph(paragraph(line)),
            Block::Bubble(bubble) => docx.add_table(bubble_table(bubble, avatars.for_bubble(bubble))),
        };
    }

    let file = File::create(path)?;
    docx.build()
        .pack(file)
        .map_err(|e| ExportError::Document(e.to_string()))?;
    debug!("wrote {} blocks to {}", transcript.len(), path.display());
    Ok(())
}

fn spacing(twips: u32) -> LineSpacing {
    LineSpacing::new().before(twips).after(twips)
}

fn bubble_table(bubble: &Bubble, avatar: Option<&Picture>) -> Table {
    let avatar_paragraph = match avatar {
        Some(picture) => {
            let (width, height) = picture.extent_for_width(AVATAR_WIDTH_EMU);
            Paragraph::new().add_run(Run::new().add_image(pic(picture, width, height)))
        }
        None => Paragraph::new(),
    };
    let avatar_cell = TableCell::new()
        .add_paragraph(avatar_paragraph)
        .vertical_align(VAlignType::Top)
        .width(AVATAR_CELL_WIDTH, WidthType::Dxa);

    let mut content_cell = TableCell::new()
        .vertical_align(VAlignType::Center)
        .width(CONTENT_CELL_WIDTH, WidthType::Dxa);
    for line in &bubble.lines {
        content_cell = content_cell.add_paragraph(paragraph(line));
    }
    if bubble.lines.is_empty() {
        content_cell = content_cell.add_paragraph(Paragraph::new());
    }

    let (cells, anchor) = if bubble.sender.is_self() {
        (vec![content_cell, avatar_cell], TableAlignmentType::Right)
    } else {
        (vec![avatar_cell, content_cell], TableAlignmentType::Left)
    };
    Table::new(vec![TableRow::new(cells)])
        .set_borders(TableBorders::with_empty())
        .align(anchor)
}

fn paragraph(line: &Line) -> Paragraph {
    let mut paragraph = Paragraph::new()
        .align(alignment(line.align))
        .line_spacing(spacing(0));
    for span in &line.spans {
        paragraph = match span {
            Span::Text { text, style } => paragraph.add_run(styled_run(text, style)),
            Span::Placeholder(text) => paragraph.add_run(styled_run(text, &TextStyle::PLACEHOLDER)),
            Span::Link { text, target } => paragraph.add_hyperlink(
                Hyperlink::new(target.as_str(), HyperlinkType::External)
                    .add_run(styled_run(text, &TextStyle::LINK)),
            ),
            Span::Picture {
                picture,
                height_emu,
            } => {
                let (width, height) = picture.extent_for_height(*height_emu);
                paragraph.add_run(Run::new().add_image(pic(picture, width, height)))
            }
        };
    }
    paragraph
}

fn alignment(align: Align) -> AlignmentType {
    match align {
        Align::Left => AlignmentType::Left,
        Align::Center => AlignmentType::Center,
        Align::Right => AlignmentType::Right,
    }
}

fn pic(picture: &Picture, width_emu: u32, height_emu: u32) -> Pic {
    let (width_px, height_px) = picture.dimensions();
    Pic::new_with_dimensions(picture.png().to_vec(), width_px, height_px).size(width_emu, height_emu)
}

fn styled_run(text: &str, style: &TextStyle) -> Run {
    let mut run = Run::new();
    for (i, piece) in text.split('\n').enumerate() {
        if i > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        run = run.add_text(piece);
    }
    if let Some(size) = style.half_points {
        run = run.size(size);
    }
    if let Some(color) = style.color {
        run = run.color(color);
    }
    if style.bold {
        run = run.bold();
    }
    if style.strike {
        run = run.strike();
    }
    if style.highlight {
        run = run.highlight("lightGray");
    }
    if style.underline {
        run = run.underline("single");
    }
    if let Some(font) = style.font {
        run = run.fonts(RunFonts::new().ascii(font).hi_ansi(font));
    }
    run
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::tiny_png;
    use wxdoc_core::Sender;

    #[test]
    fn writes_a_zip_package() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("2021-03.docx");
        let picture = Picture::decode(&tiny_png(10, 10)).expect("picture");

        let mut transcript = Transcript::new();
        transcript.push(Block::Separator("2021-03-01 12:00:00".to_string()));
        transcript.push(Block::bubble(
            Sender::Contact,
            vec![
                Line::new(Span::text("早\n今天下雨", TextStyle::BODY), Align::Left),
                Line::new(Span::placeholder("gone"), Align::Left),
            ],
        ));
        transcript.push(Block::Spacer);
        transcript.push(Block::bubble(
            Sender::SelfUser,
            vec![
                Line::new(Span::picture(picture.clone()), Align::Right),
                Line::new(Span::link("plan.pdf", "file_love/plan.pdf"), Align::Right),
            ],
        ));
        transcript.push(Block::Notice(Line::new(
            Span::text("你撤回了一条消息", TextStyle::NOTICE),
            Align::Center,
        )));

        let avatars = Avatars {
            own: Some(picture),
            contact: None,
        };
        write_docx(&transcript, &avatars, &path).expect("write");

        let bytes = std::fs::read(&path).expect("read");
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn empty_transcript_still_packs() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("empty.docx");
        write_docx(&Transcript::new(), &Avatars::default(), &path).expect("write");
        assert!(path.is_file());
    }

    #[test]
    fn unwritable_target_is_an_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("missing").join("out.docx");
        assert!(write_docx(&Transcript::new(), &Avatars::default(), &path).is_err());
    }
}
