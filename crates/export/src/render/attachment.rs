use super::media::copy_into;
use super::{placeholder_bubble, RenderContext, Renderer, FILE_MISSING, VOICE_MISSING};
use crate::document::{Align, Block, Line, Span, TextStyle};
use crate::error::ExportResult;
use std::path::Path;
use tracing::{debug, warn};
use wxdoc_core::{MessageKind, MessageRecord};
use wxdoc_wechat::audio::transcode_voice_to_mp3;
use wxdoc_wechat::markup::{non_empty_tag_text, strip_xml_header, tag_text};

/// Voice notes, linked from the transcript.
pub struct VoiceRenderer;

impl Renderer for VoiceRenderer {
    fn name(&self) -> &str {
        "voice"
    }

    fn kinds(&self) -> &'static [MessageKind] {
        &[MessageKind::Voice]
    }

    fn render(&self, record: &MessageRecord, ctx: &mut RenderContext<'_>) -> ExportResult<Block> {
        let source = ctx.media.voice_path(&record.img_path);
        let Some(copied) = copy_into(&source, ctx.dirs.tmp_voice_dir()) else {
            return Ok(placeholder_bubble(record, ctx, VOICE_MISSING));
        };

        let mut target = copied.clone();
        if let Some(options) = ctx.transcode {
            let mp3 = ctx
                .dirs
                .voice_dir()
                .join(format!("msg_{}.mp3", record.img_path));
            match transcode_voice_to_mp3(&copied, &mp3, options) {
                Ok(()) => target = mp3,
                Err(e) => warn!("voice {} left as amr: {}", record.img_path, e),
            }
        }

        let label = format!("{}的语音", record.display_name);
        Ok(Block::bubble(
            record.sender,
            vec![Line::new(
                Span::link(&label, ctx.dirs.link_target(&target)),
                ctx.side_align(record),
            )],
        ))
    }
}

/// The final component of an attachment title, if it is a plain name.
fn attachment_name(title: &str) -> Option<&str> {
    let name = Path::new(title).file_name()?.to_str()?;
    (name == title).then_some(name)
}

/// Copy `Download/<title>` into the file folder and return its link target.
fn copy_download(title: &str, ctx: &RenderContext<'_>) -> Option<String> {
    let Some(name) = attachment_name(title) else {
        debug!("attachment title {:?} is not a plain file name", title);
        return None;
    };
    copy_into(&ctx.media.download_path(name), ctx.dirs.file_dir())
        .map(|copied| ctx.dirs.link_target(&copied))
}

/// File attachments.
pub struct FileRenderer;

impl Renderer for FileRenderer {
    fn name(&self) -> &str {
        "file"
    }

    fn kinds(&self) -> &'static [MessageKind] {
        &[MessageKind::File]
    }

    fn render(&self, record: &MessageRecord, ctx: &mut RenderContext<'_>) -> ExportResult<Block> {
        let Some(title) = non_empty_tag_text(&record.content, "title") else {
            ctx.report_unrecognized("file", &record.content);
            return Ok(placeholder_bubble(record, ctx, FILE_MISSING));
        };

        let align = ctx.side_align(record);
        Ok(match copy_download(&title, ctx) {
            Some(target) => Block::bubble(
                record.sender,
                vec![Line::new(Span::link(&title, target), align)],
            ),
            None => Block::bubble(
                record.sender,
                vec![
                    Line::new(Span::text(&title, TextStyle::PLACEHOLDER), align),
                    Line::new(Span::placeholder(FILE_MISSING), align),
                ],
            ),
        })
    }
}

/// Shared links, chat-history bundles and web files.
pub struct LinkRenderer;

impl Renderer for LinkRenderer {
    fn name(&self) -> &str {
        "link"
    }

    fn kinds(&self) -> &'static [MessageKind] {
        &[MessageKind::Link]
    }

    fn render(&self, record: &MessageRecord, ctx: &mut RenderContext<'_>) -> ExportResult<Block> {
        let payload = strip_xml_header(&record.content);
        let url = non_empty_tag_text(&payload, "url");
        let title = tag_text(&payload, "title").map(|title| {
            title
                .split(" null")
                .next()
                .unwrap_or_default()
                .to_string()
        });
        let des = non_empty_tag_text(&payload, "des");
        let align = ctx.side_align(record);

        let lines = match (title, url) {
            (Some(title), _) if title.contains("聊天记录") => vec![
                Line::new(Span::text(&title, TextStyle::BODY), Align::Left),
                Line::new(
                    Span::text(des.as_deref().unwrap_or_default(), TextStyle::BODY),
                    Align::Left,
                ),
            ],
            (Some(title), None) => {
                let line = match &des {
                    Some(des) => format!("{}({})", title, des),
                    None => title.clone(),
                };
                let span = match copy_download(&title, ctx) {
                    Some(target) => Span::link(&line, target),
                    None => Span::text(&line, TextStyle::BODY),
                };
                vec![Line::new(span, align)]
            }
            (Some(title), Some(url)) => vec![Line::new(Span::link(&title, url), align)],
            (None, _) => {
                ctx.report_unrecognized("link", &payload);
                vec![Line::new(Span::text(&payload, TextStyle::BODY), align)]
            }
        };
        Ok(Block::bubble(record.sender, lines))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::tests::{record, Harness};
    use std::fs;
    use wxdoc_core::Sender;
    use wxdoc_wechat::media::md5_hex;
    use wxdoc_wechat::Offline;

    fn spans(block: &Block) -> Vec<&Span> {
        match block {
            Block::Bubble(bubble) => bubble.lines.iter().flat_map(|l| &l.spans).collect(),
            other => panic!("expected bubble, got {:?}", other),
        }
    }

    fn link_target(block: &Block) -> Option<String> {
        spans(block).into_iter().find_map(|span| match span {
            Span::Link { target, .. } => Some(target.clone()),
            _ => None,
        })
    }

    fn put_voice(harness: &Harness, id: &str) {
        let hash = md5_hex(id);
        let dir = harness
            .data()
            .join("voice2")
            .join(&hash[0..2])
            .join(&hash[2..4]);
        fs::create_dir_all(&dir).expect("mkdir");
        fs::write(dir.join(format!("msg_{}.amr", id)), b"#!SILK_V3").expect("write");
    }

    #[test]
    fn voice_is_copied_and_linked() {
        let mut harness = Harness::new();
        put_voice(&harness, "v100");
        let mut rec = record(MessageKind::Voice, Sender::Contact, "");
        rec.img_path = "v100".to_string();

        let (block, _) = harness.render(&VoiceRenderer, &rec, &Offline);
        assert_eq!(block.plain_text(), "Mia的语音");
        assert_eq!(link_target(&block).as_deref(), Some("tmp_voice/msg_v100.amr"));
        assert!(harness.dirs.tmp_voice_dir().join("msg_v100.amr").is_file());
    }

    #[test]
    fn missing_voice_yields_placeholder() {
        let mut harness = Harness::new();
        let mut rec = record(MessageKind::Voice, Sender::SelfUser, "");
        rec.img_path = "v404".to_string();
        let (block, _) = harness.render(&VoiceRenderer, &rec, &Offline);
        assert_eq!(block.plain_text(), VOICE_MISSING);
        assert_eq!(block.placeholder_count(), 1);
    }

    #[test]
    fn file_is_copied_or_marked_missing() {
        let mut harness = Harness::new();
        let download = harness.data().join("Download");
        fs::create_dir_all(&download).expect("mkdir");
        fs::write(download.join("plan.pdf"), b"%PDF").expect("write");

        let present = record(
            MessageKind::File,
            Sender::Contact,
            "<msg><appmsg><title>plan.pdf</title></appmsg></msg>",
        );
        let (block, _) = harness.render(&FileRenderer, &present, &Offline);
        assert_eq!(link_target(&block).as_deref(), Some("file_love/plan.pdf"));

        let missing = record(
            MessageKind::File,
            Sender::Contact,
            "<msg><appmsg><title>gone.doc</title></appmsg></msg>",
        );
        let (block, _) = harness.render(&FileRenderer, &missing, &Offline);
        assert_eq!(block.plain_text(), format!("gone.doc\n{}", FILE_MISSING));
        assert_eq!(block.placeholder_count(), 1);
    }

    #[test]
    fn file_title_cannot_escape_download_folder() {
        assert_eq!(attachment_name("plan.pdf"), Some("plan.pdf"));
        assert_eq!(attachment_name("../secret"), None);
        assert_eq!(attachment_name("a/b.txt"), None);
    }

    #[test]
    fn link_variants() {
        let mut harness = Harness::new();

        let url = record(
            MessageKind::Link,
            Sender::SelfUser,
            "<?xml version=\"1.0\"?><msg><appmsg><title>Rust 2024</title>\
             <url>https://blog.example/rust</url></appmsg></msg>",
        );
        let (block, _) = harness.render(&LinkRenderer, &url, &Offline);
        assert_eq!(link_target(&block).as_deref(), Some("https://blog.example/rust"));

        let bundle = record(
            MessageKind::Link,
            Sender::SelfUser,
            "<msg><appmsg><title>Mia和我的聊天记录</title><des>Mia: 早\n我: 早</des>\
             <url>https://support.example/history</url></appmsg></msg>",
        );
        let (block, _) = harness.render(&LinkRenderer, &bundle, &Offline);
        let Block::Bubble(bubble) = &block else {
            panic!("expected bubble");
        };
        assert_eq!(bubble.lines.len(), 2);
        assert_eq!(bubble.lines[0].align, Align::Left);

        let web_file = record(
            MessageKind::Link,
            Sender::Contact,
            "<msg><appmsg><title>slides.key</title><des>12MB</des><url></url></appmsg></msg>",
        );
        let (block, _) = harness.render(&LinkRenderer, &web_file, &Offline);
        assert_eq!(block.plain_text(), "slides.key(12MB)");
        assert_eq!(link_target(&block), None);
    }

    #[test]
    fn link_without_title_is_reported() {
        let mut harness = Harness::new();
        let rec = record(MessageKind::Link, Sender::Contact, "<msg><appmsg/></msg>");
        let (block, unrecognized) = harness.render(&LinkRenderer, &rec, &Offline);
        assert_eq!(block.plain_text(), "<msg><appmsg/></msg>");
        assert_eq!(unrecognized, 1);
    }
}
