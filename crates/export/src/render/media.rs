use super::{
    placeholder_bubble, RenderContext, Renderer, IMAGE_MISSING, STICKER_MISSING,
    STICKER_UNREADABLE, VIDEO_MISSING,
};
use crate::document::{Block, Line, Picture, Span};
use crate::error::ExportResult;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;
use wxdoc_core::{MessageKind, MessageRecord};
use wxdoc_wechat::markup::{non_empty_tag_text, sticker_cdn_url};

/// Chat pictures.
pub struct ImageRenderer;

impl Renderer for ImageRenderer {
    fn name(&self) -> &str {
        "image"
    }

    fn kinds(&self) -> &'static [MessageKind] {
        &[MessageKind::Image]
    }

    fn render(&self, record: &MessageRecord, ctx: &mut RenderContext<'_>) -> ExportResult<Block> {
        let picture = ctx
            .media
            .image_path(&record.img_path, record.is_self())
            .and_then(|path| load_logged(&path));

        Ok(match picture {
            Some(picture) => Block::bubble(
                record.sender,
                vec![Line::new(Span::picture(picture), ctx.side_align(record))],
            ),
            None => placeholder_bubble(record, ctx, IMAGE_MISSING),
        })
    }
}

/// Store stickers and user-saved stickers.
pub struct StickerRenderer;

impl StickerRenderer {
    fn locate(md5: &str, content: &str, ctx: &mut RenderContext<'_>) -> Option<PathBuf> {
        if let Some(path) = ctx.media.sticker_path(md5) {
            return Some(path);
        }
        let url = sticker_cdn_url(content)?;
        let bytes = match ctx.fetcher.fetch(&url) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!("sticker {} not downloadable: {}", md5, e);
                return None;
            }
        };
        match ctx.media.register_sticker(md5, &bytes) {
            Ok(path) => Some(path),
            Err(e) => {
                debug!("sticker {} not stored: {}", md5, e);
                None
            }
        }
    }
}

impl Renderer for StickerRenderer {
    fn name(&self) -> &str {
        "sticker"
    }

    fn kinds(&self) -> &'static [MessageKind] {
        &[MessageKind::BigEmoji, MessageKind::CustomEmoji]
    }

    fn render(&self, record: &MessageRecord, ctx: &mut RenderContext<'_>) -> ExportResult<Block> {
        let md5 = match record.kind() {
            Some(MessageKind::CustomEmoji) => {
                match non_empty_tag_text(&record.content, "emoticonmd5") {
                    Some(md5) => md5,
                    None => {
                        ctx.report_unrecognized("custom sticker", &record.content);
                        return Ok(placeholder_bubble(record, ctx, STICKER_MISSING));
                    }
                }
            }
            _ => record.img_path.clone(),
        };

        let Some(path) = Self::locate(&md5, &record.content, ctx) else {
            return Ok(placeholder_bubble(record, ctx, STICKER_MISSING));
        };
        Ok(match load_logged(&path) {
            Some(picture) => Block::bubble(
                record.sender,
                vec![Line::new(Span::picture(picture), ctx.side_align(record))],
            ),
            None => placeholder_bubble(record, ctx, STICKER_UNREADABLE),
        })
    }
}

/// Video clips: cover still plus a link to the copied clip.
pub struct VideoRenderer;

impl Renderer for VideoRenderer {
    fn name(&self) -> &str {
        "video"
    }

    fn kinds(&self) -> &'static [MessageKind] {
        &[MessageKind::Video]
    }

    fn render(&self, record: &MessageRecord, ctx: &mut RenderContext<'_>) -> ExportResult<Block> {
        let files = ctx.media.video_files(&record.img_path);
        let (Some(cover), Some(clip)) = (files.cover, files.clip) else {
            debug!("video {} incomplete on disk", record.img_path);
            return Ok(placeholder_bubble(record, ctx, VIDEO_MISSING));
        };
        let Some(picture) = load_logged(&cover) else {
            return Ok(placeholder_bubble(record, ctx, VIDEO_MISSING));
        };
        let Some(copied) = copy_into(&clip, ctx.dirs.video_dir()) else {
            return Ok(placeholder_bubble(record, ctx, VIDEO_MISSING));
        };

        let align = ctx.side_align(record);
        Ok(Block::bubble(
            record.sender,
            vec![
                Line::new(Span::picture(picture), align),
                Line::new(Span::link("播放视频", ctx.dirs.link_target(&copied)), align),
            ],
        ))
    }
}

fn load_logged(path: &Path) -> Option<Picture> {
    match Picture::load(path) {
        Ok(picture) => Some(picture),
        Err(e) => {
            debug!("cannot embed {}: {}", path.display(), e);
            None
        }
    }
}

/// Copy `source` into `dir` under its own name.
pub(crate) fn copy_into(source: &Path, dir: &Path) -> Option<PathBuf> {
    let name = source.file_name()?;
    let target = dir.join(name);
    match fs::copy(source, &target) {
        Ok(_) => Some(target),
        Err(e) => {
            debug!("copy of {} failed: {}", source.display(), e);
            None
        }
    }
}
