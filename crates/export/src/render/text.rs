use super::{
    RenderContext, Renderer, NOT_SENT_SUFFIX, QUOTED_PICTURE, QUOTED_STICKER, QUOTE_UNRECOGNIZED,
};
use crate::document::{Align, Block, Line, Span, TextStyle};
use crate::error::ExportResult;
use wxdoc_core::{MessageKind, MessageRecord};
use wxdoc_wechat::quote::parse_reply;
use wxdoc_wechat::QuotedContent;

fn with_send_status(record: &MessageRecord, text: &str) -> String {
    if record.send_failed() {
        format!("{}{}", text, NOT_SENT_SUFFIX)
    } else {
        text.to_string()
    }
}

/// Plain text messages.
pub struct TextRenderer;

impl Renderer for TextRenderer {
    fn name(&self) -> &str {
        "text"
    }

    fn kinds(&self) -> &'static [MessageKind] {
        &[MessageKind::Text]
    }

    fn render(&self, record: &MessageRecord, ctx: &mut RenderContext<'_>) -> ExportResult<Block> {
        let text = with_send_status(record, &record.content);
        let align = ctx.text_align(record, &text);
        Ok(Block::bubble(
            record.sender,
            vec![Line::new(Span::text(&text, TextStyle::BODY), align)],
        ))
    }
}

/// Replies: the reply line over a dimmed quote line.
pub struct ReplyRenderer;

impl Renderer for ReplyRenderer {
    fn name(&self) -> &str {
        "reply"
    }

    fn kinds(&self) -> &'static [MessageKind] {
        &[MessageKind::Reply]
    }

    fn render(&self, record: &MessageRecord, ctx: &mut RenderContext<'_>) -> ExportResult<Block> {
        let parts = parse_reply(&record.content, record.is_self());

        let reply = match parts.reply {
            Some(reply) => reply,
            None => {
                ctx.report_unrecognized("reply title", &record.content);
                String::new()
            }
        };
        let reply = with_send_status(record, &reply);
        let reply_line = Line::new(Span::text(&reply, TextStyle::BODY), ctx.text_align(record, &reply));

        let lead = format!("{}:", parts.quoted_author);
        let quoted = match parts.quoted {
            QuotedContent::Text(text) => text,
            QuotedContent::Picture => QUOTED_PICTURE.to_string(),
            QuotedContent::AnimatedSticker => QUOTED_STICKER.to_string(),
            QuotedContent::StickerImage { url } => match ctx.fetch_picture(&url) {
                Some(picture) => {
                    let align = if record.is_self() { Align::Right } else { Align::Left };
                    let quote_line = Line::new(Span::text(&lead, TextStyle::QUOTE), align)
                        .with(Span::picture(picture));
                    return Ok(Block::bubble(record.sender, vec![reply_line, quote_line]));
                }
                None => QUOTED_STICKER.to_string(),
            },
            QuotedContent::Unrecognized => {
                ctx.report_unrecognized("reply quote", &record.content);
                QUOTE_UNRECOGNIZED.to_string()
            }
        };

        let quote = format!("{}{}", lead, quoted);
        let quote_line = Line::new(Span::text(&quote, TextStyle::QUOTE), ctx.text_align(record, &quote));
        Ok(Block::bubble(record.sender, vec![reply_line, quote_line]))
    }
}
