use super::{RenderContext, Renderer};
use crate::document::{Align, Block, Line, Span, TextStyle};
use crate::error::ExportResult;
use wxdoc_core::{MessageKind, MessageRecord};
use wxdoc_wechat::notice::{pat_notice, system_notice};

/// Centered notices: recalls, system messages and pats.
pub struct NoticeRenderer;

impl Renderer for NoticeRenderer {
    fn name(&self) -> &str {
        "notice"
    }

    fn kinds(&self) -> &'static [MessageKind] {
        &[MessageKind::Withdraw, MessageKind::System, MessageKind::Pat]
    }

    fn render(&self, record: &MessageRecord, ctx: &mut RenderContext<'_>) -> ExportResult<Block> {
        let (text, style) = match record.kind() {
            Some(MessageKind::Pat) => {
                let notice = pat_notice(&record.content, ctx.label);
                if !notice.recognized {
                    ctx.report_unrecognized("pat", &record.content);
                }
                (notice.text, TextStyle::PAT)
            }
            Some(MessageKind::System) => {
                let notice = system_notice(&record.content, ctx.label);
                if !notice.recognized {
                    ctx.report_unrecognized("system", &record.content);
                }
                (notice.text, TextStyle::NOTICE)
            }
            _ => (record.content.clone(), TextStyle::NOTICE),
        };
        Ok(Block::Notice(Line::new(Span::text(&text, style), Align::Center)))
    }
}
