use super::{RenderContext, Renderer, QUOTED_PICTURE};
use crate::document::{Block, Line, Picture, Span, TextStyle};
use crate::error::ExportResult;
use tracing::debug;
use wxdoc_core::{MessageKind, MessageRecord};
use wxdoc_wechat::markup::{all_tag_texts, attr, non_empty_tag_text, strip_xml_header, tag_text};
use wxdoc_wechat::CallOutcome;

/// Call summaries.
pub struct CallRenderer;

impl Renderer for CallRenderer {
    fn name(&self) -> &str {
        "call"
    }

    fn kinds(&self) -> &'static [MessageKind] {
        &[MessageKind::Voip]
    }

    fn render(&self, record: &MessageRecord, ctx: &mut RenderContext<'_>) -> ExportResult<Block> {
        let buffer = record.buffer_text();
        let outcome = CallOutcome::parse(&buffer);
        if !outcome.recognized {
            ctx.report_unrecognized("call", &buffer);
        }
        Ok(Block::bubble(
            record.sender,
            vec![Line::new(
                Span::text(&outcome.text, TextStyle::BODY),
                ctx.side_align(record),
            )],
        ))
    }
}

/// Shared contact cards: icon, caption and nickname.
pub struct NameCardRenderer;

impl NameCardRenderer {
    fn picture(payload: &str, ctx: &RenderContext<'_>) -> Option<Picture> {
        if let Some(url) = attr(payload, "msg", "brandIconUrl").filter(|u| !u.is_empty()) {
            if let Some(picture) = ctx.fetch_picture(&url) {
                return Some(picture);
            }
        }
        let username = attr(payload, "msg", "username")?;
        let path = ctx.media.avatar_path(&username)?;
        match Picture::load(&path) {
            Ok(picture) => Some(picture),
            Err(e) => {
                debug!("card avatar {} unreadable: {}", path.display(), e);
                None
            }
        }
    }
}

impl Renderer for NameCardRenderer {
    fn name(&self) -> &str {
        "name card"
    }

    fn kinds(&self) -> &'static [MessageKind] {
        &[MessageKind::NameCard]
    }

    fn render(&self, record: &MessageRecord, ctx: &mut RenderContext<'_>) -> ExportResult<Block> {
        let payload = strip_xml_header(&record.content);
        let nickname = attr(&payload, "msg", "nickname")
            .filter(|n| !n.is_empty())
            .or_else(|| attr(&payload, "msg", "alias").filter(|a| !a.is_empty()));
        if nickname.is_none() && attr(&payload, "msg", "username").is_none() {
            ctx.report_unrecognized("name card", &payload);
        }

        let align = ctx.side_align(record);
        let picture = match Self::picture(&payload, ctx) {
            Some(picture) => Span::picture(picture),
            None => Span::text(QUOTED_PICTURE, TextStyle::BODY),
        };
        Ok(Block::bubble(
            record.sender,
            vec![
                Line::new(picture, align),
                Line::new(Span::text("分享卡片", TextStyle::BODY), align),
                Line::new(
                    Span::text(nickname.as_deref().unwrap_or_default(), TextStyle::BODY),
                    align,
                ),
            ],
        ))
    }
}

/// A fixed heading with one optional detail line read from a tag.
fn headed_card(
    record: &MessageRecord,
    ctx: &RenderContext<'_>,
    heading: &str,
    detail_tag: &str,
) -> Block {
    let align = ctx.side_align(record);
    let mut lines = vec![Line::new(Span::text(heading, TextStyle::BODY), align)];
    if let Some(detail) = tag_text(&record.content, detail_tag) {
        lines.push(Line::new(Span::text(&detail, TextStyle::BODY), align));
    }
    Block::bubble(record.sender, lines)
}

/// Money transfers.
pub struct TransferRenderer;

impl Renderer for TransferRenderer {
    fn name(&self) -> &str {
        "transfer"
    }

    fn kinds(&self) -> &'static [MessageKind] {
        &[MessageKind::Transfer]
    }

    fn render(&self, record: &MessageRecord, ctx: &mut RenderContext<'_>) -> ExportResult<Block> {
        Ok(headed_card(record, ctx, "[微信转账]", "des"))
    }
}

/// Red envelopes.
pub struct RedEnvelopeRenderer;

impl Renderer for RedEnvelopeRenderer {
    fn name(&self) -> &str {
        "red envelope"
    }

    fn kinds(&self) -> &'static [MessageKind] {
        &[MessageKind::RedEnvelope]
    }

    fn render(&self, record: &MessageRecord, ctx: &mut RenderContext<'_>) -> ExportResult<Block> {
        Ok(headed_card(record, ctx, "[微信红包]", "sendertitle"))
    }
}

/// Third-party app shares: title followed by description.
pub struct AppMsgRenderer;

impl Renderer for AppMsgRenderer {
    fn name(&self) -> &str {
        "app message"
    }

    fn kinds(&self) -> &'static [MessageKind] {
        &[MessageKind::AppMsg]
    }

    fn render(&self, record: &MessageRecord, ctx: &mut RenderContext<'_>) -> ExportResult<Block> {
        let payload = strip_xml_header(&record.content);
        let titles = all_tag_texts(&payload, "title");
        let des = non_empty_tag_text(&payload, "des");
        if titles.is_empty() && des.is_none() {
            ctx.report_unrecognized("app message", &payload);
        }
        let text = format!("{}{}", titles.join(" "), des.unwrap_or_default());
        Ok(Block::bubble(
            record.sender,
            vec![Line::new(Span::text(&text, TextStyle::BODY), ctx.side_align(record))],
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Align;
    use crate::render::tests::{record, Harness};
    use crate::testutil::tiny_png;
    use std::fs;
    use wxdoc_core::Sender;
    use wxdoc_wechat::media::md5_hex;
    use wxdoc_wechat::{Offline, RemoteFetch, WeChatResult};

    struct Serve(Vec<u8>);

    impl RemoteFetch for Serve {
        fn fetch(&self, _url: &str) -> WeChatResult<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    fn lines(block: &Block) -> &[Line] {
        match block {
            Block::Bubble(bubble) => &bubble.lines,
            other => panic!("expected bubble, got {:?}", other),
        }
    }

    #[test]
    fn call_summary_keeps_duration() {
        let mut harness = Harness::new();
        let mut rec = record(MessageKind::Voip, Sender::SelfUser, "");
        rec.buffer = "<voipmsg>通话时长 12:07</voipmsg>".as_bytes().to_vec();
        let (block, unrecognized) = harness.render(&CallRenderer, &rec, &Offline);
        assert_eq!(block.plain_text(), "通话时长 12:07");
        assert_eq!(lines(&block)[0].align, Align::Right);
        assert_eq!(unrecognized, 0);
    }

    #[test]
    fn unknown_call_buffer_is_counted() {
        let mut harness = Harness::new();
        let mut rec = record(MessageKind::Voip, Sender::Contact, "");
        rec.buffer = b"<voipmsg/>".to_vec();
        let (block, unrecognized) = harness.render(&CallRenderer, &rec, &Offline);
        assert_eq!(block.plain_text(), "语音通话");
        assert_eq!(unrecognized, 1);
    }

    #[test]
    fn name_card_prefers_remote_icon() {
        let mut harness = Harness::new();
        let rec = record(
            MessageKind::NameCard,
            Sender::Contact,
            r#"<msg username="gh_shop" nickname="Corner Shop" brandIconUrl="http://icon.example/a.png"/>"#,
        );
        let (block, _) = harness.render(&NameCardRenderer, &rec, &Serve(tiny_png(6, 6)));
        let lines = lines(&block);
        assert!(matches!(lines[0].spans[0], Span::Picture { .. }));
        assert_eq!(lines[1].plain_text(), "分享卡片");
        assert_eq!(lines[2].plain_text(), "Corner Shop");
    }

    #[test]
    fn name_card_falls_back_to_avatar_then_text() {
        let mut harness = Harness::new();
        let hash = md5_hex("wxid_friend");
        let bucket = harness
            .data()
            .join("avatar")
            .join(&hash[0..2])
            .join(&hash[2..4]);
        fs::create_dir_all(&bucket).expect("mkdir");
        fs::write(bucket.join(format!("user_{}.png", hash)), tiny_png(4, 4)).expect("write");
        harness.reindex();

        let with_avatar = record(
            MessageKind::NameCard,
            Sender::SelfUser,
            r#"<msg username="wxid_friend" nickname="" alias="lee"/>"#,
        );
        let (block, _) = harness.render(&NameCardRenderer, &with_avatar, &Offline);
        let card = lines(&block);
        assert!(matches!(card[0].spans[0], Span::Picture { .. }));
        assert_eq!(card[2].plain_text(), "lee");
        assert_eq!(card[2].align, Align::Right);

        let bare = record(
            MessageKind::NameCard,
            Sender::Contact,
            r#"<msg username="wxid_nobody" nickname="Nobody"/>"#,
        );
        let (block, _) = harness.render(&NameCardRenderer, &bare, &Offline);
        assert_eq!(lines(&block)[0].plain_text(), QUOTED_PICTURE);
    }

    #[test]
    fn money_cards_show_heading_and_detail() {
        let mut harness = Harness::new();
        let transfer = record(
            MessageKind::Transfer,
            Sender::Contact,
            "<msg><appmsg><des>收到转账0.01元</des></appmsg></msg>",
        );
        let (block, _) = harness.render(&TransferRenderer, &transfer, &Offline);
        assert_eq!(block.plain_text(), "[微信转账]\n收到转账0.01元");

        let envelope = record(
            MessageKind::RedEnvelope,
            Sender::SelfUser,
            "<msg><appmsg><wcpayinfo><sendertitle>恭喜发财，大吉大利</sendertitle></wcpayinfo></appmsg></msg>",
        );
        let (block, _) = harness.render(&RedEnvelopeRenderer, &envelope, &Offline);
        assert_eq!(block.plain_text(), "[微信红包]\n恭喜发财，大吉大利");

        let bare = record(MessageKind::RedEnvelope, Sender::Contact, "not markup");
        let (block, _) = harness.render(&RedEnvelopeRenderer, &bare, &Offline);
        assert_eq!(block.plain_text(), "[微信红包]");
    }

    #[test]
    fn app_message_joins_title_and_description() {
        let mut harness = Harness::new();
        let rec = record(
            MessageKind::AppMsg,
            Sender::Contact,
            "<msg><appmsg><title>步数排行</title><des>今日第1名</des></appmsg></msg>",
        );
        let (block, unrecognized) = harness.render(&AppMsgRenderer, &rec, &Offline);
        assert_eq!(block.plain_text(), "步数排行今日第1名");
        assert_eq!(unrecognized, 0);
    }

    #[test]
    fn app_message_keeps_every_title() {
        let mut harness = Harness::new();
        let rec = record(
            MessageKind::AppMsg,
            Sender::Contact,
            "<msg><appmsg><title>转发的卡片</title><mmreader><category><item><title>原文标题</title></item></category></mmreader></appmsg></msg>",
        );
        let (block, unrecognized) = harness.render(&AppMsgRenderer, &rec, &Offline);
        assert_eq!(block.plain_text(), "转发的卡片 原文标题");
        assert_eq!(unrecognized, 0);
    }
}
