//! Reply payloads: the reply text plus the message it quotes.
//!
//! The quoted body is stored differently depending on who sent the
//! original, and sometimes as an escaped nested document. Extractors are
//! tried in order; when none matches the quote is reported as
//! [`QuotedContent::Unrecognized`] instead of guessing.

use crate::markup::{decode_entities, tag_text};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Quoted bodies longer than this that carry markup are pictures.
const MARKUP_QUOTE_MIN_CHARS: usize = 40;

static ESCAPED_TITLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n?title&gt;(.*?)\n?&lt;/title&gt").expect("valid regex"));
static SELF_ORIGIN_CONTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"</msgsource>\n?<content>(.*?)\n?</content>").expect("valid regex")
});
static PLAIN_CONTENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<content>(.*?)</content>").expect("valid regex"));
static CONTENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n?<content>(.*?)\n?</content>").expect("valid regex"));
static STICKER_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&quot;http\*#\*//(.*?)&quot;&#x20;").expect("valid regex"));

/// What the quote line shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuotedContent {
    /// Plain quoted text.
    Text(String),
    /// The quoted message was a picture.
    Picture,
    /// The quoted message was a sticker with no usable address.
    AnimatedSticker,
    /// The quoted message was a sticker at `url`.
    StickerImage {
        /// Download address.
        url: String,
    },
    /// No extractor understood the payload.
    Unrecognized,
}

/// A decoded reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplyParts {
    /// The reply itself, when the payload has a `<title>`.
    pub reply: Option<String>,
    /// Display name of the quoted author.
    pub quoted_author: String,
    /// The quoted body.
    pub quoted: QuotedContent,
}

type Extractor = fn(&str, bool) -> Option<String>;

/// Ordered quote extractors; the first hit wins.
const EXTRACTORS: &[(&str, Extractor)] = &[
    ("escaped nested title", escaped_title),
    ("origin content", origin_content),
    ("content", any_content),
];

fn escaped_title(content: &str, _sent_by_self: bool) -> Option<String> {
    capture(&ESCAPED_TITLE, content)
}

fn origin_content(content: &str, sent_by_self: bool) -> Option<String> {
    if sent_by_self {
        capture(&SELF_ORIGIN_CONTENT, content)
    } else {
        capture(&PLAIN_CONTENT, content)
    }
}

fn any_content(content: &str, _sent_by_self: bool) -> Option<String> {
    capture(&CONTENT, content)
}

fn capture(re: &Regex, content: &str) -> Option<String> {
    re.captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Decode a reply payload.
pub fn parse_reply(content: &str, sent_by_self: bool) -> ReplyParts {
    let reply = tag_text(content, "title");
    let quoted_author = tag_text(content, "displayname").unwrap_or_default();

    let extracted = EXTRACTORS
        .iter()
        .find_map(|(name, extract)| extract(content, sent_by_self).map(|text| (*name, text)));

    let quoted = match extracted {
        Some((name, raw)) => {
            debug!("quote matched by {} extractor", name);
            classify_quote(&raw)
        }
        None => {
            warn!("reply quote not recognized: {}", preview(content));
            QuotedContent::Unrecognized
        }
    };

    ReplyParts {
        reply,
        quoted_author,
        quoted,
    }
}

/// Sort a raw quoted body into text, picture or sticker.
pub fn classify_quote(raw: &str) -> QuotedContent {
    let long = raw.chars().count() > MARKUP_QUOTE_MIN_CHARS;
    if long && raw.contains("xml") {
        return QuotedContent::Picture;
    }
    if long && raw.contains("&quot;http*#*//") {
        if let Some(rest) = capture(&STICKER_URL, raw) {
            return QuotedContent::StickerImage {
                url: format!("http://{}", rest),
            };
        }
    }
    if raw.contains("wxid") {
        return QuotedContent::AnimatedSticker;
    }
    QuotedContent::Text(decode_entities(raw))
}

fn preview(content: &str) -> String {
    content.chars().take(120).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reply_payload(refer: &str) -> String {
        format!(
            "<msg><appmsg><title>sounds good</title><refermsg><type>1</type>\
             <displayname>Mia</displayname>{}</refermsg></appmsg></msg>",
            refer
        )
    }

    #[test]
    fn plain_quote_from_contact() {
        let parts = parse_reply(&reply_payload("<content>see you at 7</content>"), false);
        assert_eq!(parts.reply.as_deref(), Some("sounds good"));
        assert_eq!(parts.quoted_author, "Mia");
        assert_eq!(parts.quoted, QuotedContent::Text("see you at 7".to_string()));
    }

    #[test]
    fn self_quote_follows_msgsource() {
        let payload = reply_payload("<msgsource>&lt;x/&gt;</msgsource>\n<content>lunch?</content>");
        let parts = parse_reply(&payload, true);
        assert_eq!(parts.quoted, QuotedContent::Text("lunch?".to_string()));
    }

    #[test]
    fn escaped_nested_title_wins() {
        let payload = reply_payload(
            "<content>&lt;msg&gt;&lt;title&gt;inner link&lt;/title&gt;&lt;/msg&gt;</content>",
        );
        let parts = parse_reply(&payload, false);
        assert_eq!(parts.quoted, QuotedContent::Text("inner link".to_string()));
    }

    #[test]
    fn long_markup_quote_is_a_picture() {
        let raw = "&lt;?xml version=\"1.0\"?&gt;&lt;msg&gt;&lt;img aeskey=\"0123456789\"/&gt;";
        assert_eq!(classify_quote(raw), QuotedContent::Picture);
    }

    #[test]
    fn sticker_quote_yields_url_or_fallback() {
        let raw = "&lt;emoji cdnurl=&quot;http*#*//emoji.example/abc&quot;&#x20;md5=&quot;ff&quot;";
        assert_eq!(
            classify_quote(raw),
            QuotedContent::StickerImage {
                url: "http://emoji.example/abc".to_string()
            }
        );
        assert_eq!(classify_quote("wxid_partner:123"), QuotedContent::AnimatedSticker);
    }

    #[test]
    fn short_markup_stays_text() {
        assert_eq!(
            classify_quote("xml is fun"),
            QuotedContent::Text("xml is fun".to_string())
        );
    }

    #[test]
    fn missing_quote_is_explicitly_unrecognized() {
        let parts = parse_reply("<msg><appmsg><title>hi</title></appmsg></msg>", false);
        assert_eq!(parts.quoted, QuotedContent::Unrecognized);
        assert_eq!(parts.quoted_author, "");

        let empty = parse_reply("", false);
        assert_eq!(empty.reply, None);
        assert_eq!(empty.quoted, QuotedContent::Unrecognized);
    }
}
