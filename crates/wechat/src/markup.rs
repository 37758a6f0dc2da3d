//! Tag and attribute extraction from message payload markup.
//!
//! Payloads are XML-like but frequently malformed (unescaped text, stray
//! headers, nested escaped documents), so extraction is pattern based and
//! tolerant rather than a strict parse.

use once_cell::sync::Lazy;
use regex::Regex;

static XML_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"<\?.*?\?>").expect("valid regex"));
static NUMERIC_ENTITY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|[0-9]+);").expect("valid regex"));
static CDN_URL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"cdnurl\s*=\s*"([^"]*)""#).expect("valid regex"));
static OPEN_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<([A-Za-z_][\w:.-]*)((?:\s|/)[^<>]*)?>").expect("valid regex")
});
static ATTRIBUTE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"([\w:.-]+)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("valid regex")
});

/// Drop any `<?xml ...?>` processing header.
pub fn strip_xml_header(content: &str) -> String {
    XML_HEADER.replace_all(content, "").into_owned()
}

/// Opening tags named `name`: the byte offset just past each, and its
/// attribute text.
fn open_tags<'c>(content: &'c str, name: &'c str) -> impl Iterator<Item = (usize, &'c str)> + 'c {
    OPEN_TAG
        .captures_iter(content)
        .filter(move |caps| &caps[1] == name)
        .filter_map(|caps| {
            let end = caps.get(0)?.end();
            Some((end, caps.get(2).map_or("", |m| m.as_str())))
        })
}

/// Text of the first `<tag>` element, CDATA unwrapped and entities decoded.
///
/// Returns `None` when the element is absent; an empty element yields
/// `Some("")`.
pub fn tag_text(content: &str, tag: &str) -> Option<String> {
    let close = format!("</{}>", tag);
    let (start, _) = open_tags(content, tag).find(|(_, attrs)| !attrs.ends_with('/'))?;
    let len = content[start..].find(&close)?;
    let inner = &content[start..start + len];
    Some(decode_entities(unwrap_cdata(inner.trim())))
}

/// Like [`tag_text`] but treats an empty element as absent.
pub fn non_empty_tag_text(content: &str, tag: &str) -> Option<String> {
    tag_text(content, tag).filter(|text| !text.is_empty())
}

/// Every non-empty `<tag>` text in document order.
pub fn all_tag_texts(content: &str, tag: &str) -> Vec<String> {
    let close = format!("</{}>", tag);
    let mut texts = Vec::new();
    let mut rest = content;
    while let Some((start, _)) = open_tags(rest, tag).find(|(_, attrs)| !attrs.ends_with('/')) {
        let Some(len) = rest[start..].find(&close) else {
            break;
        };
        let text = decode_entities(unwrap_cdata(rest[start..start + len].trim()));
        if !text.is_empty() {
            texts.push(text);
        }
        rest = &rest[start + len + close.len()..];
    }
    texts
}

/// Attribute `name` on the first `<element ...>` opening tag.
pub fn attr(content: &str, element: &str, name: &str) -> Option<String> {
    let (_, attrs) = open_tags(content, element).next()?;
    ATTRIBUTE
        .captures_iter(attrs)
        .find(|caps| &caps[1] == name)
        .and_then(|caps| caps.get(2).or_else(|| caps.get(3)))
        .map(|raw| decode_entities(raw.as_str()))
}

/// Sticker CDN address embedded as `cdnurl = "..."`.
///
/// The app stores `:` as `*#*` and doubles `&amp;` escapes.
pub fn sticker_cdn_url(content: &str) -> Option<String> {
    let raw = CDN_URL.captures(content)?.get(1)?.as_str();
    if raw.is_empty() {
        return None;
    }
    Some(raw.replace("*#*", ":").replace("amp;", ""))
}

/// Strip a surrounding `<![CDATA[ ... ]]>`.
pub fn unwrap_cdata(text: &str) -> &str {
    text.strip_prefix("<![CDATA[")
        .and_then(|rest| rest.strip_suffix("]]>"))
        .unwrap_or(text)
}

/// Decode the five named XML entities and numeric character references.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let numeric = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures<'_>| {
        let body = &caps[1];
        let code = match body.strip_prefix('x') {
            Some(hex) => u32::from_str_radix(hex, 16).ok(),
            None => body.parse::<u32>().ok(),
        };
        code.and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });
    numeric
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Remove characters that cannot appear in document XML.
pub fn strip_control_chars(text: &str) -> String {
    text.chars()
        .filter(|c| {
            let code = *c as u32;
            !matches!(code, 0x00..=0x08 | 0x0B | 0x0C | 0x0E..=0x1F | 0x7F..=0x9F)
        })
        .collect()
}
