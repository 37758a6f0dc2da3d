//! Centered one-line notices: system messages and pats.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

const FROM_PLACEHOLDER: &str = "${fromusername@textstatusicon}";
const PATTED_PLACEHOLDER: &str = "${pattedusername@textstatusicon}";

const EXPIRING_TRANSFER: &str = "你有一笔待接收的转账，将于2小时后过期";

static PAT_TEMPLATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<template><!\[CDATA\[(.*?)]]></template>").expect("valid regex")
});

/// Notice text and whether a known rule produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Text to show.
    pub text: String,
    /// False when the content was shown raw because no rule matched.
    pub recognized: bool,
}

enum Rewrite {
    Keep,
    ClaimedBy,
    Fixed(&'static str),
}

const SYSTEM_RULES: &[(&str, Rewrite)] = &[
    ("撤回", Rewrite::Keep),
    ("领取", Rewrite::ClaimedBy),
    ("拒收", Rewrite::Keep),
    ("将于2小时后过期", Rewrite::Fixed(EXPIRING_TRANSFER)),
    ("收款方24小时内未接收你的", Rewrite::Fixed(EXPIRING_TRANSFER)),
    ("24小时内未接收，已过期", Rewrite::Fixed(EXPIRING_TRANSFER)),
    ("你有一笔待接收的", Rewrite::Fixed("你有一笔待接收的转账")),
];

/// Rewrite a system message; `contact_label` names the partner.
pub fn system_notice(content: &str, contact_label: &str) -> Notice {
    for (keyword, rewrite) in SYSTEM_RULES {
        if !content.contains(keyword) {
            continue;
        }
        let text = match rewrite {
            Rewrite::Keep => content.to_string(),
            Rewrite::ClaimedBy => format!("{}领取了你的红包", contact_label),
            Rewrite::Fixed(text) => (*text).to_string(),
        };
        return Notice {
            text,
            recognized: true,
        };
    }

    warn!("unhandled system message: {}", content);
    Notice {
        text: content.to_string(),
        recognized: false,
    }
}

/// Render a pat from its CDATA template.
pub fn pat_notice(content: &str, contact_label: &str) -> Notice {
    let Some(template) = PAT_TEMPLATE
        .captures(content)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
    else {
        warn!("pat without template: {}", content);
        return Notice {
            text: content.to_string(),
            recognized: false,
        };
    };

    let text = if template.starts_with('我') {
        template.to_string()
    } else {
        let parts: Vec<&str> = if template.contains("\"\"") {
            template.split("\"\"").collect()
        } else {
            template.split('"').collect()
        };
        match parts.get(2) {
            Some(rest) => format!("\"{}\"{}", contact_label, rest),
            None => template.to_string(),
        }
    };

    Notice {
        text: text
            .replace(FROM_PLACEHOLDER, "")
            .replace(PATTED_PLACEHOLDER, "")
            .replace(' ', ""),
        recognized: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_rules_rewrite_known_notices() {
        assert_eq!(system_notice("Mia领取了你的红包", "Mia").text, "Mia领取了你的红包");
        assert_eq!(
            system_notice("\"Mia\" 领取了红包", "Mia").text,
            "Mia领取了你的红包"
        );
        assert_eq!(
            system_notice("收款方24小时内未接收你的转账，已退还", "Mia").text,
            EXPIRING_TRANSFER
        );
        assert_eq!(
            system_notice("你有一笔待接收的转账（¥5）", "Mia").text,
            "你有一笔待接收的转账"
        );
        let withdrawn = system_notice("你撤回了一条消息", "Mia");
        assert_eq!(withdrawn.text, "你撤回了一条消息");
        assert!(withdrawn.recognized);
    }

    #[test]
    fn unknown_system_message_is_shown_raw() {
        let notice = system_notice("你已添加了Mia，现在可以开始聊天了。", "Mia");
        assert_eq!(notice.text, "你已添加了Mia，现在可以开始聊天了。");
        assert!(!notice.recognized);
    }

    #[test]
    fn pat_from_contact_quotes_label() {
        let content = r#"<sysmsg type="pat"><pat><template><![CDATA["${fromusername@textstatusicon}" 拍了拍我]]></template></pat></sysmsg>"#;
        let notice = pat_notice(content, "Mia");
        assert_eq!(notice.text, "\"Mia\"拍了拍我");
        assert!(notice.recognized);
    }

    #[test]
    fn self_initiated_pat_keeps_template() {
        let content = r#"<template><![CDATA[我拍了拍 "${pattedusername@textstatusicon}" 的头]]></template>"#;
        assert_eq!(pat_notice(content, "Mia").text, "我拍了拍\"\"的头");
    }

    #[test]
    fn pat_without_template_is_unrecognized() {
        let notice = pat_notice("<sysmsg/>", "Mia");
        assert!(!notice.recognized);
        assert_eq!(notice.text, "<sysmsg/>");
    }
}
