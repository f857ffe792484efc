//! Placeholder syntax: `[multilingual_text id="5" class="note"]`.
//!
//! Attribute values may be double-quoted, single-quoted or bare, names are
//! case-insensitive and a self-closing `/]` is accepted. Doubling the
//! brackets (`[[multilingual_text id="5"]]`) escapes a placeholder so it is
//! printed literally instead of rendered.

use regex::Regex;
use std::collections::HashMap;
use std::ops::Range;
use std::sync::OnceLock;

/// Placeholder tag name.
pub const TAG: &str = "multilingual_text";

/// Parsed attributes of one placeholder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Placeholder {
    /// Positive entry id; `None` when missing, zero or non-numeric
    pub id: Option<i64>,
    /// Non-blank CSS class for the wrapping container
    pub class: Option<String>,
}

/// A placeholder occurrence in a piece of content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Render this placeholder in place of `span`
    Render {
        span: Range<usize>,
        placeholder: Placeholder,
    },
    /// Escaped placeholder; replace `span` with `literal`
    Literal { span: Range<usize>, literal: String },
}

impl Segment {
    pub fn span(&self) -> &Range<usize> {
        match self {
            Segment::Render { span, .. } | Segment::Literal { span, .. } => span,
        }
    }
}

fn tag_regex() -> &'static Regex {
    static TAG_RE: OnceLock<Regex> = OnceLock::new();
    TAG_RE.get_or_init(|| {
        Regex::new(r"\[(\[?)multilingual_text(\s[^\]]*)?/?\](\]?)").expect("valid tag regex")
    })
}

fn attr_regex() -> &'static Regex {
    static ATTR_RE: OnceLock<Regex> = OnceLock::new();
    ATTR_RE.get_or_init(|| {
        Regex::new(r#"([A-Za-z_][\w-]*)\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"']+))"#)
            .expect("valid attribute regex")
    })
}

/// Find every placeholder in `content`, in order of appearance.
pub fn scan(content: &str) -> Vec<Segment> {
    tag_regex()
        .captures_iter(content)
        .filter_map(|cap| {
            let whole = cap.get(0)?;
            let span = whole.start()..whole.end();
            let escaped = !cap[1].is_empty() && !cap[3].is_empty();

            if escaped {
                let text = whole.as_str();
                return Some(Segment::Literal {
                    span,
                    literal: text[1..text.len() - 1].to_string(),
                });
            }

            // A single stray bracket on either side stays in the output
            let open = cap[1].len();
            let close = cap[3].len();
            let span = span.start + open..span.end - close;
            let attrs = cap.get(2).map(|m| m.as_str()).unwrap_or_default();

            Some(Segment::Render {
                span,
                placeholder: parse_attributes(attrs),
            })
        })
        .collect()
}

/// Parse the attribute text of a placeholder.
pub fn parse_attributes(attrs: &str) -> Placeholder {
    let attrs = attrs.trim_end().trim_end_matches('/');
    let values: HashMap<String, String> = attr_regex()
        .captures_iter(attrs)
        .map(|cap| {
            let value = cap
                .get(2)
                .or_else(|| cap.get(3))
                .or_else(|| cap.get(4))
                .map(|m| m.as_str())
                .unwrap_or_default();
            (cap[1].to_ascii_lowercase(), value.to_string())
        })
        .collect();

    Placeholder {
        id: values.get("id").and_then(|v| parse_entry_id(v)),
        class: values
            .get("class")
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
    }
}

/// Leading-digits integer parse; `"12abc"` is 12, `"abc"` and `"0"` are `None`.
pub fn parse_entry_id(value: &str) -> Option<i64> {
    let digits: String = value
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<i64>().ok().filter(|id| *id > 0)
}

/// Copy-paste snippet shown in the admin list.
pub fn snippet(entry_id: i64) -> String {
    format!("[{} id=\"{}\"]", TAG, entry_id)
}
