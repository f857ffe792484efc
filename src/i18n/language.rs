//! Language type and request-side language matching.

/// Longest language code the storage column accepts.
pub const MAX_CODE_LEN: usize = 10;

/// A language the localization platform currently has enabled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveLanguage {
    /// Language code as stored in `text_variants.language_code` (e.g. "en", "fr-FR")
    pub code: String,

    /// Display name shown as the admin form label
    pub name: String,
}

impl ActiveLanguage {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
        }
    }
}

/// Per-request inputs for resolving the viewer's language.
#[derive(Debug, Clone, Default)]
pub struct LanguageHints {
    /// Explicit `lang` query parameter
    pub requested: Option<String>,

    /// Raw `Accept-Language` header value
    pub accept_language: Option<String>,
}

/// Check that `code` looks like a language tag: a 2-3 letter primary subtag
/// followed by optional `-`/`_` separated alphanumeric subtags.
pub fn is_valid_code(code: &str) -> bool {
    if code.is_empty() || code.len() > MAX_CODE_LEN {
        return false;
    }

    let mut parts = code.split(['-', '_']);
    let primary = parts.next().unwrap_or_default();
    if !(2..=3).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
        return false;
    }

    parts.all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_alphanumeric()))
}

fn normalize(code: &str) -> String {
    code.trim().to_ascii_lowercase().replace('_', "-")
}

fn primary_subtag(normalized: &str) -> &str {
    normalized.split('-').next().unwrap_or(normalized)
}

/// Pick the best active language for an `Accept-Language` header.
///
/// Tags are tried by descending quality (header order breaks ties). For each
/// tag an exact match wins, then an active code equal to the tag's primary
/// subtag, then any active code sharing the primary subtag.
pub(super) fn match_accept_language(header: &str, active: &[ActiveLanguage]) -> Option<String> {
    let mut tags: Vec<(String, f32)> = header
        .split(',')
        .filter_map(|part| {
            let mut pieces = part.split(';');
            let tag = normalize(pieces.next()?);
            if tag.is_empty() || tag == "*" {
                return None;
            }
            // Missing q means 1.0; an unreadable one drops the tag
            let quality = match pieces.find_map(|p| p.trim().strip_prefix("q=")) {
                Some(q) => q.trim().parse::<f32>().unwrap_or(0.0),
                None => 1.0,
            };
            Some((tag, quality))
        })
        .filter(|(_, q)| *q > 0.0)
        .collect();

    // sort_by is stable, so equal qualities keep header order
    tags.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    let normalized: Vec<(String, &ActiveLanguage)> =
        active.iter().map(|l| (normalize(&l.code), l)).collect();

    for (tag, _) in &tags {
        if let Some((_, lang)) = normalized.iter().find(|(code, _)| code == tag) {
            return Some(lang.code.clone());
        }

        let primary = primary_subtag(tag);
        if let Some((_, lang)) = normalized.iter().find(|(code, _)| code == primary) {
            return Some(lang.code.clone());
        }

        if let Some((_, lang)) = normalized
            .iter()
            .find(|(code, _)| primary_subtag(code) == primary)
        {
            return Some(lang.code.clone());
        }
    }

    None
}
