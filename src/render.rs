//! Placeholder rendering.
//!
//! Stored text may embed further placeholders, so rendering is re-entrant.
//! The renderer keeps the chain of entry ids currently being expanded: an id
//! that is already on the chain (a cycle) or a chain longer than the
//! configured depth renders as an empty string instead of recursing.

use crate::db::Database;
use crate::html;
use crate::i18n::LanguageProvider;
use crate::shortcode::{self, Segment};
use anyhow::Result;
use futures::future::{BoxFuture, FutureExt};
use tracing::warn;

pub struct Renderer<'a> {
    db: &'a Database,
    languages: &'a dyn LanguageProvider,
    max_depth: usize,
}

impl<'a> Renderer<'a> {
    /// `max_depth` counts the top-level entry, so it is at least 1.
    pub fn new(db: &'a Database, languages: &'a dyn LanguageProvider, max_depth: usize) -> Self {
        Self {
            db,
            languages,
            max_depth: max_depth.max(1),
        }
    }

    /// Render one entry for a viewer.
    ///
    /// Falls back to the default language when the viewer's language has no
    /// variant. Missing content renders as an empty string; only storage
    /// errors are returned as `Err`.
    pub async fn render(
        &self,
        entry_id: i64,
        class: Option<&str>,
        viewer_language: &str,
    ) -> Result<String> {
        let mut chain = Vec::new();
        self.render_entry(entry_id, class, viewer_language, &mut chain)
            .await
    }

    /// Replace every placeholder in `content` with its rendered output.
    pub async fn expand(&self, content: &str, viewer_language: &str) -> Result<String> {
        let mut chain = Vec::new();
        self.expand_content(content, viewer_language, &mut chain)
            .await
    }

    /// Text for the viewer's language, else for the default language.
    async fn lookup(&self, entry_id: i64, viewer_language: &str) -> Result<Option<String>> {
        if let Some(text) = self.db.get_variant(entry_id, viewer_language).await? {
            if !text.is_empty() {
                return Ok(Some(text));
            }
        }

        let default_language = self.languages.default_language();
        if default_language == viewer_language {
            return Ok(None);
        }

        Ok(self
            .db
            .get_variant(entry_id, &default_language)
            .await?
            .filter(|text| !text.is_empty()))
    }

    fn render_entry<'b>(
        &'b self,
        entry_id: i64,
        class: Option<&'b str>,
        viewer_language: &'b str,
        chain: &'b mut Vec<i64>,
    ) -> BoxFuture<'b, Result<String>> {
        async move {
            if entry_id <= 0 {
                return Ok(String::new());
            }
            if chain.contains(&entry_id) {
                warn!(
                    "Placeholder cycle detected: entry {} is already being rendered ({:?})",
                    entry_id, chain
                );
                return Ok(String::new());
            }
            if chain.len() >= self.max_depth {
                warn!(
                    "Placeholder nesting deeper than {} levels, skipping entry {}",
                    self.max_depth, entry_id
                );
                return Ok(String::new());
            }

            let text = match self.lookup(entry_id, viewer_language).await? {
                Some(text) => text,
                None => return Ok(String::new()),
            };

            chain.push(entry_id);
            let expanded = self.expand_content(&text, viewer_language, chain).await;
            chain.pop();
            let output = expanded?;

            Ok(match class.map(str::trim).filter(|c| !c.is_empty()) {
                Some(class) => format!("<div class=\"{}\">{}</div>", html::escape(class), output),
                None => output,
            })
        }
        .boxed()
    }

    fn expand_content<'b>(
        &'b self,
        content: &'b str,
        viewer_language: &'b str,
        chain: &'b mut Vec<i64>,
    ) -> BoxFuture<'b, Result<String>> {
        async move {
            let segments = shortcode::scan(content);
            if segments.is_empty() {
                return Ok(content.to_string());
            }

            let mut result = String::with_capacity(content.len());
            let mut last_end = 0;

            for segment in segments {
                let span = segment.span().clone();
                result.push_str(&content[last_end..span.start]);

                match segment {
                    Segment::Literal { literal, .. } => result.push_str(&literal),
                    Segment::Render { placeholder, .. } => {
                        if let Some(id) = placeholder.id {
                            let rendered = self
                                .render_entry(id, placeholder.class.as_deref(), viewer_language, chain)
                                .await?;
                            result.push_str(&rendered);
                        }
                    }
                }

                last_end = span.end;
            }

            result.push_str(&content[last_end..]);
            Ok(result)
        }
        .boxed()
    }
}
