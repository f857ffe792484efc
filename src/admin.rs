//! Admin settings page.
//!
//! One page drives everything through request parameters:
//!
//! - list state (default): saved entries with their placeholder snippet
//! - edit state (`edit=<id>`): the form pre-filled with that entry's texts
//! - save transition (`POST` with a save token)
//! - delete transition (`action=delete&entry_id=<id>` with a delete token)
//!
//! Every state and transition requires [`Capability::ManageOptions`].

use crate::db::{Database, SaveOutcome, SaveRequest};
use crate::error::AppError;
use crate::html;
use crate::i18n::{ActiveLanguage, LanguageProvider};
use crate::security::{Capability, Principal, TokenAction, TokenStore};
use crate::shortcode::{self, parse_entry_id};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Path the admin page is served under.
pub const ADMIN_PATH: &str = "/admin";

/// Path of the asynchronous save endpoint.
pub const AJAX_SAVE_PATH: &str = "/admin/ajax/save";

/// Everything an admin handler needs for one request.
pub struct AdminContext<'a> {
    pub principal: &'a Principal,
    pub tokens: &'a TokenStore,
    pub languages: &'a dyn LanguageProvider,
    pub db: &'a Database,
}

impl AdminContext<'_> {
    /// Check the capability and return the session user tokens are bound to.
    pub fn authorize(&self) -> Result<&str, AppError> {
        match self.principal.user() {
            Some(user) if self.principal.has_capability(Capability::ManageOptions) => Ok(user),
            _ => Err(AppError::Unauthorized),
        }
    }

    fn check_token(&self, action: TokenAction, token: Option<&str>) -> Result<(), AppError> {
        let user = self.authorize()?;
        if self.tokens.verify(action, user, token.unwrap_or_default()) {
            Ok(())
        } else {
            warn!("Rejected {} token for {}", action.as_str(), user);
            Err(AppError::InvalidToken)
        }
    }

    async fn apply_save(&self, request: &SaveRequest) -> Result<SaveOutcome, AppError> {
        let outcome = self
            .db
            .save_variants(request, &self.languages.active_languages())
            .await?;
        info!(
            "Saved {} variant(s) for entry {:?}",
            outcome.saved, outcome.entry_id
        );
        Ok(outcome)
    }
}

/// Query parameters of the admin page.
#[derive(Debug, Default, Deserialize)]
pub struct AdminQuery {
    pub edit: Option<String>,
    pub action: Option<String>,
    pub entry_id: Option<String>,
    #[serde(rename = "_token")]
    pub token: Option<String>,
}

impl AdminQuery {
    fn edit_entry_id(&self) -> Option<i64> {
        self.edit.as_deref().and_then(parse_entry_id)
    }
}

/// JSON body of the asynchronous save endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct AjaxSaveRequest {
    /// A number or numeric string; anything else means a new entry
    #[serde(default, deserialize_with = "lenient_entry_id")]
    pub entry_id: Option<i64>,
    #[serde(default)]
    pub texts: BTreeMap<String, String>,
    #[serde(default)]
    pub nonce: String,
}

fn lenient_entry_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_i64().filter(|id| *id > 0),
        Some(serde_json::Value::String(s)) => parse_entry_id(&s),
        _ => None,
    })
}

/// Banner shown above the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

/// Parse posted form fields into a typed save request.
///
/// `entry_id` is the hidden entry field, `text[<code>]` the per-language
/// textareas and `_token` the save token. Unknown fields are ignored.
pub fn parse_save_form(fields: &[(String, String)]) -> (SaveRequest, Option<String>) {
    let mut entry_id = None;
    let mut token = None;
    let mut variants = BTreeMap::new();

    for (name, value) in fields {
        match name.as_str() {
            "entry_id" => entry_id = parse_entry_id(value),
            "_token" => token = Some(value.clone()),
            _ => {
                if let Some(code) = name
                    .strip_prefix("text[")
                    .and_then(|rest| rest.strip_suffix(']'))
                {
                    variants.insert(code.to_string(), value.clone());
                }
            }
        }
    }

    let mut request = SaveRequest::new(entry_id);
    request.variants = variants;
    (request, token)
}

/// `GET /admin`: list or edit state, plus the delete transition.
pub async fn show_page(ctx: &AdminContext<'_>, query: &AdminQuery) -> Result<String, AppError> {
    ctx.authorize()?;
    let mut notices = Vec::new();

    if query.action.as_deref() == Some("delete") && query.entry_id.is_some() {
        ctx.check_token(TokenAction::DeleteEntry, query.token.as_deref())?;

        if let Some(entry_id) = query.entry_id.as_deref().and_then(parse_entry_id) {
            let removed = ctx.db.delete_entry(entry_id).await?;
            info!("Deleted entry {} ({} variant(s))", entry_id, removed);
        }
        notices.push(Notice::Success("Entry deleted.".to_string()));
    }

    build_page(ctx, query, notices).await
}

/// `POST /admin`: save transition, then the page again.
pub async fn save_form(
    ctx: &AdminContext<'_>,
    query: &AdminQuery,
    fields: &[(String, String)],
) -> Result<String, AppError> {
    let (request, token) = parse_save_form(fields);
    ctx.check_token(TokenAction::SaveText, token.as_deref())?;

    ctx.apply_save(&request).await?;

    let notices = vec![Notice::Success("Text saved successfully.".to_string())];
    build_page(ctx, query, notices).await
}

/// Asynchronous save: same rules as the form, answers with the entry id.
pub async fn ajax_save(
    ctx: &AdminContext<'_>,
    payload: AjaxSaveRequest,
) -> Result<SaveOutcome, AppError> {
    ctx.check_token(TokenAction::AjaxSave, Some(payload.nonce.as_str()))?;

    let mut request = SaveRequest::new(payload.entry_id);
    request.variants = payload.texts;
    ctx.apply_save(&request).await
}

async fn build_page(
    ctx: &AdminContext<'_>,
    query: &AdminQuery,
    mut notices: Vec<Notice>,
) -> Result<String, AppError> {
    let user = ctx.authorize()?;
    let languages = ctx.languages.active_languages();
    if languages.is_empty() {
        notices.push(Notice::Error(
            "Multilingual Text Display requires at least one active language. Set ACTIVE_LANGUAGES."
                .to_string(),
        ));
    }

    let edit_entry_id = query.edit_entry_id();
    let edit_texts = match edit_entry_id {
        Some(id) => ctx.db.get_all_variants(id).await?,
        None => BTreeMap::new(),
    };

    let view = PageView {
        notices,
        languages,
        edit_entry_id,
        edit_texts,
        entry_ids: ctx.db.list_entry_ids().await?,
        save_token: ctx.tokens.issue(TokenAction::SaveText, user),
        delete_token: ctx.tokens.issue(TokenAction::DeleteEntry, user),
        ajax_token: ctx.tokens.issue(TokenAction::AjaxSave, user),
    };

    Ok(render_page(&view))
}

/// Data the settings page is rendered from.
#[derive(Debug, Clone, Default)]
pub struct PageView {
    pub notices: Vec<Notice>,
    pub languages: Vec<ActiveLanguage>,
    pub edit_entry_id: Option<i64>,
    pub edit_texts: BTreeMap<String, String>,
    pub entry_ids: Vec<i64>,
    pub save_token: String,
    pub delete_token: String,
    pub ajax_token: String,
}

pub fn render_page(view: &PageView) -> String {
    let mut out = String::with_capacity(4096);

    out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
    out.push_str("<title>Multilingual Text Display</title>\n");
    out.push_str(&format!(
        "<meta name=\"ajax-save-url\" content=\"{}\">\n<meta name=\"ajax-nonce\" content=\"{}\">\n",
        AJAX_SAVE_PATH,
        html::escape(&view.ajax_token)
    ));
    out.push_str("</head>\n<body>\n<div class=\"wrap\">\n");
    out.push_str("<h1>Multilingual Text Display</h1>\n");

    for notice in &view.notices {
        let (class, message) = match notice {
            Notice::Success(m) => ("updated", m),
            Notice::Error(m) => ("error", m),
        };
        out.push_str(&format!(
            "<div class=\"{}\"><p>{}</p></div>\n",
            class,
            html::escape(message)
        ));
    }

    // Form
    let entry_id = view.edit_entry_id.unwrap_or(0);
    let action = match view.edit_entry_id {
        Some(id) => format!("{}?edit={}", ADMIN_PATH, id),
        None => ADMIN_PATH.to_string(),
    };
    out.push_str("<h2>Add/Edit Text Entry</h2>\n");
    out.push_str(&format!(
        "<form method=\"post\" action=\"{}\">\n",
        html::escape(&action)
    ));
    out.push_str(&format!(
        "<input type=\"hidden\" name=\"_token\" value=\"{}\">\n",
        html::escape(&view.save_token)
    ));
    out.push_str(&format!(
        "<input type=\"hidden\" name=\"entry_id\" value=\"{}\">\n",
        entry_id
    ));
    out.push_str("<table class=\"form-table\">\n");
    for lang in &view.languages {
        let code = html::escape(&lang.code);
        let text = view
            .edit_texts
            .get(&lang.code)
            .map(|t| html::escape(t))
            .unwrap_or_default();
        out.push_str(&format!(
            "<tr><th><label for=\"text_{code}\">{name}</label></th>\
             <td><textarea name=\"text[{code}]\" id=\"text_{code}\" rows=\"4\" cols=\"50\">{text}</textarea></td></tr>\n",
            code = code,
            name = html::escape(&lang.name),
            text = text,
        ));
    }
    out.push_str("</table>\n");
    out.push_str(
        "<p class=\"submit\"><input type=\"submit\" name=\"submit\" class=\"button-primary\" value=\"Save Text\"></p>\n",
    );
    out.push_str("</form>\n");

    // Saved entries
    out.push_str("<h2>Saved Entries</h2>\n");
    out.push_str("<table class=\"wp-list-table widefat fixed striped\">\n");
    out.push_str("<thead><tr><th>Entry ID</th><th>Shortcode</th><th>Actions</th></tr></thead>\n<tbody>\n");
    for id in &view.entry_ids {
        out.push_str(&format!(
            "<tr><td>{id}</td><td><code>{snippet}</code></td><td>\
             <a href=\"{path}?edit={id}\" class=\"button\">Edit</a> \
             <a href=\"{path}?action=delete&amp;entry_id={id}&amp;_token={token}\" class=\"button\" \
             onclick=\"return confirm('{confirm}');\">Delete</a></td></tr>\n",
            id = id,
            snippet = html::escape(&shortcode::snippet(*id)),
            path = ADMIN_PATH,
            token = html::escape(&view.delete_token),
            confirm = html::escape_js("Are you sure?"),
        ));
    }
    out.push_str("</tbody>\n</table>\n</div>\n</body>\n</html>\n");

    out
}
