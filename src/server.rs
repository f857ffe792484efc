use crate::admin::{self, AdminContext, AdminQuery, AjaxSaveRequest, ADMIN_PATH, AJAX_SAVE_PATH};
use crate::config::Config;
use crate::db::Database;
use crate::error::{AjaxError, AppError};
use crate::i18n::{LanguageHints, LanguageProvider, LanguageRegistry};
use crate::render::Renderer;
use crate::security::{Principal, TokenStore};
use crate::shortcode::parse_entry_id;
use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::header::{ACCEPT_LANGUAGE, AUTHORIZATION};
use axum::http::HeaderMap;
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub languages: Arc<dyn LanguageProvider>,
    pub tokens: TokenStore,
}

impl AppState {
    /// Build state from configuration, with the configuration-backed
    /// language registry as the language provider.
    pub fn new(config: Config, db: Database) -> Result<Self> {
        let languages = LanguageRegistry::new(
            config.active_languages.clone(),
            config.default_language.as_deref(),
        )?;

        let tokens = match &config.token_secret {
            Some(secret) => TokenStore::new(secret.as_bytes(), config.token_lifetime_secs),
            None => {
                warn!("TOKEN_SECRET not set; admin tokens will not survive a restart");
                TokenStore::with_random_secret(config.token_lifetime_secs)?
            }
        };

        Ok(Self {
            config: Arc::new(config),
            db,
            languages: Arc::new(languages),
            tokens,
        })
    }

    fn principal(&self, headers: &HeaderMap) -> Principal {
        let authorization = headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        Principal::from_authorization(
            authorization,
            &self.config.admin_user,
            &self.config.admin_api_key,
        )
    }

    fn viewer_language(&self, requested: Option<String>, headers: &HeaderMap) -> String {
        let hints = LanguageHints {
            requested,
            accept_language: headers
                .get(ACCEPT_LANGUAGE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        };
        self.languages.current_language(&hints)
    }

    fn renderer(&self) -> Renderer<'_> {
        Renderer::new(
            &self.db,
            self.languages.as_ref(),
            self.config.max_render_depth,
        )
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/render", post(render_content))
        .route("/render/:id", get(render_entry))
        .route(ADMIN_PATH, get(admin_page).post(admin_save))
        .route(AJAX_SAVE_PATH, post(ajax_save))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

#[derive(Debug, Default, Deserialize)]
struct RenderQuery {
    class: Option<String>,
    lang: Option<String>,
}

/// `GET /render/:id`: one entry as an HTML fragment
async fn render_entry(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<RenderQuery>,
    headers: HeaderMap,
) -> Result<Html<String>, AppError> {
    let Some(entry_id) = parse_entry_id(&id) else {
        return Ok(Html(String::new()));
    };

    let language = state.viewer_language(query.lang, &headers);
    let output = state
        .renderer()
        .render(entry_id, query.class.as_deref(), &language)
        .await?;

    Ok(Html(output))
}

/// `POST /render`: expand every placeholder in the request body
async fn render_content(
    State(state): State<AppState>,
    Query(query): Query<RenderQuery>,
    headers: HeaderMap,
    body: String,
) -> Result<Html<String>, AppError> {
    let language = state.viewer_language(query.lang, &headers);
    let output = state.renderer().expand(&body, &language).await?;
    Ok(Html(output))
}

async fn admin_page(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AdminQuery>,
) -> Result<Html<String>, AppError> {
    let principal = state.principal(&headers);
    let ctx = AdminContext {
        principal: &principal,
        tokens: &state.tokens,
        languages: state.languages.as_ref(),
        db: &state.db,
    };

    Ok(Html(admin::show_page(&ctx, &query).await?))
}

async fn admin_save(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<AdminQuery>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Result<Html<String>, AppError> {
    let principal = state.principal(&headers);
    let ctx = AdminContext {
        principal: &principal,
        tokens: &state.tokens,
        languages: state.languages.as_ref(),
        db: &state.db,
    };

    Ok(Html(admin::save_form(&ctx, &query, &fields).await?))
}

async fn ajax_save(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<AjaxSaveRequest>, JsonRejection>,
) -> Result<Json<Value>, AjaxError> {
    let principal = state.principal(&headers);
    let ctx = AdminContext {
        principal: &principal,
        tokens: &state.tokens,
        languages: state.languages.as_ref(),
        db: &state.db,
    };

    // Anonymous callers are turned away before the body is looked at
    ctx.authorize()?;
    let Json(payload) =
        payload.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let outcome = admin::ajax_save(&ctx, payload).await?;
    Ok(Json(json!({
        "success": true,
        "data": { "entry_id": outcome.entry_id },
    })))
}
