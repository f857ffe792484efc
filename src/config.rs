use crate::i18n::{parse_language_list, ActiveLanguage};
use anyhow::{bail, Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    // Storage
    pub database_url: String,

    // Server
    pub port: u16,

    // Admin access
    pub admin_user: String,
    pub admin_api_key: String,

    // Anti-forgery tokens
    pub token_secret: Option<String>,
    pub token_lifetime_secs: i64,

    // Languages
    pub active_languages: Vec<ActiveLanguage>,
    pub default_language: Option<String>,

    // Rendering
    pub max_render_depth: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let admin_api_key =
            std::env::var("ADMIN_API_KEY").context("ADMIN_API_KEY not set")?;
        if admin_api_key.trim().is_empty() {
            bail!("ADMIN_API_KEY must not be empty");
        }

        let active_languages = parse_language_list(
            &std::env::var("ACTIVE_LANGUAGES").unwrap_or_else(|_| "en:English".to_string()),
        )
        .context("Invalid ACTIVE_LANGUAGES")?;

        Ok(Self {
            // Storage
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://multilingual_text.db".to_string()),

            // Server
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8080),

            // Admin access
            admin_user: std::env::var("ADMIN_USER")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| "admin".to_string()),
            admin_api_key,

            // Anti-forgery tokens - a missing secret is generated per process
            token_secret: std::env::var("TOKEN_SECRET")
                .ok()
                .filter(|v| !v.is_empty()),
            token_lifetime_secs: std::env::var("TOKEN_LIFETIME_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &i64| *v >= 2)
                .unwrap_or(86_400),

            // Languages
            active_languages,
            default_language: std::env::var("DEFAULT_LANGUAGE")
                .ok()
                .filter(|v| !v.trim().is_empty()),

            // Rendering
            max_render_depth: std::env::var("MAX_RENDER_DEPTH")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|d: &usize| *d >= 1)
                .unwrap_or(8),
        })
    }
}
