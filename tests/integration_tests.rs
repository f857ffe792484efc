//! Integration tests for the multilingual text service
//!
//! Each test starts the full axum router on an ephemeral port backed by a
//! temporary SQLite database and talks to it over HTTP.

use reqwest::StatusCode;
use serde_json::{json, Value};
use tempfile::TempDir;

use multilingual_text::{
    config::Config,
    db::Database,
    i18n::ActiveLanguage,
    security::TokenAction,
    server::{router, AppState},
};

const API_KEY: &str = "test-admin-key";

// ==================== Test Helpers ====================

struct TestApp {
    base_url: String,
    state: AppState,
    client: reqwest::Client,
    _temp_dir: TempDir,
}

impl TestApp {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn token(&self, action: TokenAction) -> String {
        self.state.tokens.issue(action, "admin")
    }

    fn languages(&self) -> Vec<ActiveLanguage> {
        self.state.languages.active_languages()
    }
}

/// Create a test config (languages en/fr/de, default en)
fn create_test_config(temp_dir: &TempDir) -> Config {
    Config {
        database_url: format!("sqlite://{}", temp_dir.path().join("app.db").display()),
        port: 0,
        admin_user: "admin".to_string(),
        admin_api_key: API_KEY.to_string(),
        token_secret: Some("integration-secret".to_string()),
        token_lifetime_secs: 86_400,
        active_languages: vec![
            ActiveLanguage::new("en", "English"),
            ActiveLanguage::new("fr", "Français"),
            ActiveLanguage::new("de", "Deutsch"),
        ],
        default_language: Some("en".to_string()),
        max_render_depth: 8,
    }
}

async fn spawn_app() -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let config = create_test_config(&temp_dir);

    let db = Database::new(&config.database_url)
        .await
        .expect("Failed to open database");
    db.install().await.expect("Failed to install");

    let state = AppState::new(config, db).expect("Failed to build state");
    let app = router(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server error");
    });

    TestApp {
        base_url: format!("http://{}", addr),
        state,
        client: reqwest::Client::new(),
        _temp_dir: temp_dir,
    }
}

/// Seed entry 5 with {"en": "Hello", "fr": "Bonjour"}
async fn seed_hello(app: &TestApp) {
    let langs = app.languages();
    app.state
        .db
        .upsert_variant(Some(5), "en", "Hello", &langs)
        .await
        .expect("seed en");
    app.state
        .db
        .upsert_variant(Some(5), "fr", "Bonjour", &langs)
        .await
        .expect("seed fr");
}

// ==================== Health Tests ====================

#[tokio::test]
async fn test_health() {
    let app = spawn_app().await;

    let response = app.client.get(app.url("/health")).send().await.expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.expect("body"), "OK");
}

// ==================== Render Tests ====================

#[tokio::test]
async fn test_render_viewer_language_from_query() {
    let app = spawn_app().await;
    seed_hello(&app).await;

    let response = app
        .client
        .get(app.url("/render/5?lang=fr"))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.text().await.expect("body"), "Bonjour");
}

#[tokio::test]
async fn test_render_viewer_language_from_header_with_class() {
    let app = spawn_app().await;
    seed_hello(&app).await;

    let response = app
        .client
        .get(app.url("/render/5?class=greeting"))
        .header("Accept-Language", "fr-CA,fr;q=0.9")
        .send()
        .await
        .expect("request");

    assert_eq!(
        response.text().await.expect("body"),
        r#"<div class="greeting">Bonjour</div>"#
    );
}

#[tokio::test]
async fn test_render_falls_back_to_default_language() {
    let app = spawn_app().await;
    seed_hello(&app).await;

    let response = app
        .client
        .get(app.url("/render/5?lang=de"))
        .send()
        .await
        .expect("request");

    assert_eq!(response.text().await.expect("body"), "Hello");
}

#[tokio::test]
async fn test_render_unknown_entry_is_empty() {
    let app = spawn_app().await;

    for path in ["/render/404", "/render/0", "/render/abc"] {
        let response = app.client.get(app.url(path)).send().await.expect("request");
        assert_eq!(response.status(), StatusCode::OK, "{}", path);
        assert_eq!(response.text().await.expect("body"), "", "{}", path);
    }
}

#[tokio::test]
async fn test_expand_page_content() {
    let app = spawn_app().await;
    seed_hello(&app).await;
    app.state
        .db
        .upsert_variant(
            Some(6),
            "fr",
            r#"Salut: [multilingual_text id="5" class="inner"]"#,
            &app.languages(),
        )
        .await
        .expect("seed nested");

    let response = app
        .client
        .post(app.url("/render?lang=fr"))
        .body(r#"<p>[multilingual_text id="6"]</p><p>[multilingual_text id="5"]</p>"#)
        .send()
        .await
        .expect("request");

    assert_eq!(
        response.text().await.expect("body"),
        r#"<p>Salut: <div class="inner">Bonjour</div></p><p>Bonjour</p>"#
    );
}

// ==================== Admin Page Tests ====================

#[tokio::test]
async fn test_admin_page_requires_authentication() {
    let app = spawn_app().await;

    let response = app.client.get(app.url("/admin")).send().await.expect("request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .client
        .get(app.url("/admin"))
        .bearer_auth("wrong-key")
        .send()
        .await
        .expect("request");
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_page_lists_entries() {
    let app = spawn_app().await;
    seed_hello(&app).await;

    let response = app
        .client
        .get(app.url("/admin"))
        .bearer_auth(API_KEY)
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    let page = response.text().await.expect("body");
    assert!(page.contains("[multilingual_text id=&quot;5&quot;]"));
    assert!(page.contains("name=\"text[fr]\""));
    assert!(page.contains(&app.token(TokenAction::SaveText)));
}

#[tokio::test]
async fn test_admin_form_save_creates_entry() {
    let app = spawn_app().await;
    let token = app.token(TokenAction::SaveText);

    let response = app
        .client
        .post(app.url("/admin"))
        .bearer_auth(API_KEY)
        .form(&[
            ("_token", token.as_str()),
            ("entry_id", "0"),
            ("text[en]", "Hello"),
            ("text[fr]", "Bonjour"),
            ("text[it]", "Ciao"),
        ])
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .text()
        .await
        .expect("body")
        .contains("Text saved successfully."));

    let variants = app.state.db.get_all_variants(1).await.expect("variants");
    assert_eq!(variants.len(), 2);
    assert_eq!(variants["fr"], "Bonjour");
}

#[tokio::test]
async fn test_admin_form_save_rejects_bad_token() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/admin"))
        .bearer_auth(API_KEY)
        .form(&[("_token", "forged"), ("text[en]", "Hello")])
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(app.state.db.list_entry_ids().await.expect("list").is_empty());
}

#[tokio::test]
async fn test_admin_form_save_unauthenticated() {
    let app = spawn_app().await;
    let token = app.token(TokenAction::SaveText);

    let response = app
        .client
        .post(app.url("/admin"))
        .form(&[("_token", token.as_str()), ("text[en]", "Hello")])
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(app.state.db.list_entry_ids().await.expect("list").is_empty());
}

#[tokio::test]
async fn test_admin_delete() {
    let app = spawn_app().await;
    seed_hello(&app).await;
    let token = app.token(TokenAction::DeleteEntry);

    let response = app
        .client
        .get(app.url(&format!(
            "/admin?action=delete&entry_id=5&_token={}",
            token
        )))
        .bearer_auth(API_KEY)
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.text().await.expect("body").contains("Entry deleted."));
    assert!(app.state.db.get_all_variants(5).await.expect("variants").is_empty());
}

#[tokio::test]
async fn test_admin_delete_without_token_keeps_rows() {
    let app = spawn_app().await;
    seed_hello(&app).await;

    let response = app
        .client
        .get(app.url("/admin?action=delete&entry_id=5"))
        .bearer_auth(API_KEY)
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(app.state.db.get_all_variants(5).await.expect("variants").len(), 2);
}

#[tokio::test]
async fn test_admin_delete_unauthenticated_keeps_rows() {
    let app = spawn_app().await;
    seed_hello(&app).await;
    let token = app.token(TokenAction::DeleteEntry);

    let response = app
        .client
        .get(app.url(&format!(
            "/admin?action=delete&entry_id=5&_token={}",
            token
        )))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.state.db.get_all_variants(5).await.expect("variants").len(), 2);
}

// ==================== AJAX Tests ====================

#[tokio::test]
async fn test_ajax_save_new_entry_returns_id() {
    let app = spawn_app().await;
    seed_hello(&app).await;

    let response = app
        .client
        .post(app.url("/admin/ajax/save"))
        .bearer_auth(API_KEY)
        .json(&json!({
            "texts": { "en": "Goodbye", "fr": "Au revoir", "xx": "??" },
            "nonce": app.token(TokenAction::AjaxSave),
        }))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body, json!({ "success": true, "data": { "entry_id": 6 } }));

    assert_eq!(
        app.state.db.get_variant(6, "fr").await.expect("get").as_deref(),
        Some("Au revoir")
    );
}

#[tokio::test]
async fn test_ajax_save_existing_entry() {
    let app = spawn_app().await;
    seed_hello(&app).await;

    let response = app
        .client
        .post(app.url("/admin/ajax/save"))
        .bearer_auth(API_KEY)
        .json(&json!({
            "entry_id": 5,
            "texts": { "de": "Hallo", "en": "   " },
            "nonce": app.token(TokenAction::AjaxSave),
        }))
        .send()
        .await
        .expect("request");

    let body: Value = response.json().await.expect("json");
    assert_eq!(body["data"]["entry_id"], 5);

    let variants = app.state.db.get_all_variants(5).await.expect("variants");
    assert_eq!(variants["de"], "Hallo");
    assert_eq!(variants["en"], "Hello", "blank text leaves the old value");
}

#[tokio::test]
async fn test_ajax_save_unauthorized() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/admin/ajax/save"))
        .json(&json!({
            "texts": { "en": "Hello" },
            "nonce": app.token(TokenAction::AjaxSave),
        }))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body["success"], false);
    assert!(app.state.db.list_entry_ids().await.expect("list").is_empty());
}

#[tokio::test]
async fn test_ajax_save_bad_nonce() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/admin/ajax/save"))
        .bearer_auth(API_KEY)
        .json(&json!({
            "texts": { "en": "Hello" },
            "nonce": app.token(TokenAction::SaveText),
        }))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body["success"], false);
    assert!(app.state.db.list_entry_ids().await.expect("list").is_empty());
}

#[tokio::test]
async fn test_ajax_save_accepts_string_entry_id() {
    let app = spawn_app().await;
    seed_hello(&app).await;

    let response = app
        .client
        .post(app.url("/admin/ajax/save"))
        .bearer_auth(API_KEY)
        .json(&json!({
            "entry_id": "5",
            "texts": { "de": "Hallo" },
            "nonce": app.token(TokenAction::AjaxSave),
        }))
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body, json!({ "success": true, "data": { "entry_id": 5 } }));
    assert_eq!(
        app.state.db.get_variant(5, "de").await.expect("get").as_deref(),
        Some("Hallo")
    );
}

#[tokio::test]
async fn test_ajax_save_malformed_body_returns_json_failure() {
    let app = spawn_app().await;

    let response = app
        .client
        .post(app.url("/admin/ajax/save"))
        .bearer_auth(API_KEY)
        .header("content-type", "application/json")
        .body("not json")
        .send()
        .await
        .expect("request");

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.expect("json");
    assert_eq!(body["success"], false);
    assert!(body["data"]["message"].is_string());
    assert!(app.state.db.list_entry_ids().await.expect("list").is_empty());
}

#[tokio::test]
async fn test_ajax_save_anonymous_checked_before_body() {
    let app = spawn_app().await;

    // Unparseable JSON, then no content type at all
    let requests = [
        app.client
            .post(app.url("/admin/ajax/save"))
            .header("content-type", "application/json")
            .body("not json"),
        app.client.post(app.url("/admin/ajax/save")).body("texts"),
    ];

    for request in requests {
        let response = request.send().await.expect("request");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body: Value = response.json().await.expect("json");
        assert_eq!(body["success"], false);
    }
}

// ==================== End-to-End Tests ====================

#[tokio::test]
async fn test_saved_nested_placeholder_renders_like_direct_render() {
    let app = spawn_app().await;
    seed_hello(&app).await;

    let response = app
        .client
        .post(app.url("/admin/ajax/save"))
        .bearer_auth(API_KEY)
        .json(&json!({
            "texts": { "en": "Wrapped: [multilingual_text id=\"5\" class=\"x\"]" },
            "nonce": app.token(TokenAction::AjaxSave),
        }))
        .send()
        .await
        .expect("request");
    let body: Value = response.json().await.expect("json");
    let new_id = body["data"]["entry_id"].as_i64().expect("entry id");

    let direct = app
        .client
        .get(app.url("/render/5?class=x&lang=en"))
        .send()
        .await
        .expect("request")
        .text()
        .await
        .expect("body");
    let nested = app
        .client
        .get(app.url(&format!("/render/{}?lang=en", new_id)))
        .send()
        .await
        .expect("request")
        .text()
        .await
        .expect("body");

    assert_eq!(nested, format!("Wrapped: {}", direct));
}
