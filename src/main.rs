use anyhow::{Context, Result};
use multilingual_text::{config, db, server};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file (ignored when the environment is set directly)
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("multilingual_text=info".parse()?),
        )
        .init();

    info!("Starting multilingual text service");

    // Load configuration from environment
    let config = config::Config::from_env()?;

    // Open the database and create tables on first run
    let database = db::Database::new(&config.database_url).await?;
    database.install().await?;
    info!("✓ Database ready at {}", config.database_url);

    let port = config.port;
    let state = server::AppState::new(config, database)?;
    info!(
        "Active languages: {:?} (default: {})",
        state
            .languages
            .active_languages()
            .iter()
            .map(|l| l.code.as_str())
            .collect::<Vec<_>>(),
        state.languages.default_language()
    );

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .context(format!("Failed to bind port {}", port))?;
    info!("✓ Listening on port {}", port);

    axum::serve(listener, server::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
