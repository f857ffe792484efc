use anyhow::Result;
use multilingual_text::db::Database;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    let _ = dotenvy::dotenv();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("uninstall=info".parse()?)
                .add_directive("multilingual_text=info".parse()?),
        )
        .init();

    // Only the database location is needed here, not the full admin config
    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://multilingual_text.db".to_string());

    info!("Removing multilingual text tables from {}", database_url);

    let database = Database::new(&database_url).await?;
    database.uninstall().await?;

    info!("✓ Tables dropped. All stored texts have been removed.");
    Ok(())
}
