use crate::i18n::ActiveLanguage;
use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{FromRow, SqliteConnection};
use std::collections::BTreeMap;
use std::str::FromStr;

/// One stored language variant of an entry.
#[derive(Debug, Clone, FromRow)]
pub struct TextVariant {
    pub entry_id: i64,
    pub language_code: String,
    pub text_content: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Typed save payload, shared by the admin form and the AJAX endpoint.
///
/// `entry_id` of `None` means "allocate a new entry".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveRequest {
    pub entry_id: Option<i64>,
    pub variants: BTreeMap<String, String>,
}

impl SaveRequest {
    pub fn new(entry_id: Option<i64>) -> Self {
        Self {
            entry_id: entry_id.filter(|id| *id > 0),
            variants: BTreeMap::new(),
        }
    }

    pub fn with_variant(mut self, language_code: &str, text: &str) -> Self {
        self.variants
            .insert(language_code.to_string(), text.to_string());
        self
    }
}

/// Result of applying a [`SaveRequest`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOutcome {
    /// Resolved entry id; `None` when nothing was saved for a new entry
    pub entry_id: Option<i64>,
    /// Number of variants written
    pub saved: usize,
}

#[derive(Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open a connection pool. The database file is created if missing.
    pub async fn new(database_url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(database_url)
            .context(format!("Invalid database URL {}", database_url))?
            .create_if_missing(true);

        // Every connection to an in-memory database sees its own database,
        // so keep exactly one connection alive for the pool's lifetime
        let in_memory = database_url.contains(":memory:");
        let (options, pool_options) = if in_memory {
            let pool_options = SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
            (options, pool_options)
        } else {
            let options = options.journal_mode(SqliteJournalMode::Wal);
            (options, SqlitePoolOptions::new().max_connections(5))
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .context(format!("Failed to open database at {}", database_url))?;

        Ok(Self { pool })
    }

    /// Create tables (safe to run on every start)
    pub async fn install(&self) -> Result<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS text_variants (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                entry_id INTEGER NOT NULL,
                language_code TEXT NOT NULL,
                text_content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                UNIQUE (entry_id, language_code)
            )",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create text_variants table")?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS entry_sequence (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                last_entry_id INTEGER NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .context("Failed to create entry_sequence table")?;

        sqlx::query("INSERT OR IGNORE INTO entry_sequence (id, last_entry_id) VALUES (1, 0)")
            .execute(&self.pool)
            .await
            .context("Failed to seed entry_sequence")?;

        Ok(())
    }

    /// Drop all tables owned by the service
    pub async fn uninstall(&self) -> Result<()> {
        sqlx::query("DROP TABLE IF EXISTS text_variants")
            .execute(&self.pool)
            .await
            .context("Failed to drop text_variants table")?;
        sqlx::query("DROP TABLE IF EXISTS entry_sequence")
            .execute(&self.pool)
            .await
            .context("Failed to drop entry_sequence table")?;
        Ok(())
    }

    /// Distinct entry ids, ascending
    pub async fn list_entry_ids(&self) -> Result<Vec<i64>> {
        let ids = sqlx::query_scalar::<_, i64>(
            "SELECT DISTINCT entry_id FROM text_variants ORDER BY entry_id",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list entry ids")?;

        Ok(ids)
    }

    /// Text of one entry in one language
    pub async fn get_variant(&self, entry_id: i64, language_code: &str) -> Result<Option<String>> {
        let text = sqlx::query_scalar::<_, String>(
            "SELECT text_content FROM text_variants WHERE entry_id = ?1 AND language_code = ?2",
        )
        .bind(entry_id)
        .bind(language_code)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get variant")?;

        Ok(text)
    }

    /// All languages of one entry, keyed by language code
    pub async fn get_all_variants(&self, entry_id: i64) -> Result<BTreeMap<String, String>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            "SELECT language_code, text_content FROM text_variants WHERE entry_id = ?1",
        )
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to get variants")?;

        Ok(rows.into_iter().collect())
    }

    /// Full rows of one entry, ordered by language code
    pub async fn list_variants(&self, entry_id: i64) -> Result<Vec<TextVariant>> {
        let rows = sqlx::query_as::<_, TextVariant>(
            "SELECT entry_id, language_code, text_content, created_at, updated_at
             FROM text_variants
             WHERE entry_id = ?1
             ORDER BY language_code",
        )
        .bind(entry_id)
        .fetch_all(&self.pool)
        .await
        .context("Failed to list variants")?;

        Ok(rows)
    }

    /// Insert or replace one variant.
    ///
    /// Returns the entry id written to, or `None` when the language is not
    /// active or the text is blank (nothing is written). An unset or
    /// non-positive `entry_id` allocates a fresh id.
    pub async fn upsert_variant(
        &self,
        entry_id: Option<i64>,
        language_code: &str,
        text_content: &str,
        active_languages: &[ActiveLanguage],
    ) -> Result<Option<i64>> {
        let request = SaveRequest::new(entry_id).with_variant(language_code, text_content);
        let outcome = self.save_variants(&request, active_languages).await?;

        Ok(if outcome.saved > 0 {
            outcome.entry_id
        } else {
            None
        })
    }

    /// Apply every storable variant of `request` in one transaction.
    ///
    /// A new id is allocated at most once, and only when at least one
    /// variant is storable.
    pub async fn save_variants(
        &self,
        request: &SaveRequest,
        active_languages: &[ActiveLanguage],
    ) -> Result<SaveOutcome> {
        let storable: Vec<(&str, &str)> = request
            .variants
            .iter()
            .filter(|(code, text)| is_storable(code, text, active_languages))
            .map(|(code, text)| (code.as_str(), text.as_str()))
            .collect();

        let requested_id = request.entry_id.filter(|id| *id > 0);
        if storable.is_empty() {
            return Ok(SaveOutcome {
                entry_id: requested_id,
                saved: 0,
            });
        }

        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin save transaction")?;

        let entry_id = match requested_id {
            Some(id) => id,
            None => allocate_entry_id(&mut *tx).await?,
        };

        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        for (code, text) in &storable {
            upsert_row(&mut *tx, entry_id, code, text, &now).await?;
        }

        tx.commit().await.context("Failed to commit save")?;

        Ok(SaveOutcome {
            entry_id: Some(entry_id),
            saved: storable.len(),
        })
    }

    /// Reserve a fresh entry id, strictly greater than any id in use
    pub async fn allocate_entry_id(&self) -> Result<i64> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire connection")?;
        allocate_entry_id(&mut *conn).await
    }

    /// Remove every language variant of an entry.
    /// Returns the number of rows removed (0 for an unknown id).
    pub async fn delete_entry(&self, entry_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM text_variants WHERE entry_id = ?1")
            .bind(entry_id)
            .execute(&self.pool)
            .await
            .context("Failed to delete entry")?;

        Ok(result.rows_affected())
    }
}

fn is_storable(language_code: &str, text: &str, active_languages: &[ActiveLanguage]) -> bool {
    !text.trim().is_empty() && active_languages.iter().any(|l| l.code == language_code)
}

/// Advance the sequence past both its last value and the largest stored id
/// in a single statement.
async fn allocate_entry_id(conn: &mut SqliteConnection) -> Result<i64> {
    let id = sqlx::query_scalar::<_, i64>(
        "UPDATE entry_sequence
         SET last_entry_id = MAX(
             last_entry_id,
             (SELECT COALESCE(MAX(entry_id), 0) FROM text_variants)
         ) + 1
         WHERE id = 1
         RETURNING last_entry_id",
    )
    .fetch_one(&mut *conn)
    .await
    .context("Failed to allocate entry id")?;

    Ok(id)
}

async fn upsert_row(
    conn: &mut SqliteConnection,
    entry_id: i64,
    language_code: &str,
    text_content: &str,
    now: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO text_variants (entry_id, language_code, text_content, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?4)
         ON CONFLICT (entry_id, language_code)
         DO UPDATE SET text_content = excluded.text_content, updated_at = excluded.updated_at",
    )
    .bind(entry_id)
    .bind(language_code)
    .bind(text_content)
    .bind(now)
    .execute(&mut *conn)
    .await
    .context("Failed to save variant")?;

    Ok(())
}
