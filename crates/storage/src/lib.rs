use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Row, Sqlite,
};
use std::{
    fs,
    path::{Path, PathBuf},
    str::FromStr,
};

use shared::domain::{UserId, UserProfile};

/// Local SQLite document store: user profile documents and image blobs.
#[derive(Clone)]
pub struct Storage {
    pool: Pool<Sqlite>,
}

impl Storage {
    pub async fn new(database_url: &str) -> Result<Self> {
        ensure_sqlite_parent_dir_exists(database_url)?;

        let connect_options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        // Every connection to `sqlite::memory:` opens its own database.
        let max_connections = if is_memory_url(database_url) { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(connect_options)
            .await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    pub async fn health_check(&self) -> Result<()> {
        let _: i64 = sqlx::query_scalar("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .context("sqlite ping failed")?;
        Ok(())
    }

    pub async fn load_user_profile(&self, user_id: &UserId) -> Result<Option<UserProfile>> {
        let row = sqlx::query("SELECT document FROM user_profiles WHERE user_id = ?")
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read profile for user {user_id}"))?;

        let Some(row) = row else {
            return Ok(None);
        };

        let document: String = row.try_get("document")?;
        let profile: UserProfile = serde_json::from_str(&document)
            .with_context(|| format!("malformed profile document for user {user_id}"))?;
        Ok(Some(profile))
    }

    /// Writes the full profile document, replacing whatever was stored before.
    pub async fn save_user_profile(&self, profile: &UserProfile) -> Result<()> {
        let document = serde_json::to_string(profile)
            .with_context(|| format!("failed to encode profile for user {}", profile.id))?;
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO user_profiles (user_id, document, created_at, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE
             SET document = excluded.document, updated_at = excluded.updated_at",
        )
        .bind(profile.id.as_str())
        .bind(document)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to write profile for user {}", profile.id))?;
        Ok(())
    }

    pub async fn store_blob(
        &self,
        path: &str,
        bytes: &[u8],
        mime_type: Option<&str>,
    ) -> Result<()> {
        let path = normalize_blob_path(path);
        sqlx::query(
            "INSERT INTO blobs (path, bytes, mime_type, size_bytes, updated_at)
             VALUES (?, ?, ?, ?, ?)
             ON CONFLICT(path) DO UPDATE SET
                bytes = excluded.bytes,
                mime_type = excluded.mime_type,
                size_bytes = excluded.size_bytes,
                updated_at = excluded.updated_at",
        )
        .bind(&path)
        .bind(bytes)
        .bind(mime_type)
        .bind(i64::try_from(bytes.len()).unwrap_or(i64::MAX))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to store blob '{path}'"))?;
        Ok(())
    }

    /// Bytes stored at `path`, if any.
    pub async fn load_blob(&self, path: &str) -> Result<Option<Vec<u8>>> {
        let path = normalize_blob_path(path);
        let row = sqlx::query("SELECT bytes FROM blobs WHERE path = ?")
            .bind(&path)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to read blob '{path}'"))?;

        Ok(row.map(|r| r.get::<Vec<u8>, _>(0)))
    }
}

/// Blob paths are stored without a leading slash and with forward separators.
fn normalize_blob_path(path: &str) -> String {
    path.trim().replace('\\', "/").trim_start_matches('/').to_string()
}

fn is_memory_url(database_url: &str) -> bool {
    database_url.starts_with("sqlite::memory:") || database_url.contains("mode=memory")
}

fn ensure_sqlite_parent_dir_exists(database_url: &str) -> Result<()> {
    let Some(path) = sqlite_path(database_url) else {
        return Ok(());
    };

    let Some(parent) = path.parent() else {
        return Ok(());
    };

    fs::create_dir_all(parent).with_context(|| {
        format!(
            "failed to create parent directory '{}' for database url '{database_url}'",
            parent.display()
        )
    })?;

    Ok(())
}

fn sqlite_path(database_url: &str) -> Option<PathBuf> {
    if is_memory_url(database_url) || !database_url.starts_with("sqlite:") {
        return None;
    }

    let path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .split('?')
        .next()
        .unwrap_or_default();

    if path.is_empty() {
        return None;
    }

    Some(Path::new(path).to_path_buf())
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
