// src/cache/sqlite.rs

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use chrono::{DateTime, Utc};
use sqlx::{
    FromRow, SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

use crate::cache::{
    request::RequestKey,
    response::StoredResponse,
    store::{CacheStore, StoreError},
};

/// Helper struct for reading a cached response row.
#[derive(FromRow)]
struct EntryRow {
    status: i64,
    headers: String,
    body: Vec<u8>,
    fetched_at: DateTime<Utc>,
}

/// Persistent cache store backed by SQLite, so cached pages survive restarts.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Opens (creating if missing) the database at `url` and applies the schema.
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await?;

        Self::from_pool(pool).await
    }

    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;

        Ok(Self { pool })
    }
}

#[async_trait]
impl CacheStore for SqliteStore {
    async fn open(&self, generation: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT OR IGNORE INTO cache_generations (name) VALUES (?)")
            .bind(generation)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn put(
        &self,
        generation: &str,
        key: &RequestKey,
        response: &StoredResponse,
    ) -> Result<(), StoreError> {
        let headers = serde_json::to_string(&response.headers)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("INSERT OR IGNORE INTO cache_generations (name) VALUES (?)")
            .bind(generation)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            INSERT INTO cache_entries (generation, method, url, status, headers, body, fetched_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (generation, method, url) DO UPDATE SET
                status = EXCLUDED.status,
                headers = EXCLUDED.headers,
                body = EXCLUDED.body,
                fetched_at = EXCLUDED.fetched_at
            "#,
        )
        .bind(generation)
        .bind(&key.method)
        .bind(&key.url)
        .bind(i64::from(response.status))
        .bind(headers)
        .bind(response.body.as_ref())
        .bind(response.fetched_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn lookup(
        &self,
        generation: &str,
        key: &RequestKey,
    ) -> Result<Option<StoredResponse>, StoreError> {
        let row: Option<EntryRow> = sqlx::query_as(
            r#"
            SELECT status, headers, body, fetched_at
            FROM cache_entries
            WHERE generation = ? AND method = ? AND url = ?
            "#,
        )
        .bind(generation)
        .bind(&key.method)
        .bind(&key.url)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let status = u16::try_from(row.status)
            .map_err(|_| StoreError::Corrupt(format!("status {} for {}", row.status, key)))?;
        let headers: Vec<(String, String)> = serde_json::from_str(&row.headers)
            .map_err(|e| StoreError::Corrupt(format!("headers for {}: {}", key, e)))?;

        Ok(Some(StoredResponse {
            status,
            headers,
            body: Bytes::from(row.body),
            fetched_at: row.fetched_at,
        }))
    }

    async fn delete(&self, generation: &str) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM cache_entries WHERE generation = ?")
            .bind(generation)
            .execute(&mut *tx)
            .await?;
        let removed = sqlx::query("DELETE FROM cache_generations WHERE name = ?")
            .bind(generation)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;
        Ok(removed > 0)
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let names = sqlx::query_scalar::<_, String>("SELECT name FROM cache_generations ORDER BY name")
            .fetch_all(&self.pool)
            .await?;
        Ok(names)
    }

    async fn entries(&self, generation: &str) -> Result<usize, StoreError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM cache_entries WHERE generation = ?",
        )
        .bind(generation)
        .fetch_one(&self.pool)
        .await?;
        Ok(count as usize)
    }
}
