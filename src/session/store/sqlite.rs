//! Durable SQLite session store.
//!
//! SQLite allows only one writer at a time, so the store keeps a
//! multi-connection reader pool and a single-connection writer pool, both in
//! WAL mode. Several gateway processes can share one database file.

use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;

use super::StoreError;
use crate::session::record::SessionRecord;
use crate::session::token::SessionId;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS sessions (
    id          TEXT PRIMARY KEY NOT NULL,
    payload     TEXT NOT NULL,
    created_at  TEXT NOT NULL,
    expires_at  INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_sessions_expires_at ON sessions (expires_at);
"#;

/// Split read/write pool over the `sessions` table.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    reader: SqlitePool,
    writer: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database at `url` and ensure the schema.
    pub async fn connect(url: &str, max_readers: u32) -> Result<Self, StoreError> {
        let base_opts = SqliteConnectOptions::from_str(url)?
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        let read_opts = base_opts.clone().read_only(true);
        let write_opts = base_opts;

        let writer = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(write_opts)
            .await?;

        // Schema exists before the read-only pool opens
        sqlx::raw_sql(SCHEMA).execute(&writer).await?;

        let reader = SqlitePoolOptions::new()
            .max_connections(max_readers.max(1))
            .connect_with(read_opts)
            .await?;

        Ok(Self { reader, writer })
    }

    pub async fn load(&self, id: &SessionId, now: DateTime<Utc>) -> Result<Option<SessionRecord>, StoreError> {
        let row = sqlx::query(
            "SELECT payload, created_at, expires_at FROM sessions WHERE id = ? AND expires_at > ?",
        )
        .bind(id.as_str())
        .bind(now.timestamp_millis())
        .fetch_optional(&self.reader)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let payload: String = row.try_get("payload")?;
        let created_at: String = row.try_get("created_at")?;
        let expires_at: i64 = row.try_get("expires_at")?;

        let payload: Map<String, Value> = serde_json::from_str(&payload)?;
        let created_at = DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| StoreError::CorruptRecord(format!("created_at: {e}")))?;
        let expires_at = DateTime::from_timestamp_millis(expires_at)
            .ok_or_else(|| StoreError::CorruptRecord(format!("expires_at out of range: {expires_at}")))?;

        Ok(Some(SessionRecord {
            id: id.clone(),
            payload,
            created_at,
            expires_at,
        }))
    }

    pub async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&record.payload)?;

        sqlx::query(
            r#"INSERT INTO sessions (id, payload, created_at, expires_at)
               VALUES (?, ?, ?, ?)
               ON CONFLICT (id) DO UPDATE SET payload = excluded.payload, expires_at = excluded.expires_at"#,
        )
        .bind(record.id.as_str())
        .bind(&payload)
        .bind(record.created_at.to_rfc3339())
        .bind(record.expires_at.timestamp_millis())
        .execute(&self.writer)
        .await?;

        Ok(())
    }

    pub async fn touch(&self, id: &SessionId, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        sqlx::query("UPDATE sessions SET expires_at = ? WHERE id = ?")
            .bind(expires_at.timestamp_millis())
            .bind(id.as_str())
            .execute(&self.writer)
            .await?;
        Ok(())
    }

    pub async fn destroy(&self, id: &SessionId) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id.as_str())
            .execute(&self.writer)
            .await?;
        Ok(())
    }

    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now.timestamp_millis())
            .execute(&self.writer)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.reader).await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.writer.close().await;
        self.reader.close().await;
    }
}
