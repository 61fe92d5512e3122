//! Session storage backends.
//!
//! # Backends
//! - `memory.rs`: process-local `DashMap`, lost on restart
//! - `sqlite.rs`: durable SQLite database, shared by every gateway process
//!   that points at the same file
//!
//! # Design Decisions
//! - Closed set of backends selected per deployment, so no trait objects
//! - Every operation runs under the configured deadline; an elapsed deadline
//!   is reported like any other backend failure
//! - Expired records are never returned by `load`

pub mod memory;
pub mod sqlite;

use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::config::{StoreBackend, StoreConfig};
use crate::resilience::timeouts::{with_deadline, TimedOut};
use crate::session::record::SessionRecord;
use crate::session::token::SessionId;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Errors raised by a session backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("payload encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("corrupt session row: {0}")]
    CorruptRecord(String),

    #[error(transparent)]
    TimedOut(#[from] TimedOut),
}

#[derive(Debug, Clone)]
enum Backend {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

/// Handle to the process-wide session store.
///
/// Cheap to clone; all clones share the same connection pool or map.
#[derive(Debug, Clone)]
pub struct SessionStore {
    backend: Backend,
    op_timeout: Duration,
}

impl SessionStore {
    /// Open the backend described by `config`.
    pub async fn connect(config: &StoreConfig) -> Result<Self, StoreError> {
        let op_timeout = Duration::from_millis(config.op_timeout_ms);
        let backend = match config.backend {
            StoreBackend::Memory => Backend::Memory(MemoryStore::new()),
            StoreBackend::Durable => {
                Backend::Sqlite(SqliteStore::connect(&config.url, config.max_connections).await?)
            }
        };
        Ok(Self { backend, op_timeout })
    }

    pub fn memory(store: MemoryStore, op_timeout: Duration) -> Self {
        Self { backend: Backend::Memory(store), op_timeout }
    }

    pub fn sqlite(store: SqliteStore, op_timeout: Duration) -> Self {
        Self { backend: Backend::Sqlite(store), op_timeout }
    }

    pub fn kind(&self) -> StoreBackend {
        match self.backend {
            Backend::Memory(_) => StoreBackend::Memory,
            Backend::Sqlite(_) => StoreBackend::Durable,
        }
    }

    /// Fetch a live session. Unknown and expired ids both yield `None`.
    pub async fn load(&self, id: &SessionId) -> Result<Option<SessionRecord>, StoreError> {
        let now = Utc::now();
        match &self.backend {
            Backend::Memory(store) => Ok(store.load(id, now)),
            Backend::Sqlite(store) => with_deadline(self.op_timeout, store.load(id, now)).await?,
        }
    }

    /// Insert or replace a record.
    pub async fn save(&self, record: &SessionRecord) -> Result<(), StoreError> {
        match &self.backend {
            Backend::Memory(store) => {
                store.save(record);
                Ok(())
            }
            Backend::Sqlite(store) => with_deadline(self.op_timeout, store.save(record)).await?,
        }
    }

    /// Move the expiry of an existing record.
    pub async fn touch(&self, id: &SessionId, expires_at: DateTime<Utc>) -> Result<(), StoreError> {
        match &self.backend {
            Backend::Memory(store) => {
                store.touch(id, expires_at);
                Ok(())
            }
            Backend::Sqlite(store) => with_deadline(self.op_timeout, store.touch(id, expires_at)).await?,
        }
    }

    pub async fn destroy(&self, id: &SessionId) -> Result<(), StoreError> {
        match &self.backend {
            Backend::Memory(store) => {
                store.destroy(id);
                Ok(())
            }
            Backend::Sqlite(store) => with_deadline(self.op_timeout, store.destroy(id)).await?,
        }
    }

    /// Delete every expired record, returning how many were removed.
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = Utc::now();
        match &self.backend {
            Backend::Memory(store) => Ok(store.purge_expired(now)),
            Backend::Sqlite(store) => with_deadline(self.op_timeout, store.purge_expired(now)).await?,
        }
    }

    /// Round-trip to the backend.
    pub async fn ping(&self) -> Result<(), StoreError> {
        match &self.backend {
            Backend::Memory(_) => Ok(()),
            Backend::Sqlite(store) => with_deadline(self.op_timeout, store.ping()).await?,
        }
    }

    /// Release the connection. Later operations fail.
    pub async fn close(&self) {
        if let Backend::Sqlite(store) = &self.backend {
            store.close().await;
        }
    }
}
