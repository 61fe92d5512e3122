//! Process-local session store.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::session::record::SessionRecord;
use crate::session::token::SessionId;

/// Concurrent in-memory map of session id → record.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<SessionId, SessionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&self, id: &SessionId, now: DateTime<Utc>) -> Option<SessionRecord> {
        self.inner
            .get(id)
            .filter(|entry| !entry.value().is_expired_at(now))
            .map(|entry| entry.value().clone())
    }

    pub fn save(&self, record: &SessionRecord) {
        self.inner.insert(record.id.clone(), record.clone());
    }

    pub fn touch(&self, id: &SessionId, expires_at: DateTime<Utc>) {
        if let Some(mut entry) = self.inner.get_mut(id) {
            entry.expires_at = expires_at;
        }
    }

    pub fn destroy(&self, id: &SessionId) {
        self.inner.remove(id);
    }

    pub fn purge_expired(&self, now: DateTime<Utc>) -> u64 {
        let mut removed = 0;
        self.inner.retain(|_, record| {
            let keep = !record.is_expired_at(now);
            if !keep {
                removed += 1;
            }
            keep
        });
        removed
    }

    /// Number of stored records, expired ones included.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
