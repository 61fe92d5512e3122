//! The persisted shape of a session.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::token::SessionId;

/// A session as stored in a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: SessionId,
    /// Application-defined data; opaque to the gateway.
    pub payload: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
    /// A fresh, empty record expiring `ttl` from `now`.
    pub fn new(id: SessionId, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id,
            payload: Map::new(),
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Push the expiry out to `now + ttl`.
    pub fn refresh(&mut self, now: DateTime<Utc>, ttl: Duration) {
        self.expires_at = now + ttl;
    }
}
