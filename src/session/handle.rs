//! The per-request session handle collaborators interact with.
//!
//! The handle records what happened to the session during the request
//! (read, modified, regenerated, destroyed). After the response is produced the
//! session middleware turns that into a [`Commit`]: which store writes to make
//! and which cookie, if any, to send.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::record::SessionRecord;
use super::token::SessionId;

/// Session attached to every request behind the session stage.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionState>>,
}

#[derive(Debug)]
struct SessionState {
    record: SessionRecord,
    /// Id currently present in the store for this client, if any.
    persisted: Option<SessionId>,
    /// Ids to delete from the store once the request completes.
    retired: Vec<SessionId>,
    modified: bool,
    destroyed: bool,
}

/// Store write decided at the end of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    None,
    /// Extend an unmodified, already persisted session.
    Touch { id: SessionId, expires_at: DateTime<Utc> },
    /// Persist the full record.
    Save(SessionRecord),
}

/// Cookie directive decided at the end of a request.
#[derive(Debug, Clone, PartialEq)]
pub enum CookieAction {
    None,
    Set { id: SessionId, expires_at: DateTime<Utc> },
    Clear,
}

/// Everything the session stage must do after the handler ran.
#[derive(Debug, Clone, PartialEq)]
pub struct Commit {
    pub delete: Vec<SessionId>,
    pub write: Write,
    pub cookie: CookieAction,
}

impl Session {
    /// A session loaded from the store.
    pub fn loaded(record: SessionRecord) -> Self {
        let persisted = Some(record.id.clone());
        Self::with_state(record, persisted)
    }

    /// A brand-new session that is only persisted if modified.
    pub fn fresh(now: DateTime<Utc>, ttl: Duration) -> Self {
        Self::with_state(SessionRecord::new(SessionId::generate(), now, ttl), None)
    }

    fn with_state(record: SessionRecord, persisted: Option<SessionId>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionState {
                record,
                persisted,
                retired: Vec::new(),
                modified: false,
                destroyed: false,
            })),
        }
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        // A panic while holding the lock leaves plain data behind; keep using it.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn id(&self) -> SessionId {
        self.state().record.id.clone()
    }

    /// True until the session has been persisted by a previous request.
    pub fn is_new(&self) -> bool {
        self.state().persisted.is_none()
    }

    /// True once the payload changed during this request.
    pub fn is_modified(&self) -> bool {
        self.state().modified
    }

    pub fn is_destroyed(&self) -> bool {
        self.state().destroyed
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.state().record.created_at
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.state().record.expires_at
    }

    /// Deserialize the value stored under `key`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.state().record.payload.get(key).cloned()?;
        serde_json::from_value(value).ok()
    }

    /// Copy of the whole payload.
    pub fn payload(&self) -> Map<String, Value> {
        self.state().record.payload.clone()
    }

    /// Store `value` under `key`, marking the session modified.
    pub fn insert<T: Serialize>(&self, key: impl Into<String>, value: T) -> Result<(), serde_json::Error> {
        let value = serde_json::to_value(value)?;
        let mut state = self.state();
        state.record.payload.insert(key.into(), value);
        state.modified = true;
        state.destroyed = false;
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut state = self.state();
        let removed = state.record.payload.remove(key);
        if removed.is_some() {
            state.modified = true;
        }
        removed
    }

    /// Drop every key but keep the session itself.
    pub fn clear(&self) {
        let mut state = self.state();
        if !state.record.payload.is_empty() {
            state.record.payload.clear();
            state.modified = true;
        }
    }

    /// Swap to a fresh, empty session under a new id and retire the old one.
    pub fn regenerate(&self) {
        let mut state = self.state();
        if let Some(old) = state.persisted.take() {
            state.retired.push(old);
        }
        let now = Utc::now();
        let ttl = state.record.expires_at - state.record.created_at;
        state.record = SessionRecord::new(SessionId::generate(), now, ttl);
        state.modified = false;
        state.destroyed = false;
    }

    /// Remove the session from the store and clear the client's cookie.
    pub fn destroy(&self) {
        let mut state = self.state();
        state.destroyed = true;
        state.modified = false;
    }

    /// Decide writes and cookie directives for the finished request.
    pub fn commit(&self, now: DateTime<Utc>, ttl: Duration) -> Commit {
        let mut state = self.state();
        let mut delete = std::mem::take(&mut state.retired);
        let had_cookie = state.persisted.is_some() || !delete.is_empty();

        if state.destroyed {
            if let Some(id) = state.persisted.take() {
                delete.push(id);
            }
            let cookie = if had_cookie { CookieAction::Clear } else { CookieAction::None };
            return Commit { delete, write: Write::None, cookie };
        }

        if state.modified {
            state.record.refresh(now, ttl);
            state.persisted = Some(state.record.id.clone());
            state.modified = false;
            return Commit {
                delete,
                write: Write::Save(state.record.clone()),
                cookie: CookieAction::Set {
                    id: state.record.id.clone(),
                    expires_at: state.record.expires_at,
                },
            };
        }

        if let Some(id) = state.persisted.clone() {
            state.record.refresh(now, ttl);
            return Commit {
                delete,
                write: Write::Touch { id, expires_at: state.record.expires_at },
                cookie: CookieAction::None,
            };
        }

        let cookie = if had_cookie { CookieAction::Clear } else { CookieAction::None };
        Commit { delete, write: Write::None, cookie }
    }
}
