//! Session establishment and persistence around a request.

use axum::http::{HeaderMap, HeaderValue};
use chrono::{Duration, Utc};

use super::cookie::CookiePolicy;
use super::handle::{CookieAction, Session, Write};
use super::store::{SessionStore, StoreError};
use super::token::SessionSigner;
use crate::config::{GatewayConfig, SessionConfig};
use crate::observability::metrics;

const MAX_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Owns the store handle plus everything needed to read and write cookies.
#[derive(Debug, Clone)]
pub struct SessionManager {
    store: SessionStore,
    signer: SessionSigner,
    cookie: CookiePolicy,
    ttl: Duration,
    trust_proxy: bool,
}

impl SessionManager {
    pub fn new(store: SessionStore, session: &SessionConfig, production: bool, trust_proxy: bool) -> Self {
        // Ten years is far beyond any sensible cookie lifetime
        let ttl = Duration::seconds(session.ttl_secs.min(MAX_TTL_SECS) as i64);
        Self {
            store,
            signer: SessionSigner::new(session.signing_secret(), &session.previous_secrets),
            cookie: CookiePolicy::for_environment(&session.cookie_name, production, ttl),
            ttl,
            trust_proxy,
        }
    }

    pub fn from_config(store: SessionStore, config: &GatewayConfig) -> Self {
        Self::new(store, &config.session, config.server.production, config.server.trust_proxy())
    }

    pub fn signer(&self) -> &SessionSigner {
        &self.signer
    }

    /// Resolve the request's session: the stored one for a valid token,
    /// otherwise a fresh unsaved one.
    pub async fn establish(&self, headers: &HeaderMap) -> Result<Session, StoreError> {
        let Some(id) = self.cookie.read(headers).and_then(|value| self.signer.verify(value)) else {
            return Ok(Session::fresh(Utc::now(), self.ttl));
        };

        match self.store.load(&id).await? {
            Some(record) => Ok(Session::loaded(record)),
            None => {
                tracing::debug!(session_id = %id, "Unknown or expired session token, starting fresh");
                Ok(Session::fresh(Utc::now(), self.ttl))
            }
        }
    }

    /// Whether a `Secure` cookie may be sent on this request.
    ///
    /// The gateway itself speaks plain HTTP; it can only know the client hop
    /// was HTTPS when a trusted proxy says so.
    pub fn transport_is_secure(&self, headers: &HeaderMap) -> bool {
        if !self.trust_proxy {
            return false;
        }
        headers
            .get("x-forwarded-proto")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|proto| proto.trim().eq_ignore_ascii_case("https"))
            .unwrap_or(false)
    }

    /// Apply the request's session changes to the store.
    ///
    /// Returns the `Set-Cookie` value to send, if any.
    pub async fn persist(
        &self,
        session: &Session,
        secure_transport: bool,
    ) -> Result<Option<HeaderValue>, StoreError> {
        let commit = session.commit(Utc::now(), self.ttl);

        for id in &commit.delete {
            self.store.destroy(id).await?;
            metrics::record_session_event("destroyed");
        }

        match &commit.write {
            Write::None => {}
            Write::Touch { id, expires_at } => {
                self.store.touch(id, *expires_at).await?;
                metrics::record_session_event("refreshed");
            }
            Write::Save(record) => {
                self.store.save(record).await?;
                metrics::record_session_event("saved");
            }
        }

        let header = match commit.cookie {
            CookieAction::None => return Ok(None),
            CookieAction::Set { id, expires_at } => {
                self.cookie.set_cookie(&self.signer.sign(&id), expires_at)
            }
            CookieAction::Clear => self.cookie.clear_cookie(),
        };

        if self.cookie.scope().secure() && !secure_transport {
            tracing::warn!(
                cookie = %self.cookie.name(),
                "Withholding secure session cookie on a request not known to be HTTPS"
            );
            return Ok(None);
        }

        Ok(header)
    }
}
