//! Built-in collaborator under `/session`: inspect, update and end the
//! caller's session.
//!
//! ```text
//! GET    /session             current id (if stored) and payload
//! PUT    /session             merge a JSON object into the payload
//! POST   /session/regenerate  same payload under a new id
//! DELETE /session             destroy and clear the cookie
//! ```

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::http::request::{ParsedBody, RequestContext};
use crate::http::response::GatewayError;
use crate::session::Session;

#[derive(Debug, Serialize)]
pub struct SessionView {
    /// Present only for sessions that are (or are about to be) stored.
    pub id: Option<String>,
    pub payload: Map<String, Value>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl SessionView {
    fn of(session: &Session) -> Self {
        let stored = !session.is_new() || session.is_modified();
        Self {
            id: stored.then(|| session.id().to_string()),
            payload: session.payload(),
            expires_at: stored.then(|| session.expires_at()),
        }
    }
}

pub fn router() -> Router {
    Router::new()
        .route("/", get(show).put(update).delete(destroy))
        .route("/regenerate", post(regenerate))
}

async fn show(session: Session) -> Json<SessionView> {
    Json(SessionView::of(&session))
}

async fn update(ctx: RequestContext) -> Result<Json<SessionView>, GatewayError> {
    let request_id = ctx.request_id().unwrap_or("-").to_string();
    let RequestContext { body, session, .. } = ctx;
    let ParsedBody(Value::Object(fields)) = body else {
        return Err(GatewayError::MalformedBody {
            kind: "json",
            reason: "expected an object".to_string(),
        });
    };

    for (key, value) in fields {
        if value.is_null() {
            session.remove(&key);
        } else {
            session.insert(key, value).map_err(|e| GatewayError::MalformedBody {
                kind: "json",
                reason: e.to_string(),
            })?;
        }
    }

    tracing::debug!(request_id = %request_id, "Session payload updated");
    Ok(Json(SessionView::of(&session)))
}

async fn regenerate(session: Session) -> Result<Json<SessionView>, GatewayError> {
    let payload = session.payload();
    session.regenerate();
    for (key, value) in payload {
        session.insert(key, value).map_err(|e| GatewayError::MalformedBody {
            kind: "json",
            reason: e.to_string(),
        })?;
    }
    Ok(Json(SessionView::of(&session)))
}

async fn destroy(session: Session) -> StatusCode {
    session.destroy();
    StatusCode::NO_CONTENT
}
