//! Session stage: attach a [`Session`] before dispatch, persist it after.

use axum::body::Body;
use axum::extract::State;
use axum::http::header::SET_COOKIE;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::http::response::GatewayError;
use crate::observability::metrics;
use crate::session::SessionManager;

pub async fn establish_session(
    State(manager): State<SessionManager>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let secure_transport = manager.transport_is_secure(req.headers());

    let session = match manager.establish(req.headers()).await {
        Ok(session) => session,
        Err(e) => {
            metrics::record_store_failure("load");
            return GatewayError::SessionBackendUnavailable(e).into_response();
        }
    };

    req.extensions_mut().insert(session.clone());
    let mut response = next.run(req).await;

    match manager.persist(&session, secure_transport).await {
        Ok(Some(cookie)) => {
            response.headers_mut().append(SET_COOKIE, cookie);
            response
        }
        Ok(None) => response,
        Err(e) => {
            metrics::record_store_failure("persist");
            GatewayError::SessionBackendUnavailable(e).into_response()
        }
    }
}
