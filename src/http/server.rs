//! Pipeline assembly and the HTTP server.
//!
//! # Responsibilities
//! - Assemble the fixed stage order into one Axum `Router`
//! - Keep `/health` ahead of the session stage
//! - Wire ambient layers (request ID, tracing, timeout)
//! - Record every response at INFO, including ones rejected before the
//!   request logger stage
//! - Serve the router on a bound listener until shutdown
//!
//! # Layer Order (outermost first)
//! ```text
//! SetRequestId → PropagateRequestId → Trace → Timeout → origin policy
//!     ├── /health
//!     └── session → body decoder → logger → dispatcher → static files → 404
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::request_id::{PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::{Level, Span};

use crate::config::GatewayConfig;
use crate::handlers;
use crate::http::middleware::{
    apply_origin_policy, decode_body, establish_session, log_request, BodyLimit, OriginPolicy,
};
use crate::http::request::{request_id, MakeRequestUuid, X_REQUEST_ID};
use crate::routing::{with_static_fallback, Collaborators};
use crate::session::{SessionManager, SessionStore};

/// Build the full request pipeline over a connected `store`.
#[allow(deprecated)]
pub fn build_pipeline(config: &GatewayConfig, store: SessionStore, collaborators: Collaborators) -> Router {
    let options = config.pipeline_options();
    if options.session_store != store.kind() {
        tracing::warn!(
            configured = ?options.session_store,
            connected = ?store.kind(),
            "Session store differs from configuration"
        );
    }

    let sessions = SessionManager::new(
        store,
        &config.session,
        config.server.production,
        options.trust_proxy,
    );
    let origin = OriginPolicy::new(&options.cors_origin);

    let gated = with_static_fallback(collaborators.into_dispatcher(), &config.server.public_dir)
        .layer(from_fn(log_request))
        .layer(from_fn_with_state(BodyLimit(config.server.max_body_bytes), decode_body))
        .layer(from_fn_with_state(sessions, establish_session));

    Router::new()
        .route("/health", get(handlers::health::health))
        .merge(gated)
        .layer(from_fn_with_state(origin, apply_origin_policy))
        .layer(TimeoutLayer::new(Duration::from_secs(config.server.request_timeout_secs)))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(request_span)
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
        .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
}

fn request_span(req: &Request<Body>) -> Span {
    tracing::info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        request_id = request_id(req.headers()).unwrap_or("-"),
    )
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(router: Router) -> Self {
        Self { router }
    }

    /// Serve on `listener` until `shutdown` fires, then drain in-flight requests.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::debug!(address = %addr, "HTTP server accepting connections");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CorsOrigin, StoreBackend};
    use crate::session::MemoryStore;
    use axum::body::Body;
    use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE, ORIGIN, SET_COOKIE};
    use axum::http::{Method, StatusCode};
    use axum::response::Response;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;
    use tracing_subscriber::EnvFilter;

    fn pipeline(memory: MemoryStore) -> Router {
        let mut config = GatewayConfig::default();
        config.store.backend = StoreBackend::Memory;
        config.server.public_dir = "/nonexistent/public".to_string();
        config.cors.origins = Vec::new();
        assert_eq!(config.cors.origin_mode(), CorsOrigin::ReflectAll);

        let store = SessionStore::memory(memory, Duration::from_secs(1));
        build_pipeline(&config, store, Collaborators::builtin())
    }

    async fn send(app: &Router, request: Request<Body>) -> Response {
        app.clone().oneshot(request).await.unwrap()
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap();
            String::from_utf8_lossy(&bytes).lines().map(str::to_string).collect()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    async fn text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    #[tokio::test]
    async fn health_and_welcome() {
        let app = pipeline(MemoryStore::new());

        let response = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(text(response).await, r#"{"ok":true}"#);

        let response = send(&app, Request::get("/").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(text(response).await, handlers::fallback::WELCOME);
    }

    #[tokio::test]
    async fn preflight_touches_nothing_downstream() {
        let memory = MemoryStore::new();
        let app = pipeline(memory.clone());

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/chat")
            .header(ORIGIN, "https://x.example")
            .body(Body::empty())
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "https://x.example");
        assert!(response.headers().get(SET_COOKIE).is_none());
        assert!(memory.is_empty());
    }

    #[tokio::test]
    async fn unmatched_and_unattached_paths() {
        let app = pipeline(MemoryStore::new());

        let response = send(&app, Request::post("/nope").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(text(response).await.contains("Cannot POST /nope"));

        let response = send(&app, Request::get("/api/history/42").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn malformed_json_never_reaches_a_collaborator() {
        let memory = MemoryStore::new();
        let app = pipeline(memory.clone());

        let request = Request::put("/session")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{oops"))
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(memory.is_empty());
    }

    #[tokio::test]
    async fn rejected_requests_still_leave_an_info_record() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("chat_gateway=info,tower_http=info"))
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let app = pipeline(MemoryStore::new());

        let request = Request::put("/session")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from("{bad"))
            .unwrap();
        assert_eq!(send(&app, request).await.status(), StatusCode::BAD_REQUEST);

        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/chat")
            .header(ORIGIN, "https://x.example")
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&app, request).await.status(), StatusCode::NO_CONTENT);

        let lines = logs.lines();
        let finished = |method: &str, path: &str, status: &str| {
            lines.iter().any(|line| {
                line.contains("INFO")
                    && line.contains("finished processing request")
                    && line.contains(method)
                    && line.contains(path)
                    && line.contains(status)
            })
        };
        assert!(finished("method=PUT", "path=/session", "status=400"), "{lines:#?}");
        assert!(finished("method=OPTIONS", "path=/chat", "status=204"), "{lines:#?}");
        assert!(lines.iter().any(|line| line.contains("request_id=")), "{lines:#?}");
    }

    #[tokio::test]
    async fn closed_store_fails_gated_routes_but_not_health() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}", dir.path().join("sessions.db").display());
        let sqlite = crate::session::SqliteStore::connect(&url, 2).await.unwrap();
        let store = SessionStore::sqlite(sqlite, Duration::from_secs(1));

        let mut config = GatewayConfig::default();
        config.server.public_dir = "/nonexistent/public".to_string();
        let app = build_pipeline(&config, store.clone(), Collaborators::builtin());
        store.close().await;

        let request = Request::put("/session")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"user":"ada"}"#))
            .unwrap();
        let response = send(&app, request).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(text(response).await.contains("SESSION_BACKEND_UNAVAILABLE"));

        let response = send(&app, Request::get("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
