//! Static assets and the unmatched-request fallback.
//!
//! Requests no feature prefix claims are looked up under the public
//! directory. Anything still unmatched goes to
//! [`handlers::fallback::unmatched`](crate::handlers::fallback::unmatched).

use axum::handler::HandlerWithoutStateExt;
use axum::Router;
use tower_http::services::ServeDir;

use crate::handlers;

/// Wrap `dispatcher` so unclaimed paths fall through to the public directory.
pub fn with_static_fallback(dispatcher: Router, public_dir: &str) -> Router {
    let assets = ServeDir::new(public_dir)
        .call_fallback_on_method_not_allowed(true)
        .fallback(handlers::fallback::unmatched.into_service());
    dispatcher.fallback_service(assets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    async fn call(app: Router, method: &str, uri: &str) -> (StatusCode, String) {
        let request = Request::builder().method(method).uri(uri).body(Body::empty()).unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    #[tokio::test]
    async fn serves_files_then_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("app.js"), "console.log('hi');").unwrap();
        let public = dir.path().to_str().unwrap();

        let (status, body) = call(with_static_fallback(Router::new(), public), "GET", "/app.js").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "console.log('hi');");

        let (status, body) = call(with_static_fallback(Router::new(), public), "GET", "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, handlers::fallback::WELCOME);

        let (status, body) = call(with_static_fallback(Router::new(), public), "GET", "/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.contains("Cannot GET /missing"));

        let (status, _) = call(with_static_fallback(Router::new(), public), "POST", "/app.js").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn index_file_wins_over_welcome() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("index.html"), "<h1>chat</h1>").unwrap();
        let app = with_static_fallback(Router::new(), dir.path().to_str().unwrap());

        let (status, body) = call(app, "GET", "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "<h1>chat</h1>");
    }

    #[tokio::test]
    async fn missing_public_dir_only_loses_assets() {
        let app = with_static_fallback(Router::new(), "/nonexistent/public");
        let (status, body) = call(app, "GET", "/").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, handlers::fallback::WELCOME);
    }
}
