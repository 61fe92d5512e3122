//! Last stop for requests no route or static file claimed.

use axum::http::{Method, Uri};
use axum::response::{IntoResponse, Response};

use crate::http::response::GatewayError;

pub const WELCOME: &str = "Welcome to the Chat Application API";

pub async fn unmatched(method: Method, uri: Uri) -> Response {
    if uri.path() == "/" && (method == Method::GET || method == Method::HEAD) {
        return WELCOME.into_response();
    }
    GatewayError::NotFound { method, path: uri.path().to_string() }.into_response()
}
