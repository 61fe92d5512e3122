//! Body decoder stage.
//!
//! # Responsibilities
//! - Decode `application/json` and `application/x-www-form-urlencoded` bodies
//!   into a [`ParsedBody`] request extension
//! - Reject malformed JSON with 400 and oversized bodies with 413
//! - Put the raw bytes back so handlers can still read the body themselves
//!
//! # Form Encoding
//! ```text
//! a=1&b=2        → { "a": "1", "b": "2" }
//! tag=x&tag=y    → { "tag": ["x", "y"] }
//! ids[]=7        → { "ids": ["7"] }
//! ```

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use http_body_util::LengthLimitError;
use serde_json::{Map, Value};

use crate::http::request::ParsedBody;
use crate::http::response::GatewayError;

/// Largest body the decoder will buffer, in bytes.
#[derive(Debug, Clone, Copy)]
pub struct BodyLimit(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyKind {
    Json,
    Form,
}

impl BodyKind {
    fn detect(headers: &HeaderMap) -> Option<Self> {
        let content_type = headers.get(CONTENT_TYPE)?.to_str().ok()?;
        let essence = content_type.split(';').next()?.trim().to_ascii_lowercase();
        match essence.as_str() {
            "application/json" => Some(BodyKind::Json),
            "application/x-www-form-urlencoded" => Some(BodyKind::Form),
            other if other.starts_with("application/") && other.ends_with("+json") => {
                Some(BodyKind::Json)
            }
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            BodyKind::Json => "json",
            BodyKind::Form => "form",
        }
    }
}

pub async fn decode_body(
    State(BodyLimit(limit)): State<BodyLimit>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, GatewayError> {
    let Some(kind) = BodyKind::detect(req.headers()) else {
        let mut req = req;
        req.extensions_mut().insert(ParsedBody::empty());
        return Ok(next.run(req).await);
    };

    let declared = req
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<usize>().ok());
    if declared.is_some_and(|len| len > limit) {
        return Err(GatewayError::PayloadTooLarge { limit });
    }

    let (parts, body) = req.into_parts();
    let bytes = axum::body::to_bytes(body, limit)
        .await
        .map_err(|e| read_error(e, kind, limit))?;

    let parsed = match kind {
        BodyKind::Json => parse_json(&bytes)?,
        BodyKind::Form => parse_form(&bytes),
    };

    let mut req = Request::from_parts(parts, Body::from(bytes));
    req.extensions_mut().insert(ParsedBody(parsed));
    Ok(next.run(req).await)
}

/// Only the length limit maps to 413; an aborted or broken body is a 400.
fn read_error(err: axum::Error, kind: BodyKind, limit: usize) -> GatewayError {
    let inner = err.into_inner();
    if inner.downcast_ref::<LengthLimitError>().is_some() {
        return GatewayError::PayloadTooLarge { limit };
    }
    GatewayError::MalformedBody {
        kind: kind.name(),
        reason: format!("failed to read body: {inner}"),
    }
}

/// Objects and arrays only; an empty body reads as `{}`.
fn parse_json(bytes: &[u8]) -> Result<Value, GatewayError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    let value: Value = serde_json::from_slice(bytes).map_err(|e| GatewayError::MalformedBody {
        kind: "json",
        reason: e.to_string(),
    })?;
    match value {
        Value::Object(_) | Value::Array(_) => Ok(value),
        _ => Err(GatewayError::MalformedBody {
            kind: "json",
            reason: "top-level value must be an object or an array".to_string(),
        }),
    }
}

fn parse_form(bytes: &[u8]) -> Value {
    let mut fields = Map::new();
    for (key, value) in url::form_urlencoded::parse(bytes) {
        let (key, as_list) = match key.strip_suffix("[]") {
            Some(stripped) => (stripped.to_string(), true),
            None => (key.into_owned(), false),
        };
        let value = Value::String(value.into_owned());
        match fields.get_mut(&key) {
            Some(Value::Array(items)) => items.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None if as_list => {
                fields.insert(key, Value::Array(vec![value]));
            }
            None => {
                fields.insert(key, value);
            }
        }
    }
    Value::Object(fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use serde_json::json;
    use tower::ServiceExt;

    fn app(limit: usize) -> Router {
        Router::new()
            .route(
                "/echo",
                post(|parsed: ParsedBody, raw: String| async move {
                    axum::Json(json!({ "parsed": parsed.into_inner(), "raw": raw }))
                }),
            )
            .layer(axum::middleware::from_fn_with_state(BodyLimit(limit), decode_body))
    }

    async fn send(limit: usize, content_type: &str, body: &'static str) -> (StatusCode, Value) {
        let request = Request::post("/echo")
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .unwrap();
        let response = app(limit).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn json_is_parsed_and_raw_body_preserved() {
        let (status, body) = send(1024, "application/json", r#"{"text":"hi"}"#).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["parsed"], json!({ "text": "hi" }));
        assert_eq!(body["raw"], r#"{"text":"hi"}"#);
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let (status, body) = send(1024, "application/json; charset=utf-8", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "MALFORMED_BODY");

        let (status, _) = send(1024, "application/json", "42").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn empty_json_body_is_an_empty_object() {
        let (status, body) = send(1024, "application/json", "").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["parsed"], json!({}));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let (status, body) = send(8, "application/json", r#"{"text":"far too long"}"#).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"]["code"], "PAYLOAD_TOO_LARGE");
    }

    #[tokio::test]
    async fn unknown_content_type_passes_through() {
        let (status, body) = send(1024, "text/plain", "just text").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["parsed"], json!({}));
        assert_eq!(body["raw"], "just text");
    }

    #[tokio::test]
    async fn aborted_body_is_malformed_not_oversized() {
        use axum::body::Bytes;
        use http_body_util::channel::Channel;

        let (mut tx, channel) = Channel::<Bytes, std::io::Error>::new(1);
        tx.send_data(Bytes::from_static(b"{\"text\":")).await.unwrap();
        tx.abort(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "client went away"));

        let request = Request::post("/echo")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::new(channel))
            .unwrap();
        let response = app(1024).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "MALFORMED_BODY");
    }

    #[test]
    fn form_fields_collect_repeats_and_brackets() {
        let parsed = parse_form(b"name=Ada+L&tag=a&tag=b&ids[]=7&note=%F0%9F%91%8B");
        assert_eq!(
            parsed,
            json!({ "name": "Ada L", "tag": ["a", "b"], "ids": ["7"], "note": "👋" })
        );
    }

    #[tokio::test]
    async fn form_body_is_decoded() {
        let (status, body) =
            send(1024, "application/x-www-form-urlencoded", "room=general&msg=hello").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["parsed"], json!({ "room": "general", "msg": "hello" }));
    }
}
