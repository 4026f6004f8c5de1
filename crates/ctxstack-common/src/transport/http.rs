//! HTTP Transport Utilities
//!
//! This module provides the HTTP-specific pieces used by both services:
//! - Parsing JSON request bodies (an empty body means `{}`)
//! - Building JSON, plain text and HTML responses with explicit content types
//! - Mapping a [`CtxError`] to a status code and an error body
//! - The CORS policy layer
//!
//! # Example
//!
//! ```
//! use ctxstack_common::transport::http::HttpTransport;
//! use axum::body::Bytes;
//! use axum::http::StatusCode;
//! use serde_json::json;
//!
//! let params = HttpTransport::parse_json_body(&Bytes::from(r#"{"key":"s1"}"#)).unwrap();
//! assert_eq!(params["key"], "s1");
//!
//! let response = HttpTransport::json_response(StatusCode::OK, &json!({"ok": true}));
//! assert_eq!(response.headers()["content-type"], "application/json");
//! ```

use axum::body::Bytes;
use axum::http::header::{
    ACCEPT, ACCESS_CONTROL_ALLOW_CREDENTIALS, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE,
};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};

use crate::protocol::error::{CtxError, Result};

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain; charset=utf-8";
pub const CONTENT_TYPE_HTML: &str = "text/html; charset=utf-8";

/// HTTP transport utility functions
pub struct HttpTransport;

impl HttpTransport {
    /// Parses a request body as JSON.
    ///
    /// An empty (or whitespace-only) body is treated as an empty object so
    /// that parameterless calls like `clear_contexts` need no body at all.
    ///
    /// # Errors
    ///
    /// `CtxError::InvalidArgument("Invalid JSON in request body")` when the
    /// body is not valid JSON.
    pub fn parse_json_body(body: &Bytes) -> Result<Value> {
        if body.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(json!({}));
        }
        serde_json::from_slice(body)
            .map_err(|_| CtxError::InvalidArgument("Invalid JSON in request body".into()))
    }

    /// Creates a JSON response.
    pub fn json_response(status: StatusCode, body: &Value) -> Response {
        let bytes = serde_json::to_vec(body).unwrap_or_default();
        (
            status,
            [(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_JSON))],
            bytes,
        )
            .into_response()
    }

    /// Creates a `text/plain` response.
    pub fn text_response(status: StatusCode, body: impl Into<String>) -> Response {
        (
            status,
            [(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_TEXT))],
            body.into(),
        )
            .into_response()
    }

    /// Creates a `text/html` response.
    pub fn html_response(status: StatusCode, body: impl Into<String>) -> Response {
        (
            status,
            [(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_HTML))],
            body.into(),
        )
            .into_response()
    }

    /// Creates an error response: `{"error": message, "success": false}`
    /// with the status from [`CtxError::status_code`].
    pub fn error_response(error: &CtxError) -> Response {
        Self::json_response(
            error.status_code(),
            &json!({"error": error.to_string(), "success": false}),
        )
    }

    /// True when the `Accept` header asks for any `text/*` type.
    pub fn prefers_text(headers: &HeaderMap) -> bool {
        headers
            .get(ACCEPT)
            .and_then(|v| v.to_str().ok())
            .map(|accept| accept.contains("text/"))
            .unwrap_or(false)
    }

    /// Sets the fixed CORS headers on a response that bypasses the CORS
    /// layer's own decoration (forwarded upstream responses, preflights).
    pub fn apply_cors_headers(headers: &mut HeaderMap) {
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        headers.insert(
            ACCESS_CONTROL_ALLOW_CREDENTIALS,
            HeaderValue::from_static("false"),
        );
    }
}

/// CORS policy for both services: any origin, any method, any header,
/// credentials not allowed.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_json_body_object() {
        let body = Bytes::from(r#"{"key":"s1","context":{"a":1}}"#);
        let value = HttpTransport::parse_json_body(&body).unwrap();
        assert_eq!(value["context"]["a"], 1);
    }

    #[test]
    fn test_parse_json_body_empty_is_empty_object() {
        assert_eq!(HttpTransport::parse_json_body(&Bytes::new()).unwrap(), json!({}));
        assert_eq!(
            HttpTransport::parse_json_body(&Bytes::from(" \n")).unwrap(),
            json!({})
        );
    }

    #[test]
    fn test_parse_json_body_invalid() {
        let err = HttpTransport::parse_json_body(&Bytes::from("{not json")).unwrap_err();
        assert!(matches!(err, CtxError::InvalidArgument(_)));
        assert_eq!(err.to_string(), "Invalid JSON in request body");
    }

    #[test]
    fn test_json_response_headers() {
        let response = HttpTransport::json_response(StatusCode::CREATED, &json!({"ok": true}));
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()[CONTENT_TYPE], CONTENT_TYPE_JSON);
    }

    #[test]
    fn test_text_and_html_response_headers() {
        let text = HttpTransport::text_response(StatusCode::OK, "hello");
        assert_eq!(text.headers()[CONTENT_TYPE], CONTENT_TYPE_TEXT);

        let html = HttpTransport::html_response(StatusCode::OK, "<p>hi</p>");
        assert_eq!(html.headers()[CONTENT_TYPE], CONTENT_TYPE_HTML);
    }

    #[test]
    fn test_error_response_status() {
        let response = HttpTransport::error_response(&CtxError::NotFound("gone".into()));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[CONTENT_TYPE], CONTENT_TYPE_JSON);

        let response = HttpTransport::error_response(&CtxError::InvalidArgument("bad".into()));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_prefers_text() {
        let mut headers = HeaderMap::new();
        assert!(!HttpTransport::prefers_text(&headers));

        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        assert!(!HttpTransport::prefers_text(&headers));

        headers.insert(ACCEPT, HeaderValue::from_static("text/plain, */*"));
        assert!(HttpTransport::prefers_text(&headers));
    }

    #[test]
    fn test_apply_cors_headers() {
        let mut headers = HeaderMap::new();
        HttpTransport::apply_cors_headers(&mut headers);
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[ACCESS_CONTROL_ALLOW_CREDENTIALS], "false");
    }
}
