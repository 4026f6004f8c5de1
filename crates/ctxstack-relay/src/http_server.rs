//! HTTP Server for the relay
//!
//! This module provides the relay's axum application.
//!
//! # Routes
//!
//! - `POST /proxy/{*endpoint}`: forwarded to `{upstream}/mcp/{endpoint}`
//! - `OPTIONS /proxy/{*endpoint}`: CORS preflight
//! - `GET /health`: `{"ok": true}`
//! - `GET /openapi.json`, `GET /schema`: OpenAPI document with `/proxy/` paths
//! - `GET /openapi.txt`: the same document pretty-printed as plain text
//! - `GET /`: HTML landing page
//!
//! Every response carries `Access-Control-Allow-Origin: *` and
//! `Access-Control-Allow-Credentials: false`.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, State},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_MAX_AGE,
        },
        HeaderMap, HeaderValue, StatusCode,
    },
    middleware,
    response::Response,
    routing::{get, post},
};
use ctxstack_common::protocol::error::{CtxError, Result};
use ctxstack_common::transport::HttpTransport;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::docs::RelayDocs;
use crate::relay::{Relay, RelayConfig};

#[derive(Clone)]
struct AppState {
    relay: Arc<Relay>,
    docs: Arc<RelayDocs>,
}

/// HTTP server for the relay.
pub struct HttpServer {
    relay: Arc<Relay>,
    docs: Arc<RelayDocs>,
}

impl HttpServer {
    /// Creates a new relay server.
    ///
    /// # Arguments
    /// * `config` - Upstream, credentials, timeout and documentation settings
    ///
    /// # Returns
    /// A new HTTP server instance, or `CtxError::Transport` if the HTTP
    /// client cannot be built
    pub fn new(config: RelayConfig) -> Result<Self> {
        let docs = RelayDocs::build(&config.service_name, &config.public_url);
        let relay = Relay::new(config)?;
        Ok(Self {
            relay: Arc::new(relay),
            docs: Arc::new(docs),
        })
    }

    /// Builds the axum application.
    pub fn app(&self) -> axum::Router {
        let state = AppState {
            relay: self.relay.clone(),
            docs: self.docs.clone(),
        };

        axum::Router::new()
            .route("/", get(landing_page))
            .route("/health", get(health_check))
            .route("/openapi.json", get(openapi_json))
            .route("/schema", get(openapi_json))
            .route("/openapi.txt", get(openapi_txt))
            .route("/proxy/{*endpoint}", post(proxy).options(preflight))
            .layer(DefaultBodyLimit::max(self.relay.config().max_body_bytes))
            .layer(middleware::map_response(add_cors_headers))
            .with_state(state)
    }

    /// Runs the relay.
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "0.0.0.0:8080")
    pub async fn run(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| CtxError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;
        self.serve(listener, std::future::pending()).await
    }

    /// Serves on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener
            .local_addr()
            .map_err(|e| CtxError::Transport(format!("Failed to get local addr: {}", e)))?;
        info!(
            "Relay listening on {}, forwarding to {}",
            local_addr,
            self.relay.config().upstream_url
        );

        axum::serve(listener, self.app())
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("Relay shutting down");
            })
            .await
            .map_err(|e| CtxError::Transport(format!("Server error: {}", e)))
    }
}

async fn add_cors_headers(mut response: Response) -> Response {
    HttpTransport::apply_cors_headers(response.headers_mut());
    response
}

async fn proxy(
    State(state): State<AppState>,
    Path(endpoint): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    info!("Received request for endpoint: {}", endpoint);

    match state.relay.forward(&endpoint, &headers, body).await {
        Ok(upstream) => HttpTransport::json_response(upstream.status, &upstream.body),
        Err(CtxError::Upstream(msg)) => {
            error!("Unexpected error: {}", msg);
            forwarding_error(format!("Unexpected error: {}", msg))
        }
        Err(e) => {
            error!("Error forwarding request: {}", e);
            forwarding_error(format!("Error forwarding request: {}", e))
        }
    }
}

fn forwarding_error(message: String) -> Response {
    HttpTransport::json_response(StatusCode::INTERNAL_SERVER_ERROR, &json!({"error": message}))
}

async fn preflight() -> Response {
    let mut response = HttpTransport::json_response(StatusCode::OK, &json!({}));
    let headers = response.headers_mut();
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type, Authorization"),
    );
    headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static("86400"));
    response
}

async fn health_check() -> Response {
    HttpTransport::json_response(StatusCode::OK, &json!({"ok": true}))
}

async fn openapi_json(State(state): State<AppState>) -> Response {
    HttpTransport::json_response(StatusCode::OK, state.docs.openapi().as_value())
}

async fn openapi_txt(State(state): State<AppState>) -> Response {
    HttpTransport::text_response(StatusCode::OK, state.docs.openapi().pretty())
}

async fn landing_page(State(state): State<AppState>) -> Response {
    HttpTransport::html_response(StatusCode::OK, state.docs.landing_page())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};

    #[tokio::test]
    async fn test_preflight_headers() {
        let response = preflight().await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_METHODS], "GET, POST, OPTIONS");
        assert_eq!(response.headers()[ACCESS_CONTROL_MAX_AGE], "86400");
    }

    #[tokio::test]
    async fn test_add_cors_headers() {
        let response = add_cors_headers(health_check().await).await;
        assert_eq!(response.headers()[ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_forwarding_error_is_500() {
        let response = forwarding_error("Error forwarding request: refused".into());
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
