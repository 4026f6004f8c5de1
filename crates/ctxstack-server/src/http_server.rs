//! HTTP Server for the context store
//!
//! This module exposes a [`ContextRouter`] over HTTP using axum.
//!
//! # Routes
//!
//! - `POST /push_context`, `POST /pop_context`, `POST /clear_contexts`:
//!   parameters in the JSON body (an empty body means `{}`)
//! - `GET /list_contexts`, `GET /get_context`: parameters in the query string
//! - `POST /mcp/{function}`: dispatch by function name, used by the relay
//! - `GET /health`: `{"ok": true}`
//! - `GET /schema`, `GET /openapi.json`: the OpenAPI document, pretty-printed
//!   as `text/plain` when the `Accept` header asks for `text/*`
//! - `GET /`: server information
//!
//! Every response carries an explicit `Content-Type` and the permissive CORS
//! headers from [`cors_layer`].
//!
//! # Example
//!
//! ```no_run
//! use ctxstack_server::{ContextStore, HttpServer};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = Arc::new(ContextStore::new());
//!     let server = HttpServer::new(store);
//!     server.run("127.0.0.1:8000".parse().unwrap()).await.unwrap();
//! }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{get, post},
};
use ctxstack_common::protocol::error::{CtxError, Result};
use ctxstack_common::protocol::OpenApiDocument;
use ctxstack_common::transport::{cors_layer, HttpTransport};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing::info;

use crate::http_router::ContextRouter;
use crate::store::ContextStore;

#[derive(Clone)]
struct AppState {
    router: Arc<ContextRouter>,
    openapi: Arc<OpenApiDocument>,
}

/// HTTP server for the context store.
pub struct HttpServer {
    router: Arc<ContextRouter>,
    openapi: Arc<OpenApiDocument>,
    body_limit: usize,
}

impl HttpServer {
    /// Creates a new HTTP server over the given store.
    ///
    /// The request body limit is taken from the store's
    /// [`ResourceLimits`](crate::ResourceLimits).
    ///
    /// # Arguments
    /// * `store` - The shared context store
    ///
    /// # Returns
    /// A new HTTP server instance
    pub fn new(store: Arc<ContextStore>) -> Self {
        let body_limit = store.limits().effective_body_limit();
        Self {
            router: Arc::new(ContextRouter::new(store)),
            openapi: Arc::new(OpenApiDocument::build("/mcp/")),
            body_limit,
        }
    }

    /// Builds the axum application.
    pub fn app(&self) -> axum::Router {
        let state = AppState {
            router: self.router.clone(),
            openapi: self.openapi.clone(),
        };

        axum::Router::new()
            .route("/", get(root))
            .route("/health", get(health_check))
            .route("/schema", get(schema))
            .route("/openapi.json", get(schema))
            .route("/push_context", post(push_context))
            .route("/pop_context", post(pop_context))
            .route("/clear_contexts", post(clear_contexts))
            .route("/list_contexts", get(list_contexts))
            .route("/get_context", get(get_context))
            .route("/mcp/{function}", post(dispatch))
            .layer(DefaultBodyLimit::max(self.body_limit))
            .layer(cors_layer())
            .with_state(state)
    }

    /// Runs the HTTP server.
    ///
    /// # Arguments
    /// * `addr` - Socket address to bind to (e.g., "0.0.0.0:8000")
    ///
    /// # Returns
    /// - `Ok(())` - Server ran successfully
    /// - `Err(CtxError)` - Server failed to bind or run
    pub async fn run(self, addr: SocketAddr) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| CtxError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;
        self.serve(listener, std::future::pending()).await
    }

    /// Serves on an already bound listener until `shutdown` resolves.
    ///
    /// In-flight requests are allowed to finish before this returns.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local_addr = listener
            .local_addr()
            .map_err(|e| CtxError::Transport(format!("Failed to get local addr: {}", e)))?;
        info!("Context server listening on {}", local_addr);

        axum::serve(listener, self.app())
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("Context server shutting down");
            })
            .await
            .map_err(|e| CtxError::Transport(format!("Server error: {}", e)))
    }
}

/// Runs one function and turns the outcome into a response.
fn respond(router: &ContextRouter, function: &str, params: Value) -> Response {
    match router.handle(function, params) {
        Ok(result) => HttpTransport::json_response(StatusCode::OK, &result),
        Err(e) => {
            if e.status_code().is_server_error() {
                tracing::error!(function, "context function failed: {}", e);
            } else {
                tracing::debug!(function, "context function rejected: {}", e);
            }
            HttpTransport::error_response(&e)
        }
    }
}

fn respond_with_body(router: &ContextRouter, function: &str, body: &Bytes) -> Response {
    match HttpTransport::parse_json_body(body) {
        Ok(params) => respond(router, function, params),
        Err(e) => {
            tracing::debug!(function, "rejected request body: {}", e);
            HttpTransport::error_response(&e)
        }
    }
}

fn query_params(query: HashMap<String, String>) -> Value {
    Value::Object(query.into_iter().map(|(k, v)| (k, Value::String(v))).collect())
}

async fn push_context(State(state): State<AppState>, body: Bytes) -> Response {
    respond_with_body(&state.router, "push_context", &body)
}

async fn pop_context(State(state): State<AppState>, body: Bytes) -> Response {
    respond_with_body(&state.router, "pop_context", &body)
}

async fn clear_contexts(State(state): State<AppState>, body: Bytes) -> Response {
    respond_with_body(&state.router, "clear_contexts", &body)
}

async fn list_contexts(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    respond(&state.router, "list_contexts", query_params(query))
}

async fn get_context(
    State(state): State<AppState>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    respond(&state.router, "get_context", query_params(query))
}

async fn dispatch(
    State(state): State<AppState>,
    Path(function): Path<String>,
    body: Bytes,
) -> Response {
    respond_with_body(&state.router, &function, &body)
}

async fn health_check() -> Response {
    HttpTransport::json_response(StatusCode::OK, &json!({"ok": true}))
}

async fn schema(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if HttpTransport::prefers_text(&headers) {
        HttpTransport::text_response(StatusCode::OK, state.openapi.pretty())
    } else {
        HttpTransport::json_response(StatusCode::OK, state.openapi.as_value())
    }
}

async fn root(State(state): State<AppState>) -> Response {
    HttpTransport::json_response(StatusCode::OK, &state.router.info())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ResourceLimits;

    #[test]
    fn test_query_params_become_strings() {
        let mut query = HashMap::new();
        query.insert("key".to_string(), "s1".to_string());
        assert_eq!(query_params(query), json!({"key": "s1"}));
    }

    #[test]
    fn test_body_limit_from_store() {
        let limits = ResourceLimits::new()
            .with_max_entry_bytes(10)
            .with_max_key_bytes(10)
            .with_max_body_bytes(4096);
        let server = HttpServer::new(Arc::new(ContextStore::with_limits(limits)));
        assert_eq!(server.body_limit, 4096);
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = health_check().await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_respond_maps_errors() {
        let router = ContextRouter::new(Arc::new(ContextStore::new()));
        let response = respond(&router, "pop_context", json!({"key": "none"}));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = respond_with_body(&router, "pop_context", &Bytes::from("{oops"));
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
