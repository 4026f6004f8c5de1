//! HTTP Server Integration Tests
//!
//! These tests start the context server on an ephemeral port and talk to it
//! with reqwest. They cover:
//! - The per-operation routes and the `/mcp/{function}` dispatch route
//! - Status codes for not-found and invalid requests
//! - CORS and content-type headers
//! - Documentation and info endpoints

use std::net::SocketAddr;
use std::sync::Arc;

use ctxstack_server::{ContextStore, HttpServer, ResourceLimits};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;

async fn start_server_with(store: Arc<ContextStore>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = HttpServer::new(store);
    tokio::spawn(async move {
        let _ = server.serve(listener, std::future::pending()).await;
    });
    addr
}

async fn start_server() -> SocketAddr {
    start_server_with(Arc::new(ContextStore::new())).await
}

async fn post(addr: SocketAddr, path: &str, body: Value) -> (StatusCode, Value) {
    let res = Client::new()
        .post(format!("http://{}{}", addr, path))
        .json(&body)
        .send()
        .await
        .unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

async fn get(addr: SocketAddr, path: &str) -> (StatusCode, Value) {
    let res = Client::new()
        .get(format!("http://{}{}", addr, path))
        .send()
        .await
        .unwrap();
    let status = res.status();
    (status, res.json().await.unwrap())
}

// ============================================================================
// Context operations
// ============================================================================

#[tokio::test]
async fn test_push_get_pop_scenario() {
    let addr = start_server().await;

    let (status, body) = post(addr, "/push_context", json!({"key": "s1", "context": {"a": 1}})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["index"], 1);

    let (_, body) = post(addr, "/push_context", json!({"key": "s1", "context": {"a": 2}})).await;
    assert_eq!(body["index"], 2);

    let (status, body) = get(addr, "/get_context?key=s1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([{"a": 1}, {"a": 2}]));

    let (_, body) = post(addr, "/pop_context", json!({"key": "s1"})).await;
    assert_eq!(body["context"], json!({"a": 2}));
    let (_, body) = post(addr, "/pop_context", json!({"key": "s1"})).await;
    assert_eq!(body["context"], json!({"a": 1}));

    let (status, body) = post(addr, "/pop_context", json!({"key": "s1"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "No contexts to pop");
}

#[tokio::test]
async fn test_list_and_clear() {
    let addr = start_server().await;

    post(addr, "/push_context", json!({"key": "b", "context": 1})).await;
    post(addr, "/push_context", json!({"key": "a", "context": 2})).await;

    let (status, body) = get(addr, "/list_contexts").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["b", "a"]));

    let (_, body) = post(addr, "/clear_contexts", json!({"key": "b"})).await;
    assert_eq!(body, json!({"ok": true, "removed": 1}));

    let (status, _) = get(addr, "/get_context?key=b").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // No body at all clears every key.
    let res = Client::new()
        .post(format!("http://{}/clear_contexts", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let (_, body) = get(addr, "/list_contexts").await;
    assert_eq!(body, json!([]));
}

#[tokio::test]
async fn test_mcp_dispatch_route() {
    let addr = start_server().await;

    let (status, pushed) = post(
        addr,
        "/mcp/push_context",
        json!({"user_id": "u1", "context": {"query": "auth"}}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(pushed["success"], true);

    let (_, got) = post(
        addr,
        "/mcp/get_context",
        json!({"user_id": "u1", "context_id": pushed["context_id"]}),
    )
    .await;
    assert_eq!(got["context"], json!({"query": "auth"}));

    let (_, listed) = post(addr, "/mcp/list_contexts", json!({"user_id": "u1"})).await;
    assert_eq!(listed["contexts"].as_array().unwrap().len(), 1);

    let (status, body) = post(addr, "/mcp/frobnicate", json!({})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Function frobnicate not supported");
}

// ============================================================================
// Error handling
// ============================================================================

#[tokio::test]
async fn test_invalid_json_is_bad_request() {
    let addr = start_server().await;

    let res = Client::new()
        .post(format!("http://{}/push_context", addr))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["error"], "Invalid JSON in request body");
}

#[tokio::test]
async fn test_missing_parameters_are_bad_request() {
    let addr = start_server().await;

    let (status, _) = post(addr, "/push_context", json!({"key": "k"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = post(addr, "/push_context", json!({"context": 1})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(addr, "/get_context").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_clear_with_empty_key_is_rejected() {
    let addr = start_server().await;

    post(addr, "/push_context", json!({"key": "alice", "context": 1})).await;
    post(addr, "/push_context", json!({"key": "bob", "context": 2})).await;

    let (status, body) = post(addr, "/clear_contexts", json!({"key": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "key parameter is required");

    let (status, _) = post(addr, "/mcp/clear_contexts", json!({"user_id": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = get(addr, "/list_contexts?key=").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, body) = get(addr, "/list_contexts").await;
    assert_eq!(body, json!(["alice", "bob"]));
}

#[tokio::test]
async fn test_oversized_body_is_rejected() {
    let limits = ResourceLimits::new()
        .with_max_key_bytes(16)
        .with_max_entry_bytes(64)
        .with_max_body_bytes(2048);
    let addr = start_server_with(Arc::new(ContextStore::with_limits(limits))).await;

    let big = "x".repeat(8192);
    let res = Client::new()
        .post(format!("http://{}/push_context", addr))
        .json(&json!({"key": "k", "context": big}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::PAYLOAD_TOO_LARGE);

    // Fits the body limit but not the entry limit.
    let medium = "x".repeat(256);
    let (status, _) = post(addr, "/push_context", json!({"key": "k", "context": medium})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

// ============================================================================
// Headers and documentation
// ============================================================================

#[tokio::test]
async fn test_cors_and_content_type_headers() {
    let addr = start_server().await;

    let res = Client::new()
        .get(format!("http://{}/health", addr))
        .header("origin", "https://example.com")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert_eq!(res.headers()["content-type"], "application/json");
    assert_eq!(res.json::<Value>().await.unwrap(), json!({"ok": true}));

    let res = Client::new()
        .post(format!("http://{}/pop_context", addr))
        .header("origin", "https://example.com")
        .json(&json!({"key": "none"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
    assert_eq!(res.headers()["access-control-allow-origin"], "*");
    assert_eq!(res.headers()["content-type"], "application/json");
}

#[tokio::test]
async fn test_schema_json_and_text() {
    let addr = start_server().await;

    let (status, doc) = get(addr, "/openapi.json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(doc["openapi"], "3.0.0");
    assert!(doc["paths"]["/mcp/push_context"].is_object());

    let (_, schema) = get(addr, "/schema").await;
    assert_eq!(schema, doc);

    let res = Client::new()
        .get(format!("http://{}/schema", addr))
        .header("accept", "text/plain")
        .send()
        .await
        .unwrap();
    assert_eq!(res.headers()["content-type"], "text/plain; charset=utf-8");
    let text = res.text().await.unwrap();
    assert!(text.contains("\n  \"openapi\": \"3.0.0\""));
}

#[tokio::test]
async fn test_root_info() {
    let addr = start_server().await;
    post(addr, "/push_context", json!({"key": "k", "context": 1})).await;

    let (status, info) = get(addr, "/").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["documentation"], "/openapi.json");
    assert_eq!(info["functions"][0], "push_context");
    assert_eq!(info["store"]["entries"], 1);
    assert!(info["uptime_ms"].is_number());
}

#[tokio::test]
async fn test_concurrent_http_pushes() {
    let addr = start_server().await;

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            tokio::spawn(async move {
                post(addr, "/push_context", json!({"key": "shared", "context": i})).await
            })
        })
        .collect();
    for task in tasks {
        let (status, _) = task.await.unwrap();
        assert_eq!(status, StatusCode::OK);
    }

    let (_, stack) = get(addr, "/get_context?key=shared").await;
    let mut values: Vec<i64> = stack
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_i64().unwrap())
        .collect();
    values.sort();
    assert_eq!(values, (0..20).collect::<Vec<_>>());
}
