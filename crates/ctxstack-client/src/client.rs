use std::time::Duration;

use ctxstack_common::protocol::error::{CtxError, Result};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

/// Default request timeout (30 seconds)
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

/// Result of a push.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Pushed {
    pub index: usize,
    pub context_id: String,
}

/// A single context as returned by pop and by lookup by id.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StoredContext {
    pub context_id: String,
    pub context: Value,
}

#[derive(Deserialize)]
struct Cleared {
    removed: usize,
}

/// HTTP client for a context server, or for a relay in front of one.
///
/// Every call is a `POST` to `{base_url}{prefix}{function}` where the prefix
/// is `/mcp/` for a server and `/proxy/` for a relay. The underlying
/// `reqwest::Client` pools connections, so clones are cheap and share them.
#[derive(Clone)]
pub struct ContextClient {
    base_url: String,
    prefix: &'static str,
    client: reqwest::Client,
    timeout_ms: u64,
}

impl ContextClient {
    /// Creates a client for a context server at `base_url`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::build(base_url.into(), "/mcp/", DEFAULT_TIMEOUT_MS)
    }

    /// Creates a client that goes through a relay at `relay_url`.
    pub fn via_relay(relay_url: impl Into<String>) -> Result<Self> {
        Self::build(relay_url.into(), "/proxy/", DEFAULT_TIMEOUT_MS)
    }

    /// Returns a copy of this client with a different request timeout.
    pub fn with_timeout_ms(self, timeout_ms: u64) -> Result<Self> {
        Self::build(self.base_url, self.prefix, timeout_ms)
    }

    fn build(base_url: String, prefix: &'static str, timeout_ms: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| CtxError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            prefix,
            client,
            timeout_ms,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Calls a context function by name and returns the raw JSON result.
    ///
    /// # Errors
    ///
    /// - `NotFound` / `InvalidArgument` for a 404 / 400 answer, carrying the
    ///   server's error message
    /// - `Upstream` for any other non-success answer, or a non-JSON body
    /// - `Transport` / `Timeout` when no answer arrives
    pub async fn call(&self, function: &str, params: Value) -> Result<Value> {
        let url = format!("{}{}{}", self.base_url, self.prefix, function);
        tracing::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .json(&params)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        let body: Value = if bytes.is_empty() {
            json!({})
        } else {
            serde_json::from_slice(&bytes).map_err(|e| {
                CtxError::Upstream(format!("Invalid JSON from {}: {}", url, e))
            })?
        };

        if status.is_success() {
            return Ok(body);
        }

        let message = body
            .get("error")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        Err(match status {
            StatusCode::NOT_FOUND => CtxError::NotFound(message),
            StatusCode::BAD_REQUEST => CtxError::InvalidArgument(message),
            _ => CtxError::Upstream(message),
        })
    }

    async fn call_as<T: DeserializeOwned>(&self, function: &str, params: Value) -> Result<T> {
        let value = self.call(function, params).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Pushes `context` onto `key`'s stack.
    pub async fn push(&self, key: &str, context: Value) -> Result<Pushed> {
        self.call_as("push_context", json!({"key": key, "context": context}))
            .await
    }

    /// Pops the top of `key`'s stack.
    pub async fn pop(&self, key: &str) -> Result<StoredContext> {
        self.call_as("pop_context", json!({"key": key})).await
    }

    /// Keys currently holding at least one context.
    pub async fn list(&self) -> Result<Vec<String>> {
        self.call_as("list_contexts", json!({})).await
    }

    /// The whole stack for `key`, bottom to top.
    pub async fn get(&self, key: &str) -> Result<Vec<Value>> {
        self.call_as("get_context", json!({"key": key})).await
    }

    /// One context of `key`'s stack by id.
    pub async fn get_entry(&self, key: &str, context_id: &str) -> Result<StoredContext> {
        self.call_as("get_context", json!({"key": key, "context_id": context_id}))
            .await
    }

    /// Clears one key, or every key when `key` is `None`. Returns the number
    /// of contexts removed.
    pub async fn clear(&self, key: Option<&str>) -> Result<usize> {
        let params = match key {
            Some(key) => json!({"key": key}),
            None => json!({}),
        };
        let cleared: Cleared = self.call_as("clear_contexts", params).await?;
        Ok(cleared.removed)
    }

    fn classify(&self, error: reqwest::Error) -> CtxError {
        if error.is_timeout() {
            CtxError::Timeout(self.timeout_ms)
        } else {
            CtxError::Transport(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        // Succeeds even if nothing listens there
        let client = ContextClient::new("http://127.0.0.1:8000/").unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8000");
        assert_eq!(client.prefix, "/mcp/");
    }

    #[test]
    fn test_relay_prefix() {
        let client = ContextClient::via_relay("http://127.0.0.1:8080").unwrap();
        assert_eq!(client.prefix, "/proxy/");
    }

    #[test]
    fn test_with_timeout_keeps_target() {
        let client = ContextClient::via_relay("http://relay:8080")
            .unwrap()
            .with_timeout_ms(250)
            .unwrap();
        assert_eq!(client.base_url(), "http://relay:8080");
        assert_eq!(client.prefix, "/proxy/");
        assert_eq!(client.timeout_ms, 250);
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let client = ContextClient::new("http://127.0.0.1:1").unwrap();
        let err = client.list().await.unwrap_err();
        assert!(matches!(err, CtxError::Transport(_)));
    }
}
