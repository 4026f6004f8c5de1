//! Upstream forwarding for the relay.
//!
//! [`Relay`] posts a request body to `{upstream}/mcp/{endpoint}` and returns
//! the upstream status with its JSON body. It holds one pooled
//! `reqwest::Client` for the lifetime of the process.
//!
//! # Retry Strategy
//!
//! Only connection-level failures (refused, reset before a response) are
//! retried, with exponential backoff:
//!
//! - Attempt 1: Wait `initial_backoff_ms` (default: 50ms)
//! - Attempt 2: Wait `initial_backoff_ms * multiplier` (default: 100ms)
//! - Capped at `max_backoff_ms` (default: 1000ms)
//!
//! Timeouts are not retried, and neither is any response the upstream actually
//! produced, whatever its status.

use std::time::{Duration, Instant};

use axum::body::Bytes;
use axum::http::header::{self, HeaderMap, HeaderName};
use axum::http::StatusCode;
use ctxstack_common::protocol::error::{CtxError, Result};
use serde_json::{json, Value};
use tracing::{info, warn};

/// Retry configuration for connection failures.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (excluding initial attempt)
    ///
    /// Total attempts = max_retries + 1
    /// Default: 2
    pub max_retries: usize,
    /// Initial backoff in milliseconds
    ///
    /// Default: 50ms
    pub initial_backoff_ms: u64,
    /// Maximum backoff in milliseconds
    ///
    /// Default: 1000ms
    pub max_backoff_ms: u64,
    /// Exponential backoff multiplier
    ///
    /// Default: 2.0
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_backoff_ms: 50,
            max_backoff_ms: 1000,
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// Configuration that never retries.
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    fn next_backoff(&self, backoff_ms: u64) -> u64 {
        std::cmp::min(
            (backoff_ms as f64 * self.backoff_multiplier) as u64,
            self.max_backoff_ms,
        )
    }
}

/// Credentials attached to every upstream request as HTTP Basic auth.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamCredentials {
    pub username: String,
    pub password: Option<String>,
}

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Base URL of the context server, without a trailing slash
    pub upstream_url: String,
    pub credentials: Option<UpstreamCredentials>,
    /// Per-request timeout for upstream calls
    pub timeout: Duration,
    pub retry: RetryConfig,
    /// Name shown in the landing page and OpenAPI title
    pub service_name: String,
    /// URL the relay is reachable at, used in the landing page examples
    pub public_url: String,
    /// Largest accepted request body
    pub max_body_bytes: usize,
}

impl RelayConfig {
    /// Creates a configuration for `upstream_url` with default settings.
    pub fn new(upstream_url: impl Into<String>) -> Self {
        let upstream_url = upstream_url.into().trim_end_matches('/').to_string();
        Self {
            upstream_url,
            credentials: None,
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            service_name: "ctxstack".to_string(),
            public_url: "http://127.0.0.1:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: Option<String>) -> Self {
        self.credentials = Some(UpstreamCredentials {
            username: username.into(),
            password,
        });
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = name.into();
        self
    }

    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }
}

/// What the upstream answered.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    /// The upstream JSON body; `{}` when the upstream sent no body
    pub body: Value,
}

/// Forwards context calls to an upstream context server.
pub struct Relay {
    client: reqwest::Client,
    config: RelayConfig,
}

/// Request headers never forwarded upstream.
///
/// `authorization` belongs to the caller, not to the upstream. The rest are
/// hop-by-hop or recomputed by the client.
const STRIPPED_HEADERS: &[HeaderName] = &[
    header::AUTHORIZATION,
    header::HOST,
    header::CONTENT_LENGTH,
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    // reqwest is built without decompression
    header::ACCEPT_ENCODING,
];

impl Relay {
    /// Creates a relay with its HTTP client.
    ///
    /// # Errors
    ///
    /// `CtxError::Transport` if the TLS backend cannot be initialized.
    pub fn new(config: RelayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CtxError::Transport(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Upstream URL for an endpoint.
    pub fn upstream_url(&self, endpoint: &str) -> String {
        format!(
            "{}/mcp/{}",
            self.config.upstream_url,
            endpoint.trim_start_matches('/')
        )
    }

    /// Forwards `body` to `{upstream}/mcp/{endpoint}`.
    ///
    /// # Arguments
    ///
    /// * `endpoint` - Path after `/proxy/`
    /// * `headers` - The caller's request headers (filtered before sending)
    /// * `body` - The caller's raw request body
    ///
    /// # Returns
    ///
    /// - `Ok(UpstreamResponse)` - Any response the upstream produced
    /// - `Err(CtxError::Transport)` - Upstream unreachable after all retries
    /// - `Err(CtxError::Timeout)` - Upstream did not answer in time
    /// - `Err(CtxError::Upstream)` - Upstream body is not JSON
    pub async fn forward(
        &self,
        endpoint: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> Result<UpstreamResponse> {
        let url = self.upstream_url(endpoint);
        let headers = forwardable_headers(headers);
        let start = Instant::now();
        let mut backoff_ms = self.config.retry.initial_backoff_ms;

        info!("Forwarding request to {}", url);

        let mut attempt = 0;
        let response = loop {
            match self.send_once(&url, &headers, body.clone()).await {
                Ok(response) => break response,
                Err(e) if e.is_connect() && attempt < self.config.retry.max_retries => {
                    warn!(
                        "Request to {} failed (attempt {}): {}, retrying in {}ms",
                        url,
                        attempt + 1,
                        e,
                        backoff_ms
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = self.config.retry.next_backoff(backoff_ms);
                    attempt += 1;
                }
                Err(e) => return Err(self.classify(e)),
            }
        };

        let status = response.status();
        let bytes = response.bytes().await.map_err(|e| self.classify(e))?;
        info!(
            "Received response from {} with status {} in {}ms",
            url,
            status.as_u16(),
            start.elapsed().as_millis()
        );

        Ok(UpstreamResponse {
            status,
            body: parse_upstream_body(&bytes)?,
        })
    }

    async fn send_once(
        &self,
        url: &str,
        headers: &HeaderMap,
        body: Bytes,
    ) -> std::result::Result<reqwest::Response, reqwest::Error> {
        let mut request = self.client.post(url).headers(headers.clone()).body(body);
        if let Some(creds) = &self.config.credentials {
            request = request.basic_auth(&creds.username, creds.password.as_ref());
        }
        request.send().await
    }

    fn classify(&self, error: reqwest::Error) -> CtxError {
        if error.is_timeout() {
            CtxError::Timeout(self.config.timeout.as_millis() as u64)
        } else {
            CtxError::Transport(error.to_string())
        }
    }
}

/// Copies the caller's headers minus the ones that must not reach upstream.
pub fn forwardable_headers(headers: &HeaderMap) -> HeaderMap {
    let mut forwarded = headers.clone();
    for name in STRIPPED_HEADERS {
        forwarded.remove(name);
    }
    forwarded.remove("keep-alive");
    forwarded
}

fn parse_upstream_body(bytes: &Bytes) -> Result<Value> {
    if bytes.is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_slice(bytes).map_err(|e| CtxError::Upstream(e.to_string()))
}
