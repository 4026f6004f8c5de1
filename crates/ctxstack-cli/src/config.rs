// Copyright 2025 ctxstack Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Settings resolution.
//!
//! Every setting is taken from its command-line flag if given, then from an
//! environment variable, then from a default:
//!
//! | setting | env |
//! |---|---|
//! | bind address | `PORT` (binds `0.0.0.0:$PORT`) |
//! | upstream URL | `UPSTREAM_URL` |
//! | upstream credentials | `UPSTREAM_USER`, `UPSTREAM_PASSWORD` |
//! | service name | `SERVICE_NAME` |
//! | public URL | `CTXSTACK_PUBLIC_URL` |
//! | log filter | `RUST_LOG`, then `LOG_LEVEL` |
//!
//! Lookups go through an [`EnvLookup`] so tests never touch the process
//! environment.

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use anyhow::{anyhow, Result};
use ctxstack_relay::{RelayConfig, RetryConfig};

/// Reads one environment variable; `None` when unset or empty.
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

pub const DEFAULT_SERVER_PORT: u16 = 8000;
pub const DEFAULT_RELAY_PORT: u16 = 8080;
pub const DEFAULT_UPSTREAM_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_SERVICE_NAME: &str = "ctxstack";

/// [`EnvLookup`] backed by the process environment.
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Validates that a URL string starts with http:// or https://
///
/// # Arguments
///
/// * `url` - The URL string to validate
/// * `description` - Human-readable description of what the URL is for (e.g., "upstream URL")
///
/// # Errors
///
/// Returns an error if the URL doesn't start with http:// or https://
pub fn validate_http_url(url: &str, description: &str) -> Result<()> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Ok(())
    } else {
        Err(anyhow!(
            "Invalid {}: '{}' must start with http:// or https://",
            description,
            url
        ))
    }
}

/// Resolves the bind address: `--bind`, then `0.0.0.0:$PORT`, then
/// `0.0.0.0:{default_port}`.
pub fn resolve_bind(flag: Option<&str>, env: EnvLookup, default_port: u16) -> Result<SocketAddr> {
    if let Some(bind) = flag {
        return bind
            .parse()
            .map_err(|e| anyhow!("Invalid bind address {}: {}", bind, e));
    }

    let port = match env("PORT") {
        Some(port) => port
            .trim()
            .parse::<u16>()
            .map_err(|e| anyhow!("Invalid PORT {}: {}", port, e))?,
        None => default_port,
    };
    Ok(SocketAddr::from((Ipv4Addr::UNSPECIFIED, port)))
}

/// Log filter directive: `RUST_LOG` verbatim, then `LOG_LEVEL` as a level
/// name, then `info`.
///
/// `LOG_LEVEL` accepts the usual level names in any case, plus `WARNING`
/// and `CRITICAL`.
pub fn log_directive(env: EnvLookup) -> String {
    if let Some(directive) = env("RUST_LOG") {
        return directive;
    }
    match env("LOG_LEVEL").map(|l| l.trim().to_ascii_lowercase()).as_deref() {
        Some("warning") => "warn".to_string(),
        Some("critical") | Some("fatal") => "error".to_string(),
        Some(level @ ("trace" | "debug" | "info" | "warn" | "error" | "off")) => level.to_string(),
        _ => "info".to_string(),
    }
}

/// Relay settings as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct RelayOptions {
    pub bind: Option<String>,
    pub upstream: Option<String>,
    pub upstream_user: Option<String>,
    pub upstream_password: Option<String>,
    pub service_name: Option<String>,
    pub public_url: Option<String>,
    pub timeout_ms: u64,
    pub max_retries: usize,
    pub max_body_bytes: usize,
}

/// Resolves the relay's bind address and configuration.
///
/// # Errors
///
/// An invalid bind address or `PORT`, or an upstream / public URL without an
/// `http://` or `https://` prefix.
pub fn relay_settings(opts: RelayOptions, env: EnvLookup) -> Result<(SocketAddr, RelayConfig)> {
    let bind = resolve_bind(opts.bind.as_deref(), env, DEFAULT_RELAY_PORT)?;

    let upstream = opts
        .upstream
        .or_else(|| env("UPSTREAM_URL"))
        .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_string());
    validate_http_url(&upstream, "upstream URL")?;

    let service_name = opts
        .service_name
        .or_else(|| env("SERVICE_NAME"))
        .unwrap_or_else(|| DEFAULT_SERVICE_NAME.to_string());

    let public_url = opts
        .public_url
        .or_else(|| env("CTXSTACK_PUBLIC_URL"))
        .unwrap_or_else(|| format!("http://{}", bind));
    validate_http_url(&public_url, "public URL")?;

    let mut config = RelayConfig::new(upstream)
        .with_service_name(service_name)
        .with_public_url(public_url)
        .with_timeout(Duration::from_millis(opts.timeout_ms))
        .with_retry(RetryConfig {
            max_retries: opts.max_retries,
            ..RetryConfig::default()
        })
        .with_max_body_bytes(opts.max_body_bytes);

    if let Some(user) = opts.upstream_user.or_else(|| env("UPSTREAM_USER")) {
        let password = opts.upstream_password.or_else(|| env("UPSTREAM_PASSWORD"));
        config = config.with_credentials(user, password);
    }

    Ok((bind, config))
}
