//! ctxstack Relay
//!
//! A thin forwarder in front of a context server. Callers post to
//! `/proxy/{function}`; the relay drops their `Authorization` header, attaches
//! its own upstream credentials and posts the body to
//! `{upstream}/mcp/{function}`. It also serves the API documentation.
//!
//! # Example
//!
//! ```no_run
//! use ctxstack_relay::{HttpServer, RelayConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = RelayConfig::new("https://ctx.example.com")
//!         .with_credentials("relay", Some("secret".to_string()));
//!     let server = HttpServer::new(config).unwrap();
//!     server.run("0.0.0.0:8080".parse().unwrap()).await.unwrap();
//! }
//! ```

pub mod docs;
pub mod http_server;
pub mod relay;

pub use docs::RelayDocs;
pub use http_server::HttpServer;
pub use relay::{Relay, RelayConfig, RetryConfig, UpstreamCredentials, UpstreamResponse};
