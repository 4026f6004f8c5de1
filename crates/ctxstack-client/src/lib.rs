//! ctxstack Client
//!
//! Typed async access to a context server, directly or through a relay.
//!
//! ```no_run
//! use ctxstack_client::ContextClient;
//! use serde_json::json;
//!
//! # async fn demo() -> ctxstack_common::protocol::Result<()> {
//! let client = ContextClient::new("http://127.0.0.1:8000")?;
//! client.push("session-1", json!({"query": "auth"})).await?;
//! let top = client.pop("session-1").await?;
//! assert_eq!(top.context["query"], "auth");
//! # Ok(())
//! # }
//! ```

pub mod client;

pub use client::{ContextClient, Pushed, StoredContext, DEFAULT_TIMEOUT_MS};
