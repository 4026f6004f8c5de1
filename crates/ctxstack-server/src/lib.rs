//! ctxstack Server
//!
//! This crate provides the context store and the HTTP server that exposes it.
//!
//! # Components
//!
//! - **[`ContextStore`]**: per-key LIFO stacks of opaque JSON entries
//! - **[`ContextRouter`]**: maps a function name and JSON parameters to a
//!   store operation
//! - **[`HttpServer`]**: the axum application around the router
//! - **[`ResourceLimits`]**: key, entry and body size caps

pub mod http_router;
pub mod http_server;
pub mod resource_limits;
pub mod store;

pub use http_router::ContextRouter;
pub use http_server::HttpServer;
pub use resource_limits::ResourceLimits;
pub use store::{ContextEntry, ContextStore, PushOutcome, StoreStats};
