//! ctxstack Common Types and Transport
//!
//! This crate provides the pieces shared by the context server, the relay and
//! the client:
//!
//! - **Protocol Layer**: the [`CtxError`] taxonomy, the static catalog of
//!   context functions and the OpenAPI document generated from it
//! - **Transport Layer**: HTTP response builders that always set an explicit
//!   content type and the permissive CORS headers
//!
//! # Context functions
//!
//! Both services expose the same five operations over a per-key LIFO stack:
//! `push_context`, `pop_context`, `list_contexts`, `get_context` and
//! `clear_contexts`. Their descriptions live in [`protocol::catalog`] so that
//! the server's `/openapi.json`, the relay's `/openapi.json` and the relay's
//! HTML landing page never drift apart.
//!
//! # Example
//!
//! ```
//! use ctxstack_common::protocol::openapi::OpenApiDocument;
//!
//! let doc = OpenApiDocument::build("/mcp/");
//! assert!(doc.as_value()["paths"]["/mcp/push_context"].is_object());
//! ```

pub mod protocol;
pub mod transport;

pub use protocol::*;
