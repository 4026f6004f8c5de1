//! ctxstack Transport Layer
//!
//! HTTP helpers shared by the context server and the relay.
//!
//! # Components
//!
//! - **[`HttpTransport`]**: body parsing and response builders that always set
//!   an explicit `Content-Type`
//! - **[`cors_layer`]**: the CORS policy both services install (any origin,
//!   any method, any header, no credentials)

pub mod http;

pub use http::{cors_layer, HttpTransport, CONTENT_TYPE_HTML, CONTENT_TYPE_JSON, CONTENT_TYPE_TEXT};
