pub mod catalog;
pub mod error;
pub mod openapi;


pub use catalog::{ContextFunction, FunctionParam, CONTEXT_FUNCTIONS};
pub use error::{CtxError, Result};
pub use openapi::OpenApiDocument;
