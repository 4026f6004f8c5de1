use axum::http::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CtxError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error("{0}")]
    NotFound(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timeout after {0}ms")]
    Timeout(u64),

    #[error("Invalid upstream response: {0}")]
    Upstream(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CtxError {
    /// HTTP status the server layer answers with for this error.
    ///
    /// Only lookup misses and caller mistakes map to 4xx; everything that
    /// went wrong on our side of the wire is a 500.
    pub fn status_code(&self) -> StatusCode {
        match self {
            CtxError::InvalidArgument(_) | CtxError::JsonSerialization(_) => {
                StatusCode::BAD_REQUEST
            }
            CtxError::NotFound(_) => StatusCode::NOT_FOUND,
            CtxError::Transport(_)
            | CtxError::Timeout(_)
            | CtxError::Upstream(_)
            | CtxError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type Result<T> = std::result::Result<T, CtxError>;
