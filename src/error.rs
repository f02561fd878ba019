//! Error types for the cache adapter
//!
//! Provides unified error handling using thiserror. A cache miss is never an
//! error: absent, expired and malformed records all surface as `Ok(None)`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Store Error Enum ==
/// Failure reported by a backing-store collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Network, timeout, auth or service-side failure
    #[error("{operation} failed: {message}")]
    Backend {
        operation: &'static str,
        message: String,
    },

    /// The collaborator does not implement an optional operation
    #[error("{0} is not supported by this store")]
    Unsupported(&'static str),
}

impl StoreError {
    /// Shorthand for a backend failure of the named operation.
    pub fn backend(operation: &'static str, message: impl Into<String>) -> Self {
        StoreError::Backend {
            operation,
            message: message.into(),
        }
    }
}

// == Cache Error Enum ==
/// Unified error type for the cache adapter and its HTTP facade.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The backing store could not be reached or rejected the call
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Key has no live value (HTTP facade only; the adapter reports misses as `None`)
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

// == IntoResponse Implementation ==
impl IntoResponse for CacheError {
    fn into_response(self) -> Response {
        let status = match &self {
            CacheError::Store(_) => StatusCode::BAD_GATEWAY,
            CacheError::NotFound(_) => StatusCode::NOT_FOUND,
            CacheError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache adapter.
pub type Result<T> = std::result::Result<T, CacheError>;
