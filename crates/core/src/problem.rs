//! User-facing problems.
//!
//! A `Problem` is an expected failure that an operator can act on: it has an
//! HTTP-style status, a human message and optional structured detail. Any
//! other error is treated as opaque.

use serde::{Deserialize, Serialize};

/// A classified, user-facing error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct Problem {
    /// HTTP-style status code
    pub status: u16,

    /// Human readable message
    pub message: String,

    /// Structured detail, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<serde_json::Value>,
}

impl Problem {
    /// Create a problem with no detail.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            detail: None,
        }
    }

    /// 400
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    /// 404
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    /// 409
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(409, message)
    }

    /// 500
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(500, message)
    }

    /// Attach structured detail.
    pub fn with_detail(mut self, detail: serde_json::Value) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Client-side problems are reported tersely.
    pub fn is_client_error(&self) -> bool {
        self.status < 500
    }
}
