//! Error types for the graph client.
//!
//! Every failure in this crate is recoverable: operations that fail leave the
//! graph in its previous state and report the error through the notification
//! channel. Nothing here is fatal.

use crate::models::NodeId;
use thiserror::Error;

/// Result type alias for graph client operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The request never completed (connection refused, timeout, broken body).
    #[error("request failed: {0}")]
    Transport(String),

    /// Non-2xx response without a usable error payload.
    #[error("server returned status {status}")]
    Status { status: u16 },

    /// Non-2xx response carrying `{ "error": "..." }`.
    #[error("{0}")]
    Server(String),

    /// 2xx response whose body did not match the expected shape.
    #[error("unexpected response body: {0}")]
    Decode(String),

    /// Create payload rejected before any request was sent.
    #[error("{0}")]
    Validation(String),

    /// Reference to a node id that is no longer in the store.
    #[error("node {0} not found")]
    NotFound(NodeId),
}

impl Error {
    /// Text shown to the user. Server and validation messages pass through
    /// verbatim; everything else collapses to `fallback`.
    pub fn user_message(&self, fallback: &str) -> String {
        match self {
            Error::Server(msg) | Error::Validation(msg) if !msg.trim().is_empty() => msg.clone(),
            _ => fallback.to_string(),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Error::Decode(e.to_string())
        } else {
            Error::Transport(e.to_string())
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Decode(e.to_string())
    }
}
