//! Error types
//!
//! `ApiError` is what the sync entrypoints and the CLI return. Storage, transport and
//! per-node failures have their own types so the importer can record them without
//! aborting a batch.

use thiserror::Error;

/// Errors raised by a `NodeRepository`
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Database(#[from] sled::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("Write rejected for {external_id}: {reason}")]
    WriteRejected { external_id: String, reason: String },
}

impl From<bincode::Error> for StorageError {
    fn from(err: bincode::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Failures at the fetch boundary
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Remote returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    #[error("Network failure: {0}")]
    Network(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => TransportError::Status {
                status: status.as_u16(),
                url: err
                    .url()
                    .map(redacted_url)
                    .unwrap_or_else(|| "<unknown>".to_string()),
            },
            None => TransportError::Network(err.without_url().to_string()),
        }
    }
}

/// Strip the query string so API keys never reach logs or error messages.
pub(crate) fn redacted_url(url: &reqwest::Url) -> String {
    let mut url = url.clone();
    url.set_query(None);
    url.to_string()
}

/// A node in the raw document is missing a required field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed node {}: missing {field}", external_id.as_deref().unwrap_or("<no id>"))]
pub struct MalformedNodeError {
    pub external_id: Option<String>,
    pub field: &'static str,
}

/// Per-node failure recorded by the importer and the linker
#[derive(Debug, Error)]
pub enum NodeError {
    #[error(transparent)]
    Malformed(#[from] MalformedNodeError),

    #[error("Repository write failed: {0}")]
    Write(#[from] StorageError),
}

/// Crate-level error
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Storage error: {0}")]
    StorageError(#[from] StorageError),

    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Node not found: {0}")]
    NodeNotFound(String),

    #[error("A sync pass is already running for scope {0}")]
    SyncInProgress(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
