//! Remote org chart fetching
//!
//! The fetch boundary: a request names a start organization and a depth bound, both
//! zero-padded to the fixed widths the remote endpoint expects, and yields the raw
//! nested document.

pub mod http;

use crate::error::{ApiError, TransportError};
use async_trait::async_trait;
use std::fmt;

pub use http::HttpTreeFetcher;

const ORG_ID_WIDTH: usize = 5;
const MAX_DEPTH_WIDTH: usize = 4;

fn pad_digits(value: &str, width: usize, what: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::InvalidArgument(format!(
            "{} must be numeric, got '{}'",
            what, value
        )));
    }
    if value.len() > width {
        return Err(ApiError::InvalidArgument(format!(
            "{} must fit in {} digits, got '{}'",
            what, width, value
        )));
    }
    Ok(format!("{:0>width$}", value, width = width))
}

/// Org chart request with ids already padded for the endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    org_id: String,
    max_depth: String,
}

impl FetchRequest {
    /// Build a request, padding `org_id` to 5 and `max_depth` to 4 digits.
    pub fn new(org_id: &str, max_depth: &str) -> Result<Self, ApiError> {
        Ok(Self {
            org_id: pad_digits(org_id, ORG_ID_WIDTH, "Organization id")?,
            max_depth: pad_digits(max_depth, MAX_DEPTH_WIDTH, "Max depth")?,
        })
    }

    pub fn org_id(&self) -> &str {
        &self.org_id
    }

    pub fn max_depth(&self) -> &str {
        &self.max_depth
    }
}

impl fmt::Display for FetchRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.org_id, self.max_depth)
    }
}

/// Source of raw org chart documents
#[async_trait]
pub trait RemoteTreeFetcher: Send + Sync {
    async fn fetch(&self, request: &FetchRequest) -> Result<String, TransportError>;
}
