//! Configuration
//!
//! Layered with the `config` crate: built-in defaults, the global file, the
//! workspace file and `ORGTREE__*` environment variables, highest last.

mod facade;
pub mod merge;
pub mod paths;
pub mod sources;
pub mod workspace;

pub use facade::ConfigLoader;
pub use paths::xdg_root as xdg;
pub use workspace::storage_paths::StorageConfig;

use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

fn default_chart_path() -> String {
    "fi/ahjo-proxy/org-chart".to_string()
}

fn default_org_id() -> String {
    "00001".to_string()
}

fn default_fetch_depth() -> String {
    "9999".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

/// Remote org chart endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the API proxy; `https://` is assumed when no scheme is given
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Path segment before `/{org_id}/{max_depth}`
    #[serde(default = "default_chart_path")]
    pub chart_path: String,

    /// Start organization
    #[serde(default = "default_org_id")]
    pub org_id: String,

    /// Depth bound sent to the endpoint
    #[serde(default = "default_fetch_depth")]
    pub max_depth: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_key: None,
            chart_path: default_chart_path(),
            org_id: default_org_id(),
            max_depth: default_fetch_depth(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RemoteConfig {
    fn has_scheme(url: &str) -> bool {
        url.starts_with("http://") || url.starts_with("https://")
    }

    pub fn normalized_base_url(&self) -> Option<String> {
        self.base_url.as_deref().map(|url| {
            let url = url.trim().trim_end_matches('/');
            if Self::has_scheme(url) {
                url.to_string()
            } else {
                format!("https://{}", url)
            }
        })
    }

    /// Check the settings a fetch needs.
    pub fn validate(&self) -> Result<(), String> {
        match self.base_url.as_deref().map(str::trim) {
            None | Some("") => return Err("remote.base_url is required".to_string()),
            Some(url) if url.chars().any(char::is_whitespace) => {
                return Err(format!("Invalid base URL: {}", url));
            }
            Some(_) => {}
        }

        if self
            .api_key
            .as_deref()
            .map(|k| k.trim().is_empty())
            .unwrap_or(true)
        {
            return Err("remote.api_key is required".to_string());
        }

        if self.timeout_secs == 0 {
            return Err("remote.timeout_secs must be greater than 0".to_string());
        }

        Ok(())
    }
}

fn default_display_depth() -> usize {
    3
}

/// Read-side tree view defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Levels shown by `tree` when no depth is given (0 = unlimited)
    #[serde(default = "default_display_depth")]
    pub max_depth: usize,

    /// Type ids hidden from tree views
    #[serde(default)]
    pub excluded_type_ids: Vec<String>,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: default_display_depth(),
            excluded_type_ids: Vec::new(),
        }
    }
}

fn default_max_queue_size() -> usize {
    10_000
}

fn default_true() -> bool {
    true
}

fn default_idle_poll_ms() -> u64 {
    100
}

/// Deferred import queue settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeferredConfig {
    #[serde(default = "default_max_queue_size")]
    pub max_queue_size: usize,

    /// Run a relink pass whenever the queue drains
    #[serde(default = "default_true")]
    pub relink_on_idle: bool,

    #[serde(default = "default_idle_poll_ms")]
    pub idle_poll_ms: u64,
}

impl Default for DeferredConfig {
    fn default() -> Self {
        Self {
            max_queue_size: default_max_queue_size(),
            relink_on_idle: default_true(),
            idle_poll_ms: default_idle_poll_ms(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgTreeConfig {
    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub tree: TreeConfig,

    #[serde(default)]
    pub deferred: DeferredConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}
