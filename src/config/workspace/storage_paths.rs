//! StorageConfig and store path resolution for a workspace.

use crate::config::xdg;
use crate::error::ApiError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_STORE_PATH: &str = ".orgtree/store";

fn default_store_path() -> PathBuf {
    PathBuf::from(DEFAULT_STORE_PATH)
}

fn default_scope() -> String {
    "org_section".to_string()
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path to the node database (relative to workspace root)
    #[serde(default = "default_store_path")]
    pub store_path: PathBuf,

    /// Collection the synced nodes live in
    #[serde(default = "default_scope")]
    pub scope: String,
}

impl StorageConfig {
    /// Resolve the store path to an actual filesystem location.
    ///
    /// The default path lives under the XDG data directory for the workspace; any
    /// other path is taken relative to the workspace root.
    pub fn resolve_store_path(&self, workspace_root: &Path) -> Result<PathBuf, ApiError> {
        if self.store_path == Path::new(DEFAULT_STORE_PATH) {
            let data_dir = xdg::workspace_data_dir(workspace_root)?;
            Ok(data_dir.join("store"))
        } else {
            Ok(workspace_root.join(&self.store_path))
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            scope: default_scope(),
        }
    }
}
