//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::OrgTreeConfig;
use config::ConfigError;
use std::path::Path;
#[cfg(test)]
use std::path::PathBuf;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Get the XDG config file path (~/.config/orgtree/config.toml)
    #[cfg(test)]
    pub(crate) fn xdg_config_path() -> Option<PathBuf> {
        super::xdg::config_home()
            .ok()
            .map(|home| home.join("orgtree").join("config.toml"))
    }

    /// Load configuration from files and environment.
    pub fn load(workspace_root: &Path) -> Result<OrgTreeConfig, ConfigError> {
        MergeService::load(workspace_root)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> Result<OrgTreeConfig, ConfigError> {
        MergeService::load_from_file(path)
    }

    /// Create default configuration.
    pub fn default() -> OrgTreeConfig {
        OrgTreeConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xdg_config_path_ends_with_config_toml() {
        if let Some(path) = ConfigLoader::xdg_config_path() {
            assert!(path.ends_with("orgtree/config.toml"));
        }
    }

    #[test]
    fn load_from_file_reads_sections() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("custom.toml");
        std::fs::write(
            &path,
            "[remote]\nbase_url = \"demo.example.org\"\nmax_depth = \"0003\"\n\n[storage]\nscope = \"units\"\n",
        )
        .unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.remote.base_url.as_deref(), Some("demo.example.org"));
        assert_eq!(config.remote.max_depth, "0003");
        assert_eq!(config.remote.org_id, "00001");
        assert_eq!(config.storage.scope, "units");
    }
}
