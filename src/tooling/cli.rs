//! CLI Tooling
//!
//! Command-line interface for org tree operations. Every command works against the
//! node store of one workspace and one scope.

use crate::concurrency::SyncLockManager;
use crate::config::{ConfigLoader, OrgTreeConfig};
use crate::error::{ApiError, StorageError};
use crate::remote::{FetchRequest, HttpTreeFetcher};
use crate::store::{NodeRepository, SledNodeRepository};
use crate::sync::{DeferredImportQueue, SyncService, SyncSummary};
use crate::tooling::format::{
    format_relink_text, format_status_text, format_sync_summary_text, format_tree_text,
    relink_json, sync_summary_json, ScopeStatus,
};
use crate::tree::TreeBuilder;
use clap::{Parser, Subcommand};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Orgtree CLI - Org chart sync into a local node store
#[derive(Parser)]
#[command(name = "orgtree")]
#[command(about = "Sync a remote organization chart into a local node store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (debug level)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file, file+stderr, both)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output includes "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Fetch the org chart and import it
    Sync {
        /// Start organization (defaults to remote.org_id)
        #[arg(long)]
        org_id: Option<String>,
        /// Depth bound sent to the remote (defaults to remote.max_depth)
        #[arg(long)]
        max_depth: Option<String>,
        /// Import node by node through the deferred queue
        #[arg(long)]
        deferred: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Import a saved org chart document
    Import {
        /// JSON document as returned by the remote
        #[arg(long)]
        file: PathBuf,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Repair internal parent links
    Relink {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show the stored tree
    Tree {
        /// External id of the root (defaults to every top-level node)
        #[arg(long)]
        root: Option<String>,
        /// Type ids to hide, in addition to tree.excluded_type_ids
        #[arg(long)]
        exclude: Vec<String>,
        /// Levels to show including the root, 0 for all (defaults to tree.max_depth)
        #[arg(long)]
        max_depth: Option<usize>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Show node counts for the scope
    Status {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Delete every imported node of the scope
    Purge {
        /// Confirm the deletion
        #[arg(long)]
        yes: bool,
    },
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Sync { .. } => "sync",
        Commands::Import { .. } => "import",
        Commands::Relink { .. } => "relink",
        Commands::Tree { .. } => "tree",
        Commands::Status { .. } => "status",
        Commands::Purge { .. } => "purge",
    }
}

fn check_format(format: &str) -> Result<bool, ApiError> {
    match format {
        "text" => Ok(false),
        "json" => Ok(true),
        other => Err(ApiError::InvalidArgument(format!(
            "Invalid format: {} (must be 'text' or 'json')",
            other
        ))),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, ApiError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| ApiError::ConfigError(format!("Failed to serialize output: {}", e)))
}

/// CLI context for executing commands
pub struct CliContext {
    workspace_root: PathBuf,
    config: OrgTreeConfig,
    store_path: PathBuf,
    repository: Arc<SledNodeRepository>,
    locks: Arc<SyncLockManager>,
}

impl CliContext {
    /// Create a new CLI context
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(cfg_path) = &config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };

        let store_path = config.storage.resolve_store_path(&workspace_root)?;
        let repository = Arc::new(SledNodeRepository::open(&store_path, &config.storage.scope)?);

        Ok(Self {
            workspace_root,
            config,
            store_path,
            repository,
            locks: Arc::new(SyncLockManager::new()),
        })
    }

    pub fn config(&self) -> &OrgTreeConfig {
        &self.config
    }

    pub fn workspace_root(&self) -> &PathBuf {
        &self.workspace_root
    }

    pub fn repository(&self) -> Arc<SledNodeRepository> {
        Arc::clone(&self.repository)
    }

    fn offline_service(&self) -> SyncService {
        SyncService::offline(self.repository.clone()).with_locks(Arc::clone(&self.locks))
    }

    fn remote_service(&self) -> Result<SyncService, ApiError> {
        let fetcher = HttpTreeFetcher::from_config(&self.config.remote)?;
        Ok(SyncService::new(Arc::new(fetcher), self.repository.clone())
            .with_locks(Arc::clone(&self.locks)))
    }

    fn runtime() -> Result<tokio::runtime::Runtime, ApiError> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(ApiError::InvalidArgument(
                "Cannot run a blocking sync from within an async runtime".to_string(),
            ));
        }
        tokio::runtime::Runtime::new()
            .map_err(|e| ApiError::ConfigError(format!("Failed to create runtime: {}", e)))
    }

    /// Execute a command, returning its rendered output
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        let result = self.execute_inner(command);
        info!(
            command = command_name(command),
            ok = result.is_ok(),
            duration_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Sync {
                org_id,
                max_depth,
                deferred,
                format,
            } => {
                let json = check_format(format)?;
                let request = FetchRequest::new(
                    org_id.as_deref().unwrap_or(&self.config.remote.org_id),
                    max_depth.as_deref().unwrap_or(&self.config.remote.max_depth),
                )?;
                let service = self.remote_service()?;
                let rt = Self::runtime()?;
                let summary = if *deferred {
                    let queue = DeferredImportQueue::new(
                        service.importer(),
                        service.linker(),
                        self.config.deferred.clone(),
                    );
                    rt.block_on(service.sync_deferred(&request, &queue))?
                } else {
                    rt.block_on(service.sync(&request))?
                };
                self.render_summary(&summary, json)
            }
            Commands::Import { file, format } => {
                let json = check_format(format)?;
                let raw = std::fs::read_to_string(file).map_err(|e| {
                    ApiError::InvalidArgument(format!("Cannot read {}: {}", file.display(), e))
                })?;
                let summary = self.offline_service().import_raw(&raw)?;
                self.render_summary(&summary, json)
            }
            Commands::Relink { format } => {
                let json = check_format(format)?;
                let result = self.offline_service().relink()?;
                if json {
                    to_json(&relink_json(&result))
                } else {
                    Ok(format_relink_text(&result))
                }
            }
            Commands::Tree {
                root,
                exclude,
                max_depth,
                format,
            } => {
                let json = check_format(format)?;
                let excluded: HashSet<String> = self
                    .config
                    .tree
                    .excluded_type_ids
                    .iter()
                    .chain(exclude.iter())
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .collect();
                let depth = max_depth.unwrap_or(self.config.tree.max_depth);
                let tree = TreeBuilder::new(self.repository.clone())
                    .build_tree(root.as_deref(), &excluded, depth)
                    .map_err(|e| match e {
                        StorageError::NodeNotFound(id) => ApiError::NodeNotFound(id),
                        other => ApiError::StorageError(other),
                    })?;
                if json {
                    to_json(&tree)
                } else {
                    Ok(format_tree_text(&tree))
                }
            }
            Commands::Status { format } => {
                let json = check_format(format)?;
                let status = self.scope_status()?;
                if json {
                    to_json(&status)
                } else {
                    Ok(format_status_text(&status))
                }
            }
            Commands::Purge { yes } => {
                if !yes {
                    return Err(ApiError::InvalidArgument(
                        "Purge deletes every imported node; pass --yes to confirm".to_string(),
                    ));
                }
                let removed = self.offline_service().purge()?;
                Ok(format!(
                    "Purged {} nodes from scope {}",
                    removed,
                    self.repository.scope()
                ))
            }
        }
    }

    fn render_summary(&self, summary: &SyncSummary, json: bool) -> Result<String, ApiError> {
        if json {
            to_json(&sync_summary_json(summary))
        } else {
            Ok(format_sync_summary_text(summary))
        }
    }

    fn scope_status(&self) -> Result<ScopeStatus, ApiError> {
        let nodes = self.repository.list_all()?;
        let known: HashSet<&str> = nodes.iter().map(|n| n.external_id.as_str()).collect();
        let top_level = nodes.iter().filter(|n| n.is_top_level()).count();
        let linked = nodes
            .iter()
            .filter(|n| n.parent_internal_id.is_some())
            .count();
        let orphaned = nodes
            .iter()
            .filter(|n| !n.is_top_level() && !known.contains(n.parent_external_id.trim()))
            .count();

        Ok(ScopeStatus {
            scope: self.repository.scope().to_string(),
            store_path: self.store_path.display().to_string(),
            total_nodes: nodes.len(),
            top_level,
            linked,
            orphaned,
            remote_configured: self.config.remote.validate().is_ok(),
        })
    }
}
