//! Sync entrypoint
//!
//! Fetch, flatten, import and relink as one pass per repository scope. A transport
//! or document error aborts the pass before anything is written; per-node problems
//! are counted in the summary instead.

use crate::concurrency::{SyncGuard, SyncLockManager};
use crate::error::ApiError;
use crate::remote::{FetchRequest, RemoteTreeFetcher};
use crate::store::NodeRepository;
use crate::sync::deferred::DeferredImportQueue;
use crate::sync::importer::{BatchImporter, ImportResult, NodeFailure};
use crate::sync::linker::{ParentLinker, RelinkResult};
use crate::tree::flatten::Flatten;
use crate::tree::node::{parse_document, OrgNode};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Aggregate outcome of a sync pass
#[derive(Debug)]
pub struct SyncSummary {
    pub scope: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Delivered nodes that could not be imported
    pub failed: usize,
    pub linked: usize,
    pub orphaned: Vec<String>,
    /// Import failures followed by relink write failures
    pub failures: Vec<NodeFailure>,
}

impl SyncSummary {
    fn assemble(
        scope: &str,
        started_at: DateTime<Utc>,
        started: Instant,
        import: ImportResult,
        relink: RelinkResult,
    ) -> Self {
        let failed = import.failures.len();
        let mut failures = import.failures;
        failures.extend(relink.failures);
        Self {
            scope: scope.to_string(),
            started_at,
            duration_ms: started.elapsed().as_millis() as u64,
            created: import.created,
            updated: import.updated,
            unchanged: import.unchanged,
            failed,
            linked: relink.linked,
            orphaned: relink.orphaned,
            failures,
        }
    }
}

pub struct SyncService {
    fetcher: Option<Arc<dyn RemoteTreeFetcher>>,
    repository: Arc<dyn NodeRepository>,
    locks: Arc<SyncLockManager>,
}

impl SyncService {
    pub fn new(fetcher: Arc<dyn RemoteTreeFetcher>, repository: Arc<dyn NodeRepository>) -> Self {
        Self {
            fetcher: Some(fetcher),
            repository,
            locks: Arc::new(SyncLockManager::new()),
        }
    }

    /// A service without a remote; only local imports, relink and purge work.
    pub fn offline(repository: Arc<dyn NodeRepository>) -> Self {
        Self {
            fetcher: None,
            repository,
            locks: Arc::new(SyncLockManager::new()),
        }
    }

    /// Share a lock manager between services writing the same scopes
    pub fn with_locks(mut self, locks: Arc<SyncLockManager>) -> Self {
        self.locks = locks;
        self
    }

    pub fn repository(&self) -> &Arc<dyn NodeRepository> {
        &self.repository
    }

    pub fn importer(&self) -> BatchImporter {
        BatchImporter::new(Arc::clone(&self.repository))
    }

    pub fn linker(&self) -> ParentLinker {
        ParentLinker::new(Arc::clone(&self.repository))
    }

    fn acquire(&self) -> Result<SyncGuard, ApiError> {
        let scope = self.repository.scope();
        self.locks
            .try_acquire(scope)
            .ok_or_else(|| ApiError::SyncInProgress(scope.to_string()))
    }

    /// Fetch and parse the remote document
    pub async fn fetch_document(&self, request: &FetchRequest) -> Result<Vec<OrgNode>, ApiError> {
        let fetcher = self.fetcher.as_ref().ok_or_else(|| {
            ApiError::ConfigError("No remote configured for this sync service".to_string())
        })?;
        let raw = fetcher.fetch(request).await?;
        parse_document(&raw)
    }

    /// Fetch the org chart and import it synchronously.
    pub async fn sync(&self, request: &FetchRequest) -> Result<SyncSummary, ApiError> {
        let _guard = self.acquire()?;
        info!(scope = %self.repository.scope(), request = %request, "Starting sync");
        let roots = self.fetch_document(request).await?;
        Ok(self.run_import(&roots))
    }

    /// Import an already fetched document.
    pub fn import_document(&self, roots: &[OrgNode]) -> Result<SyncSummary, ApiError> {
        let _guard = self.acquire()?;
        Ok(self.run_import(roots))
    }

    /// Import a raw JSON document (saved API response).
    pub fn import_raw(&self, raw: &str) -> Result<SyncSummary, ApiError> {
        let roots = parse_document(raw)?;
        self.import_document(&roots)
    }

    fn run_import(&self, roots: &[OrgNode]) -> SyncSummary {
        let started_at = Utc::now();
        let started = Instant::now();

        let import = self.importer().import_batch(Flatten::new(roots));
        let relink = self.relink_after_import();

        let summary = SyncSummary::assemble(
            self.repository.scope(),
            started_at,
            started,
            import,
            relink,
        );
        info!(
            scope = %summary.scope,
            created = summary.created,
            updated = summary.updated,
            unchanged = summary.unchanged,
            failed = summary.failed,
            linked = summary.linked,
            orphaned = summary.orphaned.len(),
            duration_ms = summary.duration_ms,
            "Sync finished"
        );
        summary
    }

    fn relink_after_import(&self) -> RelinkResult {
        match self.linker().relink() {
            Ok(relink) => relink,
            Err(e) => {
                // Imported nodes stay; a later relink repairs them.
                warn!(error = %e, "Relink after import failed");
                RelinkResult::default()
            }
        }
    }

    /// Fetch the org chart and hand it to the deferred queue, returning the unit count.
    ///
    /// The queue's worker (or a later `drain`) does the import. The scope guard only
    /// covers the fetch and the enqueue: units imported later by the worker are not
    /// serialized against other passes on the same scope.
    pub async fn enqueue_sync(
        &self,
        request: &FetchRequest,
        queue: &DeferredImportQueue,
    ) -> Result<usize, ApiError> {
        let _guard = self.acquire()?;
        let roots = self.fetch_document(request).await?;
        queue.enqueue_document(&roots).await
    }

    /// Fetch, queue every node as its own unit, drain the queue on this task and relink.
    pub async fn sync_deferred(
        &self,
        request: &FetchRequest,
        queue: &DeferredImportQueue,
    ) -> Result<SyncSummary, ApiError> {
        let _guard = self.acquire()?;
        let started_at = Utc::now();
        let started = Instant::now();

        let roots = self.fetch_document(request).await?;
        let queued = queue.enqueue_document(&roots).await?;
        debug!(queued, "Draining deferred import queue");
        let mut import = queue.drain_units().await;
        // Units a running worker picked up count toward this pass too.
        queue.wait_idle().await;
        import.merge(queue.take_results());
        let relink = self.relink_after_import();

        Ok(SyncSummary::assemble(
            self.repository.scope(),
            started_at,
            started,
            import,
            relink,
        ))
    }

    /// Standalone relink pass
    pub fn relink(&self) -> Result<RelinkResult, ApiError> {
        let _guard = self.acquire()?;
        Ok(self.linker().relink()?)
    }

    /// Delete every node of the scope
    pub fn purge(&self) -> Result<usize, ApiError> {
        let _guard = self.acquire()?;
        let removed = self.repository.delete_all()?;
        warn!(scope = %self.repository.scope(), removed, "Purged all imported nodes");
        Ok(removed)
    }
}
