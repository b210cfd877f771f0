//! Deferred import queue
//!
//! The queued delivery mode: a document is split into single-node units that are
//! imported one at a time by a background worker, with the same importer logic as the
//! batch path. A failing unit is recorded and the worker moves on. When the queue
//! drains, a relink pass repairs any parent the units could not resolve in order.

use crate::config::DeferredConfig;
use crate::error::ApiError;
use crate::sync::importer::{BatchImporter, ImportResult, ImportSession};
use crate::sync::linker::{ParentLinker, RelinkResult};
use crate::tree::flatten::Flatten;
use crate::tree::node::{FlatNode, OrgNode};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, Notify};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// One queued node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredImportUnit {
    pub node: FlatNode,
    /// Authoritative parent external id for this unit
    pub parent_external_id: String,
}

impl DeferredImportUnit {
    pub fn new(node: FlatNode) -> Self {
        let parent_external_id = node.parent_external_id.clone();
        Self {
            node,
            parent_external_id,
        }
    }

    fn into_flat(self) -> FlatNode {
        FlatNode {
            parent_external_id: self.parent_external_id,
            ..self.node
        }
    }
}

/// Queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
    pub relink_passes: usize,
}

struct Shared {
    queue: Mutex<VecDeque<DeferredImportUnit>>,
    notify: Notify,
    importer: BatchImporter,
    linker: ParentLinker,
    config: DeferredConfig,
    running: RwLock<bool>,
    stats: RwLock<QueueStats>,
    results: parking_lot::Mutex<ImportResult>,
    last_relink: parking_lot::Mutex<Option<RelinkResult>>,
}

pub struct DeferredImportQueue {
    shared: Arc<Shared>,
    worker: parking_lot::Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl DeferredImportQueue {
    pub fn new(importer: BatchImporter, linker: ParentLinker, config: DeferredConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(VecDeque::new()),
                notify: Notify::new(),
                importer,
                linker,
                config,
                running: RwLock::new(false),
                stats: RwLock::new(QueueStats::default()),
                results: parking_lot::Mutex::new(ImportResult::default()),
                last_relink: parking_lot::Mutex::new(None),
            }),
            worker: parking_lot::Mutex::new(None),
        }
    }

    /// Enqueue a single unit
    pub async fn enqueue(&self, unit: DeferredImportUnit) -> Result<(), ApiError> {
        self.enqueue_all(vec![unit]).await.map(|_| ())
    }

    /// Split a document into units and enqueue them in pre-order
    pub async fn enqueue_document(&self, roots: &[OrgNode]) -> Result<usize, ApiError> {
        let units: Vec<DeferredImportUnit> =
            Flatten::new(roots).map(DeferredImportUnit::new).collect();
        self.enqueue_all(units).await
    }

    async fn enqueue_all(&self, units: Vec<DeferredImportUnit>) -> Result<usize, ApiError> {
        let count = units.len();
        let mut queue = self.shared.queue.lock().await;
        if queue.len() + count > self.shared.config.max_queue_size {
            warn!(
                queue_size = queue.len(),
                batch_size = count,
                max_size = self.shared.config.max_queue_size,
                "Deferred import queue is full"
            );
            return Err(ApiError::InvalidArgument(format!(
                "Deferred import queue is full ({} pending, limit {})",
                queue.len(),
                self.shared.config.max_queue_size
            )));
        }
        queue.extend(units);
        self.shared.stats.write().pending += count;
        drop(queue);

        self.shared.notify.notify_one();
        debug!(batch_size = count, "Enqueued deferred import units");
        Ok(count)
    }

    /// Start the background worker
    pub fn start(&self) {
        {
            let mut running = self.shared.running.write();
            if *running {
                return;
            }
            *running = true;
        }

        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(async move { worker_loop(shared).await });
        *self.worker.lock() = Some(handle);
        info!("Started deferred import worker");
    }

    /// Stop the worker after its current unit
    pub async fn stop(&self) {
        *self.shared.running.write() = false;
        self.shared.notify.notify_one();
        let handle = self.worker.lock().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                error!(error = %e, "Deferred import worker panicked");
            }
        }
        info!("Stopped deferred import worker");
    }

    /// Process every pending unit on the caller's task, then relink if configured.
    ///
    /// Returns the import outcome of the units processed by this call.
    pub async fn drain(&self) -> ImportResult {
        let drained = self.drain_units().await;
        if self.shared.config.relink_on_idle && drained.processed() > 0 {
            run_relink(&self.shared);
        }
        drained
    }

    /// Process every pending unit on the caller's task, leaving relink to the caller.
    pub async fn drain_units(&self) -> ImportResult {
        let mut drained = ImportResult::default();
        while let Some(unit) = next_unit(&self.shared).await {
            drained.merge(process_unit(&self.shared, unit));
        }
        drained
    }

    /// Wait until the queue is empty and nothing is in flight
    pub async fn wait_idle(&self) {
        loop {
            let idle = {
                let stats = self.shared.stats.read();
                stats.pending == 0 && stats.processing == 0
            };
            if idle {
                return;
            }
            sleep(Duration::from_millis(self.shared.config.idle_poll_ms.max(1))).await;
        }
    }

    pub fn stats(&self) -> QueueStats {
        self.shared.stats.read().clone()
    }

    /// Take the accumulated outcome of units processed by the worker
    pub fn take_results(&self) -> ImportResult {
        std::mem::take(&mut *self.shared.results.lock())
    }

    /// Outcome of the most recent relink pass, if any
    pub fn take_last_relink(&self) -> Option<RelinkResult> {
        self.shared.last_relink.lock().take()
    }
}

async fn next_unit(shared: &Shared) -> Option<DeferredImportUnit> {
    let unit = shared.queue.lock().await.pop_front()?;
    let mut stats = shared.stats.write();
    stats.pending = stats.pending.saturating_sub(1);
    stats.processing += 1;
    Some(unit)
}

fn process_unit(shared: &Shared, unit: DeferredImportUnit) -> ImportResult {
    // Units are independent: parents resolve through the repository, not a shared map.
    let mut session = ImportSession::new();
    shared.importer.import_node(&mut session, &unit.into_flat());
    let result = session.finish();

    let mut stats = shared.stats.write();
    stats.processing = stats.processing.saturating_sub(1);
    if result.failures.is_empty() {
        stats.completed += 1;
    } else {
        stats.failed += 1;
    }
    result
}

fn run_relink(shared: &Shared) {
    match shared.linker.relink() {
        Ok(result) => {
            shared.stats.write().relink_passes += 1;
            *shared.last_relink.lock() = Some(result);
        }
        Err(e) => error!(error = %e, "Relink after deferred import failed"),
    }
}

async fn worker_loop(shared: Arc<Shared>) {
    let idle_poll = Duration::from_millis(shared.config.idle_poll_ms.max(1));
    let mut since_relink = 0usize;

    loop {
        if !*shared.running.read() {
            break;
        }

        match next_unit(&shared).await {
            Some(unit) => {
                let result = process_unit(&shared, unit);
                since_relink += 1;
                shared.results.lock().merge(result);
            }
            None => {
                if since_relink > 0 && shared.config.relink_on_idle {
                    run_relink(&shared);
                    since_relink = 0;
                }
                tokio::select! {
                    _ = shared.notify.notified() => {}
                    _ = sleep(idle_poll) => {}
                }
            }
        }
    }

    debug!("Deferred import worker exiting");
}
