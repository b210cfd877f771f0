//! Sync engine
//!
//! Write path from a fetched org chart to the node repository: batch import,
//! parent relinking, the deferred queue and the service tying them to the remote.

pub mod deferred;
pub mod importer;
pub mod linker;
pub mod service;

pub use deferred::{DeferredImportQueue, DeferredImportUnit, QueueStats};
pub use importer::{BatchImporter, ImportResult, ImportSession, NodeFailure};
pub use linker::{ParentLinker, RelinkResult};
pub use service::{SyncService, SyncSummary};
