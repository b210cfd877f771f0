//! Sync pass exclusion
//!
//! At most one sync pass may write to a repository scope at a time. The lock manager
//! hands out a guard per scope; a second pass on the same scope fails fast instead of
//! racing the first one on the same external ids. Different scopes never block each
//! other.

use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

/// Per-scope lock manager for sync passes
pub struct SyncLockManager {
    /// Scopes with an active pass
    active: Mutex<HashSet<String>>,
}

impl SyncLockManager {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(HashSet::new()),
        }
    }

    /// Try to start a pass on `scope`
    ///
    /// Returns `None` while another guard for the same scope is alive.
    pub fn try_acquire(self: &Arc<Self>, scope: &str) -> Option<SyncGuard> {
        let mut active = self.active.lock();
        if !active.insert(scope.to_string()) {
            return None;
        }
        Some(SyncGuard {
            manager: Arc::clone(self),
            scope: scope.to_string(),
        })
    }

    pub fn is_active(&self, scope: &str) -> bool {
        self.active.lock().contains(scope)
    }
}

impl Default for SyncLockManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Held for the duration of a sync pass; releases the scope on drop
pub struct SyncGuard {
    manager: Arc<SyncLockManager>,
    scope: String,
}

impl Drop for SyncGuard {
    fn drop(&mut self) {
        self.manager.active.lock().remove(&self.scope);
    }
}
