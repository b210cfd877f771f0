//! Orgtree: Organization Chart Sync
//!
//! Fetches a nested organization chart from a remote endpoint, flattens it in
//! pre-order and upserts every unit into a scoped node store, then reconciles
//! internal parent links. The stored tree can be read back as a nested view with
//! node types filtered out.

pub mod concurrency;
pub mod config;
pub mod error;
pub mod logging;
pub mod remote;
pub mod store;
pub mod sync;
pub mod tooling;
pub mod tree;
pub mod types;
