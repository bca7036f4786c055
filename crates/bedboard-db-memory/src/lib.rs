//! In-memory realtime store backend.
//!
//! Backs the `hospitals/` tree with a lock-free `papaya::HashMap`, serving
//! whole-tree snapshots and optimistic per-key transactions, and pushing a
//! snapshot to all watchers after every committed mutation.

pub mod store;

pub use store::InMemoryStore;
