//! Realtime store abstraction for bedboard.
//!
//! Defines the contract every store backend implements: whole-tree snapshots,
//! a push-based snapshot feed, and an optimistic read-compute-write
//! transaction driven by a caller-supplied pure decision function.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{ErrorCategory, StorageError};
pub use traits::{DecisionFn, RealtimeStore};
pub use types::{AbortReason, TransactionDecision, TransactionOutcome};
