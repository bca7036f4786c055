//! The realtime store trait every backend implements.

use async_trait::async_trait;
use tokio::sync::broadcast;

use bedboard_core::{HospitalCollection, HospitalId, HospitalRecord, StoreEvent};

use crate::error::StorageError;
use crate::types::{TransactionDecision, TransactionOutcome};

/// A pure decision function for optimistic transactions.
///
/// Given the value supplied by the store at this retry (never a previously
/// cached one), produce a full replacement record or an abort. The store may
/// invoke it any number of times per logical call, so it must have no
/// observable side effects besides its return value.
pub type DecisionFn<'a> = &'a (dyn Fn(Option<&HospitalRecord>) -> TransactionDecision + Send + Sync);

/// The realtime hospital store.
///
/// Backends hold the `hospitals/<id>` tree, push whole-tree snapshots to all
/// watchers on every committed mutation, and serialize transactions per key.
///
/// # Example
///
/// ```ignore
/// use bedboard_storage::{RealtimeStore, TransactionDecision, AbortReason};
///
/// async fn admit(store: &dyn RealtimeStore, id: &str) -> anyhow::Result<()> {
///     let outcome = store
///         .run_transaction(id, &|current| match current {
///             None => TransactionDecision::Abort(AbortReason::NotFound),
///             Some(record) => match record.apply_delta(bedboard_core::BedDelta::Admit) {
///                 Ok(next) => TransactionDecision::Commit(next),
///                 Err(range) => TransactionDecision::Abort(AbortReason::BoundsViolation {
///                     hospital: range.hospital,
///                     attempted_available: range.attempted_available,
///                     total: range.total,
///                 }),
///             },
///         })
///         .await?;
///     println!("{outcome:?}");
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait RealtimeStore: Send + Sync {
    // ==================== Reads ====================

    /// Reads a full snapshot of the hospital tree.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues.
    async fn snapshot(&self) -> Result<HospitalCollection, StorageError>;

    /// Reads one hospital record.
    ///
    /// Returns `None` if the key is absent.
    async fn read(&self, id: &str) -> Result<Option<HospitalRecord>, StorageError>;

    // ==================== Writes ====================

    /// Writes a record unconditionally and pushes a fresh snapshot.
    ///
    /// Used for seeding and out-of-band corrections; operator bed updates go
    /// through [`RealtimeStore::run_transaction`] instead.
    async fn put(&self, id: HospitalId, record: HospitalRecord) -> Result<(), StorageError>;

    /// Removes a record and pushes a fresh snapshot.
    ///
    /// Removing an absent key is a no-op and pushes nothing.
    async fn remove(&self, id: &str) -> Result<(), StorageError>;

    /// Runs an optimistic read-compute-write transaction on one key.
    ///
    /// The store reads the current value, invokes `decide`, and attempts to
    /// commit the proposed record. If a conflicting writer committed in
    /// between (detected by version comparison at commit time), the store
    /// re-reads and re-invokes `decide` until the attempt commits or `decide`
    /// aborts it. An abort leaves the store untouched.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` only for store-level failures (connection,
    /// internal); validation aborts are an [`TransactionOutcome::Aborted`].
    async fn run_transaction(
        &self,
        id: &str,
        decide: DecisionFn<'_>,
    ) -> Result<TransactionOutcome, StorageError>;

    // ==================== Feed ====================

    /// Subscribes to the live feed.
    ///
    /// The receiver sees a [`StoreEvent::Snapshot`] for every committed
    /// mutation from this point on, and [`StoreEvent::ReadError`] if the feed
    /// fails.
    fn watch(&self) -> broadcast::Receiver<StoreEvent>;

    // ==================== Metadata ====================

    /// Returns the name of this store backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}
