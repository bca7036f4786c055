use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use papaya::{Compute, HashMap as PapayaHashMap, Operation};
use time::OffsetDateTime;
use tokio::sync::broadcast;

use bedboard_core::{
    HospitalCollection, HospitalId, HospitalRecord, SnapshotBroadcaster, StoreEvent,
};
use bedboard_storage::{
    DecisionFn, RealtimeStore, StorageError, TransactionDecision, TransactionOutcome,
};

/// A record plus the commit version that produced it.
///
/// The version is what conflicting-writer detection compares at commit time.
#[derive(Debug, Clone)]
struct VersionedRecord {
    version: u64,
    record: HospitalRecord,
    updated_at: OffsetDateTime,
}

/// In-memory realtime store backed by a papaya lock-free HashMap.
///
/// This store provides:
/// - Lock-free concurrent access via papaya::HashMap
/// - Optimistic per-key transactions with automatic retry on interference
/// - A broadcast feed pushing a full snapshot after every committed mutation
#[derive(Debug)]
pub struct InMemoryStore {
    /// Main tree using papaya for lock-free concurrent access
    data: Arc<PapayaHashMap<HospitalId, VersionedRecord>>,
    /// Atomic counter for generating commit versions
    version_counter: AtomicU64,
    /// Snapshot feed
    broadcaster: SnapshotBroadcaster,
}

impl InMemoryStore {
    /// Creates an empty store with the default feed buffer.
    pub fn new() -> Self {
        Self {
            data: Arc::new(PapayaHashMap::new()),
            version_counter: AtomicU64::new(1),
            broadcaster: SnapshotBroadcaster::new(),
        }
    }

    /// Creates an empty store with a custom feed buffer size.
    pub fn with_broadcast_capacity(capacity: usize) -> Self {
        Self {
            data: Arc::new(PapayaHashMap::new()),
            version_counter: AtomicU64::new(1),
            broadcaster: SnapshotBroadcaster::with_capacity(capacity),
        }
    }

    /// Generates the next commit version.
    fn next_version(&self) -> u64 {
        self.version_counter.fetch_add(1, Ordering::SeqCst)
    }

    /// Builds the current whole-tree snapshot.
    ///
    /// Hospitals enumerate in key order, matching the remote tree's
    /// lexicographic key ordering.
    fn build_snapshot(&self) -> HospitalCollection {
        let guard = self.data.pin();
        let mut entries: Vec<(HospitalId, HospitalRecord)> = guard
            .iter()
            .map(|(id, versioned)| (id.clone(), versioned.record.clone()))
            .collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        entries.into_iter().collect()
    }

    /// Pushes the current snapshot to all watchers.
    fn broadcast_snapshot(&self) {
        let receivers = self.broadcaster.send_snapshot(self.build_snapshot());
        tracing::trace!(receivers, "snapshot pushed");
    }

    /// Injects a feed read error, e.g. when the backing connection is lost.
    ///
    /// Watchers render a persistent error state and are not resubscribed
    /// automatically.
    pub fn emit_read_error(&self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!(error = %message, "store feed read error");
        self.broadcaster.send_read_error(message);
    }

    /// Bulk-loads records, pushing a single snapshot at the end.
    pub async fn seed<I>(&self, hospitals: I) -> Result<(), StorageError>
    where
        I: IntoIterator<Item = (HospitalId, HospitalRecord)>,
    {
        {
            let guard = self.data.pin();
            for (id, record) in hospitals {
                guard.insert(
                    id,
                    VersionedRecord {
                        version: self.next_version(),
                        record,
                        updated_at: OffsetDateTime::now_utc(),
                    },
                );
            }
        }
        self.broadcast_snapshot();
        Ok(())
    }

    /// Number of records currently stored.
    pub fn len(&self) -> usize {
        self.data.pin().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RealtimeStore for InMemoryStore {
    async fn snapshot(&self) -> Result<HospitalCollection, StorageError> {
        Ok(self.build_snapshot())
    }

    async fn read(&self, id: &str) -> Result<Option<HospitalRecord>, StorageError> {
        let guard = self.data.pin();
        Ok(guard.get(id).map(|versioned| versioned.record.clone()))
    }

    async fn put(&self, id: HospitalId, record: HospitalRecord) -> Result<(), StorageError> {
        {
            let guard = self.data.pin();
            guard.insert(
                id,
                VersionedRecord {
                    version: self.next_version(),
                    record,
                    updated_at: OffsetDateTime::now_utc(),
                },
            );
        }
        self.broadcast_snapshot();
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<(), StorageError> {
        let removed = {
            let guard = self.data.pin();
            guard.remove(id).is_some()
        };
        if removed {
            self.broadcast_snapshot();
        }
        Ok(())
    }

    async fn run_transaction(
        &self,
        id: &str,
        decide: DecisionFn<'_>,
    ) -> Result<TransactionOutcome, StorageError> {
        let outcome = {
            let guard = self.data.pin();
            // papaya re-invokes the closure whenever a conflicting writer
            // committed between read and commit, so the decision runs against
            // the value of this retry, never a cached one.
            let result = guard.compute(id.to_string(), |entry| {
                let current = entry.map(|(_, versioned)| &versioned.record);
                match decide(current) {
                    TransactionDecision::Commit(next) => Operation::Insert(VersionedRecord {
                        version: self.next_version(),
                        record: next,
                        updated_at: OffsetDateTime::now_utc(),
                    }),
                    TransactionDecision::Abort(reason) => Operation::Abort(reason),
                }
            });

            match result {
                Compute::Inserted(_, versioned) | Compute::Updated { new: (_, versioned), .. } => {
                    tracing::debug!(
                        id,
                        version = versioned.version,
                        updated_at = %versioned.updated_at,
                        "transaction committed"
                    );
                    TransactionOutcome::Committed(versioned.record.clone())
                }
                Compute::Aborted(reason) => {
                    tracing::debug!(id, %reason, "transaction aborted");
                    TransactionOutcome::Aborted(reason)
                }
                Compute::Removed(..) => {
                    // The decision function never proposes a removal.
                    return Err(StorageError::internal(
                        "unexpected removal from transaction compute",
                    ));
                }
            }
        };

        if outcome.is_committed() {
            self.broadcast_snapshot();
        }
        Ok(outcome)
    }

    fn watch(&self) -> broadcast::Receiver<StoreEvent> {
        self.broadcaster.subscribe()
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bedboard_core::BedDelta;
    use bedboard_storage::AbortReason;

    fn census(name: &str, total: u32, occupied: u32) -> HospitalRecord {
        HospitalRecord::new(name, total).with_occupied(occupied)
    }

    fn bed_decision(delta: BedDelta) -> impl Fn(Option<&HospitalRecord>) -> TransactionDecision {
        move |current| match current {
            None => TransactionDecision::Abort(AbortReason::NotFound),
            Some(record) => match record.apply_delta(delta) {
                Ok(next) => TransactionDecision::Commit(next),
                Err(range) => TransactionDecision::Abort(AbortReason::BoundsViolation {
                    hospital: range.hospital,
                    attempted_available: range.attempted_available,
                    total: range.total,
                }),
            },
        }
    }

    #[tokio::test]
    async fn test_store_basic_operations() {
        let store = InMemoryStore::new();
        assert!(store.is_empty());

        store
            .put("hospital_A".to_string(), census("A Hospital", 10, 7))
            .await
            .unwrap();
        assert_eq!(store.len(), 1);

        let record = store.read("hospital_A").await.unwrap().unwrap();
        assert_eq!(record.name, "A Hospital");
        assert_eq!(record.available_er_beds, 3);

        assert!(store.read("hospital_Z").await.unwrap().is_none());

        store.remove("hospital_A").await.unwrap();
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_enumerates_in_key_order() {
        let store = InMemoryStore::new();
        store
            .seed([
                ("hospital_C".to_string(), census("C Hospital", 8, 2)),
                ("hospital_A".to_string(), census("A Hospital", 10, 7)),
                ("hospital_B".to_string(), census("B Hospital", 6, 6)),
            ])
            .await
            .unwrap();

        let snapshot = store.snapshot().await.unwrap();
        let keys: Vec<&HospitalId> = snapshot.keys().collect();
        assert_eq!(keys, vec!["hospital_A", "hospital_B", "hospital_C"]);
    }

    #[tokio::test]
    async fn test_transaction_admit_commits() {
        // {total:10, available:3, occupied:7}, admit -> {available:2, occupied:8}
        let store = InMemoryStore::new();
        store
            .put("hospital_A".to_string(), census("A Hospital", 10, 7))
            .await
            .unwrap();

        let outcome = store
            .run_transaction("hospital_A", &bed_decision(BedDelta::Admit))
            .await
            .unwrap();

        let committed = outcome.committed().expect("should commit");
        assert_eq!(committed.available_er_beds, 2);
        assert_eq!(committed.occupied_er_beds, 8);

        // Durable: a fresh read sees the committed record
        let stored = store.read("hospital_A").await.unwrap().unwrap();
        assert_eq!(stored.available_er_beds, 2);
    }

    #[tokio::test]
    async fn test_commit_stamps_version_and_time() {
        let store = InMemoryStore::new();
        let before = OffsetDateTime::now_utc();
        store
            .put("hospital_A".to_string(), census("A Hospital", 10, 7))
            .await
            .unwrap();

        store
            .run_transaction("hospital_A", &bed_decision(BedDelta::Admit))
            .await
            .unwrap();

        let guard = store.data.pin();
        let versioned = guard.get("hospital_A").unwrap();
        assert_eq!(versioned.version, 2);
        assert!(versioned.updated_at >= before);
    }

    #[tokio::test]
    async fn test_transaction_admit_full_hospital_aborts() {
        // {total:10, available:0, occupied:10}, admit -> bounds abort, unchanged
        let store = InMemoryStore::new();
        store
            .put("hospital_A".to_string(), census("A Hospital", 10, 10))
            .await
            .unwrap();

        let outcome = store
            .run_transaction("hospital_A", &bed_decision(BedDelta::Admit))
            .await
            .unwrap();

        match outcome {
            TransactionOutcome::Aborted(AbortReason::BoundsViolation {
                attempted_available,
                total,
                ..
            }) => {
                assert_eq!(attempted_available, -1);
                assert_eq!(total, 10);
            }
            other => panic!("expected bounds abort, got {other:?}"),
        }

        let stored = store.read("hospital_A").await.unwrap().unwrap();
        assert_eq!(stored.available_er_beds, 0);
        assert_eq!(stored.occupied_er_beds, 10);
    }

    #[tokio::test]
    async fn test_transaction_discharge_empty_hospital_aborts() {
        // {total:10, available:10, occupied:0}, discharge -> bounds abort
        let store = InMemoryStore::new();
        store
            .put("hospital_A".to_string(), census("A Hospital", 10, 0))
            .await
            .unwrap();

        let outcome = store
            .run_transaction("hospital_A", &bed_decision(BedDelta::Discharge))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            TransactionOutcome::Aborted(AbortReason::BoundsViolation { .. })
        ));

        let stored = store.read("hospital_A").await.unwrap().unwrap();
        assert_eq!(stored.occupied_er_beds, 0);
    }

    #[tokio::test]
    async fn test_transaction_missing_record_aborts() {
        let store = InMemoryStore::new();

        let outcome = store
            .run_transaction("hospital_missing", &bed_decision(BedDelta::Admit))
            .await
            .unwrap();

        assert!(matches!(
            outcome,
            TransactionOutcome::Aborted(AbortReason::NotFound)
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_aborted_transaction_is_idempotent() {
        // Repeating an aborted call against unchanged state aborts identically
        let store = InMemoryStore::new();
        store
            .put("hospital_A".to_string(), census("A Hospital", 10, 10))
            .await
            .unwrap();

        let first = store
            .run_transaction("hospital_A", &bed_decision(BedDelta::Admit))
            .await
            .unwrap();
        let second = store
            .run_transaction("hospital_A", &bed_decision(BedDelta::Admit))
            .await
            .unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_abort_pushes_no_snapshot() {
        let store = InMemoryStore::new();
        store
            .put("hospital_A".to_string(), census("A Hospital", 10, 10))
            .await
            .unwrap();

        let mut feed = store.watch();
        store
            .run_transaction("hospital_A", &bed_decision(BedDelta::Admit))
            .await
            .unwrap();

        // An abort must not record a spurious commit
        assert!(matches!(
            feed.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_commit_pushes_snapshot() {
        let store = InMemoryStore::new();
        store
            .put("hospital_A".to_string(), census("A Hospital", 10, 7))
            .await
            .unwrap();

        let mut feed = store.watch();
        store
            .run_transaction("hospital_A", &bed_decision(BedDelta::Admit))
            .await
            .unwrap();

        match feed.recv().await.unwrap() {
            StoreEvent::Snapshot(collection) => {
                assert_eq!(collection["hospital_A"].available_er_beds, 2);
            }
            other => panic!("expected snapshot, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_put_and_remove_push_snapshots() {
        let store = InMemoryStore::new();
        let mut feed = store.watch();

        store
            .put("hospital_A".to_string(), census("A Hospital", 10, 0))
            .await
            .unwrap();
        assert!(feed.recv().await.unwrap().is_snapshot());

        store.remove("hospital_A").await.unwrap();
        match feed.recv().await.unwrap() {
            StoreEvent::Snapshot(collection) => assert!(collection.is_empty()),
            other => panic!("expected snapshot, got {other:?}"),
        }

        // Removing an absent key pushes nothing
        store.remove("hospital_A").await.unwrap();
        assert!(matches!(
            feed.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn test_emit_read_error_reaches_watchers() {
        let store = InMemoryStore::new();
        let mut feed = store.watch();

        store.emit_read_error("permission denied");

        match feed.recv().await.unwrap() {
            StoreEvent::ReadError(message) => assert_eq!(message, "permission denied"),
            other => panic!("expected read error, got {other:?}"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_admits_no_lost_update() {
        use tokio::task::JoinSet;

        let store = Arc::new(InMemoryStore::new());
        store
            .put("hospital_A".to_string(), census("A Hospital", 20, 0))
            .await
            .unwrap();

        let mut join_set = JoinSet::new();
        for _ in 0..20 {
            let store = Arc::clone(&store);
            join_set.spawn(async move {
                store
                    .run_transaction("hospital_A", &bed_decision(BedDelta::Admit))
                    .await
                    .unwrap()
            });
        }

        let mut commits = 0;
        while let Some(result) = join_set.join_next().await {
            if result.unwrap().is_committed() {
                commits += 1;
            }
        }

        // Every admit was individually valid; none may be lost
        assert_eq!(commits, 20);
        let stored = store.read("hospital_A").await.unwrap().unwrap();
        assert_eq!(stored.available_er_beds, 0);
        assert_eq!(stored.occupied_er_beds, 20);
        assert!(stored.is_consistent());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_admits_last_bed() {
        use tokio::task::JoinSet;

        let store = Arc::new(InMemoryStore::new());
        store
            .put("hospital_A".to_string(), census("A Hospital", 10, 9))
            .await
            .unwrap();

        let mut join_set = JoinSet::new();
        for _ in 0..10 {
            let store = Arc::clone(&store);
            join_set.spawn(async move {
                store
                    .run_transaction("hospital_A", &bed_decision(BedDelta::Admit))
                    .await
                    .unwrap()
            });
        }

        let mut commits = 0;
        let mut bounds_aborts = 0;
        while let Some(result) = join_set.join_next().await {
            match result.unwrap() {
                TransactionOutcome::Committed(_) => commits += 1,
                TransactionOutcome::Aborted(AbortReason::BoundsViolation { .. }) => {
                    bounds_aborts += 1
                }
                other => panic!("unexpected outcome {other:?}"),
            }
        }

        // Exactly one writer claims the last bed; the rest revalidate and abort
        assert_eq!(commits, 1);
        assert_eq!(bounds_aborts, 9);
        let stored = store.read("hospital_A").await.unwrap().unwrap();
        assert_eq!(stored.available_er_beds, 0);
        assert_eq!(stored.occupied_er_beds, 10);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_mixed_deltas_preserve_invariant() {
        use tokio::task::JoinSet;

        let store = Arc::new(InMemoryStore::new());
        store
            .put("hospital_A".to_string(), census("A Hospital", 10, 5))
            .await
            .unwrap();

        let mut join_set = JoinSet::new();
        for i in 0..40 {
            let store = Arc::clone(&store);
            let delta = if i % 2 == 0 {
                BedDelta::Admit
            } else {
                BedDelta::Discharge
            };
            join_set.spawn(async move {
                if fastrand::bool() {
                    tokio::task::yield_now().await;
                }
                (
                    delta,
                    store
                        .run_transaction("hospital_A", &bed_decision(delta))
                        .await
                        .unwrap(),
                )
            });
        }

        let mut net_change: i64 = 0;
        while let Some(result) = join_set.join_next().await {
            let (delta, outcome) = result.unwrap();
            if outcome.is_committed() {
                net_change += delta.as_i64();
            }
        }

        let stored = store.read("hospital_A").await.unwrap().unwrap();
        assert!(stored.is_consistent());
        assert_eq!(i64::from(stored.available_er_beds), 5 + net_change);
    }
}
