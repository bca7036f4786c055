//! Background subscriber that feeds store snapshots into the mirror.

use std::sync::Arc;

use bedboard_core::StoreEvent;
use tokio::sync::{broadcast, watch};

use crate::mirror::HospitalMirror;

/// Long-lived task that consumes the store's snapshot feed.
///
/// Every snapshot replaces the mirrored collection wholesale; read errors
/// are recorded on the mirror until the next successful snapshot.
pub struct SnapshotSubscriber {
    events: broadcast::Receiver<StoreEvent>,
    mirror: Arc<HospitalMirror>,
    /// Invoked after every applied event, for redraws.
    on_change: Option<Box<dyn Fn() + Send>>,
}

impl SnapshotSubscriber {
    pub fn new(events: broadcast::Receiver<StoreEvent>, mirror: Arc<HospitalMirror>) -> Self {
        Self {
            events,
            mirror,
            on_change: None,
        }
    }

    pub fn with_on_change(mut self, callback: impl Fn() + Send + 'static) -> Self {
        self.on_change = Some(Box::new(callback));
        self
    }

    /// Run until the shutdown signal fires or the feed closes.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!("Starting snapshot subscriber");

        loop {
            tokio::select! {
                biased;

                result = shutdown.changed() => {
                    match result {
                        Ok(()) if *shutdown.borrow() => {
                            tracing::info!("Snapshot subscriber shutting down");
                            break;
                        }
                        Ok(()) => {
                            // Value changed but not to shutdown, continue
                        }
                        Err(_) => {
                            // Sender was dropped, the app is going away
                            tracing::info!("Snapshot subscriber shutdown channel closed");
                            break;
                        }
                    }
                }
                event = self.events.recv() => {
                    match event {
                        Ok(StoreEvent::Snapshot(hospitals)) => {
                            tracing::debug!(count = hospitals.len(), "Applying hospital snapshot");
                            self.mirror.apply_snapshot(hospitals);
                            self.notify();
                        }
                        Ok(StoreEvent::ReadError(message)) => {
                            tracing::error!(%message, "Subscription feed reported a read error");
                            self.mirror.apply_read_error(message);
                            self.notify();
                        }
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            // Snapshots are full-state, so only the latest matters.
                            tracing::warn!(skipped, "Snapshot subscriber lagged, catching up");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            tracing::info!("Snapshot feed closed, subscriber stopping");
                            break;
                        }
                    }
                }
            }
        }
    }

    fn notify(&self) {
        if let Some(callback) = &self.on_change {
            callback();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bedboard_core::{HospitalRecord, SnapshotBroadcaster};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    #[tokio::test]
    async fn test_snapshot_reaches_mirror() {
        let broadcaster = SnapshotBroadcaster::new();
        let mirror = Arc::new(HospitalMirror::new());
        let subscriber = SnapshotSubscriber::new(broadcaster.subscribe(), Arc::clone(&mirror));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(subscriber.run(shutdown_rx));

        let mut hospitals = bedboard_core::HospitalCollection::default();
        hospitals.insert(
            "h1".to_string(),
            HospitalRecord::new("General Hospital", 12).with_occupied(7),
        );
        broadcaster.send_snapshot(hospitals);

        settle().await;
        let state = mirror.load();
        assert_eq!(state.hospitals.len(), 1);
        assert_eq!(state.selected.as_deref(), Some("h1"));

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_read_error_reaches_mirror() {
        let broadcaster = SnapshotBroadcaster::new();
        let mirror = Arc::new(HospitalMirror::new());
        let subscriber = SnapshotSubscriber::new(broadcaster.subscribe(), Arc::clone(&mirror));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(subscriber.run(shutdown_rx));

        broadcaster.send_read_error("connection lost");
        settle().await;
        assert_eq!(
            mirror.load().feed_error.as_deref(),
            Some("connection lost")
        );

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_on_change_fires_per_event() {
        let broadcaster = SnapshotBroadcaster::new();
        let mirror = Arc::new(HospitalMirror::new());
        let counter = Arc::new(AtomicUsize::new(0));
        let counted = Arc::clone(&counter);
        let subscriber = SnapshotSubscriber::new(broadcaster.subscribe(), Arc::clone(&mirror))
            .with_on_change(move || {
                counted.fetch_add(1, Ordering::SeqCst);
            });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(subscriber.run(shutdown_rx));

        broadcaster.send_snapshot(bedboard_core::HospitalCollection::default());
        broadcaster.send_read_error("blip");
        settle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_task() {
        let broadcaster = SnapshotBroadcaster::new();
        let mirror = Arc::new(HospitalMirror::new());
        let subscriber = SnapshotSubscriber::new(broadcaster.subscribe(), Arc::clone(&mirror));

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(subscriber.run(shutdown_rx));

        shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_closed_feed_stops_task() {
        let broadcaster = SnapshotBroadcaster::new();
        let mirror = Arc::new(HospitalMirror::new());
        let subscriber = SnapshotSubscriber::new(broadcaster.subscribe(), Arc::clone(&mirror));

        let (_shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(subscriber.run(shutdown_rx));

        drop(broadcaster);
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
