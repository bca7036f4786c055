//! Snapshot feed events and their broadcaster.
//!
//! The store pushes a full point-in-time copy of the hospital tree to every
//! subscriber on any committed change. The broadcaster wraps tokio's
//! broadcast channel for multi-producer, multi-consumer delivery.

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::hospital::HospitalCollection;

/// Default buffer size for the broadcast channel.
/// Slow receivers lag (and are told so) once the buffer is exceeded.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// One event on the live feed.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// Full replacement snapshot of the subscribed tree.
    Snapshot(HospitalCollection),
    /// The feed failed; subscribers render a persistent error state.
    ReadError(String),
}

impl StoreEvent {
    pub fn is_snapshot(&self) -> bool {
        matches!(self, StoreEvent::Snapshot(_))
    }
}

/// Broadcaster for store snapshot events.
///
/// Thread-safe; clone freely and share across tasks. Multiple subscribers
/// receive every event sent after they subscribed.
#[derive(Clone)]
pub struct SnapshotBroadcaster {
    sender: broadcast::Sender<StoreEvent>,
}

impl SnapshotBroadcaster {
    /// Create a new broadcaster with default buffer size.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    /// Create a new broadcaster with custom buffer size.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Create a new broadcaster wrapped in an Arc for sharing.
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Send an event to all subscribers.
    ///
    /// Returns the number of subscribers that received it; 0 if none active.
    pub fn send(&self, event: StoreEvent) -> usize {
        self.sender.send(event).unwrap_or_default()
    }

    /// Push a full-tree snapshot.
    pub fn send_snapshot(&self, collection: HospitalCollection) -> usize {
        self.send(StoreEvent::Snapshot(collection))
    }

    /// Push a feed read error.
    pub fn send_read_error(&self, message: impl Into<String>) -> usize {
        self.send(StoreEvent::ReadError(message.into()))
    }

    /// Subscribe to events sent from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers.
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Default for SnapshotBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SnapshotBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotBroadcaster")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}
