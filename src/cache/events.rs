//! Cache notifications.
//!
//! Defines the change notifications the published cache reacts to and an
//! in-memory queue that orders them before they are planned and applied.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;
use uuid::Uuid;

use crate::domain::content::NodeId;

use super::lock::mutex_lock;

const SOURCE: &str = "cache::events";

/// Monotonic epoch for ordering notifications within this process.
pub type Epoch = u64;

/// Something changed in the backing stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheNotification {
    /// Content, media or member types were saved or deleted.
    ContentTypesChanged(Vec<i32>),
    /// Data types were saved or deleted; types using them are stale.
    DataTypesChanged(Vec<i32>),
    /// Nodes were published, unpublished, moved or deleted.
    ContentChanged(Vec<NodeId>),
    /// Domain assignments changed.
    DomainsChanged,
    /// Drop everything.
    RefreshAll,
}

/// Queued notification with idempotency and ordering support.
#[derive(Debug, Clone)]
pub struct CacheEvent {
    pub id: Uuid,
    pub epoch: Epoch,
    pub notification: CacheNotification,
}

impl CacheEvent {
    pub fn new(notification: CacheNotification, epoch: Epoch) -> Self {
        Self {
            id: Uuid::new_v4(),
            epoch,
            notification,
        }
    }
}

/// In-memory notification queue.
///
/// Contention is low: notifications are published by writers and drained by
/// the service right after publishing.
pub struct EventQueue {
    queue: Mutex<VecDeque<CacheEvent>>,
    epoch_counter: AtomicU64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            epoch_counter: AtomicU64::new(0),
        }
    }

    pub fn next_epoch(&self) -> Epoch {
        self.epoch_counter.fetch_add(1, Ordering::SeqCst)
    }

    pub fn publish(&self, notification: CacheNotification) {
        let event = CacheEvent::new(notification, self.next_epoch());

        info!(
            event_id = %event.id,
            event_epoch = event.epoch,
            notification = ?event.notification,
            "Cache notification enqueued"
        );

        mutex_lock(&self.queue, SOURCE, "publish").push_back(event);
    }

    /// Drain every queued event in FIFO order.
    pub fn drain_all(&self) -> Vec<CacheEvent> {
        mutex_lock(&self.queue, SOURCE, "drain_all").drain(..).collect()
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.queue, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
