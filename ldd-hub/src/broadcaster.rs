//! Live notification broadcaster
//!
//! Keeps a registry of subscriber queues and relays refresh events to each
//! of them. Publishing never waits: a full queue skips the event (a pending
//! event already tells that viewer to refresh) and a closed queue is removed.
//!
//! Each [`Subscriber`] owns its receive side and unregisters itself when
//! dropped, so tearing down a streaming connection is the cancellation signal.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Idle interval after which a subscriber yields a keep-alive
pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Default pending-event capacity per subscriber
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Refresh notifications carried to viewers
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum HubEvent {
    /// A batch committed
    ReadingsIngested {
        batch_id: Uuid,
        node: String,
        rows: usize,
        timestamp: DateTime<Utc>,
    },

    /// All readings were wiped
    ReadingsReset { timestamp: DateTime<Utc> },
}

/// What a subscriber's receive loop produced
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    Event(HubEvent),
    KeepAlive,
}

/// Registry key of a subscriber
pub type SubscriberId = u64;

#[derive(Default)]
struct Registry {
    next_id: AtomicU64,
    queues: Mutex<HashMap<SubscriberId, mpsc::Sender<HubEvent>>>,
}

impl Registry {
    // Publishing must not fail because some other thread panicked mid-update
    fn queues(&self) -> MutexGuard<'_, HashMap<SubscriberId, mpsc::Sender<HubEvent>>> {
        self.queues.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn remove(&self, id: SubscriberId) -> bool {
        self.queues().remove(&id).is_some()
    }
}

/// Fan-out of refresh events to every open live stream
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<Registry>,
    queue_capacity: usize,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl Broadcaster {
    /// Create a broadcaster whose subscribers buffer up to `queue_capacity` events
    pub fn new(queue_capacity: usize) -> Self {
        let queue_capacity = queue_capacity.max(1);
        info!("Broadcaster initialized with per-subscriber capacity {}", queue_capacity);
        Self {
            registry: Arc::new(Registry::default()),
            queue_capacity,
        }
    }

    /// Register a new subscriber with an empty queue
    pub fn subscribe(&self) -> Subscriber {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        let count = {
            let mut queues = self.registry.queues();
            queues.insert(id, tx);
            queues.len()
        };
        debug!(subscriber = id, subscribers = count, "Subscriber registered");

        Subscriber {
            id,
            rx,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Deliver `event` to every registered subscriber without waiting
    ///
    /// Returns how many subscribers had the event queued.
    pub fn publish(&self, event: HubEvent) -> usize {
        let mut queues = self.registry.queues();
        let mut delivered = 0;
        let mut dead = Vec::new();

        for (id, tx) in queues.iter() {
            match tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    debug!(subscriber = *id, "Subscriber queue full, skipping event");
                }
                Err(TrySendError::Closed(_)) => dead.push(*id),
            }
        }

        for id in dead {
            queues.remove(&id);
            warn!(subscriber = id, "Dropped closed subscriber");
        }

        debug!(delivered, subscribers = queues.len(), "Published {:?}", event);
        delivered
    }

    /// Remove a subscriber by id; `false` if it was not registered
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let removed = self.registry.remove(id);
        if removed {
            debug!(subscriber = id, "Subscriber unregistered");
        }
        removed
    }

    /// Number of registered subscribers
    pub fn subscriber_count(&self) -> usize {
        self.registry.queues().len()
    }

    /// Drop every subscriber queue, ending their receive loops
    ///
    /// Used on shutdown so long-lived streams do not hold the server open.
    pub fn close_all(&self) {
        let closed = {
            let mut queues = self.registry.queues();
            let count = queues.len();
            queues.clear();
            count
        };
        info!("Closed {} live subscriber(s)", closed);
    }
}

/// Receive side of one live-view registration
pub struct Subscriber {
    id: SubscriberId,
    rx: mpsc::Receiver<HubEvent>,
    registry: Weak<Registry>,
}

impl Subscriber {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Still present in the broadcaster's registry
    pub fn is_registered(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.queues().contains_key(&self.id))
            .unwrap_or(false)
    }

    /// Wait for the next event; `None` once the broadcaster dropped this queue
    pub async fn recv(&mut self) -> Option<HubEvent> {
        self.rx.recv().await
    }

    /// Next pending event, if one is already queued
    pub fn try_recv(&mut self) -> Option<HubEvent> {
        self.rx.try_recv().ok()
    }

    /// Wait for an event, or yield a keep-alive after `idle` of silence
    ///
    /// Returns `None` when the queue has been closed.
    pub async fn next_signal(&mut self, idle: Duration) -> Option<Signal> {
        match tokio::time::timeout(idle, self.rx.recv()).await {
            Ok(Some(event)) => Some(Signal::Event(event)),
            Ok(None) => None,
            Err(_) => Some(Signal::KeepAlive),
        }
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            if registry.remove(self.id) {
                debug!(subscriber = self.id, "Subscriber dropped");
            }
        }
    }
}
