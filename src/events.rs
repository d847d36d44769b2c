//! Fan-out of file changes to live observers.

use serde::Serialize;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use uuid::Uuid;

use crate::storage::FileRecord;

/// A change to the set of shared files.
/// Serializes as `{"event": "...", "data": ...}` for the live channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum FileEvent {
    #[serde(rename = "fileUploaded")]
    FilesAdded(Vec<FileRecord>),
    #[serde(rename = "fileDeleted")]
    FileRemoved(String),
}

/// Publish/subscribe hub for [`FileEvent`]s.
///
/// Publishing never waits on subscribers. A subscriber that falls more than
/// `capacity` events behind skips the oldest ones.
pub struct Broadcaster {
    tx: broadcast::Sender<FileEvent>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Register an observer. Only events published after this call are seen.
    pub fn subscribe(&self) -> Subscription {
        let subscription = Subscription {
            id: Uuid::new_v4(),
            rx: Some(self.tx.subscribe()),
        };
        tracing::debug!(subscriber = %subscription.id, "Subscribed to file events");
        subscription
    }

    /// Deliver `event` to every current subscriber. Returns how many were reached.
    pub fn publish(&self, event: FileEvent) -> usize {
        match self.tx.send(event) {
            Ok(receivers) => {
                tracing::debug!(receivers, "Published file event");
                receivers
            }
            Err(_) => {
                tracing::debug!("No live subscribers, event dropped");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// Handle held by one observer.
/// Dropping it unsubscribes as well.
pub struct Subscription {
    id: Uuid,
    rx: Option<broadcast::Receiver<FileEvent>>,
}

impl Subscription {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn is_active(&self) -> bool {
        self.rx.is_some()
    }

    /// Wait for the next event. `None` once unsubscribed or the hub is gone.
    pub async fn recv(&mut self) -> Option<FileEvent> {
        loop {
            let received = self.rx.as_mut()?.recv().await;
            match received {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(subscriber = %self.id, skipped, "Subscriber lagged, events skipped");
                }
                Err(RecvError::Closed) => {
                    self.rx = None;
                    return None;
                }
            }
        }
    }

    /// Next already-published event, without waiting.
    pub fn try_recv(&mut self) -> Option<FileEvent> {
        loop {
            let received = self.rx.as_mut()?.try_recv();
            match received {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(subscriber = %self.id, skipped, "Subscriber lagged, events skipped");
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Closed) => {
                    self.rx = None;
                    return None;
                }
            }
        }
    }

    /// Stop receiving events. Safe to call repeatedly.
    pub fn unsubscribe(&mut self) {
        if self.rx.take().is_some() {
            tracing::debug!(subscriber = %self.id, "Unsubscribed from file events");
        }
    }
}
