//! Fan-out delivery of conversation events to live observers.
//!
//! [`BroadcastHub`] is an [`EventSink`] backed by a `tokio::sync::broadcast` channel. Every
//! observer that has subscribed at emission time receives every event; events emitted while
//! nobody is subscribed are dropped. Each observer owns its own receive cursor, so a slow or
//! vanished observer never blocks the orchestrator or the other observers.
//!
//! ```rust
//! use multillm::broadcast::BroadcastHub;
//! use multillm::event::{ConversationEvent, EventSink};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let hub = BroadcastHub::new(16);
//! let mut observer = hub.subscribe();
//!
//! hub.emit(&ConversationEvent::ConversationEnd {}).await;
//! assert_eq!(observer.next_event().await, Some(ConversationEvent::ConversationEnd {}));
//! # }
//! ```

use crate::event::{ConversationEvent, EventSink};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Events buffered per observer before a slow observer starts losing the oldest ones.
pub const DEFAULT_CAPACITY: usize = 256;

/// Broadcast sink shared by the conversation runs and the observer connections.
#[derive(Clone)]
pub struct BroadcastHub {
    sender: broadcast::Sender<ConversationEvent>,
    attached: Arc<AtomicUsize>,
}

impl BroadcastHub {
    /// Create a hub buffering up to `capacity` events per observer.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        BroadcastHub {
            sender,
            attached: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Attach a new observer. It receives every event emitted from now on.
    pub fn subscribe(&self) -> Observer {
        self.attached.fetch_add(1, Ordering::SeqCst);
        Observer {
            receiver: self.sender.subscribe(),
            attached: Arc::clone(&self.attached),
        }
    }

    /// Number of observers currently attached.
    pub fn observer_count(&self) -> usize {
        self.attached.load(Ordering::SeqCst)
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[async_trait]
impl EventSink for BroadcastHub {
    async fn emit(&self, event: &ConversationEvent) {
        match self.sender.send(event.clone()) {
            Ok(observers) => log::debug!(
                "BroadcastHub::emit(...): {} delivered to {} observer(s)",
                event.event_type(),
                observers
            ),
            Err(_) => log::debug!(
                "BroadcastHub::emit(...): no observers, dropping {}",
                event.event_type()
            ),
        }
    }
}

/// One observer's view of the hub.
pub struct Observer {
    receiver: broadcast::Receiver<ConversationEvent>,
    attached: Arc<AtomicUsize>,
}

impl Observer {
    /// Wait for the next event.
    ///
    /// An observer that fell behind skips the events it missed and carries on; the loss is
    /// logged and isolated to this observer. Returns `None` once the hub is gone.
    pub async fn next_event(&mut self) -> Option<ConversationEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    log::warn!(
                        "Observer::next_event(): observer lagged, skipped {} event(s)",
                        skipped
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Observer {
    fn drop(&mut self) {
        let remaining = self.attached.fetch_sub(1, Ordering::SeqCst).saturating_sub(1);
        log::info!("Observer disconnected. Total observers: {}", remaining);
    }
}
