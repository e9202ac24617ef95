//! # Event Bus
//!
//! Notifications for collaborators outside the pipeline (UI, renderer, HUD).
//!
//! An [`EventBus`] is created by the caller and handed to every
//! [`crate::connection::Connection`] and [`crate::world::World`] that should
//! report into it. There is no process-wide bus, so independent sessions in
//! one process do not see each other's events.
//!
//! Delivery is best effort: events published with no subscriber are dropped,
//! and a subscriber that falls more than `capacity` events behind skips the
//! oldest ones.

use futures::Stream;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::StreamExt;
use tracing::trace;

/// Default number of events buffered per subscriber.
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// The socket finished connecting.
    Connected,
    /// The socket could not connect or failed while open.
    ConnectionFailed { reason: String },
    /// A packet could not be decoded; the connection is being closed.
    /// `packet_id` is absent when the failure happened below dispatch.
    DecodeError {
        packet_id: Option<i32>,
        reason: String,
    },
    /// The connection reached its terminal state.
    Disconnected { reason: String },
    /// The initial terrain has been unpacked.
    TerrainReady { chunks: usize },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publishes an event to current subscribers.
    pub fn dispatch(&self, event: Event) {
        trace!(?event, "Dispatching event");
        // No subscribers is not an error.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.sender.subscribe()
    }

    /// Subscribes and yields events as a stream, skipping over lag gaps.
    pub fn stream(&self) -> impl Stream<Item = Event> + Unpin {
        BroadcastStream::new(self.sender.subscribe()).filter_map(|event| event.ok())
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}
