//! Message types for the queue runtime.

use serde_json::Value;
use tokio::time::Instant;
use uuid::Uuid;

/// Unique identifier for a queued message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(Uuid);

impl MessageId {
    /// Create a new random MessageId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A queued message: an opaque payload plus its delivery state.
///
/// The attempt counter starts at 0 and is mutated only by the queue runtime:
/// it increments when a delivery attempt fails and resets when the message
/// moves to a dead-letter queue.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: MessageId,
    pub body: Value,
    pub attempts: u32,
    pub enqueued_at: Instant,
}

impl Message {
    /// Create a fresh message with a zero attempt counter.
    pub fn new(body: Value) -> Self {
        Self {
            id: MessageId::new(),
            body,
            attempts: 0,
            enqueued_at: Instant::now(),
        }
    }

    /// The same message re-entering a queue as dead-lettered: counter reset,
    /// enqueue timestamp refreshed, identity and payload kept.
    pub(crate) fn into_dead_letter(self) -> Self {
        Self {
            attempts: 0,
            enqueued_at: Instant::now(),
            ..self
        }
    }
}

/// A bounded group of messages delivered to a consumer in one invocation.
#[derive(Debug, Clone)]
pub struct MessageBatch {
    /// The queue the batch was formed from.
    pub queue: String,
    /// Messages in enqueue order.
    pub messages: Vec<Message>,
}

impl MessageBatch {
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
