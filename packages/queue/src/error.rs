//! Error types for the queue runtime.

use thiserror::Error;

/// Errors that can occur in the queue runtime.
#[derive(Debug, Error)]
pub enum QueueError {
    /// A queue can have at most one consumer bound at a time.
    #[error("queue '{queue}' already has consumer '{existing}'")]
    ConsumerAlreadyBound { queue: String, existing: String },

    /// The operation requires a queue without a bound consumer.
    #[error("queue '{queue}' is bound to a consumer; its messages are observed through delivery")]
    ConsumerBound { queue: String },

    /// The consumer policy failed validation.
    #[error("invalid consumer policy: {message}")]
    InvalidPolicy { message: String },

    /// The queue's delivery loop is gone and can no longer accept messages.
    #[error("queue '{queue}' is closed")]
    Closed { queue: String },
}

/// Failure reported by a consumer for a whole batch.
///
/// Recovered by the runtime's retry/dead-letter policy; never fatal.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct DeliveryError {
    message: String,
}

impl DeliveryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
