//! Consumer delivery policy.

use std::time::Duration;

use crate::QueueError;

/// Batching, retry, and dead-letter policy for one queue consumer.
///
/// Batch size and timeout are racing conditions: a batch closes when it
/// reaches `max_batch_size` or when `max_batch_timeout` has elapsed since
/// the oldest undelivered message was enqueued, whichever comes first.
#[derive(Debug, Clone)]
pub struct ConsumerPolicy {
    /// Maximum messages per delivered batch. Must be at least 1.
    pub max_batch_size: usize,

    /// Longest a message may wait before its batch is flushed.
    pub max_batch_timeout: Duration,

    /// Failed delivery attempts allowed beyond the first, per message.
    pub max_retries: u32,

    /// Destination for messages that exhaust their retry budget. Without
    /// one, exhausted messages are dropped.
    pub dead_letter_queue: Option<String>,
}

impl ConsumerPolicy {
    /// A policy with no retries and no dead-letter queue.
    pub fn new(max_batch_size: usize, max_batch_timeout: Duration) -> Self {
        Self {
            max_batch_size,
            max_batch_timeout,
            max_retries: 0,
            dead_letter_queue: None,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_dead_letter_queue(mut self, queue: impl Into<String>) -> Self {
        self.dead_letter_queue = Some(queue.into());
        self
    }

    /// Validate the policy before a consumer binds with it.
    pub fn validate(&self) -> Result<(), QueueError> {
        if self.max_batch_size == 0 {
            return Err(QueueError::InvalidPolicy {
                message: "max_batch_size must be at least 1".to_string(),
            });
        }
        if let Some(dlq) = &self.dead_letter_queue {
            if dlq.is_empty() {
                return Err(QueueError::InvalidPolicy {
                    message: "dead_letter_queue name must not be empty".to_string(),
                });
            }
        }
        Ok(())
    }
}
