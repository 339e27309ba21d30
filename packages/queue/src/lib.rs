//! Emulated message queues for the hangar harness.
//!
//! The queue model is at-least-once delivery with capped retries:
//! - `produce` appends a message to a named queue, non-blocking
//! - a bound consumer receives messages in batches, closed by size or by a
//!   timeout window opened at the oldest message's enqueue time
//! - a rejected batch sends each message back through the retry budget,
//!   then to the dead-letter queue (or the floor)
//!
//! One delivery loop runs per bound queue; loops are independent of each
//! other, and within one queue batches dispatch in enqueue order.

mod error;
mod message;
mod policy;
mod runtime;

pub use error::{DeliveryError, QueueError};
pub use message::{Message, MessageBatch, MessageId};
pub use policy::ConsumerPolicy;
pub use runtime::{QueueConsumer, QueueRuntime};
