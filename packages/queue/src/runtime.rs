//! The queue runtime: named queues, producers, and per-queue delivery loops.
//!
//! Queues are created lazily on first reference. Producing is non-blocking.
//! Binding a consumer spawns one independent delivery loop task for that
//! queue; the loop accumulates batches under the consumer's policy and
//! drives the retry/dead-letter machinery. Delivery is at-least-once: a
//! consumer may see the same message more than once.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex as StdMutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use tokio::time::timeout_at;
use tracing::{debug, warn};

use crate::{ConsumerPolicy, DeliveryError, Message, MessageBatch, MessageId, QueueError};

/// A consumer of whole batches.
///
/// `Ok(())` acknowledges the entire batch; `Err` rejects it, sending every
/// message in the batch through the retry/dead-letter policy.
#[async_trait]
pub trait QueueConsumer: Send + Sync {
    async fn deliver(&self, batch: MessageBatch) -> Result<(), DeliveryError>;
}

/// One named queue: the producer side of its channel, plus the receiver
/// until a consumer claims it.
struct QueueSlot {
    tx: mpsc::UnboundedSender<Message>,
    rx: Option<mpsc::UnboundedReceiver<Message>>,
    consumer: Option<String>,
}

impl QueueSlot {
    fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Some(rx),
            consumer: None,
        }
    }
}

/// Holds all named queues and their delivery loops.
pub struct QueueRuntime {
    queues: StdMutex<HashMap<String, QueueSlot>>,
}

impl QueueRuntime {
    pub fn new() -> Self {
        Self {
            queues: StdMutex::new(HashMap::new()),
        }
    }

    /// Append a message to the named queue, creating the queue on first
    /// reference. Non-blocking from the producer's perspective.
    pub fn produce(&self, queue: &str, body: Value) -> Result<MessageId, QueueError> {
        self.enqueue(queue, Message::new(body))
    }

    fn enqueue(&self, queue: &str, message: Message) -> Result<MessageId, QueueError> {
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        let slot = queues.entry(queue.to_string()).or_insert_with(QueueSlot::new);
        let id = message.id;
        slot.tx.send(message).map_err(|_| QueueError::Closed {
            queue: queue.to_string(),
        })?;
        debug!(queue, message_id = %id, "message enqueued");
        Ok(id)
    }

    /// Bind a consumer to the named queue and start its delivery loop.
    ///
    /// At most one consumer per queue; a second bind fails. The label
    /// identifies the consumer in errors and logs.
    pub fn bind_consumer(
        self: &Arc<Self>,
        queue: &str,
        label: &str,
        consumer: Arc<dyn QueueConsumer>,
        policy: ConsumerPolicy,
    ) -> Result<(), QueueError> {
        policy.validate()?;
        let rx = {
            let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
            let slot = queues.entry(queue.to_string()).or_insert_with(QueueSlot::new);
            if let Some(existing) = &slot.consumer {
                return Err(QueueError::ConsumerAlreadyBound {
                    queue: queue.to_string(),
                    existing: existing.clone(),
                });
            }
            match slot.rx.take() {
                Some(rx) => {
                    slot.consumer = Some(label.to_string());
                    rx
                }
                None => {
                    return Err(QueueError::ConsumerBound {
                        queue: queue.to_string(),
                    })
                }
            }
        };
        debug!(queue, consumer = label, "consumer bound");
        let runtime = Arc::clone(self);
        tokio::spawn(delivery_loop(runtime, queue.to_string(), rx, consumer, policy));
        Ok(())
    }

    /// Take every message currently buffered in a queue with no consumer.
    ///
    /// Useful for inspecting dead-letter queues that have no consumer chain
    /// of their own. Fails if a consumer is bound.
    pub fn drain(&self, queue: &str) -> Result<Vec<Message>, QueueError> {
        let mut queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        let slot = match queues.get_mut(queue) {
            Some(slot) => slot,
            None => return Ok(Vec::new()),
        };
        let rx = slot.rx.as_mut().ok_or_else(|| QueueError::ConsumerBound {
            queue: queue.to_string(),
        })?;
        let mut messages = Vec::new();
        while let Ok(message) = rx.try_recv() {
            messages.push(message);
        }
        Ok(messages)
    }

    /// Name of the consumer bound to a queue, if any.
    pub fn consumer_of(&self, queue: &str) -> Option<String> {
        let queues = self.queues.lock().unwrap_or_else(|e| e.into_inner());
        queues.get(queue).and_then(|slot| slot.consumer.clone())
    }
}

impl Default for QueueRuntime {
    fn default() -> Self {
        Self::new()
    }
}

/// One delivery loop per bound queue.
///
/// Retried messages live in `backlog` and re-enter batches ahead of newer
/// messages, preserving enqueue order within the queue.
async fn delivery_loop(
    runtime: Arc<QueueRuntime>,
    queue: String,
    mut rx: mpsc::UnboundedReceiver<Message>,
    consumer: Arc<dyn QueueConsumer>,
    policy: ConsumerPolicy,
) {
    let mut backlog: VecDeque<Message> = VecDeque::new();
    loop {
        let mut batch: Vec<Message> = Vec::with_capacity(policy.max_batch_size);
        while batch.len() < policy.max_batch_size {
            match backlog.pop_front() {
                Some(message) => batch.push(message),
                None => break,
            }
        }
        if batch.is_empty() {
            match rx.recv().await {
                Some(message) => batch.push(message),
                None => break,
            }
        }
        // The batch window opens when the oldest undelivered message was
        // enqueued; size and timeout race, whichever fires first closes it.
        let deadline = batch[0].enqueued_at + policy.max_batch_timeout;
        while batch.len() < policy.max_batch_size {
            match timeout_at(deadline, rx.recv()).await {
                Ok(Some(message)) => batch.push(message),
                Ok(None) | Err(_) => break,
            }
        }
        deliver_batch(&runtime, &queue, consumer.as_ref(), &policy, batch, &mut backlog).await;
    }
    debug!(%queue, "delivery loop stopped");
}

async fn deliver_batch(
    runtime: &QueueRuntime,
    queue: &str,
    consumer: &dyn QueueConsumer,
    policy: &ConsumerPolicy,
    batch: Vec<Message>,
    backlog: &mut VecDeque<Message>,
) {
    let size = batch.len();
    let delivery = MessageBatch {
        queue: queue.to_string(),
        messages: batch.clone(),
    };
    match consumer.deliver(delivery).await {
        Ok(()) => {
            debug!(queue, size, "batch delivered");
        }
        Err(error) => {
            warn!(queue, size, %error, "batch delivery failed");
            let mut retries = Vec::new();
            for mut message in batch {
                message.attempts += 1;
                if message.attempts > policy.max_retries {
                    dead_letter(runtime, queue, policy, message);
                } else {
                    retries.push(message);
                }
            }
            // Re-enqueue at the head, keeping the original order.
            for message in retries.into_iter().rev() {
                backlog.push_front(message);
            }
        }
    }
}

fn dead_letter(runtime: &QueueRuntime, queue: &str, policy: &ConsumerPolicy, message: Message) {
    match &policy.dead_letter_queue {
        Some(dlq) => {
            warn!(
                queue,
                message_id = %message.id,
                attempts = message.attempts,
                dead_letter_queue = %dlq,
                "message dead-lettered"
            );
            if let Err(error) = runtime.enqueue(dlq, message.into_dead_letter()) {
                warn!(queue, %error, "dead-letter enqueue failed");
            }
        }
        None => {
            warn!(
                queue,
                message_id = %message.id,
                attempts = message.attempts,
                "message dropped after exhausting retries"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;

    /// Records delivered batches; fails the first `fail_first` deliveries.
    struct Recorder {
        batches: StdMutex<Vec<Vec<(MessageId, u32, Value)>>>,
        fail_first: StdMutex<u32>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Self::failing(0)
        }

        fn failing(fail_first: u32) -> Arc<Self> {
            Arc::new(Self {
                batches: StdMutex::new(Vec::new()),
                fail_first: StdMutex::new(fail_first),
            })
        }

        fn batch_sizes(&self) -> Vec<usize> {
            self.batches.lock().unwrap().iter().map(Vec::len).collect()
        }

        fn deliveries(&self) -> Vec<Vec<(MessageId, u32, Value)>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl QueueConsumer for Recorder {
        async fn deliver(&self, batch: MessageBatch) -> Result<(), DeliveryError> {
            self.batches.lock().unwrap().push(
                batch
                    .messages
                    .iter()
                    .map(|m| (m.id, m.attempts, m.body.clone()))
                    .collect(),
            );
            let mut fail_first = self.fail_first.lock().unwrap();
            if *fail_first > 0 {
                *fail_first -= 1;
                return Err(DeliveryError::new("rejected"));
            }
            Ok(())
        }
    }

    /// A consumer that always rejects its batches.
    struct AlwaysFails {
        seen: StdMutex<Vec<(MessageId, u32)>>,
    }

    impl AlwaysFails {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: StdMutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl QueueConsumer for AlwaysFails {
        async fn deliver(&self, batch: MessageBatch) -> Result<(), DeliveryError> {
            let mut seen = self.seen.lock().unwrap();
            for message in &batch.messages {
                seen.push((message.id, message.attempts));
            }
            Err(DeliveryError::new("always fails"))
        }
    }

    async fn settle() {
        // Paused-clock tests: sleeping lets every delivery loop drain and
        // auto-advances past any pending batch timeout.
        tokio::time::sleep(Duration::from_secs(30)).await;
    }

    #[tokio::test(start_paused = true)]
    async fn batches_cap_at_max_size() {
        let runtime = Arc::new(QueueRuntime::new());
        let recorder = Recorder::new();
        runtime
            .bind_consumer(
                "events",
                "worker",
                recorder.clone(),
                ConsumerPolicy::new(5, Duration::from_secs(1)),
            )
            .unwrap();

        for i in 0..12 {
            runtime.produce("events", json!({ "n": i })).unwrap();
        }
        settle().await;

        assert_eq!(recorder.batch_sizes(), vec![5, 5, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_flushes_partial_batch() {
        let runtime = Arc::new(QueueRuntime::new());
        let recorder = Recorder::new();
        runtime
            .bind_consumer(
                "events",
                "worker",
                recorder.clone(),
                ConsumerPolicy::new(10, Duration::from_secs(1)),
            )
            .unwrap();

        for i in 0..3 {
            runtime.produce("events", json!(i)).unwrap();
        }
        settle().await;

        assert_eq!(recorder.batch_sizes(), vec![3]);
    }

    #[tokio::test(start_paused = true)]
    async fn delivery_preserves_enqueue_order() {
        let runtime = Arc::new(QueueRuntime::new());
        let recorder = Recorder::new();
        runtime
            .bind_consumer(
                "events",
                "worker",
                recorder.clone(),
                ConsumerPolicy::new(2, Duration::from_secs(1)),
            )
            .unwrap();

        for i in 0..4 {
            runtime.produce("events", json!(i)).unwrap();
        }
        settle().await;

        let bodies: Vec<Value> = recorder
            .deliveries()
            .into_iter()
            .flatten()
            .map(|(_, _, body)| body)
            .collect();
        assert_eq!(bodies, vec![json!(0), json!(1), json!(2), json!(3)]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_batch_retries_at_head() {
        let runtime = Arc::new(QueueRuntime::new());
        let recorder = Recorder::failing(1);
        runtime
            .bind_consumer(
                "events",
                "worker",
                recorder.clone(),
                ConsumerPolicy::new(2, Duration::from_secs(1)).with_max_retries(3),
            )
            .unwrap();

        for i in 0..3 {
            runtime.produce("events", json!(i)).unwrap();
        }
        settle().await;

        // First [0, 1] fails, then [0, 1] again ahead of [2].
        let deliveries = recorder.deliveries();
        assert_eq!(deliveries.len(), 3);
        assert_eq!(deliveries[0][0].2, json!(0));
        assert_eq!(deliveries[1][0].2, json!(0));
        assert_eq!(deliveries[1][0].1, 1); // second attempt
        assert_eq!(deliveries[2][0].2, json!(2));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_go_to_dead_letter_queue() {
        let runtime = Arc::new(QueueRuntime::new());
        let failing = AlwaysFails::new();
        runtime
            .bind_consumer(
                "events",
                "worker",
                failing.clone(),
                ConsumerPolicy::new(5, Duration::from_secs(1))
                    .with_max_retries(1)
                    .with_dead_letter_queue("events-dlq"),
            )
            .unwrap();

        let id_a = runtime.produce("events", json!("a")).unwrap();
        let id_b = runtime.produce("events", json!("b")).unwrap();
        settle().await;

        // Each message attempted exactly twice: 1 initial + 1 retry.
        let seen = failing.seen.lock().unwrap().clone();
        assert_eq!(seen.iter().filter(|(id, _)| *id == id_a).count(), 2);
        assert_eq!(seen.iter().filter(|(id, _)| *id == id_b).count(), 2);

        // Both land in the dead-letter queue with the counter reset.
        let dead = runtime.drain("events-dlq").unwrap();
        assert_eq!(dead.len(), 2);
        assert!(dead.iter().all(|m| m.attempts == 0));
        assert!(dead.iter().any(|m| m.id == id_a));
        assert!(dead.iter().any(|m| m.id == id_b));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_drop_without_dead_letter_queue() {
        let runtime = Arc::new(QueueRuntime::new());
        let failing = AlwaysFails::new();
        runtime
            .bind_consumer(
                "events",
                "worker",
                failing.clone(),
                ConsumerPolicy::new(5, Duration::from_secs(1)).with_max_retries(1),
            )
            .unwrap();

        let id = runtime.produce("events", json!("doomed")).unwrap();
        settle().await;

        let seen = failing.seen.lock().unwrap().clone();
        assert_eq!(seen, vec![(id, 0), (id, 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn dead_letter_queue_can_have_its_own_consumer() {
        let runtime = Arc::new(QueueRuntime::new());
        let failing = AlwaysFails::new();
        let dlq_recorder = Recorder::new();
        runtime
            .bind_consumer(
                "events",
                "worker",
                failing,
                ConsumerPolicy::new(1, Duration::ZERO)
                    .with_max_retries(0)
                    .with_dead_letter_queue("events-dlq"),
            )
            .unwrap();
        runtime
            .bind_consumer(
                "events-dlq",
                "janitor",
                dlq_recorder.clone(),
                ConsumerPolicy::new(10, Duration::from_secs(1)),
            )
            .unwrap();

        runtime.produce("events", json!("x")).unwrap();
        settle().await;

        let delivered: usize = dlq_recorder.batch_sizes().iter().sum();
        assert_eq!(delivered, 1);
    }

    #[tokio::test]
    async fn second_consumer_rejected() {
        let runtime = Arc::new(QueueRuntime::new());
        let policy = ConsumerPolicy::new(1, Duration::ZERO);
        runtime
            .bind_consumer("events", "first", Recorder::new(), policy.clone())
            .unwrap();

        let result = runtime.bind_consumer("events", "second", Recorder::new(), policy);
        assert!(matches!(
            result,
            Err(QueueError::ConsumerAlreadyBound { .. })
        ));
        assert_eq!(runtime.consumer_of("events").as_deref(), Some("first"));
    }

    #[tokio::test]
    async fn invalid_policy_rejected_at_bind() {
        let runtime = Arc::new(QueueRuntime::new());
        let result = runtime.bind_consumer(
            "events",
            "worker",
            Recorder::new(),
            ConsumerPolicy::new(0, Duration::ZERO),
        );
        assert!(matches!(result, Err(QueueError::InvalidPolicy { .. })));
    }

    #[tokio::test]
    async fn unconsumed_queue_accumulates_and_drains() {
        let runtime = Arc::new(QueueRuntime::new());
        runtime.produce("orphan", json!(1)).unwrap();
        runtime.produce("orphan", json!(2)).unwrap();

        let drained = runtime.drain("orphan").unwrap();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].body, json!(1));
        assert_eq!(drained[1].body, json!(2));

        // Unknown queue drains empty.
        assert!(runtime.drain("never_seen").unwrap().is_empty());
    }

    #[tokio::test]
    async fn drain_refused_on_consumed_queue() {
        let runtime = Arc::new(QueueRuntime::new());
        runtime
            .bind_consumer(
                "events",
                "worker",
                Recorder::new(),
                ConsumerPolicy::new(1, Duration::ZERO),
            )
            .unwrap();
        assert!(matches!(
            runtime.drain("events"),
            Err(QueueError::ConsumerBound { .. })
        ));
    }
}
