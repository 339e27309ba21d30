//! Per-service binding context.
//!
//! Every service gets an `Env` built once at startup holding exactly the
//! resources its descriptor declared. A handler can only reach what it
//! declared: lookups for anything else fail, and nothing else is in the
//! maps.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;

use hangar_queue::{MessageId, QueueError, QueueRuntime};
use hangar_store::{BucketStore, DurableObjectRegistry, ObjectHandle};

use crate::{EnvError, ServiceDescriptor};

/// Producer handle for one bound queue.
#[derive(Clone)]
pub struct QueueProducer {
    runtime: Arc<QueueRuntime>,
    queue: String,
}

impl QueueProducer {
    /// The global queue name this producer appends to.
    pub fn queue_name(&self) -> &str {
        &self.queue
    }

    /// Append a message. Non-blocking.
    pub fn produce(&self, body: Value) -> Result<MessageId, QueueError> {
        self.runtime.produce(&self.queue, body)
    }
}

/// Handle for one bound bucket.
#[derive(Clone)]
pub struct BucketBinding {
    store: Arc<BucketStore>,
    bucket: String,
}

impl BucketBinding {
    /// The global bucket name behind this binding.
    pub fn bucket_name(&self) -> &str {
        &self.bucket
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.get(&self.bucket, key)
    }

    pub fn put(&self, key: &str, value: Value) {
        self.store.put(&self.bucket, key, value)
    }

    pub fn delete(&self, key: &str) -> bool {
        self.store.delete(&self.bucket, key)
    }

    pub fn keys(&self) -> Vec<String> {
        self.store.keys(&self.bucket)
    }
}

/// Handle for one bound durable-object namespace.
#[derive(Clone)]
pub struct DurableNamespace {
    registry: Arc<DurableObjectRegistry>,
    namespace: String,
}

impl DurableNamespace {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The instance for a key in this namespace, created on first access.
    pub fn get(&self, key: &str) -> ObjectHandle {
        self.registry.get_or_create(&self.namespace, key)
    }
}

/// A service's environment: its declared bindings and nothing more.
pub struct Env {
    vars: BTreeMap<String, String>,
    buckets: BTreeMap<String, BucketBinding>,
    objects: BTreeMap<String, DurableNamespace>,
    queues: BTreeMap<String, QueueProducer>,
}

impl Env {
    pub(crate) fn new(
        descriptor: &ServiceDescriptor,
        buckets: &Arc<BucketStore>,
        objects: &Arc<DurableObjectRegistry>,
        queues: &Arc<QueueRuntime>,
    ) -> Self {
        let bucket_bindings = descriptor
            .buckets
            .iter()
            .map(|(local, bucket)| {
                (
                    local.clone(),
                    BucketBinding {
                        store: Arc::clone(buckets),
                        bucket: bucket.clone(),
                    },
                )
            })
            .collect();
        let object_bindings = descriptor
            .durable_objects
            .iter()
            .map(|(local, namespace)| {
                (
                    local.clone(),
                    DurableNamespace {
                        registry: Arc::clone(objects),
                        namespace: namespace.clone(),
                    },
                )
            })
            .collect();
        let queue_bindings = descriptor
            .queue_producers
            .iter()
            .map(|(local, queue)| {
                (
                    local.clone(),
                    QueueProducer {
                        runtime: Arc::clone(queues),
                        queue: queue.clone(),
                    },
                )
            })
            .collect();
        Self {
            vars: descriptor.vars.clone(),
            buckets: bucket_bindings,
            objects: object_bindings,
            queues: queue_bindings,
        }
    }

    /// A static configuration value.
    pub fn var(&self, name: &str) -> Result<&str, EnvError> {
        self.vars
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| EnvError::UnknownBinding {
                kind: "var",
                name: name.to_string(),
            })
    }

    /// A bound bucket, by its local name.
    pub fn bucket(&self, name: &str) -> Result<&BucketBinding, EnvError> {
        self.buckets.get(name).ok_or_else(|| EnvError::UnknownBinding {
            kind: "bucket",
            name: name.to_string(),
        })
    }

    /// A bound durable-object namespace, by its local name.
    pub fn objects(&self, name: &str) -> Result<&DurableNamespace, EnvError> {
        self.objects.get(name).ok_or_else(|| EnvError::UnknownBinding {
            kind: "durable object namespace",
            name: name.to_string(),
        })
    }

    /// A bound queue producer, by its local name.
    pub fn queue(&self, name: &str) -> Result<&QueueProducer, EnvError> {
        self.queues.get(name).ok_or_else(|| EnvError::UnknownBinding {
            kind: "queue producer",
            name: name.to_string(),
        })
    }
}
