//! hangar: the routing-and-binding layer of a local multi-service
//! emulation harness.
//!
//! One process stands in for a small distributed platform during
//! development:
//! - the `Router` resolves every inbound path to exactly one service
//! - each service runs behind the `ServiceHandler` seam with an `Env`
//!   holding only the resources its descriptor declared
//! - queue messages flow through `hangar_queue` with batching, retry, and
//!   dead-letter semantics; durable objects and buckets come from
//!   `hangar_store`
//! - the `Edge` is the single HTTP listening endpoint
//!
//! Services are declared once at startup with `HarnessBuilder`;
//! configuration errors are fatal before the first request is accepted.

mod bindings;
mod descriptor;
mod edge;
mod error;
mod harness;
mod proxy;
mod registry;
mod router;
mod service;

pub use bindings::{BucketBinding, DurableNamespace, Env, QueueProducer};
pub use descriptor::{QueueConsumerBinding, RoutePattern, ServiceDescriptor};
pub use edge::Edge;
pub use error::{EdgeError, EnvError, HandlerError};
pub use harness::{Harness, HarnessBuilder};
pub use proxy::BucketProxy;
pub use registry::{ServiceInstance, ServiceRegistry};
pub use router::{Resolution, Router};
pub use service::ServiceHandler;

// Re-export the layers below for convenience
pub use hangar_core::{ConfigError, Method, PathError, Request, Response, RoutePath};
pub use hangar_queue::{
    ConsumerPolicy, DeliveryError, Message, MessageBatch, MessageId, QueueConsumer, QueueError,
    QueueRuntime,
};
pub use hangar_store::{BucketStore, DurableObjectRegistry, ObjectHandle, StorageGuard};
