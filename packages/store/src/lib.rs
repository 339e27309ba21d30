//! Emulated storage for the hangar harness.
//!
//! Two storage primitives live here:
//! - `BucketStore`: path-addressable object storage, one logical namespace
//!   per bucket name
//! - `DurableObjectRegistry`: keyed, process-lifetime, single-instance
//!   durable state with per-instance operation serialization
//!
//! Both are process-scoped: constructed once at startup by the composition
//! root and passed by handle into every component that needs them. Absent
//! values are `None`, never errors.

mod bucket;
mod durable;

pub use bucket::BucketStore;
pub use durable::{DurableObjectRegistry, ObjectHandle, StorageGuard};
