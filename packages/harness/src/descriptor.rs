//! Declarative service descriptors.
//!
//! A descriptor names a service, its route patterns, and the emulated
//! resources bound into its environment: queue producers, at most one queue
//! consumer, durable-object namespaces, buckets, and static configuration
//! values. Descriptors are registered once at startup and validated at
//! registration time.

use std::collections::BTreeMap;

use hangar_core::{ConfigError, RoutePath};
use hangar_queue::ConsumerPolicy;

/// A parsed route pattern.
///
/// Written as an exact path (`/flights`) or a path with a trailing wildcard
/// segment (`/js/*`); the wildcard captures the remaining suffix, which may
/// span several segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoutePattern {
    Exact(RoutePath),
    Wildcard(RoutePath),
}

impl RoutePattern {
    /// Parse a pattern string.
    pub fn parse(pattern: &str) -> Result<Self, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidRoutePattern {
            pattern: pattern.to_string(),
            message,
        };
        if pattern == "*" || pattern == "/*" {
            return Ok(RoutePattern::Wildcard(RoutePath::root()));
        }
        if let Some(prefix) = pattern.strip_suffix("/*") {
            if prefix.contains('*') {
                return Err(invalid(
                    "wildcard may only appear as a trailing '/*' segment".to_string(),
                ));
            }
            let path = RoutePath::parse(prefix).map_err(|e| invalid(e.to_string()))?;
            return Ok(RoutePattern::Wildcard(path));
        }
        if pattern.contains('*') {
            return Err(invalid(
                "wildcard may only appear as a trailing '/*' segment".to_string(),
            ));
        }
        RoutePath::parse(pattern)
            .map(RoutePattern::Exact)
            .map_err(|e| invalid(e.to_string()))
    }
}

/// A service's single queue-consumer binding.
#[derive(Debug, Clone)]
pub struct QueueConsumerBinding {
    /// Global queue name the service consumes from.
    pub queue: String,
    /// Delivery policy for that queue.
    pub policy: ConsumerPolicy,
}

/// Declarative description of one logical service.
#[derive(Debug, Clone)]
pub struct ServiceDescriptor {
    pub name: String,

    /// Route pattern strings, parsed and validated at registration.
    pub routes: Vec<String>,

    /// Static configuration values available to the handler.
    pub vars: BTreeMap<String, String>,

    /// Queue producer bindings: local name → global queue name.
    pub queue_producers: BTreeMap<String, String>,

    /// At most one queue-consumer binding.
    pub queue_consumer: Option<QueueConsumerBinding>,

    /// Durable-object namespace bindings: local name → namespace identifier.
    pub durable_objects: BTreeMap<String, String>,

    /// Bucket bindings: local name → global bucket name.
    pub buckets: BTreeMap<String, String>,
}

impl ServiceDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            routes: Vec::new(),
            vars: BTreeMap::new(),
            queue_producers: BTreeMap::new(),
            queue_consumer: None,
            durable_objects: BTreeMap::new(),
            buckets: BTreeMap::new(),
        }
    }

    pub fn with_route(mut self, pattern: impl Into<String>) -> Self {
        self.routes.push(pattern.into());
        self
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    pub fn with_queue_producer(
        mut self,
        local: impl Into<String>,
        queue: impl Into<String>,
    ) -> Self {
        self.queue_producers.insert(local.into(), queue.into());
        self
    }

    pub fn with_queue_consumer(mut self, queue: impl Into<String>, policy: ConsumerPolicy) -> Self {
        self.queue_consumer = Some(QueueConsumerBinding {
            queue: queue.into(),
            policy,
        });
        self
    }

    pub fn with_durable_objects(
        mut self,
        local: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        self.durable_objects.insert(local.into(), namespace.into());
        self
    }

    pub fn with_bucket(mut self, local: impl Into<String>, bucket: impl Into<String>) -> Self {
        self.buckets.insert(local.into(), bucket.into());
        self
    }
}
