//! The composition root: builds the registry, router, and binding contexts
//! from declarative service descriptors, then dispatches requests.
//!
//! Configuration problems surface while descriptors are registered and from
//! `build`; both are fatal before any request is accepted. At runtime a
//! failing handler is translated into a server-error response and the
//! process keeps serving.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use hangar_core::{ConfigError, Request, Response, RoutePath};
use hangar_queue::{DeliveryError, MessageBatch, QueueConsumer, QueueRuntime};
use hangar_store::{BucketStore, DurableObjectRegistry};

use crate::{
    Env, Resolution, RoutePattern, Router, ServiceDescriptor, ServiceHandler, ServiceInstance,
    ServiceRegistry,
};

/// Collects service descriptors and assembles the harness.
pub struct HarnessBuilder {
    services: Vec<(ServiceDescriptor, Arc<dyn ServiceHandler>)>,
    aliases: Vec<(RoutePath, RoutePath)>,
    strip_prefix: Option<RoutePath>,
    // Registration-time validation state.
    names: HashSet<String>,
    exact_routes: HashMap<RoutePath, String>,
    consumers: HashMap<String, String>,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
            aliases: Vec::new(),
            strip_prefix: None,
            names: HashSet::new(),
            exact_routes: HashMap::new(),
            consumers: HashMap::new(),
        }
    }

    /// Register one service. Descriptors are validated here, at
    /// registration time: route patterns must parse, exact routes must not
    /// collide with any previously registered exact route, binding names
    /// must be non-empty, and a queue can gain at most one consumer.
    pub fn register(
        &mut self,
        descriptor: ServiceDescriptor,
        handler: Arc<dyn ServiceHandler>,
    ) -> Result<&mut Self, ConfigError> {
        if !self.names.insert(descriptor.name.clone()) {
            return Err(ConfigError::DuplicateService(descriptor.name));
        }
        for pattern in &descriptor.routes {
            if let RoutePattern::Exact(path) = RoutePattern::parse(pattern)? {
                if let Some(existing) = self.exact_routes.get(&path) {
                    return Err(ConfigError::RouteCollision {
                        route: path.to_string(),
                        existing: existing.clone(),
                    });
                }
                self.exact_routes.insert(path, descriptor.name.clone());
            }
        }
        validate_binding_names(&descriptor)?;
        if let Some(consumer) = &descriptor.queue_consumer {
            if let Some(existing) = self.consumers.get(&consumer.queue) {
                return Err(ConfigError::DuplicateConsumer {
                    queue: consumer.queue.clone(),
                    existing: existing.clone(),
                });
            }
            consumer
                .policy
                .validate()
                .map_err(|e| ConfigError::InvalidConsumerPolicy {
                    queue: consumer.queue.clone(),
                    message: e.to_string(),
                })?;
            self.consumers
                .insert(consumer.queue.clone(), descriptor.name.clone());
        }
        self.services.push((descriptor, handler));
        Ok(self)
    }

    /// Declare an alternate path served by the same route as `canonical`.
    pub fn page_alias(&mut self, alias: &str, canonical: &str) -> Result<&mut Self, ConfigError> {
        let parse = |pattern: &str| {
            RoutePath::parse(pattern).map_err(|e| ConfigError::InvalidRoutePattern {
                pattern: pattern.to_string(),
                message: e.to_string(),
            })
        };
        self.aliases.push((parse(alias)?, parse(canonical)?));
        Ok(self)
    }

    /// Strip a harness-wide prefix from inbound paths before matching.
    pub fn strip_prefix(&mut self, prefix: &str) -> Result<&mut Self, ConfigError> {
        self.strip_prefix =
            Some(
                RoutePath::parse(prefix).map_err(|e| ConfigError::InvalidRoutePattern {
                    pattern: prefix.to_string(),
                    message: e.to_string(),
                })?,
            );
        Ok(self)
    }

    /// Assemble the harness: construct the shared stores, build each
    /// service's binding context, assemble the route table, and start the
    /// delivery loop for every declared queue consumer.
    pub fn build(self) -> Result<Harness, ConfigError> {
        let buckets = Arc::new(BucketStore::new());
        let objects = Arc::new(DurableObjectRegistry::new());
        let queues = Arc::new(QueueRuntime::new());

        let mut router = Router::new();
        if let Some(prefix) = self.strip_prefix {
            router.set_strip_prefix(prefix);
        }
        for (alias, canonical) in self.aliases {
            router.add_alias(alias, canonical);
        }

        let mut instances = Vec::with_capacity(self.services.len());
        for (descriptor, handler) in self.services {
            for pattern in &descriptor.routes {
                match RoutePattern::parse(pattern)? {
                    RoutePattern::Exact(path) => router.add_exact(path, &descriptor.name)?,
                    RoutePattern::Wildcard(prefix) => {
                        router.add_wildcard(prefix, &descriptor.name)
                    }
                }
            }
            let env = Env::new(&descriptor, &buckets, &objects, &queues);
            info!(service = %descriptor.name, routes = descriptor.routes.len(), "service registered");
            instances.push(Arc::new(ServiceInstance {
                descriptor,
                handler,
                env,
            }));
        }

        for instance in &instances {
            if let Some(consumer) = &instance.descriptor.queue_consumer {
                let adapter = Arc::new(ConsumerAdapter {
                    instance: Arc::clone(instance),
                });
                queues
                    .bind_consumer(
                        &consumer.queue,
                        instance.name(),
                        adapter,
                        consumer.policy.clone(),
                    )
                    .map_err(|e| ConfigError::InvalidConsumerPolicy {
                        queue: consumer.queue.clone(),
                        message: e.to_string(),
                    })?;
            }
        }

        Ok(Harness {
            router,
            registry: ServiceRegistry::new(instances),
            buckets,
            objects,
            queues,
        })
    }
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_binding_names(descriptor: &ServiceDescriptor) -> Result<(), ConfigError> {
    let empty = |kind: &'static str| ConfigError::EmptyBindingName {
        service: descriptor.name.clone(),
        kind,
    };
    for (local, queue) in &descriptor.queue_producers {
        if local.is_empty() || queue.is_empty() {
            return Err(empty("queue producer"));
        }
    }
    if let Some(consumer) = &descriptor.queue_consumer {
        if consumer.queue.is_empty() {
            return Err(empty("queue consumer"));
        }
    }
    for (local, namespace) in &descriptor.durable_objects {
        if local.is_empty() || namespace.is_empty() {
            return Err(empty("durable object namespace"));
        }
    }
    for (local, bucket) in &descriptor.buckets {
        if local.is_empty() || bucket.is_empty() {
            return Err(empty("bucket"));
        }
    }
    Ok(())
}

/// Bridges a delivered batch to the consumer service's queue entry point.
struct ConsumerAdapter {
    instance: Arc<ServiceInstance>,
}

#[async_trait]
impl QueueConsumer for ConsumerAdapter {
    async fn deliver(&self, batch: MessageBatch) -> Result<(), DeliveryError> {
        self.instance
            .handler
            .queue(batch, &self.instance.env)
            .await
            .map_err(|e| DeliveryError::new(e.to_string()))
    }
}

/// The assembled harness: route table, service registry, and the shared
/// emulated stores.
pub struct Harness {
    router: Router,
    registry: ServiceRegistry,
    buckets: Arc<BucketStore>,
    objects: Arc<DurableObjectRegistry>,
    queues: Arc<QueueRuntime>,
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder::new()
    }

    /// Route a request to its service and run the handler.
    ///
    /// Unmatched and malformed requests get structured error bodies; a
    /// failing handler becomes a structured 500 and is logged, never a
    /// crash.
    pub async fn dispatch(&self, mut request: Request) -> Response {
        match self.router.resolve(&request.method, &request.path) {
            Resolution::Malformed => Response::error(400, "malformed path"),
            Resolution::NotFound => {
                debug!(path = %request.path, "no route");
                Response::not_found()
            }
            Resolution::Matched { service, suffix } => {
                let Some(instance) = self.registry.get(&service) else {
                    // The router only emits names the registry produced.
                    return Response::error(500, "internal error");
                };
                request.suffix = suffix;
                debug!(service = %service, path = %request.path, "request dispatched");
                match instance.handler.fetch(request, &instance.env).await {
                    Ok(response) => response,
                    Err(e) => {
                        error!(service = %service, error = %e, "handler failed");
                        Response::error(500, "internal error")
                    }
                }
            }
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    pub fn buckets(&self) -> &Arc<BucketStore> {
        &self.buckets
    }

    pub fn objects(&self) -> &Arc<DurableObjectRegistry> {
        &self.objects
    }

    pub fn queues(&self) -> &Arc<QueueRuntime> {
        &self.queues
    }
}
