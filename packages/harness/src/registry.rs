//! The built service registry: name → service instance, in registration
//! order.
//!
//! The registry is process-wide state initialized once by the harness
//! builder and never mutated afterwards. Validation happens earlier, while
//! descriptors are being registered.

use std::collections::HashMap;
use std::sync::Arc;

use crate::{Env, ServiceDescriptor, ServiceHandler};

/// One constructed service: its descriptor, its handler, and the binding
/// context scoped to its declared resources.
pub struct ServiceInstance {
    pub descriptor: ServiceDescriptor,
    pub handler: Arc<dyn ServiceHandler>,
    pub env: Env,
}

impl ServiceInstance {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }
}

/// Immutable mapping of service name → instance.
pub struct ServiceRegistry {
    order: Vec<String>,
    services: HashMap<String, Arc<ServiceInstance>>,
}

impl ServiceRegistry {
    pub(crate) fn new(instances: Vec<Arc<ServiceInstance>>) -> Self {
        let order = instances.iter().map(|i| i.name().to_string()).collect();
        let services = instances
            .into_iter()
            .map(|i| (i.name().to_string(), i))
            .collect();
        Self { order, services }
    }

    /// Look up a service by name.
    pub fn get(&self, name: &str) -> Option<&Arc<ServiceInstance>> {
        self.services.get(name)
    }

    /// Iterate services in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<ServiceInstance>> {
        self.order.iter().filter_map(|name| self.services.get(name))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
