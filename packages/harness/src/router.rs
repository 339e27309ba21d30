//! Route resolution: from an inbound path to exactly one service.
//!
//! The route table is assembled once from the service registry. Resolution
//! is pure: exact matches are checked across all services first, then
//! wildcard routes in service-registration order, first match wins. The
//! router returns a tri-state result and assumes nothing about response
//! shapes; translating a miss into a 404-class outcome is the edge's job.

use std::collections::HashMap;

use hangar_core::{ConfigError, Method, RoutePath};

/// Outcome of resolving a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The path belongs to a service. `suffix` is the remainder captured by
    /// a wildcard route (empty for exact matches).
    Matched { service: String, suffix: RoutePath },
    /// No route matched.
    NotFound,
    /// The path could not be normalized (bad percent-escape, traversal).
    Malformed,
}

/// The assembled route table.
pub struct Router {
    exact: HashMap<RoutePath, String>,
    wildcards: Vec<(RoutePath, String)>,
    aliases: HashMap<RoutePath, RoutePath>,
    strip_prefix: Option<RoutePath>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            exact: HashMap::new(),
            wildcards: Vec::new(),
            aliases: HashMap::new(),
            strip_prefix: None,
        }
    }

    /// Configure a harness-wide prefix stripped from inbound paths before
    /// matching (e.g. when the whole logical group sits under `/backoffice`).
    pub fn set_strip_prefix(&mut self, prefix: RoutePath) {
        self.strip_prefix = Some(prefix);
    }

    /// Declare an alternate path that serves the same route as `canonical`.
    pub fn add_alias(&mut self, alias: RoutePath, canonical: RoutePath) {
        self.aliases.insert(alias, canonical);
    }

    /// Register an exact route. Collides with any previously registered
    /// exact route for the same path.
    pub fn add_exact(&mut self, path: RoutePath, service: &str) -> Result<(), ConfigError> {
        if let Some(existing) = self.exact.get(&path) {
            return Err(ConfigError::RouteCollision {
                route: path.to_string(),
                existing: existing.clone(),
            });
        }
        self.exact.insert(path, service.to_string());
        Ok(())
    }

    /// Register a wildcard route. Tried after exact routes, in registration
    /// order.
    pub fn add_wildcard(&mut self, prefix: RoutePath, service: &str) {
        self.wildcards.push((prefix, service.to_string()));
    }

    /// Resolve a path to a service.
    ///
    /// Matching is path-based; the method travels with the request for the
    /// handler to branch on. Resolution has no side effects.
    pub fn resolve(&self, method: &Method, path: &str) -> Resolution {
        let _ = method;
        let mut path = match RoutePath::parse(path) {
            Ok(path) => path,
            Err(_) => return Resolution::Malformed,
        };
        if let Some(prefix) = &self.strip_prefix {
            if let Some(stripped) = path.strip_prefix(prefix) {
                path = stripped;
            }
        }
        if let Some(canonical) = self.aliases.get(&path) {
            path = canonical.clone();
        }
        if let Some(service) = self.exact.get(&path) {
            return Resolution::Matched {
                service: service.clone(),
                suffix: RoutePath::root(),
            };
        }
        for (prefix, service) in &self.wildcards {
            if let Some(suffix) = path.strip_prefix(prefix) {
                return Resolution::Matched {
                    service: service.clone(),
                    suffix,
                };
            }
        }
        Resolution::NotFound
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}
