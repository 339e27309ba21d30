//! The startup configuration error taxonomy.
//!
//! Configuration problems are detected while the service table is being
//! registered and are fatal: the harness must refuse to start serving.

use thiserror::Error;

/// Errors in the declarative service configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Two services declared the same exact route.
    #[error("route '{route}' is already registered by service '{existing}'")]
    RouteCollision { route: String, existing: String },

    /// A service name was registered twice.
    #[error("service '{0}' is already registered")]
    DuplicateService(String),

    /// Two services declared themselves consumer of the same queue.
    #[error("queue '{queue}' already has consumer '{existing}'")]
    DuplicateConsumer { queue: String, existing: String },

    /// A binding name (queue, bucket, or durable-object namespace) was empty.
    #[error("service '{service}' declares an empty {kind} binding name")]
    EmptyBindingName {
        service: String,
        kind: &'static str,
    },

    /// A route pattern could not be parsed.
    #[error("invalid route pattern '{pattern}': {message}")]
    InvalidRoutePattern { pattern: String, message: String },

    /// A queue consumer policy was rejected.
    #[error("invalid consumer policy for queue '{queue}': {message}")]
    InvalidConsumerPolicy { queue: String, message: String },
}
