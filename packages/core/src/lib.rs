//! Core types for the hangar emulation harness.
//!
//! This layer defines what the rest of the workspace talks in:
//! - `RoutePath`: normalized, percent-decoded request path
//! - `Request` / `Response`: what flows between the HTTP edge and handlers
//! - `ConfigError`: the fatal startup configuration taxonomy
//!
//! # Example
//!
//! ```rust
//! use hangar_core::{route_path, RoutePath};
//!
//! let path = route_path!("/buckets/scheduling/dashboard");
//! assert!(path.has_prefix(&route_path!("/buckets")));
//! ```

mod error;
mod http;
mod path;

pub use error::ConfigError;
pub use http::{Method, Request, Response};
pub use path::{PathError, RoutePath};
