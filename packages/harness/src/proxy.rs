//! Generic bucket proxy for ad-hoc inspection of the bucket store.
//!
//! Registered like any other service, with a wildcard route such as
//! `/buckets/*`. The captured suffix is `<logicalName>/<resource...>`: the
//! logical name resolves through the proxy service's own bucket bindings
//! (the binding table is the naming convention), and the rest of the path
//! joins into the resource key.

use async_trait::async_trait;
use serde_json::json;

use hangar_core::{Request, Response};

use crate::{Env, HandlerError, ServiceHandler};

/// Serves `GET /buckets/<logicalName>/<resource...>`.
///
/// A hit returns `{"value": <object>}`; a missing object, an unknown
/// logical name, or a path without a resource all return the structured
/// not-found body, never a transport-level error.
pub struct BucketProxy;

impl BucketProxy {
    pub fn new() -> Self {
        Self
    }
}

impl Default for BucketProxy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceHandler for BucketProxy {
    async fn fetch(&self, request: Request, env: &Env) -> Result<Response, HandlerError> {
        let Some((logical, resource_segments)) = request.suffix.segments.split_first() else {
            return Ok(Response::not_found());
        };
        if resource_segments.is_empty() {
            return Ok(Response::not_found());
        }
        let resource = resource_segments.join("/");
        let Ok(bucket) = env.bucket(logical) else {
            return Ok(Response::not_found());
        };
        match bucket.get(&resource) {
            Some(value) => Ok(Response::json(200, json!({ "value": value }))),
            None => Ok(Response::not_found()),
        }
    }
}
