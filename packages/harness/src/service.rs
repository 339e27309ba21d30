//! The service handler seam.
//!
//! The harness does not define how a service computes its response; it only
//! defines how requests and queue batches reach it. A handler is the opaque
//! unit of business logic behind that seam.

use async_trait::async_trait;

use hangar_core::{Request, Response};
use hangar_queue::MessageBatch;

use crate::{Env, HandlerError};

/// One logical service's entry points.
///
/// `fetch` runs for every routed request. `queue` runs when the service is
/// bound as a queue consumer and a batch is delivered; services without a
/// consumer binding never see it.
///
/// # Object Safety
///
/// This trait is object-safe: the harness stores `Arc<dyn ServiceHandler>`.
#[async_trait]
pub trait ServiceHandler: Send + Sync {
    /// Handle a routed request with the service's own bindings.
    async fn fetch(&self, request: Request, env: &Env) -> Result<Response, HandlerError>;

    /// Handle a delivered queue batch.
    ///
    /// `Ok(())` acknowledges the whole batch. An error rejects it and sends
    /// every message through the retry/dead-letter policy.
    async fn queue(&self, batch: MessageBatch, env: &Env) -> Result<(), HandlerError> {
        let _ = (batch, env);
        Err(HandlerError::msg("service does not handle queue batches"))
    }
}
