//! Error types for the harness layer.

use thiserror::Error;

use hangar_queue::QueueError;

/// A service asked its environment for a resource it never declared.
#[derive(Debug, Error)]
pub enum EnvError {
    #[error("no {kind} binding named '{name}'")]
    UnknownBinding { kind: &'static str, name: String },
}

/// Failure inside a service handler.
///
/// The harness translates this into a server-error-class response; it never
/// crashes the process.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler touched an undeclared binding.
    #[error("binding error: {0}")]
    Env(#[from] EnvError),

    /// A queue operation failed.
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    /// Anything else the handler wants to report.
    #[error("{0}")]
    Other(String),
}

impl HandlerError {
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

/// Errors from the HTTP edge.
#[derive(Debug, Error)]
pub enum EdgeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
