//! The HTTP edge: one listening endpoint funneling every inbound request
//! into the harness router.
//!
//! The edge is deliberately thin. It converts the wire request into the
//! harness request type, lets `Harness::dispatch` do the routing and
//! translation work, and converts the outcome back. Abandoned requests are
//! advisory only: side effects a handler already committed are not rolled
//! back.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::State;
use axum::response::IntoResponse;
use http::header::CONTENT_TYPE;
use http::StatusCode;
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

use hangar_core::{Request, Response, RoutePath};

use crate::{EdgeError, Harness};

/// Request bodies over this size are refused.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// A bound listening endpoint ready to serve a harness.
pub struct Edge {
    listener: TcpListener,
    harness: Arc<Harness>,
}

impl Edge {
    /// Bind the listening endpoint. Binding to port 0 picks a free port;
    /// see `local_addr`.
    pub async fn bind(addr: SocketAddr, harness: Arc<Harness>) -> Result<Self, EdgeError> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, harness })
    }

    /// The address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr, EdgeError> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until process teardown.
    pub async fn serve(self) -> Result<(), EdgeError> {
        info!(addr = %self.listener.local_addr()?, "edge listening");
        let app = axum::Router::new()
            .fallback(handle)
            .with_state(self.harness)
            .layer(TraceLayer::new_for_http());
        axum::serve(self.listener, app).await?;
        Ok(())
    }
}

async fn handle(
    State(harness): State<Arc<Harness>>,
    req: axum::extract::Request,
) -> axum::response::Response {
    let (parts, body) = req.into_parts();
    let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return into_axum(Response::error(
                StatusCode::PAYLOAD_TOO_LARGE.as_u16(),
                "body too large",
            ))
        }
    };
    let mut headers = HashMap::new();
    for (name, value) in &parts.headers {
        if let Ok(value) = value.to_str() {
            headers.insert(name.as_str().to_string(), value.to_string());
        }
    }
    let body = if bytes.is_empty() {
        None
    } else {
        // Non-JSON bodies ride along as a JSON string value.
        Some(serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        }))
    };
    let request = Request {
        method: parts.method.into(),
        path: parts.uri.path().to_string(),
        headers,
        body,
        suffix: RoutePath::root(),
    };
    into_axum(harness.dispatch(request).await)
}

fn into_axum(response: Response) -> axum::response::Response {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let (content_type, bytes) = match response.body_text {
        Some(text) => (
            response
                .headers
                .get("content-type")
                .cloned()
                .unwrap_or_else(|| "text/plain; charset=utf-8".to_string()),
            text.into_bytes(),
        ),
        None => (
            "application/json".to_string(),
            serde_json::to_vec(&response.body).unwrap_or_else(|_| b"null".to_vec()),
        ),
    };
    let mut builder = http::Response::builder()
        .status(status)
        .header(CONTENT_TYPE, content_type);
    for (name, value) in &response.headers {
        if !name.eq_ignore_ascii_case("content-type") {
            builder = builder.header(name.as_str(), value.as_str());
        }
    }
    match builder.body(Body::from(bytes)) {
        Ok(response) => response,
        // A handler set an unencodable header name or value.
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
