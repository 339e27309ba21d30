//! Request and response types carried between the HTTP edge and service
//! handlers.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::RoutePath;

/// HTTP method for requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    #[default]
    GET,
    POST,
    PUT,
    DELETE,
    PATCH,
    HEAD,
    OPTIONS,
}

impl From<Method> for http::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::GET => http::Method::GET,
            Method::POST => http::Method::POST,
            Method::PUT => http::Method::PUT,
            Method::DELETE => http::Method::DELETE,
            Method::PATCH => http::Method::PATCH,
            Method::HEAD => http::Method::HEAD,
            Method::OPTIONS => http::Method::OPTIONS,
        }
    }
}

impl From<http::Method> for Method {
    fn from(method: http::Method) -> Self {
        match method {
            http::Method::POST => Method::POST,
            http::Method::PUT => Method::PUT,
            http::Method::DELETE => Method::DELETE,
            http::Method::PATCH => Method::PATCH,
            http::Method::HEAD => Method::HEAD,
            http::Method::OPTIONS => Method::OPTIONS,
            _ => Method::GET,
        }
    }
}

/// An inbound request as seen by a service handler.
///
/// The harness resolves `path` against the route table before invoking the
/// handler; `suffix` carries the remainder captured by a wildcard route
/// (empty for exact matches).
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// HTTP method.
    pub method: Method,

    /// Raw request path, as received (not percent-decoded).
    pub path: String,

    /// Request headers.
    pub headers: HashMap<String, String>,

    /// Request body. Non-JSON bodies arrive as a JSON string value.
    pub body: Option<serde_json::Value>,

    /// Path remainder captured by the matched wildcard route.
    pub suffix: RoutePath,
}

impl Request {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self {
            method: Method::PUT,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::DELETE,
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_json_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }
}

/// A response produced by a service handler.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status: u16,

    /// Response headers.
    pub headers: HashMap<String, String>,

    /// Structured response body, serialized as JSON at the edge.
    pub body: serde_json::Value,

    /// Raw body override. When set, the edge sends this text verbatim
    /// instead of serializing `body`.
    pub body_text: Option<String>,
}

impl Response {
    /// A JSON response with the given status.
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body,
            body_text: None,
        }
    }

    /// A plain text response with the given status and content type.
    pub fn text(status: u16, content_type: impl Into<String>, body: impl Into<String>) -> Self {
        let mut headers = HashMap::new();
        headers.insert("content-type".to_string(), content_type.into());
        Self {
            status,
            headers,
            body: serde_json::Value::Null,
            body_text: Some(body.into()),
        }
    }

    /// A structured error body: `{"error": <message>}` with the given status.
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, serde_json::json!({ "error": message }))
    }

    /// The structured not-found outcome.
    pub fn not_found() -> Self {
        Self::error(404, "not found")
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Check if the status indicates success (2xx).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn method_conversion_roundtrip() {
        for method in [
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
            Method::HEAD,
            Method::OPTIONS,
        ] {
            let converted: http::Method = method.clone().into();
            assert_eq!(Method::from(converted), method);
        }
    }

    #[test]
    fn request_builders() {
        let req = Request::post("/flights")
            .with_json_body(json!({"flight": "LZ-127"}))
            .with_header("x-api-key", "1234");
        assert_eq!(req.method, Method::POST);
        assert_eq!(req.path, "/flights");
        assert_eq!(req.headers.get("x-api-key").unwrap(), "1234");
        assert!(req.body.is_some());
    }

    #[test]
    fn error_body_shape() {
        let resp = Response::not_found();
        assert_eq!(resp.status, 404);
        assert_eq!(resp.body, json!({"error": "not found"}));
    }

    #[test]
    fn text_response_sets_content_type() {
        let resp = Response::text(200, "text/html", "<h1>hi</h1>");
        assert_eq!(resp.headers.get("content-type").unwrap(), "text/html");
        assert_eq!(resp.body_text.as_deref(), Some("<h1>hi</h1>"));
    }

    #[test]
    fn is_success() {
        assert!(Response::json(204, serde_json::Value::Null).is_success());
        assert!(!Response::not_found().is_success());
    }
}
