//! Transport seam between the engine and the wire.
//!
//! The engine only ever talks to [`HttpTransport`]. Production traffic goes
//! through [`ReqwestTransport`]; tests swap in [`MockTransport`].

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::{debug, warn};
use url::Url;

use crate::error::TransportError;

/// Wire verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpVerb {
    /// GET
    Get,
    /// POST
    Post,
    /// PUT
    Put,
    /// DELETE
    Delete,
}

impl HttpVerb {
    /// Canonical verb text.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl std::fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully built outgoing request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    /// Wire verb.
    pub method: HttpVerb,
    /// Target URL.
    pub url: Url,
    /// Header map. Names are matched case-insensitively on replacement.
    pub headers: HashMap<String, String>,
    /// Body bytes, when the verb carries one.
    pub body: Option<Bytes>,
    /// Per-request deadline.
    pub timeout: Option<Duration>,
}

impl TransportRequest {
    /// A bare request for `method` against `url`.
    pub fn new(method: HttpVerb, url: Url) -> Self {
        Self {
            method,
            url,
            headers: HashMap::new(),
            body: None,
            timeout: None,
        }
    }

    /// Set a header, replacing any existing value under a
    /// case-insensitively equal name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.headers
            .retain(|existing, _| !existing.eq_ignore_ascii_case(&name));
        self.headers.insert(name, value.into());
    }

    /// Builder form of [`set_header`](Self::set_header).
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Attach a body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attach a per-request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A response as it came off the wire. Status is carried as-is; the engine
/// decides what counts as success.
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response headers.
    pub headers: HashMap<String, String>,
    /// Body bytes; empty when the response had no body.
    pub body: Bytes,
}

impl TransportResponse {
    /// A bodyless response with `status`.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: Bytes::new(),
        }
    }

    /// Attach a body.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Attach a JSON body.
    pub fn with_json(mut self, value: &serde_json::Value) -> Self {
        self.body = Bytes::from(value.to_string());
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        self
    }

    /// Attach a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Whether the status falls inside [200, 300).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Abstraction over the HTTP layer.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Dispatch a request and return the raw response.
    ///
    /// Implementations report non-success statuses as `Ok`; only faults
    /// below the HTTP layer are errors.
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError>;
}

/// Production transport backed by [`reqwest`].
pub struct ReqwestTransport {
    client: reqwest::Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Build a transport whose requests default to `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Setup {
                message: e.to_string(),
            })?;
        Ok(Self { client, timeout })
    }

    fn classify(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout {
                seconds: self.timeout.as_secs(),
            }
        } else if error.is_connect() {
            TransportError::ConnectionFailed {
                message: error.to_string(),
            }
        } else if error.is_decode() || error.is_body() {
            TransportError::MalformedResponse {
                message: error.to_string(),
            }
        } else {
            TransportError::ConnectionFailed {
                message: error.to_string(),
            }
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        let method = match request.method {
            HttpVerb::Get => reqwest::Method::GET,
            HttpVerb::Post => reqwest::Method::POST,
            HttpVerb::Put => reqwest::Method::PUT,
            HttpVerb::Delete => reqwest::Method::DELETE,
        };
        debug!("Dispatching {} {}", request.method, request.url);

        let mut builder = self.client.request(method, request.url.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            warn!("Request to {} failed: {}", request.url, e);
            self.classify(e)
        })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        debug!("Response from {}: status {}", request.url, status);

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// In-memory transport for tests. Responses are served from a FIFO queue and
/// every dispatched request is recorded.
#[derive(Default)]
pub struct MockTransport {
    queue: Mutex<VecDeque<Result<TransportResponse, TransportError>>>,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    /// An empty mock. Sending with nothing queued yields a connection
    /// failure.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response.
    pub fn queue_response(&self, response: TransportResponse) {
        self.queue.lock().unwrap().push_back(Ok(response));
    }

    /// Queue a 200 response with a JSON body.
    pub fn queue_json(&self, value: &serde_json::Value) {
        self.queue_response(TransportResponse::new(200).with_json(value));
    }

    /// Queue a transport fault.
    pub fn queue_error(&self, error: TransportError) {
        self.queue.lock().unwrap().push_back(Err(error));
    }

    /// Number of requests dispatched so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// All dispatched requests, in order.
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The most recently dispatched request.
    pub fn last_request(&self) -> Option<TransportRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request);
        self.queue
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(TransportError::ConnectionFailed {
                    message: "no queued response".to_string(),
                })
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> TransportRequest {
        TransportRequest::new(HttpVerb::Get, Url::parse("https://api.example.com/a").unwrap())
    }

    #[test]
    fn set_header_replaces_case_insensitively() {
        let mut req = request();
        req.set_header("authorization", "Bearer one");
        req.set_header("Authorization", "Bearer two");
        assert_eq!(req.headers.len(), 1);
        assert_eq!(req.header("AUTHORIZATION"), Some("Bearer two"));
    }

    #[test]
    fn success_range_is_half_open() {
        assert!(TransportResponse::new(200).is_success());
        assert!(TransportResponse::new(299).is_success());
        assert!(!TransportResponse::new(300).is_success());
        assert!(!TransportResponse::new(199).is_success());
    }

    #[test]
    fn mock_serves_queue_in_order_and_records_requests() {
        let mock = MockTransport::new();
        mock.queue_response(TransportResponse::new(201));
        mock.queue_response(TransportResponse::new(202));

        let first = tokio_test::block_on(mock.send(request())).unwrap();
        let second = tokio_test::block_on(mock.send(request())).unwrap();

        assert_eq!(first.status, 201);
        assert_eq!(second.status, 202);
        assert_eq!(mock.request_count(), 2);
        assert_eq!(mock.last_request().unwrap().method, HttpVerb::Get);
    }

    #[test]
    fn mock_with_empty_queue_fails() {
        let mock = MockTransport::new();
        let result = tokio_test::block_on(mock.send(request()));
        assert!(matches!(
            result,
            Err(TransportError::ConnectionFailed { .. })
        ));
    }
}
