//! Pluggable HTTP transport for remote providers
//!
//! Remote providers never talk to `reqwest` directly; they go through the
//! `HttpTransport` trait so tests can substitute scripted transports and
//! assert on exactly what would have left the device.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

/// HTTP method for a transport request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// A single outbound HTTP request.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    /// Request method
    pub method: HttpMethod,

    /// Target URL
    pub url: String,

    /// Header name/value pairs
    pub headers: Vec<(String, String)>,

    /// JSON body, if any
    pub body: Option<String>,

    /// Per-attempt timeout in milliseconds
    pub timeout_ms: u64,
}

impl HttpRequest {
    /// Build a bare GET request.
    pub fn get(url: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout_ms,
        }
    }

    /// Build a POST request with a JSON body.
    pub fn post_json(url: impl Into<String>, body: impl Into<String>, timeout_ms: u64) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: vec![("Content-Type".to_string(), "application/json".to_string())],
            body: Some(body.into()),
            timeout_ms,
        }
    }

    /// Attach a bearer token authorization header.
    pub fn with_bearer_token(mut self, token: &str) -> Self {
        self.headers
            .push(("Authorization".to_string(), format!("Bearer {}", token)));
        self
    }
}

/// A received HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,

    /// Response body
    pub body: String,
}

impl HttpResponse {
    /// 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 4xx status; never retried.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// 5xx status; retried until attempts are exhausted.
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Transport-level failures where no HTTP response was received.
#[derive(Debug, Clone, Error)]
pub enum TransportFault {
    /// The attempt exceeded its timeout
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The connection could not be established
    #[error("Connection failed: {reason}")]
    Connect { reason: String },

    /// Any other transport failure
    #[error("Transport failure: {reason}")]
    Other { reason: String },
}

/// Abstract HTTP transport: url/method/body/headers/timeout in,
/// status/body or fault out.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportFault>;
}

/// Production transport backed by a shared `reqwest` client.
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport with a pooled HTTP client.
    pub fn new() -> Self {
        Self { client: Client::new() }
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportFault> {
        let mut builder = match request.method {
            HttpMethod::Get => self.client.get(&request.url),
            HttpMethod::Post => self.client.post(&request.url),
        };

        builder = builder.timeout(Duration::from_millis(request.timeout_ms));

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let timeout_ms = request.timeout_ms;
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                TransportFault::Timeout { timeout_ms }
            } else if e.is_connect() {
                TransportFault::Connect { reason: e.to_string() }
            } else {
                TransportFault::Other { reason: e.to_string() }
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| TransportFault::Other {
            reason: format!("Failed to read response body: {}", e),
        })?;

        Ok(HttpResponse { status, body })
    }
}
