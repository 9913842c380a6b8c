//! Remote transport
//!
//! The orchestrator talks to the remote API through the [`Transport`] trait. The
//! production implementation, [`HttpTransport`], wraps a `reqwest` client with a
//! fixed timeout and JSON headers.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_TYPE};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

use crate::endpoints::Method;
use crate::error::{SetupError, TransportError};

/// Performs a single remote call
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends `method` to `path` (relative to the base URL, query included)
    ///
    /// `body` is only passed for verbs that carry one.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError>;
}

/// Joins a base URL and a relative path with exactly one slash between them
pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// reqwest-backed transport for JSON APIs
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    /// Creates a transport for `base_url` with a per-request `timeout`
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SetupError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;

        Ok(Self::with_client(client, base_url))
    }

    /// Creates a transport around an existing HTTP client
    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Value, TransportError> {
        let url = join_url(&self.base_url, path);

        let builder = match method {
            Method::Get => self.client.get(&url),
            Method::Delete => self.client.delete(&url),
            Method::Post => self.client.post(&url),
            Method::Put => self.client.put(&url),
        };
        let builder = match body {
            Some(body) if method.sends_body() => builder.json(body),
            _ => builder,
        };

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                url,
            });
        }

        // Non-JSON bodies are passed through as a string
        let text = response.text().await?;
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url_inserts_single_slash() {
        assert_eq!(join_url("http://localhost:3001/", "cars/"), "http://localhost:3001/cars/");
        assert_eq!(join_url("http://localhost:3001", "cars/"), "http://localhost:3001/cars/");
        assert_eq!(join_url("http://localhost:3001/", "/cars/"), "http://localhost:3001/cars/");
    }

    #[test]
    fn test_join_url_keeps_query() {
        assert_eq!(
            join_url("https://api.example.com/api/", "cars/?start=2008&end=2010"),
            "https://api.example.com/api/cars/?start=2008&end=2010"
        );
    }

    #[test]
    fn test_http_transport_construction() {
        let transport = HttpTransport::new("http://localhost:3001/", Duration::from_millis(25_000))
            .expect("client should build");
        assert_eq!(transport.base_url(), "http://localhost:3001/");
    }
}
