//! HTTP transport to the generation endpoint
//!
//! The engine only needs "POST this JSON, give me status and body", so it
//! talks to a [`GenerationTransport`]. [`HttpTransport`] is the `reqwest`
//! implementation used natively and in the browser; tests plug in fakes.

use std::future::Future;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, trace};

use crate::core::{EditorError, EngineConfig};

/// Raw reply from the endpoint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// POST a generation request
///
/// No `Send` bound on the future: the browser build runs on a single-threaded
/// executor and its fetch futures are `!Send`.
pub trait GenerationTransport {
    fn post_generate(
        &self,
        body: Value,
    ) -> impl Future<Output = Result<TransportResponse, EditorError>>;
}

/// `reqwest`-backed transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// Build from config; `base_url` resolves a path-only endpoint
    pub fn new(config: &EngineConfig, base_url: Option<&str>) -> Result<Self, EditorError> {
        let endpoint = resolve_endpoint(&config.endpoint, base_url)?;

        #[cfg(not(target_arch = "wasm32"))]
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EditorError::config(format!("Failed to build HTTP client: {}", e)))?;
        #[cfg(target_arch = "wasm32")]
        let client = reqwest::Client::new();

        debug!(endpoint = %endpoint, "HTTP transport ready");
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl GenerationTransport for HttpTransport {
    async fn post_generate(&self, body: Value) -> Result<TransportResponse, EditorError> {
        trace!(endpoint = %self.endpoint, "POST generation request");
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(classify_reqwest_error)?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(classify_reqwest_error)?;
        Ok(TransportResponse { status, body })
    }
}

/// Turn a `reqwest` failure into a transport error with a network flag
fn classify_reqwest_error(error: reqwest::Error) -> EditorError {
    if error.is_timeout() {
        return EditorError::transport(format!("request timed out: {}", error), true);
    }
    #[cfg(not(target_arch = "wasm32"))]
    if error.is_connect() {
        return EditorError::transport(format!("connection failed: {}", error), true);
    }
    if let Some(status) = error.status() {
        return EditorError::http_status(status.as_u16());
    }
    let is_network = error.is_request() || error.is_body();
    EditorError::transport(error.to_string(), is_network)
}

/// Join a path-only endpoint onto `base_url`; absolute endpoints pass through
pub fn resolve_endpoint(endpoint: &str, base_url: Option<&str>) -> Result<String, EditorError> {
    let endpoint = endpoint.trim();
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        return Ok(endpoint.to_string());
    }
    match base_url.map(str::trim).filter(|b| !b.is_empty()) {
        Some(base) => Ok(format!(
            "{}/{}",
            base.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )),
        None => Err(EditorError::config(format!(
            "Endpoint '{}' is not an absolute URL and no base URL was given",
            endpoint
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_absolute_endpoint() {
        let url =
            resolve_endpoint("https://example.org/api/generate_graph", Some("http://x")).unwrap();
        assert_eq!(url, "https://example.org/api/generate_graph");
    }

    #[test]
    fn test_resolve_relative_endpoint() {
        let url = resolve_endpoint("/api/generate_graph", Some("http://localhost:9527/")).unwrap();
        assert_eq!(url, "http://localhost:9527/api/generate_graph");
    }

    #[test]
    fn test_relative_without_base_is_config_error() {
        let err = resolve_endpoint("/api/generate_graph", None).unwrap_err();
        assert!(matches!(err, EditorError::Config { .. }));
    }

    #[test]
    fn test_transport_from_default_config_needs_base() {
        assert!(HttpTransport::new(&EngineConfig::default(), None).is_err());
        let transport =
            HttpTransport::new(&EngineConfig::default(), Some("http://127.0.0.1:9527")).unwrap();
        assert_eq!(transport.endpoint(), "http://127.0.0.1:9527/api/generate_graph");
    }

    #[test]
    fn test_response_status_range() {
        assert!(TransportResponse::new(204, "").is_success());
        assert!(!TransportResponse::new(302, "").is_success());
    }
}
