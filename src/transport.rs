//! HTTP transport layer: endpoint/credential state and raw request execution

use crate::errors::{ApiError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, Url};
use std::time::Duration;
use tracing::debug;

/// Header carrying the shared-secret credential
pub const TOKEN_HEADER: &str = "X-Token";

/// Base endpoint and credential used for every request.
///
/// Both values are always replaced together; an unset endpoint makes every
/// request fail with [`ApiError::InvalidEndpoint`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransportConfig {
    endpoint: Option<Url>,
    credential: String,
}

impl TransportConfig {
    /// Build a configuration, or `None` if `endpoint` is not a usable absolute URL
    pub fn parse(endpoint: &str, credential: &str) -> Option<Self> {
        parse_endpoint(endpoint).map(|url| Self {
            endpoint: Some(url),
            credential: credential.to_string(),
        })
    }

    pub fn endpoint(&self) -> Option<&Url> {
        self.endpoint.as_ref()
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some() && !self.credential.is_empty()
    }

    /// Append `path` to the endpoint's own path.
    pub fn resolve(&self, path: &str) -> Result<Url> {
        let mut url = self.endpoint.clone().ok_or(ApiError::InvalidEndpoint)?;
        url.set_fragment(None);

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| ApiError::InvalidEndpoint)?;
            segments.pop_if_empty();
            segments.extend(path.split('/').filter(|segment| !segment.is_empty()));
        }

        Ok(url)
    }
}

/// Parse an endpoint string into a base URL that can carry a path
pub fn parse_endpoint(endpoint: &str) -> Option<Url> {
    Url::parse(endpoint)
        .ok()
        .filter(|url| !url.cannot_be_a_base() && url.has_host())
}

/// Options applied when building the underlying HTTP client
#[derive(Debug, Clone)]
pub struct TransportOptions {
    /// Optional per-request timeout. `None` leaves reqwest's defaults in place.
    pub request_timeout: Option<Duration>,
    pub user_agent: String,
}

impl Default for TransportOptions {
    fn default() -> Self {
        Self {
            request_timeout: None,
            user_agent: format!("court_monitor_client/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// A single request ready to be sent
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub url: Url,
    pub credential: Option<String>,
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            credential: None,
            body: None,
        }
    }

    pub fn with_credential(mut self, credential: &str) -> Self {
        self.credential = Some(credential.to_string());
        self
    }

    pub fn with_json_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

/// HTTP transport for monitor API requests
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a new HTTP transport
    pub fn new(options: &TransportOptions) -> Result<Self> {
        let mut builder = Client::builder().user_agent(options.user_agent.clone());

        if let Some(timeout) = options.request_timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(ApiError::from)?;

        Ok(Self { client })
    }

    /// Send a request and return the body of a 2xx response
    pub async fn execute(&self, request: ApiRequest) -> Result<Vec<u8>> {
        debug!("{} {}", request.method, request.url);

        let mut builder = self
            .client
            .request(request.method.clone(), request.url.clone())
            .header(CONTENT_TYPE, "application/json");

        if let Some(credential) = &request.credential {
            builder = builder.header(TOKEN_HEADER, credential.as_str());
        }

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(ApiError::from)?;
        let status = response.status().as_u16();

        if let Some(err) = ApiError::from_status(status) {
            debug!("{} {} rejected with status {}", request.method, request.url, status);
            return Err(err);
        }

        let body = response.bytes().await.map_err(ApiError::from)?;

        Ok(body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unset_config_resolves_to_invalid_endpoint() {
        let config = TransportConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.resolve("api/status"), Err(ApiError::InvalidEndpoint));
    }

    #[test]
    fn test_parse_rejects_relative_and_opaque_urls() {
        assert!(TransportConfig::parse("not a url", "secret").is_none());
        assert!(TransportConfig::parse("/relative/path", "secret").is_none());
        assert!(TransportConfig::parse("mailto:someone@example.com", "secret").is_none());
        assert!(TransportConfig::parse("localhost:8000", "secret").is_none());
        assert!(TransportConfig::parse("", "secret").is_none());
    }

    #[test]
    fn test_configured_requires_credential() {
        let config = TransportConfig::parse("http://192.168.1.100:8000", "").unwrap();
        assert!(config.endpoint().is_some());
        assert!(!config.is_configured());

        let config = TransportConfig::parse("http://192.168.1.100:8000", "secret").unwrap();
        assert!(config.is_configured());
        assert_eq!(config.credential(), "secret");
    }

    #[test]
    fn test_resolve_appends_to_base_path() {
        let config = TransportConfig::parse("http://host:8000", "k").unwrap();
        assert_eq!(
            config.resolve("/api/status").unwrap().as_str(),
            "http://host:8000/api/status"
        );

        let config = TransportConfig::parse("http://host:8000/monitor/", "k").unwrap();
        assert_eq!(
            config.resolve("/api/monitor/logs").unwrap().as_str(),
            "http://host:8000/monitor/api/monitor/logs"
        );

        let config = TransportConfig::parse("https://host/monitor", "k").unwrap();
        assert_eq!(config.resolve("health").unwrap().as_str(), "https://host/monitor/health");
    }

    #[test]
    fn test_transport_creation() {
        let transport = HttpTransport::new(&TransportOptions {
            request_timeout: Some(Duration::from_secs(5)),
            ..TransportOptions::default()
        });
        assert!(transport.is_ok());
    }
}
