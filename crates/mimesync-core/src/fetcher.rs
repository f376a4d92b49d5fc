use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderName};
use tracing::debug;

use crate::{Error, Result};

/// Status, headers and body of one HTTP exchange.
#[derive(Debug, Clone, Default)]
pub struct TransportResponse {
    /// HTTP status code returned by the server (e.g., 200, 404)
    pub status: u16,
    /// Response headers
    pub headers: HeaderMap,
    /// Response body; empty for HEAD requests
    pub body: String,
}

impl TransportResponse {
    /// Whether the status is in the 2xx range.
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Header value as a string, if present and valid UTF-8.
    #[must_use]
    pub fn header(&self, name: &HeaderName) -> Option<String> {
        self.headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(std::string::ToString::to_string)
    }
}

/// Client used to check and download feeds.
///
/// A non-success status is not an error at this layer; callers inspect
/// [`TransportResponse::status`].
#[async_trait]
pub trait Transport: Send + Sync {
    /// Metadata-only request.
    async fn head(&self, url: &str, headers: &HeaderMap) -> Result<TransportResponse>;
    /// Full request including the body.
    async fn get(&self, url: &str, headers: &HeaderMap) -> Result<TransportResponse>;
}

/// [`Transport`] backed by `reqwest`.
///
/// Response bodies are never decompressed by the client, so validators such as
/// `ETag` always describe the bytes actually served.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with a 30 second request timeout
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Creates a transport with a custom request timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(Error::Network)?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn head(&self, url: &str, headers: &HeaderMap) -> Result<TransportResponse> {
        debug!("HEAD {}", url);
        let response = self.client.head(url).headers(headers.clone()).send().await?;

        Ok(TransportResponse {
            status: response.status().as_u16(),
            headers: response.headers().clone(),
            body: String::new(),
        })
    }

    async fn get(&self, url: &str, headers: &HeaderMap) -> Result<TransportResponse> {
        debug!("GET {}", url);
        let response = self.client.get(url).headers(headers.clone()).send().await?;
        let status = response.status().as_u16();
        let response_headers = response.headers().clone();
        let body = response.text().await?;

        debug!("Fetched {} bytes from {}", body.len(), url);

        Ok(TransportResponse {
            status,
            headers: response_headers,
            body,
        })
    }
}
