//! HTTP fetch pipeline for the worker's network side.
//!
//! ### Semantics
//! - Only transport failures are errors; any HTTP status is a response
//! - Max redirects: 5
//! - Max body bytes: 5MB (configurable)
//! - Request timeout: 20s (configurable)

use async_trait::async_trait;
use reqwest::{Client, Method, header};
use std::time::{Duration, Instant};

use folio_core::{Error, Request, Response};

/// Network access as seen by fetch strategies.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Perform a live network fetch.
    ///
    /// `Err` means no response arrived at all. Error statuses come back as
    /// an `Ok` response.
    async fn fetch(&self, request: &Request) -> Result<Response, Error>;
}

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "folio-sw/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "folio-sw/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn from_app(config: &folio_core::AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            timeout: config.timeout(),
            ..Self::default()
        }
    }
}

/// reqwest-backed [`Fetcher`].
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn transport_error(url: &str, err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url}: {err}"))
    } else {
        Error::Network(format!("{url}: {err}"))
    }
}

#[async_trait]
impl Fetcher for FetchClient {
    async fn fetch(&self, request: &Request) -> Result<Response, Error> {
        let start = Instant::now();
        let url = request.url.as_str();
        let method = Method::from_bytes(request.method.as_bytes())
            .map_err(|e| Error::InvalidInput(format!("invalid method {}: {e}", request.method)))?;

        let response = self
            .http
            .request(method, request.url.clone())
            .send()
            .await
            .map_err(|e| transport_error(url, &e))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect::<Vec<_>>();

        let body = response.bytes().await.map_err(|e| transport_error(url, &e))?;

        if body.len() > self.config.max_bytes {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", body.len(), self.config.max_bytes)));
        }

        let response = Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or("").to_string(),
            headers,
            body,
        };

        tracing::debug!(
            url,
            status = response.status,
            bytes = response.body.len(),
            content_type = content_type(&response),
            fetch_ms = start.elapsed().as_millis() as u64,
            "network fetch"
        );

        Ok(response)
    }
}

/// Content-Type of a fetched response, for logging.
pub fn content_type(response: &Response) -> Option<&str> {
    response.header(header::CONTENT_TYPE.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::AppConfig;

    #[test]
    fn test_fetch_config_default() {
        let config = FetchConfig::default();
        assert_eq!(config.user_agent, "folio-sw/0.1");
        assert_eq!(config.max_bytes, 5 * 1024 * 1024);
        assert_eq!(config.timeout, Duration::from_millis(20000));
        assert_eq!(config.max_redirects, 5);
    }

    #[test]
    fn test_fetch_config_from_app() {
        let app = AppConfig { user_agent: "folio-test".into(), timeout_ms: 500, max_bytes: 1024, ..Default::default() };
        let config = FetchConfig::from_app(&app);
        assert_eq!(config.user_agent, "folio-test");
        assert_eq!(config.timeout, Duration::from_millis(500));
        assert_eq!(config.max_bytes, 1024);
    }

    #[test]
    fn test_content_type() {
        let resp = Response::new(200, "body").with_header("Content-Type", "image/png");
        assert_eq!(content_type(&resp), Some("image/png"));
    }

    #[tokio::test]
    async fn test_fetch_client_new() {
        let client = FetchClient::new(FetchConfig { max_redirects: 2, ..Default::default() }).unwrap();
        assert_eq!(client.config().max_redirects, 2);
        assert_eq!(client.config().user_agent, "folio-sw/0.1");
    }

    #[tokio::test]
    async fn test_fetch_unreachable_is_network_error() {
        let client = FetchClient::new(FetchConfig { timeout: Duration::from_millis(500), ..Default::default() }).unwrap();
        let request = Request::get(url::Url::parse("http://127.0.0.1:9/unreachable").unwrap());
        let err = client.fetch(&request).await.unwrap_err();
        assert!(err.is_network());
    }
}
