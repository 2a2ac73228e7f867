//! HTTP client setup and middleware configuration.
//!
//! Every request obsup makes (GitHub API, forum pages, archive transfers)
//! goes through a [`ClientWithMiddleware`] built here:
//!
//! - **Tracing**: requests are traced by `reqwest-tracing`
//! - **Retry Logic**: exponential backoff for transient failures, when asked
//! - **Timeouts**: a bounded connect timeout so no request hangs forever
//! - **Custom Headers**: default headers applied to all requests
//!
//! The transfer client used by the downloader is built with `retries: 0`
//! because the downloader runs its own fixed-delay retry loop that can resume
//! a half-written file.
//!
//! # Examples
//!
//! ```rust
//! use obsup::http::{create_http_client, HttpClientConfig};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = create_http_client(HttpClientConfig::default())?;
//! # Ok(())
//! # }
//! ```

use reqwest::{header::HeaderMap, Proxy};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use reqwest_tracing::TracingMiddleware;
use std::time::Duration;

/// User agent sent with every request.
pub const USER_AGENT: &str = concat!("obsup/", env!("CARGO_PKG_VERSION"));

/// Configuration for HTTP client setup.
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Number of middleware retries for transient failures. `0` disables the
    /// retry middleware entirely.
    pub retries: u32,
    /// Optional proxy configuration.
    pub proxy: Option<Proxy>,
    /// Default headers to include with all requests.
    pub headers: Option<HeaderMap>,
    /// Upper bound for establishing a connection.
    pub connect_timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            retries: 3,
            proxy: None,
            headers: None,
            connect_timeout: Duration::from_secs(30),
        }
    }
}

/// Creates an HTTP client with middleware configuration.
///
/// # Example
///
/// ```rust
/// use obsup::http::client::{create_http_client, HttpClientConfig};
///
/// let config = HttpClientConfig { retries: 0, ..Default::default() };
/// let client = create_http_client(config).unwrap();
/// ```
pub fn create_http_client(
    config: HttpClientConfig,
) -> Result<ClientWithMiddleware, reqwest::Error> {
    let mut inner_client_builder = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(config.connect_timeout);

    if let Some(proxy) = config.proxy {
        inner_client_builder = inner_client_builder.proxy(proxy);
    }

    if let Some(headers) = config.headers {
        inner_client_builder = inner_client_builder.default_headers(headers);
    }

    let inner_client = inner_client_builder.build()?;

    let mut builder = ClientBuilder::new(inner_client)
        // Trace HTTP requests. See the tracing crate to make use of these traces.
        .with(TracingMiddleware::default());

    if config.retries > 0 {
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.retries);
        builder = builder.with(RetryTransientMiddleware::new_with_policy(retry_policy));
    }

    Ok(builder.build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderValue, ACCEPT};

    #[test]
    fn test_default_config() {
        let config = HttpClientConfig::default();
        assert_eq!(config.retries, 3);
        assert!(config.proxy.is_none());
        assert!(config.headers.is_none());
        assert_eq!(config.connect_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_create_http_client_without_retries() {
        let config = HttpClientConfig {
            retries: 0,
            ..Default::default()
        };
        assert!(create_http_client(config).is_ok());
    }

    #[test]
    fn test_create_http_client_with_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let config = HttpClientConfig {
            retries: 5,
            headers: Some(headers),
            ..Default::default()
        };

        assert!(create_http_client(config).is_ok());
    }

    #[test]
    fn test_user_agent_carries_crate_version() {
        assert!(USER_AGENT.starts_with("obsup/"));
    }
}
