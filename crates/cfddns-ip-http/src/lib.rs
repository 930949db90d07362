// # HTTP IP Source
//
// This crate discovers the public IPv4 address by asking a plain-text echo
// service (ipify by default) over HTTPS.
//
// ## Architecture
//
// One GET per `current()` call. The response body is trimmed and must be a
// dotted-quad IPv4 address; anything else (IPv6, HTML error pages, empty
// bodies) is reported as an IP source error and the cycle is skipped.

use cfddns_core::traits::IpSource;
use cfddns_core::{Error, Result};

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Default IPv4 echo service
pub const DEFAULT_IP_URL: &str = "https://api.ipify.org";

/// Default HTTP timeout for discovery requests
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP-based public IPv4 source
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    /// URL to fetch the address from
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a source querying `url`
    ///
    /// # Errors
    ///
    /// Fails if the URL is not HTTP(S) or the client cannot be built.
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create a source querying `url` with a custom request timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        if !url.starts_with("https://") && !url.starts_with("http://") {
            return Err(Error::config(format!(
                "IP discovery URL must use HTTP or HTTPS scheme. Got: {}",
                url
            )));
        }
        if url.starts_with("http://") {
            tracing::warn!("IP discovery URL {} uses HTTP (not HTTPS)", url);
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { url, client })
    }

    /// Source querying [`DEFAULT_IP_URL`]
    pub fn ipify() -> Result<Self> {
        Self::new(DEFAULT_IP_URL)
    }

    /// The URL being queried
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<Ipv4Addr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::ip_source(format!("Request to {} failed: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(Error::ip_source(format!(
                "{} returned HTTP {}",
                self.url,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::ip_source(format!("Failed to read response: {}", e)))?;

        let ip = parse_ipv4(&body)?;
        tracing::debug!("{} reported {}", self.url, ip);
        Ok(ip)
    }

    fn source_name(&self) -> &'static str {
        "http"
    }
}

/// Parse an echo-service body as a public IPv4 address
pub fn parse_ipv4(body: &str) -> Result<Ipv4Addr> {
    let text = body.trim();
    match text.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => Ok(ip),
        Ok(IpAddr::V6(ip)) => Err(Error::ip_source(format!("Expected IPv4, got: {}", ip))),
        Err(_) => {
            let shown: String = text.chars().take(64).collect();
            Err(Error::ip_source(format!("Invalid IP address: {:?}", shown)))
        }
    }
}
