//! Proxy list retrieval and parsing.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

/// Where the pool gets its raw list of `host:port` endpoints.
///
/// Implementations may fail; the pool contains those failures and treats
/// them as an empty list, because an empty pool is a safe degraded state
/// (the executor falls back to direct requests).
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProxySource: Send + Sync {
    async fn fetch(&self) -> Result<Vec<String>>;
}

/// Fetches a newline-delimited proxy list from a remote plaintext resource.
pub struct HttpProxySource {
    url: String,
    timeout: Duration,
}

impl HttpProxySource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }
}

#[async_trait]
impl ProxySource for HttpProxySource {
    async fn fetch(&self) -> Result<Vec<String>> {
        let client = Client::builder()
            .timeout(self.timeout)
            .build()
            .context("failed to build proxy source client")?;

        let body = client
            .get(&self.url)
            .send()
            .await
            .context("proxy list source unreachable")?
            .error_for_status()
            .context("proxy list source returned an error status")?
            .text()
            .await
            .context("failed to read proxy list body")?;

        Ok(parse_proxy_list(&body))
    }
}

/// Split a plaintext body into `host:port` endpoints, trimming whitespace and
/// dropping empty or malformed lines. No scheme is attached here; the
/// executor applies one when it builds a transport.
pub(crate) fn parse_proxy_list(body: &str) -> Vec<String> {
    body.lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let valid = Url::parse(&format!("http://{line}"))
                .map(|url| url.host_str().is_some() && url.port().is_some() && url.path() == "/" && url.query().is_none())
                .unwrap_or(false);
            valid.then(|| line.to_string())
        })
        .collect()
}
