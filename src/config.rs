//! Runtime configuration.

use std::time::Duration;

use anyhow::{Context, Result};

/// Tunables for the proxy pool and the API server.
///
/// Everything here has a compiled-in default matching the service's
/// historical behavior; the environment can override any of them through
/// [`AppConfig::from_env`].
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// URL of the newline-delimited `host:port` proxy list.
    pub proxy_source_url: String,
    /// Wall-clock width of one pool-cache bucket.
    pub cache_window: Duration,
    /// Attempts per logical request before a terminal failure.
    pub max_attempts: usize,
    /// Per-attempt request timeout.
    pub request_timeout: Duration,
    /// Port the API listens on.
    pub port: u16,
    /// Base URL of the upstream profile endpoint.
    pub profile_api_base: String,
    /// URL of the upstream GraphQL endpoint.
    pub graphql_api_url: String,
}

impl AppConfig {
    /// Create a new configuration builder.
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::new()
    }

    /// Configuration from environment variables, falling back to the
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self> {
        let mut builder = Self::builder();

        if let Ok(url) = std::env::var("PROXY_SOURCE_URL") {
            builder = builder.proxy_source_url(url);
        }
        if let Ok(secs) = std::env::var("PROXY_CACHE_WINDOW_SECS") {
            let secs = secs
                .parse()
                .context("failed to parse PROXY_CACHE_WINDOW_SECS")?;
            builder = builder.cache_window(Duration::from_secs(secs));
        }
        if let Ok(count) = std::env::var("MAX_ATTEMPTS") {
            builder = builder.max_attempts(count.parse().context("failed to parse MAX_ATTEMPTS")?);
        }
        if let Ok(secs) = std::env::var("REQUEST_TIMEOUT_SECS") {
            let secs = secs.parse().context("failed to parse REQUEST_TIMEOUT_SECS")?;
            builder = builder.request_timeout(Duration::from_secs(secs));
        }
        if let Ok(port) = std::env::var("PORT") {
            builder = builder.port(port.parse().context("failed to parse PORT")?);
        }
        if let Ok(base) = std::env::var("PROFILE_API_BASE") {
            builder = builder.profile_api_base(base);
        }
        if let Ok(url) = std::env::var("GRAPHQL_API_URL") {
            builder = builder.graphql_api_url(url);
        }

        Ok(builder.build())
    }
}

/// Builder for `AppConfig`.
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    proxy_source_url: Option<String>,
    cache_window: Option<Duration>,
    max_attempts: Option<usize>,
    request_timeout: Option<Duration>,
    port: Option<u16>,
    profile_api_base: Option<String>,
    graphql_api_url: Option<String>,
}

impl AppConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the URL the proxy list is fetched from.
    pub fn proxy_source_url(mut self, url: impl Into<String>) -> Self {
        self.proxy_source_url = Some(url.into());
        self
    }

    /// Set the width of one pool-cache bucket.
    pub fn cache_window(mut self, window: Duration) -> Self {
        self.cache_window = Some(window);
        self
    }

    /// Set the number of attempts per logical request.
    pub fn max_attempts(mut self, count: usize) -> Self {
        self.max_attempts = Some(count);
        self
    }

    /// Set the per-attempt request timeout.
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Set the port the API listens on.
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the base URL of the upstream profile endpoint.
    pub fn profile_api_base(mut self, base: impl Into<String>) -> Self {
        self.profile_api_base = Some(base.into());
        self
    }

    /// Set the URL of the upstream GraphQL endpoint.
    pub fn graphql_api_url(mut self, url: impl Into<String>) -> Self {
        self.graphql_api_url = Some(url.into());
        self
    }

    /// Build the configuration.
    pub fn build(self) -> AppConfig {
        AppConfig {
            proxy_source_url: self.proxy_source_url.unwrap_or_else(|| {
                "https://www.proxy-list.download/api/v1/get?type=http".to_string()
            }),
            cache_window: self.cache_window.unwrap_or(Duration::from_secs(1800)),
            max_attempts: self.max_attempts.unwrap_or(3),
            request_timeout: self.request_timeout.unwrap_or(Duration::from_secs(10)),
            port: self.port.unwrap_or(8000),
            profile_api_base: self
                .profile_api_base
                .unwrap_or_else(|| "https://i.instagram.com".to_string()),
            graphql_api_url: self
                .graphql_api_url
                .unwrap_or_else(|| "https://www.instagram.com/graphql/query/".to_string()),
        }
    }
}
