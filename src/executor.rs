//! Outbound request execution with proxy rotation.

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use log::{info, warn};
use reqwest::header::HeaderMap;
use reqwest::Client;
use serde_json::Value;

use crate::blacklist::Blacklist;
use crate::config::AppConfig;
use crate::error::FetchError;
use crate::pool::ProxyPool;

/// How a single attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureKind {
    /// Connection refused, timeout, DNS failure, unreachable proxy.
    Transport,
    /// Upstream answered 401 through a proxy; the proxy has been benched.
    AuthRejected,
    /// Any other non-2xx status, including a 401 on a direct request.
    Http,
    /// 2xx whose body did not decode as JSON.
    Decode,
}

#[derive(Debug)]
struct AttemptFailure {
    proxy: Option<String>,
    kind: FailureKind,
    message: String,
}

/// Issues GET requests through randomly selected proxies.
///
/// Each logical request gets a bounded number of attempts, each through an
/// independently selected proxy (or direct when no viable proxy remains).
/// The only success exit is a 2xx response whose body decodes as JSON;
/// everything else consumes an attempt. A 401 through a proxy blacklists
/// that proxy before the next selection happens.
pub struct RequestExecutor {
    pool: Arc<ProxyPool>,
    blacklist: Arc<Blacklist>,
    max_attempts: usize,
    timeout: Duration,
}

impl RequestExecutor {
    pub fn new(pool: Arc<ProxyPool>, blacklist: Arc<Blacklist>, config: &AppConfig) -> Self {
        Self {
            pool,
            blacklist,
            max_attempts: config.max_attempts,
            timeout: config.request_timeout,
        }
    }

    /// Fetch `url` and decode the body as JSON, retrying through a fresh
    /// proxy on every failure. Fails with one aggregated [`FetchError`] once
    /// the attempts are exhausted.
    pub async fn execute(
        &self,
        url: &str,
        headers: &HeaderMap,
        params: Option<&[(&str, String)]>,
    ) -> Result<Value, FetchError> {
        let mut failures: Vec<AttemptFailure> = Vec::with_capacity(self.max_attempts);

        for attempt in 1..=self.max_attempts {
            let endpoints = self.pool.endpoints().await;
            let proxy = self.pool.pick(&endpoints);
            match &proxy {
                Some(endpoint) => info!(
                    "Attempt {}/{} for {} via proxy {}",
                    attempt, self.max_attempts, url, endpoint
                ),
                None => info!("Attempt {}/{} for {} direct", attempt, self.max_attempts, url),
            }

            match self.attempt(url, headers, params, proxy.as_deref()).await {
                Ok(body) => return Ok(body),
                Err(failure) => {
                    warn!(
                        "Attempt {}/{} failed: {}",
                        attempt, self.max_attempts, failure.message
                    );
                    failures.push(failure);
                }
            }
        }

        Err(summarize(failures, self.max_attempts))
    }

    async fn attempt(
        &self,
        url: &str,
        headers: &HeaderMap,
        params: Option<&[(&str, String)]>,
        proxy: Option<&str>,
    ) -> Result<Value, AttemptFailure> {
        let fail = |kind, message: String| AttemptFailure {
            proxy: proxy.map(str::to_string),
            kind,
            message,
        };

        let mut builder = Client::builder().timeout(self.timeout);
        if let Some(endpoint) = proxy {
            let reqwest_proxy = reqwest::Proxy::all(format!("http://{endpoint}"))
                .map_err(|err| fail(FailureKind::Transport, format!("invalid proxy {endpoint}: {err}")))?;
            builder = builder.proxy(reqwest_proxy);
        }
        let client = builder
            .build()
            .map_err(|err| fail(FailureKind::Transport, format!("failed to build client: {err}")))?;

        let mut request = client.get(url).headers(headers.clone());
        if let Some(params) = params {
            request = request.query(params);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(err) => return Err(fail(FailureKind::Transport, err.to_string())),
        };

        // Classify the status first, then mutate shared state, then decide:
        // blacklisting happens before the failure is recorded so the next
        // selection in this same logical request already excludes the proxy.
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            if let Some(endpoint) = proxy {
                self.blacklist.add(endpoint);
                return Err(fail(
                    FailureKind::AuthRejected,
                    format!("upstream returned 401 via proxy {endpoint}"),
                ));
            }
            return Err(fail(
                FailureKind::Http,
                "upstream returned 401 on a direct request".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(fail(FailureKind::Http, format!("upstream returned {status}")));
        }

        response
            .json::<Value>()
            .await
            .map_err(|err| fail(FailureKind::Decode, format!("body is not valid JSON: {err}")))
    }
}

/// Fold the attempt log into one terminal error: auth-flavored only when
/// every failure was a 401 through a proxy, generic otherwise.
fn summarize(failures: Vec<AttemptFailure>, attempts: usize) -> FetchError {
    let all_auth =
        !failures.is_empty() && failures.iter().all(|f| f.kind == FailureKind::AuthRejected);

    if all_auth {
        let mut proxies: Vec<String> = Vec::new();
        for failure in &failures {
            if let Some(proxy) = &failure.proxy {
                if !proxies.iter().any(|seen| seen == proxy) {
                    proxies.push(proxy.clone());
                }
            }
        }
        if !proxies.is_empty() {
            return FetchError::ProxyAuthRejected {
                proxies,
                errors: failures.into_iter().map(|f| f.message).collect(),
            };
        }
    }

    FetchError::AttemptsExhausted {
        attempts,
        errors: failures.into_iter().map(|f| f.message).collect(),
    }
}
