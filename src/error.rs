//! Error types for the gramgate crate.

use thiserror::Error;

/// Terminal failure of an upstream fetch.
///
/// Individual attempt failures never leave the executor's retry loop; only
/// these aggregated variants cross a component boundary. The controller layer
/// maps them straight to HTTP status codes without further classification.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Every attempt came back 401 through a proxy: upstream is blocking the
    /// pool, not just flaking.
    #[error("upstream rejected all proxies with 401 [{}]: {}", .proxies.join(", "), .errors.join("; "))]
    ProxyAuthRejected {
        /// Implicated proxies, deduplicated in first-seen order.
        proxies: Vec<String>,
        errors: Vec<String>,
    },

    /// All attempts failed for mixed or non-auth reasons.
    #[error("all {attempts} attempts failed: {}", .errors.join("; "))]
    AttemptsExhausted { attempts: usize, errors: Vec<String> },

    /// A 2xx response decoded as JSON but is missing an expected member.
    #[error("unexpected upstream response shape: {0}")]
    UpstreamShape(String),
}
