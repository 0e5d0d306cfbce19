//! Upstream Instagram adapters.
//!
//! Thin consumers of the request executor: they know the two undocumented
//! web endpoints, the headers those expect, and the shape of the JSON that
//! comes back. Everything about proxies and retries lives in the executor.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::AppConfig;
use crate::error::FetchError;
use crate::executor::RequestExecutor;

/// App id Instagram's own web client sends; the profile endpoint rejects
/// requests without it.
const IG_APP_ID: &str = "936619743392459";
/// Query hash of the public "first N posts of a user" GraphQL query.
const TIMELINE_QUERY_HASH: &str = "58b6785bea111c67129decbe6a448951";
const BROWSER_USER_AGENT: &str = "Mozilla/5.0";

#[derive(Debug, Deserialize)]
struct TimelineResponse {
    data: TimelineData,
}

#[derive(Debug, Deserialize)]
struct TimelineData {
    user: Option<TimelineUser>,
}

#[derive(Debug, Deserialize)]
struct TimelineUser {
    edge_owner_to_timeline_media: TimelineMedia,
}

#[derive(Debug, Deserialize)]
struct TimelineMedia {
    edges: Vec<TimelineEdge>,
}

#[derive(Debug, Deserialize)]
struct TimelineEdge {
    node: TimelineNode,
}

#[derive(Debug, Deserialize)]
struct TimelineNode {
    taken_at_timestamp: i64,
}

pub struct InstagramClient {
    executor: Arc<RequestExecutor>,
    profile_api_base: String,
    graphql_api_url: String,
}

impl InstagramClient {
    pub fn new(executor: Arc<RequestExecutor>, config: &AppConfig) -> Self {
        Self {
            executor,
            profile_api_base: config.profile_api_base.clone(),
            graphql_api_url: config.graphql_api_url.clone(),
        }
    }

    /// Public profile payload for `username`: the `data` member of the
    /// upstream `web_profile_info` response, passed through verbatim.
    pub async fn fetch_profile(&self, username: &str) -> Result<Value, FetchError> {
        let url = format!("{}/api/v1/users/web_profile_info/", self.profile_api_base);
        let params = [("username", username.to_string())];

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
        headers.insert("x-ig-app-id", HeaderValue::from_static(IG_APP_ID));

        let body = self.executor.execute(&url, &headers, Some(&params)).await?;
        body.get("data").cloned().ok_or_else(|| {
            FetchError::UpstreamShape("profile response has no `data` member".to_string())
        })
    }

    /// Timestamp of the user's most recent post, or `None` for an empty
    /// timeline.
    pub async fn fetch_last_post_date(
        &self,
        username: &str,
    ) -> Result<Option<DateTime<Utc>>, FetchError> {
        let profile = self.fetch_profile(username).await?;
        let user_id = profile
            .pointer("/user/id")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                FetchError::UpstreamShape("profile data has no `user.id` member".to_string())
            })?;

        let variables = json!({ "id": user_id, "first": 1 }).to_string();
        let params = [
            ("query_hash", TIMELINE_QUERY_HASH.to_string()),
            ("variables", variables),
        ];

        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));

        let body = self
            .executor
            .execute(&self.graphql_api_url, &headers, Some(&params))
            .await?;
        last_post_from_timeline(body)
    }
}

/// Pull the most recent post's timestamp out of a timeline response body.
/// Zero edges means the account has no posts, which is not an error.
fn last_post_from_timeline(body: Value) -> Result<Option<DateTime<Utc>>, FetchError> {
    let timeline: TimelineResponse = serde_json::from_value(body)
        .map_err(|err| FetchError::UpstreamShape(format!("timeline response: {err}")))?;
    let user = timeline.data.user.ok_or_else(|| {
        FetchError::UpstreamShape("timeline response has no `data.user` member".to_string())
    })?;

    match user.edge_owner_to_timeline_media.edges.first() {
        Some(edge) => {
            let timestamp = edge.node.taken_at_timestamp;
            let date = DateTime::from_timestamp(timestamp, 0).ok_or_else(|| {
                FetchError::UpstreamShape(format!("post timestamp {timestamp} is out of range"))
            })?;
            Ok(Some(date))
        }
        None => Ok(None),
    }
}
