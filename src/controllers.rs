//! Inbound HTTP API.
//!
//! The route layer performs no classification of its own: a terminal
//! [`FetchError`] from the executor maps straight to a status code and a
//! JSON `detail` body.

use std::sync::Arc;

use log::error;
use rocket::http::{ContentType, Status};
use rocket::response::{self, Responder, Response};
use rocket::serde::json::Json;
use rocket::{get, Request, State};
use serde::Serialize;
use serde_json::Value;

use crate::error::FetchError;
use crate::instagram::InstagramClient;
use crate::pool::ProxyPool;

/// JSON error body carried with an explicit status code.
#[derive(Debug, Serialize)]
pub struct ResponseError {
    pub detail: String,
    #[serde(skip)]
    pub status: Status,
}

impl<'r> Responder<'r, 'static> for ResponseError {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        let body = serde_json::to_string(&self).map_err(|_| Status::InternalServerError)?;
        Response::build()
            .sized_body(body.len(), std::io::Cursor::new(body))
            .header(ContentType::JSON)
            .status(self.status)
            .ok()
    }
}

impl From<FetchError> for ResponseError {
    fn from(err: FetchError) -> Self {
        error!("{err}");
        let status = match err {
            FetchError::ProxyAuthRejected { .. } => Status::Unauthorized,
            FetchError::AttemptsExhausted { .. } | FetchError::UpstreamShape(_) => {
                Status::InternalServerError
            }
        };
        Self {
            detail: err.to_string(),
            status,
        }
    }
}

pub type ResponseResult<T> = Result<Json<T>, ResponseError>;

#[derive(Debug, Serialize)]
pub struct LastPostResponse {
    pub username: String,
    pub last_post_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    pub status: &'static str,
    pub proxy_count: usize,
}

#[get("/user/<username>")]
pub async fn user_info(
    username: &str,
    instagram: &State<Arc<InstagramClient>>,
) -> ResponseResult<Value> {
    let profile = instagram.fetch_profile(username).await?;
    Ok(Json(profile))
}

#[get("/last-post/<username>")]
pub async fn last_post(
    username: &str,
    instagram: &State<Arc<InstagramClient>>,
) -> ResponseResult<LastPostResponse> {
    let response = match instagram.fetch_last_post_date(username).await? {
        Some(date) => LastPostResponse {
            username: username.to_string(),
            last_post_date: Some(date.to_rfc3339()),
            message: None,
        },
        None => LastPostResponse {
            username: username.to_string(),
            last_post_date: None,
            message: Some("No posts found".to_string()),
        },
    };
    Ok(Json(response))
}

#[get("/refresh-proxies")]
pub async fn refresh_proxies(pool: &State<Arc<ProxyPool>>) -> Json<RefreshResponse> {
    let proxy_count = pool.refresh().await;
    Json(RefreshResponse {
        status: "success",
        proxy_count,
    })
}

#[get("/status/health")]
pub fn get_health() -> ResponseResult<()> {
    Ok(Json(()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_flavored_errors_map_to_401() {
        let err = FetchError::ProxyAuthRejected {
            proxies: vec!["1.1.1.1:80".to_string()],
            errors: vec!["upstream returned 401 via proxy 1.1.1.1:80".to_string()],
        };
        let response = ResponseError::from(err);
        assert_eq!(response.status, Status::Unauthorized);
        assert!(response.detail.contains("1.1.1.1:80"));
    }

    #[test]
    fn generic_errors_map_to_500() {
        let err = FetchError::AttemptsExhausted {
            attempts: 3,
            errors: vec!["connection refused".to_string()],
        };
        assert_eq!(
            ResponseError::from(err).status,
            Status::InternalServerError
        );

        let err = FetchError::UpstreamShape("profile response has no `data` member".to_string());
        assert_eq!(
            ResponseError::from(err).status,
            Status::InternalServerError
        );
    }
}
