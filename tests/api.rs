//! End-to-end tests: the rocket app wired against wiremock upstreams.

use std::sync::Arc;
use std::time::Duration;

use rocket::http::Status;
use rocket::local::asynchronous::Client;
use serde_json::{json, Value};
use wiremock::matchers::{any, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use gramgate::blacklist::Blacklist;
use gramgate::config::AppConfig;
use gramgate::executor::RequestExecutor;
use gramgate::instagram::InstagramClient;
use gramgate::pool::ProxyPool;
use gramgate::setup::setup_app;
use gramgate::source::HttpProxySource;

struct TestApp {
    client: Client,
    blacklist: Arc<Blacklist>,
}

async fn spawn_app(proxy_list: &MockServer, upstream: &MockServer) -> TestApp {
    let config = AppConfig::builder()
        .proxy_source_url(format!("{}/proxies.txt", proxy_list.uri()))
        .profile_api_base(upstream.uri())
        .graphql_api_url(format!("{}/graphql/query/", upstream.uri()))
        .request_timeout(Duration::from_secs(2))
        .build();

    let blacklist = Arc::new(Blacklist::new());
    let source = HttpProxySource::new(&config.proxy_source_url, config.request_timeout);
    let pool = Arc::new(ProxyPool::new(
        Box::new(source),
        Arc::clone(&blacklist),
        config.cache_window,
    ));
    let executor = Arc::new(RequestExecutor::new(
        Arc::clone(&pool),
        Arc::clone(&blacklist),
        &config,
    ));
    let instagram = Arc::new(InstagramClient::new(executor, &config));

    let client = Client::tracked(setup_app(instagram, pool))
        .await
        .expect("valid rocket instance");
    TestApp { client, blacklist }
}

async fn serve_proxy_list(server: &MockServer, body: &str) {
    Mock::given(method("GET"))
        .and(path("/proxies.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn profile_body(user_id: &str) -> Value {
    json!({ "data": { "user": { "id": user_id, "username": "someone" } } })
}

fn timeline_body(timestamps: &[i64]) -> Value {
    let edges: Vec<Value> = timestamps
        .iter()
        .map(|ts| json!({ "node": { "taken_at_timestamp": ts } }))
        .collect();
    json!({ "data": { "user": { "edge_owner_to_timeline_media": { "edges": edges } } } })
}

#[tokio::test]
async fn user_profile_is_passed_through() {
    let proxy_list = MockServer::start().await;
    let upstream = MockServer::start().await;
    serve_proxy_list(&proxy_list, "").await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/web_profile_info/"))
        .and(query_param("username", "someone"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body("42")))
        .expect(1)
        .mount(&upstream)
        .await;

    let app = spawn_app(&proxy_list, &upstream).await;
    let response = app.client.get("/user/someone").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let body: Value = response.into_json().await.expect("json body");
    assert_eq!(body, json!({ "user": { "id": "42", "username": "someone" } }));
}

#[tokio::test]
async fn last_post_reports_the_newest_timestamp() {
    let proxy_list = MockServer::start().await;
    let upstream = MockServer::start().await;
    serve_proxy_list(&proxy_list, "").await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/web_profile_info/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body("42")))
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/graphql/query/"))
        .and(query_param("query_hash", "58b6785bea111c67129decbe6a448951"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline_body(&[1714645230])))
        .mount(&upstream)
        .await;

    let app = spawn_app(&proxy_list, &upstream).await;
    let response = app.client.get("/last-post/someone").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let body: Value = response.into_json().await.expect("json body");
    assert_eq!(
        body,
        json!({ "username": "someone", "last_post_date": "2024-05-02T10:20:30+00:00" })
    );
}

#[tokio::test]
async fn last_post_with_empty_timeline_is_not_an_error() {
    let proxy_list = MockServer::start().await;
    let upstream = MockServer::start().await;
    serve_proxy_list(&proxy_list, "").await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/web_profile_info/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile_body("42")))
        .mount(&upstream)
        .await;
    Mock::given(method("GET"))
        .and(path("/graphql/query/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(timeline_body(&[])))
        .mount(&upstream)
        .await;

    let app = spawn_app(&proxy_list, &upstream).await;
    let response = app.client.get("/last-post/someone").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let body: Value = response.into_json().await.expect("json body");
    assert_eq!(
        body,
        json!({ "username": "someone", "last_post_date": null, "message": "No posts found" })
    );
}

#[tokio::test]
async fn upstream_errors_consume_exactly_three_attempts() {
    let proxy_list = MockServer::start().await;
    let upstream = MockServer::start().await;
    serve_proxy_list(&proxy_list, "").await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/web_profile_info/"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&upstream)
        .await;

    let app = spawn_app(&proxy_list, &upstream).await;
    let response = app.client.get("/user/someone").dispatch().await;
    assert_eq!(response.status(), Status::InternalServerError);

    let body: Value = response.into_json().await.expect("json body");
    assert!(body["detail"]
        .as_str()
        .expect("detail string")
        .contains("all 3 attempts failed"));
}

#[tokio::test]
async fn undecodable_body_consumes_attempts() {
    let proxy_list = MockServer::start().await;
    let upstream = MockServer::start().await;
    serve_proxy_list(&proxy_list, "").await;

    Mock::given(method("GET"))
        .and(path("/api/v1/users/web_profile_info/"))
        .respond_with(ResponseTemplate::new(200).set_body_string("definitely not json"))
        .expect(3)
        .mount(&upstream)
        .await;

    let app = spawn_app(&proxy_list, &upstream).await;
    let response = app.client.get("/user/someone").dispatch().await;
    assert_eq!(response.status(), Status::InternalServerError);
}

#[tokio::test]
async fn rejected_proxies_are_blacklisted_and_surface_as_auth_failure() {
    let proxy_list = MockServer::start().await;
    let upstream = MockServer::start().await;

    // Three proxies, each a server that answers 401 to everything it is
    // asked to forward.
    let rejecting = [
        MockServer::start().await,
        MockServer::start().await,
        MockServer::start().await,
    ];
    let mut endpoints = Vec::new();
    for server in &rejecting {
        Mock::given(any())
            .respond_with(ResponseTemplate::new(401))
            .mount(server)
            .await;
        endpoints.push(server.address().to_string());
    }
    serve_proxy_list(&proxy_list, &endpoints.join("\n")).await;

    let app = spawn_app(&proxy_list, &upstream).await;
    let response = app.client.get("/user/someone").dispatch().await;
    assert_eq!(response.status(), Status::Unauthorized);

    let body: Value = response.into_json().await.expect("json body");
    let detail = body["detail"].as_str().expect("detail string");
    for endpoint in &endpoints {
        assert!(detail.contains(endpoint.as_str()));
    }
    assert_eq!(app.blacklist.len(), 3);

    // A fresh fetch must not reintroduce the benched proxies.
    let response = app.client.get("/refresh-proxies").dispatch().await;
    let body: Value = response.into_json().await.expect("json body");
    assert_eq!(body, json!({ "status": "success", "proxy_count": 0 }));
}

#[tokio::test]
async fn mixed_auth_and_http_failures_stay_generic() {
    let proxy_list = MockServer::start().await;
    let upstream = MockServer::start().await;

    let rejecting = MockServer::start().await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(401))
        .mount(&rejecting)
        .await;
    serve_proxy_list(&proxy_list, &rejecting.address().to_string()).await;

    // Direct fallback attempts reach the upstream, which is also failing.
    Mock::given(method("GET"))
        .and(path("/api/v1/users/web_profile_info/"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&upstream)
        .await;

    let app = spawn_app(&proxy_list, &upstream).await;
    let response = app.client.get("/user/someone").dispatch().await;
    assert_eq!(response.status(), Status::InternalServerError);
    assert_eq!(app.blacklist.len(), 1);
}

#[tokio::test]
async fn unreachable_proxies_fail_generic() {
    let proxy_list = MockServer::start().await;
    let upstream = MockServer::start().await;
    // Nothing listens on the discard port.
    serve_proxy_list(&proxy_list, "127.0.0.1:9").await;

    let app = spawn_app(&proxy_list, &upstream).await;
    let response = app.client.get("/user/someone").dispatch().await;
    assert_eq!(response.status(), Status::InternalServerError);
    assert!(app.blacklist.is_empty());
}

#[tokio::test]
async fn refresh_proxies_reports_the_fetched_count() {
    let proxy_list = MockServer::start().await;
    let upstream = MockServer::start().await;
    serve_proxy_list(&proxy_list, "203.0.113.5:8080\n198.51.100.7:3128\n").await;

    let app = spawn_app(&proxy_list, &upstream).await;
    let response = app.client.get("/refresh-proxies").dispatch().await;
    assert_eq!(response.status(), Status::Ok);

    let body: Value = response.into_json().await.expect("json body");
    assert_eq!(body, json!({ "status": "success", "proxy_count": 2 }));
}

#[tokio::test]
async fn health_endpoint_answers() {
    let proxy_list = MockServer::start().await;
    let upstream = MockServer::start().await;
    serve_proxy_list(&proxy_list, "").await;

    let app = spawn_app(&proxy_list, &upstream).await;
    let response = app.client.get("/status/health").dispatch().await;
    assert_eq!(response.status(), Status::Ok);
}
