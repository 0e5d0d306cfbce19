use std::sync::Arc;

use anyhow::{anyhow, Result};
use log::info;

use gramgate::blacklist::Blacklist;
use gramgate::config::AppConfig;
use gramgate::executor::RequestExecutor;
use gramgate::instagram::InstagramClient;
use gramgate::pool::ProxyPool;
use gramgate::setup::setup_app;
use gramgate::source::HttpProxySource;

#[rocket::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    env_logger::init();

    let config = AppConfig::from_env()?;

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

    // Pre-warm so the first inbound request does not pay for the list fetch.
    let warmed = pool.endpoints().await.len();
    info!("Proxy pool pre-warmed with {warmed} endpoints");

    std::env::set_var("ROCKET_PORT", config.port.to_string());
    setup_app(instagram, pool)
        .launch()
        .await
        .map(|_| {})
        .map_err(|err| anyhow!("failed to run application: {err}"))
}
