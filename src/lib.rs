//! # gramgate
//!
//! Instagram profile and last-post API served through a rotating pool of
//! free HTTP proxies.
//!
//! Instagram aggressively rate-limits and blocks single-origin traffic, so
//! every upstream call goes through a [`RequestExecutor`] that fans requests
//! across a periodically refreshed proxy pool, retries through a fresh proxy
//! on failure, and permanently benches proxies the upstream rejects with 401.

pub mod blacklist;
pub mod config;
pub mod controllers;
pub mod error;
pub mod executor;
pub mod instagram;
pub mod pool;
pub mod setup;
pub mod source;

pub use blacklist::Blacklist;
pub use config::{AppConfig, AppConfigBuilder};
pub use error::FetchError;
pub use executor::RequestExecutor;
pub use instagram::InstagramClient;
pub use pool::ProxyPool;
pub use setup::setup_app;
pub use source::{HttpProxySource, ProxySource};
