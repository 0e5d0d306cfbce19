//! Application assembly.

use std::sync::Arc;

use rocket::{routes, Build, Rocket};

use crate::controllers;
use crate::instagram::InstagramClient;
use crate::pool::ProxyPool;

/// Build the rocket application with all managed state and routes mounted.
pub fn setup_app(instagram: Arc<InstagramClient>, pool: Arc<ProxyPool>) -> Rocket<Build> {
    rocket::build().manage(instagram).manage(pool).mount(
        "/",
        routes![
            controllers::user_info,
            controllers::last_post,
            controllers::refresh_proxies,
            controllers::get_health,
        ],
    )
}
