//! Factory: build process-level services from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::middleware::user_sync::UserSync;
use crate::services::directory::HttpDirectoryClient;
use crate::services::proxy::{ProxyClient, Route};

pub fn build_user_sync(config: &Config) -> Result<UserSync, reqwest::Error> {
    let directory = HttpDirectoryClient::new(
        config.user_service_url.clone(),
        config.directory_timeout,
        config.register_placeholder_password.clone(),
    )?;

    Ok(UserSync::new(Arc::new(directory)))
}

pub fn routes(config: &Config) -> Vec<Route> {
    vec![
        Route::new("/api/users", config.user_service_url.clone()),
        Route::new("/api/activities", config.activity_service_url.clone()),
        Route::new("/api/recommendations", config.ai_service_url.clone()),
    ]
}

pub fn build_proxy(config: &Config) -> Result<Arc<ProxyClient>, reqwest::Error> {
    let proxy = ProxyClient::new(
        routes(config),
        config.upstream_timeout,
        config.max_body_bytes,
    )?;

    Ok(Arc::new(proxy))
}
