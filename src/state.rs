/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - user_sync: identity directory との同期 (middleware が使う)
 *   - proxy: upstream への転送
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 * - リクエスト間で共有する可変状態は持たない
 */
use std::sync::Arc;

use crate::middleware::user_sync::UserSync;
use crate::services::proxy::ProxyClient;

#[derive(Clone)]
pub struct AppState {
    pub user_sync: UserSync,
    pub proxy: Arc<ProxyClient>,
}

impl AppState {
    pub fn new(user_sync: UserSync, proxy: Arc<ProxyClient>) -> Self {
        Self { user_sync, proxy }
    }
}
