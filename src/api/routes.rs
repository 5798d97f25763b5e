/*
 * Responsibility
 * - proxy する URL 構造を定義 (route table の prefix ごとに prefix と prefix/{*rest} を登録)
 * - user_sync を掛ける範囲はここで決める (proxy routes のみ、/health は対象外)
 */
use axum::{Router, routing::any};

use crate::api::handlers::proxy::forward;
use crate::middleware;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let mut router = Router::new();

    for prefix in state.proxy.prefixes() {
        router = router
            .route(prefix, any(forward))
            .route(&format!("{prefix}/{{*rest}}"), any(forward));
    }

    middleware::user_sync::apply(router, state.clone())
}
