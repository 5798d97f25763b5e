/*
 * Responsibility
 * - GET /health (疎通用)
 * - user_sync を通さない (directory を叩かない)
 */
use axum::{Json, http::StatusCode, response::IntoResponse};
use serde_json::json;

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(json!({"status": "ok"})))
}
