/*
 * Responsibility
 * - proxy routes の handler
 * - user_sync middleware を通過した request をそのまま upstream へ渡す
 */
use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
};

use crate::{error::AppError, state::AppState};

pub async fn forward(
    State(state): State<AppState>,
    req: Request<Body>,
) -> Result<Response, AppError> {
    Ok(state.proxy.forward(req).await?)
}

pub async fn not_found() -> AppError {
    AppError::not_found("route")
}
