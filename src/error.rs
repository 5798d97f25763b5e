/*
 * Responsibility
 * - gateway 自身が返すエラー (AppError) の定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - ProxyError を統一的に変換
 *
 * Notes
 * - identity directory のエラーは user_sync で吸収する (fail-open) ので、ここには来ない
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::proxy::ProxyError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{code}: {message}")]
    BadRequest { code: &'static str, message: String },
    #[error("not found: {resource}")]
    NotFound { resource: &'static str },
    #[error("payload too large")]
    PayloadTooLarge,
    #[error("bad gateway")]
    BadGateway,
    #[error("gateway timeout")]
    GatewayTimeout,
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            AppError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("{resource} not found."),
            ),
            AppError::PayloadTooLarge => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                "request body exceeds the configured limit".into(),
            ),
            AppError::BadGateway => (
                StatusCode::BAD_GATEWAY,
                "BAD_GATEWAY",
                "upstream service unavailable".into(),
            ),
            AppError::GatewayTimeout => (
                StatusCode::GATEWAY_TIMEOUT,
                "GATEWAY_TIMEOUT",
                "upstream service timed out".into(),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "internal server error".into(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<ProxyError> for AppError {
    fn from(e: ProxyError) -> Self {
        match e {
            ProxyError::NoRoute(_) => AppError::not_found("route"),
            ProxyError::BodyTooLarge => AppError::PayloadTooLarge,
            ProxyError::Body(err) => {
                tracing::debug!(error = %err, "unreadable request body");
                AppError::bad_request("INVALID_BODY", "request body could not be read")
            }
            ProxyError::Timeout(err) => {
                tracing::warn!(error = %err, "upstream timed out");
                AppError::GatewayTimeout
            }
            ProxyError::Upstream(err) => {
                tracing::warn!(error = %err, "upstream request failed");
                AppError::BadGateway
            }
        }
    }
}
