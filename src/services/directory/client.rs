//! Identity directory interface used by the user-sync middleware.
use async_trait::async_trait;
use axum::http::StatusCode;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::services::identity::IdentityClaims;

/// Result type for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Directory-layer errors.
///
/// Note:
/// - Kept independent from `AppError`: the sync middleware absorbs all of these
///   (fail-open), they never become an HTTP response.
/// - `status` is the remote status when there was one, kept for logging.
#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("user lookup failed (status: {status:?}): {message}")]
    LookupFailed {
        status: Option<StatusCode>,
        message: String,
    },
    #[error("user registration rejected (status: {status}): {message}")]
    RegistrationRejected { status: StatusCode, message: String },
    #[error("user registration unavailable (status: {status:?}): {message}")]
    RegistrationUnavailable {
        status: Option<StatusCode>,
        message: String,
    },
}

impl DirectoryError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::LookupFailed { status, .. } | Self::RegistrationUnavailable { status, .. } => {
                *status
            }
            Self::RegistrationRejected { status, .. } => Some(*status),
        }
    }
}

/// Profile returned by the user-service on registration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub created_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub updated_date: Option<NaiveDateTime>,
}

/// Registration body expected by `POST /api/users/register`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(rename = "keyCloakId")]
    pub keycloak_id: String,
    pub password: String,
}

impl RegisterRequest {
    pub fn from_claims(claims: &IdentityClaims, password: impl Into<String>) -> Self {
        Self {
            email: claims.email.clone(),
            first_name: claims.given_name.clone(),
            last_name: claims.family_name.clone(),
            keycloak_id: claims.subject.clone(),
            password: password.into(),
        }
    }
}

/// The service of record for "does this user exist" / "create this user".
///
/// Implementations must be safe to share across requests (`Arc<dyn ...>`).
/// Duplicate registration of the same identity is the directory's problem:
/// callers do not coordinate across requests.
#[async_trait]
pub trait IdentityDirectory: Send + Sync + 'static {
    // Returns the backend name (for logging).
    fn backend_name(&self) -> &'static str;

    // `Ok(false)` for unknown users; errors are reserved for transport/remote failures.
    async fn exists(&self, user_id: &str) -> DirectoryResult<bool>;

    async fn register(&self, claims: &IdentityClaims) -> DirectoryResult<Profile>;
}
