//! Identity sync: bearer token / `X-USER-ID` → user-service → `X-USER-ID` downstream.
//!
//! Per request, strictly in this order:
//! 1. decode the bearer claims (no signature check, see `identity::claims`)
//! 2. resolve the user id (`X-USER-ID` wins over the token subject)
//! 3. ask the directory whether the user exists
//! 4. register the user from the claims when it does not (and claims exist)
//! 5. overwrite `X-USER-ID` with the resolved id and run the rest of the chain
//!
//! Without a resolvable id the request passes through untouched and the
//! directory is never called. A blank or non-UTF-8 `X-USER-ID` is the one
//! thing dropped on the way: only ids the gateway resolved go downstream.
//!
//! Fail-open: directory failures are logged and the request is forwarded anyway.
//! Traffic must not depend on the user-service being up.
//!
//! Concurrency:
//! - no shared mutable state; every request runs its own sequence
//! - two first-time requests for the same identity can both see "missing" and
//!   both register. Deduplication is the user-service's job (unique keycloak id).
//! - dropping the request future (client gone, global timeout) while a
//!   directory call is pending abandons the request; nothing is forwarded.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::services::directory::IdentityDirectory;
use crate::services::identity::{claims, resolver};
use crate::state::AppState;

pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");

/// What the sync step decided for one request. Also stored in request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// no id could be resolved; request forwarded as received, minus an unusable `X-USER-ID`
    PassThrough,
    AlreadyRegistered,
    Registered,
    /// unknown user but no claims to register from
    RegistrationSkipped,
    LookupFailed,
    RegistrationFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncDecision {
    pub user_id: Option<String>,
    pub outcome: SyncOutcome,
}

#[derive(Clone)]
pub struct UserSync {
    directory: Arc<dyn IdentityDirectory>,
}

impl UserSync {
    pub fn new(directory: Arc<dyn IdentityDirectory>) -> Self {
        Self { directory }
    }

    /// Run the sync sequence for one request's headers.
    ///
    /// Never fails: every directory error is absorbed into the outcome.
    pub async fn sync(&self, headers: &HeaderMap) -> SyncDecision {
        let authorization = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let header_user_id = headers.get(USER_ID_HEADER).and_then(|v| v.to_str().ok());

        let claims = claims::extract(authorization);

        let Some(user_id) = resolver::resolve(header_user_id, claims.as_ref()) else {
            return SyncDecision {
                user_id: None,
                outcome: SyncOutcome::PassThrough,
            };
        };

        let outcome = match self.directory.exists(&user_id).await {
            Ok(true) => {
                tracing::info!(user_id = %user_id, "user already exists, skipping sync");
                SyncOutcome::AlreadyRegistered
            }
            Ok(false) => match claims.as_ref() {
                Some(claims) => match self.directory.register(claims).await {
                    Ok(profile) => {
                        tracing::info!(
                            user_id = %user_id,
                            profile_id = %profile.id,
                            "registered user from token claims"
                        );
                        SyncOutcome::Registered
                    }
                    Err(err) => {
                        tracing::warn!(
                            user_id = %user_id,
                            backend = self.directory.backend_name(),
                            status = ?err.status(),
                            error = %err,
                            "user registration failed, forwarding anyway"
                        );
                        SyncOutcome::RegistrationFailed
                    }
                },
                None => {
                    tracing::info!(
                        user_id = %user_id,
                        "unknown user without token claims, cannot register"
                    );
                    SyncOutcome::RegistrationSkipped
                }
            },
            Err(err) => {
                tracing::warn!(
                    user_id = %user_id,
                    backend = self.directory.backend_name(),
                    status = ?err.status(),
                    error = %err,
                    "user lookup failed, forwarding anyway"
                );
                SyncOutcome::LookupFailed
            }
        };

        SyncDecision {
            user_id: Some(user_id),
            outcome,
        }
    }
}

/// Wrap the proxied routes with the user-sync middleware.
///
/// Example:
/// ```ignore
/// let proxied = api::routes(&state);
/// let proxied = middleware::user_sync::apply(proxied, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router.layer(middleware::from_fn_with_state(state, user_sync_middleware))
}

async fn user_sync_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let decision = state.user_sync.sync(req.headers()).await;

    match decision.user_id.as_deref() {
        Some(user_id) => match HeaderValue::from_str(user_id) {
            // insert replaces every previous value
            Ok(value) => {
                req.headers_mut().insert(USER_ID_HEADER, value);
            }
            Err(_) => {
                tracing::warn!(
                    user_id = ?user_id,
                    "resolved user id is not a valid header value, forwarding without it"
                );
                req.headers_mut().remove(USER_ID_HEADER);
            }
        },
        // only blank or unreadable values are left here; they never reach upstream
        None => {
            req.headers_mut().remove(USER_ID_HEADER);
        }
    }

    req.extensions_mut().insert(decision.outcome);

    next.run(req).await
}
