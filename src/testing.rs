//! Test doubles shared by the unit tests.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::http::StatusCode;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use tokio::sync::Barrier;

use crate::services::directory::client::{
    DirectoryError, DirectoryResult, IdentityDirectory, Profile,
};
use crate::services::identity::IdentityClaims;

pub fn encode_segment(value: &serde_json::Value) -> String {
    URL_SAFE_NO_PAD.encode(value.to_string())
}

/// `Bearer <jws>` with the given payload. The signature segment is junk:
/// the gateway never verifies it.
pub fn bearer(payload: serde_json::Value) -> String {
    let header = encode_segment(&serde_json::json!({ "alg": "RS256", "typ": "JWT" }));
    format!("Bearer {}.{}.c2lnbmF0dXJl", header, encode_segment(&payload))
}

/// An http URI nothing listens on.
pub fn unreachable_uri() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{}", addr)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryCall {
    Exists(String),
    Register(String),
}

#[derive(Debug, Clone, Copy, Default)]
enum LookupMode {
    #[default]
    Answer,
    Fail,
    Hang,
}

#[derive(Debug, Clone, Copy, Default)]
enum RegistrationMode {
    #[default]
    Accept,
    Reject,
    Unavailable,
    Hang,
}

/// In-memory directory that records every call in order.
///
/// `exists` answers from the set of known users; `register` adds the subject
/// to that set (and happily registers it twice if asked to).
#[derive(Default)]
pub struct FakeDirectory {
    known: Mutex<HashSet<String>>,
    calls: Mutex<Vec<DirectoryCall>>,
    lookup: LookupMode,
    registration: RegistrationMode,
    lookup_barrier: Option<Arc<Barrier>>,
}

impl FakeDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user_id: &str) -> Self {
        self.known
            .lock()
            .expect("known lock")
            .insert(user_id.to_string());
        self
    }

    pub fn failing_lookups(mut self) -> Self {
        self.lookup = LookupMode::Fail;
        self
    }

    pub fn hanging_lookups(mut self) -> Self {
        self.lookup = LookupMode::Hang;
        self
    }

    pub fn rejecting_registrations(mut self) -> Self {
        self.registration = RegistrationMode::Reject;
        self
    }

    pub fn unavailable_registrations(mut self) -> Self {
        self.registration = RegistrationMode::Unavailable;
        self
    }

    pub fn hanging_registrations(mut self) -> Self {
        self.registration = RegistrationMode::Hang;
        self
    }

    /// Every lookup waits on the barrier before answering, so concurrent
    /// lookups all observe the directory before any registration lands.
    pub fn with_lookup_barrier(mut self, barrier: Arc<Barrier>) -> Self {
        self.lookup_barrier = Some(barrier);
        self
    }

    pub fn calls(&self) -> Vec<DirectoryCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn register_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, DirectoryCall::Register(_)))
            .count()
    }

    fn record(&self, call: DirectoryCall) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

#[async_trait]
impl IdentityDirectory for FakeDirectory {
    fn backend_name(&self) -> &'static str {
        "fake"
    }

    async fn exists(&self, user_id: &str) -> DirectoryResult<bool> {
        self.record(DirectoryCall::Exists(user_id.to_string()));

        // answer from the state seen on arrival, not after the barrier
        let known = self.known.lock().expect("known lock").contains(user_id);

        if let Some(barrier) = &self.lookup_barrier {
            barrier.wait().await;
        }

        match self.lookup {
            LookupMode::Answer => Ok(known),
            LookupMode::Fail => Err(DirectoryError::LookupFailed {
                status: None,
                message: "connection refused".into(),
            }),
            LookupMode::Hang => std::future::pending().await,
        }
    }

    async fn register(&self, claims: &IdentityClaims) -> DirectoryResult<Profile> {
        self.record(DirectoryCall::Register(claims.subject.clone()));

        match self.registration {
            RegistrationMode::Accept => {
                self.known
                    .lock()
                    .expect("known lock")
                    .insert(claims.subject.clone());

                Ok(Profile {
                    id: format!("profile-{}", claims.subject),
                    email: claims.email.clone(),
                    first_name: claims.given_name.clone(),
                    last_name: claims.family_name.clone(),
                    created_date: None,
                    updated_date: None,
                })
            }
            RegistrationMode::Reject => Err(DirectoryError::RegistrationRejected {
                status: StatusCode::BAD_REQUEST,
                message: "Email already exists".into(),
            }),
            RegistrationMode::Unavailable => Err(DirectoryError::RegistrationUnavailable {
                status: Some(StatusCode::INTERNAL_SERVER_ERROR),
                message: "Internal server error".into(),
            }),
            RegistrationMode::Hang => std::future::pending().await,
        }
    }
}
