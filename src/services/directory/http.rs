use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use reqwest::Client;
use url::Url;

use crate::services::directory::client::{
    DirectoryError, DirectoryResult, IdentityDirectory, Profile, RegisterRequest,
};
use crate::services::identity::IdentityClaims;

/// user-service backed identity directory.
///
/// - `GET  /api/users/{id}/validate` -> boolean
/// - `POST /api/users/register`      -> Profile
///
/// Every call is bounded by the client timeout; a timeout is reported like any
/// other transport failure.
#[derive(Clone, Debug)]
pub struct HttpDirectoryClient {
    client: Client,
    base_url: Url,
    register_password: String,
}

impl HttpDirectoryClient {
    pub fn new(
        base_url: Url,
        timeout: Duration,
        register_password: impl Into<String>,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url,
            register_password: register_password.into(),
        })
    }

    // Each segment is percent-encoded on its own, so an id can never escape its slot.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

#[async_trait]
impl IdentityDirectory for HttpDirectoryClient {
    fn backend_name(&self) -> &'static str {
        "user-service"
    }

    async fn exists(&self, user_id: &str) -> DirectoryResult<bool> {
        tracing::info!(user_id = %user_id, "calling validate user");

        let url = self.endpoint(&["api", "users", user_id, "validate"]);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| DirectoryError::LookupFailed {
                status: e.status(),
                message: e.to_string(),
            })?;

        let status = response.status();

        // Unknown user is an answer, not a failure
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DirectoryError::LookupFailed {
                status: Some(status),
                message,
            });
        }

        response
            .json::<bool>()
            .await
            .map_err(|e| DirectoryError::LookupFailed {
                status: Some(status),
                message: format!("unexpected validate body: {}", e),
            })
    }

    async fn register(&self, claims: &IdentityClaims) -> DirectoryResult<Profile> {
        tracing::info!(
            user_id = %claims.subject,
            email = claims.email.as_deref().unwrap_or("-"),
            "calling user registration"
        );

        let url = self.endpoint(&["api", "users", "register"]);
        let body = RegisterRequest::from_claims(claims, self.register_password.as_str());

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| DirectoryError::RegistrationUnavailable {
                status: e.status(),
                message: e.to_string(),
            })?;

        let status = response.status();

        if status.is_client_error() {
            let message = response.text().await.unwrap_or_default();
            return Err(DirectoryError::RegistrationRejected { status, message });
        }

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DirectoryError::RegistrationUnavailable {
                status: Some(status),
                message,
            });
        }

        response
            .json::<Profile>()
            .await
            .map_err(|e| DirectoryError::RegistrationUnavailable {
                status: Some(status),
                message: format!("unexpected register body: {}", e),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::unreachable_uri;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(uri: &str) -> HttpDirectoryClient {
        let base = Url::parse(uri).expect("mock uri");
        HttpDirectoryClient::new(base, Duration::from_millis(500), "dummyPassword")
            .expect("client")
    }

    fn claims() -> IdentityClaims {
        IdentityClaims {
            subject: "kc-7".into(),
            email: Some("ada@example.com".into()),
            given_name: Some("Ada".into()),
            family_name: Some("Lovelace".into()),
        }
    }

    #[tokio::test]
    async fn exists_reads_boolean_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users/u-42/validate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(true)))
            .expect(1)
            .mount(&server)
            .await;

        let exists = client_for(&server.uri()).exists("u-42").await.expect("lookup");

        assert!(exists);
    }

    #[tokio::test]
    async fn exists_maps_not_found_to_false() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users/kc-7/validate"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let exists = client_for(&server.uri()).exists("kc-7").await.expect("lookup");

        assert!(!exists);
    }

    #[tokio::test]
    async fn exists_encodes_id_as_single_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/users/a%2Fb/validate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(false)))
            .expect(1)
            .mount(&server)
            .await;

        let exists = client_for(&server.uri()).exists("a/b").await.expect("lookup");

        assert!(!exists);
    }

    #[tokio::test]
    async fn exists_reports_client_errors_with_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(400).set_body_string("Invalid Request"))
            .mount(&server)
            .await;

        let err = client_for(&server.uri()).exists("u-42").await.unwrap_err();

        assert!(matches!(err, DirectoryError::LookupFailed { .. }));
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn exists_reports_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client_for(&server.uri()).exists("u-42").await.unwrap_err();

        assert!(matches!(err, DirectoryError::LookupFailed { .. }));
        assert_eq!(err.status(), Some(StatusCode::SERVICE_UNAVAILABLE));
    }

    #[tokio::test]
    async fn exists_rejects_non_boolean_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = client_for(&server.uri()).exists("u-42").await.unwrap_err();

        assert!(matches!(err, DirectoryError::LookupFailed { .. }));
    }

    #[tokio::test]
    async fn exists_reports_transport_failure_without_status() {
        let uri = unreachable_uri();

        let err = client_for(&uri).exists("u-42").await.unwrap_err();

        assert!(matches!(err, DirectoryError::LookupFailed { status: None, .. }));
    }

    #[tokio::test]
    async fn exists_times_out_as_lookup_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!(true))
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let err = client_for(&server.uri()).exists("u-42").await.unwrap_err();

        assert!(matches!(err, DirectoryError::LookupFailed { status: None, .. }));
    }

    #[tokio::test]
    async fn register_posts_claims_and_reads_profile() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/users/register"))
            .and(body_json(json!({
                "email": "ada@example.com",
                "firstName": "Ada",
                "lastName": "Lovelace",
                "keyCloakId": "kc-7",
                "password": "dummyPassword"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "user-123",
                "email": "ada@example.com",
                "firstName": "Ada",
                "lastName": "Lovelace"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let profile = client_for(&server.uri())
            .register(&claims())
            .await
            .expect("register");

        assert_eq!(profile.id, "user-123");
        assert_eq!(profile.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn register_maps_client_errors_to_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(409).set_body_string("Email already exists"))
            .mount(&server)
            .await;

        let err = client_for(&server.uri()).register(&claims()).await.unwrap_err();

        match err {
            DirectoryError::RegistrationRejected { status, message } => {
                assert_eq!(status, StatusCode::CONFLICT);
                assert_eq!(message, "Email already exists");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn register_maps_server_errors_to_unavailable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let err = client_for(&server.uri()).register(&claims()).await.unwrap_err();

        assert!(matches!(
            err,
            DirectoryError::RegistrationUnavailable {
                status: Some(StatusCode::INTERNAL_SERVER_ERROR),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn register_maps_transport_failure_to_unavailable() {
        let uri = unreachable_uri();

        let err = client_for(&uri).register(&claims()).await.unwrap_err();

        assert!(matches!(
            err,
            DirectoryError::RegistrationUnavailable { status: None, .. }
        ));
    }
}
