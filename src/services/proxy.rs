//! Reverse proxy to the backend services.
//!
//! Responsibility:
//! - Map a path prefix to an upstream (`/api/users` -> user-service, ...)
//! - Forward method, path, query, headers and body; relay the response back
//! - Strip hop-by-hop headers in both directions
//!
//! Whatever the user-sync middleware attached (`X-USER-ID`) travels as a plain
//! header; this module knows nothing about identities.

use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderMap, Request, Response, header},
};
use http_body_util::LengthLimitError;
use reqwest::Client;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("no route for {0}")]
    NoRoute(String),
    #[error("request body exceeds the limit")]
    BodyTooLarge,
    #[error("failed to read request body: {0}")]
    Body(#[source] axum::Error),
    #[error("upstream timed out: {0}")]
    Timeout(#[source] reqwest::Error),
    #[error("upstream unavailable: {0}")]
    Upstream(#[source] reqwest::Error),
}

impl From<reqwest::Error> for ProxyError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e)
        } else {
            Self::Upstream(e)
        }
    }
}

/// One entry of the route table.
#[derive(Debug, Clone)]
pub struct Route {
    pub prefix: String,
    pub upstream: Url,
}

impl Route {
    pub fn new(prefix: impl Into<String>, upstream: Url) -> Self {
        Self {
            prefix: prefix.into(),
            upstream,
        }
    }

    // `/api/users` matches `/api/users` and `/api/users/...`, not `/api/usersX`
    fn matches(&self, path: &str) -> bool {
        match path.strip_prefix(self.prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }
}

const HOP_BY_HOP: [header::HeaderName; 8] = [
    header::CONNECTION,
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    header::HeaderName::from_static("keep-alive"),
];

// the limit error sits somewhere below axum's wrapper (ours or tower-http's)
fn is_length_limit(err: &axum::Error) -> bool {
    let mut source = Some(err as &(dyn std::error::Error + 'static));
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

fn read_error(err: axum::Error) -> ProxyError {
    if is_length_limit(&err) {
        ProxyError::BodyTooLarge
    } else {
        ProxyError::Body(err)
    }
}

fn strip_hop_by_hop(mut headers: HeaderMap) -> HeaderMap {
    for name in HOP_BY_HOP.iter() {
        headers.remove(name);
    }
    // recomputed for the new connection
    headers.remove(header::CONTENT_LENGTH);
    headers
}

#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: Client,
    routes: Vec<Route>,
    max_body_bytes: usize,
}

impl ProxyClient {
    pub fn new(
        routes: Vec<Route>,
        timeout: Duration,
        max_body_bytes: usize,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            routes,
            max_body_bytes,
        })
    }

    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(|r| r.prefix.as_str())
    }

    pub fn route_for(&self, path: &str) -> Option<&Route> {
        self.routes.iter().find(|r| r.matches(path))
    }

    /// Forward the request to the upstream owning its path.
    pub async fn forward(&self, req: Request<Body>) -> Result<Response<Body>, ProxyError> {
        let (parts, body) = req.into_parts();

        let path = parts.uri.path();
        let route = self
            .route_for(path)
            .ok_or_else(|| ProxyError::NoRoute(path.to_string()))?;

        let mut url = route.upstream.clone();
        url.set_path(path);
        url.set_query(parts.uri.query());

        let body = axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(read_error)?;

        let mut headers = strip_hop_by_hop(parts.headers);
        headers.remove(header::HOST);

        tracing::debug!(
            method = %parts.method,
            upstream = %url,
            "forwarding request"
        );

        let upstream = self
            .client
            .request(parts.method, url)
            .headers(headers)
            .body(body)
            .send()
            .await?;

        let status = upstream.status();
        let headers = strip_hop_by_hop(upstream.headers().clone());
        let bytes = upstream.bytes().await?;

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = headers;

        Ok(response)
    }
}
