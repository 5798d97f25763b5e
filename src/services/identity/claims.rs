//! Bearer token → IdentityClaims (decode only).
//!
//! The gateway sits behind the identity provider and receives tokens that were
//! already verified upstream, so this module never checks the signature. It only
//! requires the token to be a structurally valid compact JWS and reads the
//! identity claims out of the payload.
//!
//! Every failure collapses into `None` for the caller; the reason is logged at
//! debug level (never the token itself).

use axum::http::HeaderValue;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserialize;

/// Identity attributes read from a bearer token. Scoped to one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub subject: String,
    pub email: Option<String>,
    pub given_name: Option<String>,
    pub family_name: Option<String>,
}

// OIDC standard claim names. Optional claims must be strings when present;
// anything else makes the whole claim set undecodable.
#[derive(Debug, Deserialize)]
struct RawClaims {
    #[serde(default)]
    sub: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    given_name: Option<String>,
    #[serde(default)]
    family_name: Option<String>,
}

#[derive(Debug, thiserror::Error)]
enum ClaimsDecodeFailure {
    #[error("authorization scheme is not Bearer")]
    NotBearer,
    #[error("token is not a compact JWS")]
    Malformed,
    #[error("invalid JWS header: {0}")]
    Header(#[from] jsonwebtoken::errors::Error),
    #[error("payload is not base64url: {0}")]
    Payload(#[from] base64::DecodeError),
    #[error("payload is not the expected claim set: {0}")]
    ClaimSet(#[from] serde_json::Error),
    #[error("missing 'sub' claim")]
    MissingSubject,
    #[error("'sub' claim cannot be sent as a header value")]
    InvalidSubject,
}

/// Extract identity claims from an `Authorization` header value.
///
/// Returns `None` when the header is absent, is not `Bearer <token>`, the token
/// is not a signed compact JWS, or the payload lacks a non-empty `sub`.
/// The subject is trimmed and must be usable as an `X-USER-ID` value.
pub fn extract(authorization: Option<&str>) -> Option<IdentityClaims> {
    let value = authorization?;

    match decode(value) {
        Ok(claims) => Some(claims),
        Err(err) => {
            tracing::debug!(error = %err, "bearer claims could not be decoded");
            None
        }
    }
}

fn decode(value: &str) -> Result<IdentityClaims, ClaimsDecodeFailure> {
    let token = value
        .strip_prefix("Bearer ")
        .ok_or(ClaimsDecodeFailure::NotBearer)?
        .trim();

    // header.payload.signature, all three present
    let mut segments = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) = (
        segments.next(),
        segments.next(),
        segments.next(),
        segments.next(),
    ) else {
        return Err(ClaimsDecodeFailure::Malformed);
    };
    if header.is_empty() || payload.is_empty() || signature.is_empty() {
        return Err(ClaimsDecodeFailure::Malformed);
    }

    jsonwebtoken::decode_header(token)?;

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;
    let raw: RawClaims = serde_json::from_slice(&bytes)?;

    let subject = raw
        .sub
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(ClaimsDecodeFailure::MissingSubject)?;
    if HeaderValue::from_str(&subject).is_err() {
        return Err(ClaimsDecodeFailure::InvalidSubject);
    }

    Ok(IdentityClaims {
        subject,
        email: raw.email,
        given_name: raw.given_name,
        family_name: raw.family_name,
    })
}
