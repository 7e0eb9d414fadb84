//! Bearer token resolution
//!
//! Tokens are taken from `Authorization: Bearer <base64>` first and from the
//! `Bearer` cookie otherwise. A token that is present but malformed rejects
//! the request; it is never treated as anonymous.

use crate::ApiError;
use axum::http::{HeaderMap, header::AUTHORIZATION};
use axum_extra::extract::CookieJar;
use neogate_core::{BearerToken, OwnerId};

/// Name of the cookie carrying a bearer token
pub const BEARER_COOKIE: &str = "Bearer";

/// Extract bearer token from Authorization header.
///
/// The `Bearer` scheme with nothing after it yields an empty token, which
/// then fails to decode; it does not fall through to the cookie.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    if auth_header == "Bearer" {
        return Some("");
    }
    auth_header.strip_prefix("Bearer ").map(str::trim)
}

/// Raw base64 token from the request, header taking precedence over cookie
fn raw_bearer_token(headers: &HeaderMap) -> Option<String> {
    let from_header = headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(extract_bearer_token);
    if let Some(token) = from_header {
        return Some(token.to_string());
    }

    CookieJar::from_headers(headers)
        .get(BEARER_COOKIE)
        .map(|cookie| cookie.value().trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Resolve the request's bearer token: `Ok(None)` when absent, an
/// `InvalidBearerToken` error when present but undecodable.
pub fn resolve_bearer_token(headers: &HeaderMap) -> Result<Option<BearerToken>, ApiError> {
    let Some(raw) = raw_bearer_token(headers) else {
        return Ok(None);
    };

    BearerToken::from_base64(&raw).map(Some).map_err(|e| {
        tracing::debug!(error = %e, "Bearer token rejected");
        ApiError::from(e)
    })
}

/// Owner of objects written under the token: its issuer, or the gateway default
pub fn resolve_owner(token: Option<&BearerToken>, default_owner: OwnerId) -> OwnerId {
    token.map(BearerToken::issuer).unwrap_or(default_owner)
}
