use std::time::SystemTime;

use axum::http::{HeaderMap, HeaderValue, header};
use merx_core::IssuedToken;

/// Cookie carrying the refresh token between calls.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Scope the cookie to the auth routes so it is not replayed to the
/// rest of the API surface.
const COOKIE_PATH: &str = "/api/auth";

/// Build the `Set-Cookie` header for a freshly issued refresh token.
///
/// `HttpOnly`, and the cookie expiry equals the token's `expires_at`.
pub fn refresh_cookie(token: &IssuedToken) -> Result<HeaderValue, header::InvalidHeaderValue> {
    let expires = httpdate::fmt_http_date(SystemTime::from(token.expires_at()));
    HeaderValue::from_str(&format!(
        "{REFRESH_COOKIE}={}; HttpOnly; Path={COOKIE_PATH}; Expires={expires}",
        token.as_str()
    ))
}

/// Extract the refresh cookie's value from the request headers.
pub fn refresh_cookie_value(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == REFRESH_COOKIE)
        .map(|(_, value)| value.to_string())
}
