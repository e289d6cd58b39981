//! Caller identity from request headers.

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use raidhub_core::SessionId;

/// Header carrying the caller's session id.
pub const SESSION_HEADER: &str = "x-session-id";
/// Cookie carrying the caller's session id when the header is absent.
pub const SESSION_COOKIE: &str = "PHPSESSID";

/// The caller's session id: `X-Session-Id`, else the `PHPSESSID` cookie.
///
/// Empty values count as absent.
pub fn session_from_headers(headers: &HeaderMap) -> Option<SessionId> {
    if let Some(value) = headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok()) {
        let value = value.trim();
        if !value.is_empty() {
            return Some(SessionId::from(value));
        }
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|cookies| cookies.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| SessionId::from(value))
}
