//! Cookie transport of the access/refresh credential pair.
//!
//! The access credential travels as-is in `token_a`. The refresh credential
//! travels in `token_r` under standard base64; the encoding only keeps the
//! value cookie-safe and protects nothing.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use pairauth_core::types::Timestamp;

/// Cookie carrying the signed access credential.
pub const ACCESS_COOKIE: &str = "token_a";

/// Cookie carrying the base64-encoded refresh credential.
pub const REFRESH_COOKIE: &str = "token_r";

/// Encode a plaintext refresh credential for the `token_r` cookie.
pub fn encode_refresh(credential: &str) -> String {
    STANDARD.encode(credential)
}

/// Decode a `token_r` cookie value. Returns `None` for invalid base64 or
/// non-UTF-8 content.
pub fn decode_refresh(encoded: &str) -> Option<String> {
    let bytes = STANDARD.decode(encoded).ok()?;
    String::from_utf8(bytes).ok()
}

/// Add both session cookies to `jar`, each expiring with its credential.
pub fn set_session_cookies(
    jar: CookieJar,
    access_token: &str,
    access_expires_at: Timestamp,
    refresh_credential: &str,
    refresh_expires_at: Timestamp,
    secure: bool,
) -> CookieJar {
    jar.add(session_cookie(
        ACCESS_COOKIE,
        access_token.to_string(),
        access_expires_at,
        secure,
    ))
    .add(session_cookie(
        REFRESH_COOKIE,
        encode_refresh(refresh_credential),
        refresh_expires_at,
        secure,
    ))
}

/// Expire both session cookies on the client.
pub fn clear_session_cookies(jar: CookieJar) -> CookieJar {
    jar.remove(Cookie::build(ACCESS_COOKIE).path("/"))
        .remove(Cookie::build(REFRESH_COOKIE).path("/"))
}

fn session_cookie(
    name: &'static str,
    value: String,
    expires_at: Timestamp,
    secure: bool,
) -> Cookie<'static> {
    let max_age = (expires_at - Utc::now()).num_seconds().max(0);
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(max_age))
        .build()
}
