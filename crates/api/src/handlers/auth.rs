//! Handlers for session issue, refresh, and revocation.
//!
//! Credentials travel only in cookies; response bodies carry expiry
//! metadata, never the credentials themselves.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::CookieJar;
use pairauth_core::error::CoreError;
use pairauth_core::session::IssuedRefresh;
use pairauth_core::types::Timestamp;
use serde::Serialize;

use crate::auth::cookies::{
    clear_session_cookies, decode_refresh, set_session_cookies, REFRESH_COOKIE,
};
use crate::auth::jwt::{generate_access_token, IssuedAccess};
use crate::error::{AppError, AppResult};
use crate::middleware::auth::{AccessSession, Guid};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

/// Body returned whenever a credential pair is (re)issued.
#[derive(Debug, Serialize)]
pub struct SessionIssued {
    pub guid: String,
    pub access_expires_at: Timestamp,
    pub refresh_expires_at: Timestamp,
}

type IssuedResponse = (CookieJar, Json<DataResponse<SessionIssued>>);

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /auth?guid=
///
/// Open a new session for `guid` and set both credential cookies.
pub async fn issue(
    State(state): State<AppState>,
    Guid(owner_id): Guid,
    jar: CookieJar,
) -> AppResult<IssuedResponse> {
    let access = sign_access(&state, &owner_id)?;
    let refresh = state.sessions.issue_session(&owner_id, &access.token).await?;

    Ok(issued_response(&state, jar, owner_id, &access, &refresh))
}

/// GET /token_refresh?guid=
///
/// Consume the presented pair and replace it with a fresh one.
pub async fn refresh(
    State(state): State<AppState>,
    session: AccessSession,
    jar: CookieJar,
) -> AppResult<IssuedResponse> {
    let old_refresh = refresh_from_jar(&jar)?;
    let access = sign_access(&state, &session.owner_id)?;

    let refresh = state
        .sessions
        .rotate_session(
            &session.owner_id,
            &session.access_token,
            &old_refresh,
            &access.token,
        )
        .await?;

    Ok(issued_response(
        &state,
        jar,
        session.owner_id,
        &access,
        &refresh,
    ))
}

/// GET /token_refresh_remove?guid=
///
/// Revoke the presented session after checking its refresh credential.
pub async fn revoke(
    State(state): State<AppState>,
    session: AccessSession,
    jar: CookieJar,
) -> AppResult<(CookieJar, StatusCode)> {
    let refresh = refresh_from_jar(&jar)?;

    state
        .sessions
        .revoke_session(&session.owner_id, &session.access_token, &refresh)
        .await?;

    Ok((clear_session_cookies(jar), StatusCode::NO_CONTENT))
}

/// GET /token_refresh_remove_all?guid=
///
/// Revoke every session of `guid`. Only the access cookie is checked.
pub async fn revoke_all(
    State(state): State<AppState>,
    session: AccessSession,
    jar: CookieJar,
) -> AppResult<(CookieJar, StatusCode)> {
    let removed = state.sessions.revoke_all_sessions(&session.owner_id).await?;
    tracing::debug!(owner_id = %session.owner_id, removed, "Revoke-all completed");

    Ok((clear_session_cookies(jar), StatusCode::NO_CONTENT))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn sign_access(state: &AppState, owner_id: &str) -> AppResult<IssuedAccess> {
    generate_access_token(owner_id, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))
}

/// Read the plaintext refresh credential from the `token_r` cookie.
fn refresh_from_jar(jar: &CookieJar) -> AppResult<String> {
    let encoded = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Missing refresh cookie".into()))
        })?;

    decode_refresh(encoded)
        .ok_or_else(|| AppError::BadRequest("Malformed refresh cookie".into()))
}

fn issued_response(
    state: &AppState,
    jar: CookieJar,
    owner_id: String,
    access: &IssuedAccess,
    refresh: &IssuedRefresh,
) -> IssuedResponse {
    let jar = set_session_cookies(
        jar,
        &access.token,
        access.expires_at,
        &refresh.refresh_credential,
        refresh.refresh_expires_at,
        state.config.cookie_secure,
    );

    let body = SessionIssued {
        guid: owner_id,
        access_expires_at: access.expires_at,
        refresh_expires_at: refresh.refresh_expires_at,
    };

    (jar, Json(DataResponse { data: body }))
}
