//! Cookie-based session extractors for Axum handlers.
//!
//! Every route carries the owner id in the `guid` query parameter. The
//! extractors here validate it and, where a session is required, bind the
//! `token_a` access credential to that owner.

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;
use pairauth_core::error::CoreError;
use pairauth_core::types::validate_owner_id;
use serde::Deserialize;

use crate::auth::cookies::ACCESS_COOKIE;
use crate::auth::jwt::{verify_access_token, AccessVerdict};
use crate::error::AppError;
use crate::state::AppState;

/// Raw `?guid=` query parameter.
#[derive(Debug, Deserialize)]
pub struct GuidQuery {
    pub guid: Option<String>,
}

/// Validated owner id taken from the `guid` query parameter.
#[derive(Debug, Clone)]
pub struct Guid(pub String);

impl<S: Send + Sync> FromRequestParts<S> for Guid {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        guid_from_parts(parts).map(Guid)
    }
}

/// Session proven by an authentic, unexpired access cookie issued for the
/// requested `guid`.
#[derive(Debug, Clone)]
pub struct AccessSession {
    /// The owner id (`guid`), equal to the token's `sub`.
    pub owner_id: String,
    /// The raw access credential, i.e. the session lookup key.
    pub access_token: String,
}

impl FromRequestParts<AppState> for AccessSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        authenticate(parts, state)
    }
}

fn guid_from_parts(parts: &Parts) -> Result<String, AppError> {
    let Query(query) = Query::<GuidQuery>::try_from_uri(&parts.uri)
        .map_err(|e| AppError::BadRequest(format!("Invalid query string: {e}")))?;

    let guid = query.guid.unwrap_or_default();
    validate_owner_id(&guid)?;
    Ok(guid)
}

fn authenticate(parts: &Parts, state: &AppState) -> Result<AccessSession, AppError> {
    let owner_id = guid_from_parts(parts)?;

    let jar = CookieJar::from_headers(&parts.headers);
    let access_token = jar
        .get(ACCESS_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| unauthorized("Missing access cookie"))?;

    let claims = match verify_access_token(&access_token, &state.config.jwt) {
        AccessVerdict::Valid(claims) => claims,
        AccessVerdict::Expired => return Err(unauthorized("Access token has expired")),
        AccessVerdict::Invalid => return Err(unauthorized("Invalid access token")),
    };

    if claims.sub != owner_id {
        tracing::warn!(owner_id, "Access token presented for a different owner");
        return Err(unauthorized("Access token does not belong to guid"));
    }

    Ok(AccessSession {
        owner_id,
        access_token,
    })
}

fn unauthorized(reason: &str) -> AppError {
    AppError::Core(CoreError::Unauthorized(reason.into()))
}
