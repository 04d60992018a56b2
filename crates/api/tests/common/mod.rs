#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use axum_extra::extract::cookie::Cookie;
use http_body_util::BodyExt;
use pairauth_api::auth::cookies::{ACCESS_COOKIE, REFRESH_COOKIE};
use pairauth_api::auth::jwt::JwtConfig;
use pairauth_api::config::ServerConfig;
use pairauth_api::router::build_app_router;
use pairauth_api::state::AppState;
use pairauth_core::hashing::Argon2Hasher;
use pairauth_core::session::SessionConfig;
use sqlx::PgPool;
use tower::ServiceExt;

pub const TEST_SECRET: &str = "integration-test-secret-long-enough-for-hs512";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        sweep_interval_secs: 3600,
        cookie_secure: false,
        jwt: JwtConfig {
            secret: TEST_SECRET.to_string(),
            access_token_expiry_mins: 30,
        },
        session: SessionConfig::default(),
    }
}

/// Argon2id with minimal cost so tests stay fast.
pub fn cheap_hasher() -> Argon2Hasher {
    Argon2Hasher::with_params(argon2::Params::new(16, 1, 1, None).unwrap())
}

pub fn test_state(pool: PgPool) -> AppState {
    AppState::with_hasher(pool, Arc::new(test_config()), cheap_hasher())
}

/// Build the application router over `state` with the production middleware stack.
pub fn app_for(state: AppState) -> Router {
    build_app_router(state, &test_config()).unwrap()
}

pub fn build_test_app(pool: PgPool) -> Router {
    app_for(test_state(pool))
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

pub async fn get(app: Router, uri: &str) -> Response {
    app.oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

/// GET with a `Cookie` header built from `(name, value)` pairs.
pub async fn get_with_cookies(app: Router, uri: &str, cookies: &[(&str, &str)]) -> Response {
    let header = cookies
        .iter()
        .map(|(name, value)| format!("{name}={value}"))
        .collect::<Vec<_>>()
        .join("; ");

    app.oneshot(
        Request::get(uri)
            .header(COOKIE, header)
            .body(Body::empty())
            .unwrap(),
    )
    .await
    .unwrap()
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Parse every `Set-Cookie` header of `response`, keyed by cookie name.
pub fn set_cookies(response: &Response) -> HashMap<String, Cookie<'static>> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|v| {
            let cookie = Cookie::parse_encoded(v.to_str().unwrap().to_string()).unwrap();
            (cookie.name().to_string(), cookie)
        })
        .collect()
}

/// The cookie pair a client holds after `/auth` or `/token_refresh`.
#[derive(Debug, Clone)]
pub struct ClientCookies {
    pub access: String,
    pub refresh: String,
}

impl ClientCookies {
    pub fn from_response(response: &Response) -> Self {
        let cookies = set_cookies(response);
        Self {
            access: cookies[ACCESS_COOKIE].value().to_string(),
            refresh: cookies[REFRESH_COOKIE].value().to_string(),
        }
    }

    pub fn pairs(&self) -> [(&str, &str); 2] {
        [
            (ACCESS_COOKIE, self.access.as_str()),
            (REFRESH_COOKIE, self.refresh.as_str()),
        ]
    }
}

/// Call `/auth` for `guid` and return the cookies it set.
pub async fn login(app: Router, guid: &str) -> ClientCookies {
    let response = get(app, &format!("/auth?guid={guid}")).await;
    assert_eq!(response.status(), axum::http::StatusCode::OK);
    ClientCookies::from_response(&response)
}
