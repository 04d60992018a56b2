//! Route definitions for session issue, refresh, and revocation.

use axum::routing::get;
use axum::Router;

use crate::handlers::auth;
use crate::state::AppState;

/// Session routes, mounted at the root. Each takes `?guid=`.
///
/// ```text
/// GET /auth                      -> issue
/// GET /token_refresh             -> refresh (access + refresh cookies)
/// GET /token_refresh_remove      -> revoke  (access + refresh cookies)
/// GET /token_refresh_remove_all  -> revoke_all (unexpired access cookie)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth", get(auth::issue))
        .route("/token_refresh", get(auth::refresh))
        .route("/token_refresh_remove", get(auth::revoke))
        .route("/token_refresh_remove_all", get(auth::revoke_all))
}
