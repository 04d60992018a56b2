use std::sync::Arc;

use pairauth_core::hashing::Argon2Hasher;
use pairauth_core::session::SessionRotator;
use pairauth_db::PgSessionStore;

use crate::config::ServerConfig;

/// Session rotator over PostgreSQL with Argon2id-hashed refresh credentials.
pub type Sessions = SessionRotator<PgSessionStore, Argon2Hasher>;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: pairauth_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Session issue, rotation, and revocation.
    pub sessions: Arc<Sessions>,
}

impl AppState {
    /// Build state with the default Argon2id parameters.
    pub fn new(pool: pairauth_db::DbPool, config: Arc<ServerConfig>) -> Self {
        Self::with_hasher(pool, config, Argon2Hasher::default())
    }

    /// Build state with an explicit hasher (tests use cheaper parameters).
    pub fn with_hasher(
        pool: pairauth_db::DbPool,
        config: Arc<ServerConfig>,
        hasher: Argon2Hasher,
    ) -> Self {
        let sessions = SessionRotator::new(
            PgSessionStore::new(pool.clone()),
            hasher,
            config.session.clone(),
        );
        Self {
            pool,
            config,
            sessions: Arc::new(sessions),
        }
    }
}
