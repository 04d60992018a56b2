//! Periodic removal of sessions whose refresh window has closed.
//!
//! Expired rows can never be honored again; the rotator rejects them on
//! read. This job only keeps `user_sessions` from growing without bound.

use std::time::Duration;

use chrono::Utc;
use pairauth_db::repositories::SessionRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

/// Delete every session that expired before now. Returns the row count.
pub async fn sweep_once(pool: &PgPool) -> Result<u64, sqlx::Error> {
    SessionRepo::delete_expired(pool, Utc::now()).await
}

/// Run the sweep loop every `interval` until `cancel` is triggered.
///
/// Failures are logged and retried on the next tick.
pub async fn run(pool: PgPool, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        interval_secs = interval.as_secs(),
        "Session sweeper started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session sweeper stopping");
                break;
            }
            _ = ticker.tick() => {
                match sweep_once(&pool).await {
                    Ok(0) => tracing::debug!("Session sweeper: nothing to purge"),
                    Ok(deleted) => tracing::info!(deleted, "Session sweeper: purged expired sessions"),
                    Err(e) => tracing::error!(error = %e, "Session sweeper: cleanup failed"),
                }
            }
        }
    }
}
