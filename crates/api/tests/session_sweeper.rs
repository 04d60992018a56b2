//! Integration tests for the expired-session sweeper.

use std::time::Duration;

use chrono::Utc;
use pairauth_api::background::session_sweeper;
use pairauth_core::session::NewSession;
use pairauth_db::repositories::SessionRepo;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;

async fn seed(pool: &PgPool, access: &str, expires_in: chrono::Duration) {
    let now = Utc::now();
    SessionRepo::create(
        pool,
        &NewSession {
            owner_id: "user-1".to_string(),
            access_credential: access.to_string(),
            refresh_credential_hash: "$argon2id$placeholder".to_string(),
            created_at: now,
            refresh_expires_at: now + expires_in,
        },
    )
    .await
    .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sweep_removes_only_expired_sessions(pool: PgPool) {
    seed(&pool, "expired", -chrono::Duration::minutes(1)).await;
    seed(&pool, "live", chrono::Duration::days(1)).await;

    assert_eq!(session_sweeper::sweep_once(&pool).await.unwrap(), 1);
    assert_eq!(session_sweeper::sweep_once(&pool).await.unwrap(), 0);
    assert!(SessionRepo::find(&pool, "user-1", "live").await.unwrap().is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sweeper_runs_immediately_and_stops_on_cancel(pool: PgPool) {
    seed(&pool, "expired", -chrono::Duration::minutes(1)).await;

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(session_sweeper::run(
        pool.clone(),
        Duration::from_secs(3600),
        cancel.clone(),
    ));

    // The first interval tick fires immediately.
    let mut remaining = 1;
    for _ in 0..50 {
        remaining = SessionRepo::count_for_owner(&pool, "user-1").await.unwrap();
        if remaining == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(remaining, 0);

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("sweeper should stop after cancel")
        .unwrap();
}
