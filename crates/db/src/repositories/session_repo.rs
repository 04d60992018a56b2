//! Repository for the `user_sessions` table.

use pairauth_core::session::{NewSession, Rotation};
use pairauth_core::types::Timestamp;
use sqlx::PgExecutor;

use crate::models::session::SessionRow;

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, owner_id, access_credential, refresh_credential_hash, \
                       created_at, refresh_expires_at";

/// Provides CRUD operations for credential sessions.
///
/// Rows are addressed by `(owner_id, access_credential)`; there is no soft
/// delete, retired sessions are removed physically.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new session, returning the created row.
    ///
    /// Fails with a unique violation on `uq_user_sessions_owner_access` if
    /// the owner already has a session under this access credential.
    pub async fn create<'e, E>(executor: E, input: &NewSession) -> Result<SessionRow, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "INSERT INTO user_sessions
                (owner_id, access_credential, refresh_credential_hash, created_at, refresh_expires_at)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(&input.owner_id)
            .bind(&input.access_credential)
            .bind(&input.refresh_credential_hash)
            .bind(input.created_at)
            .bind(input.refresh_expires_at)
            .fetch_one(executor)
            .await
    }

    /// Find a session by owner and access credential.
    pub async fn find<'e, E>(
        executor: E,
        owner_id: &str,
        access_credential: &str,
    ) -> Result<Option<SessionRow>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM user_sessions
             WHERE owner_id = $1 AND access_credential = $2"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(owner_id)
            .bind(access_credential)
            .fetch_optional(executor)
            .await
    }

    /// Find a session and take a row lock on it.
    ///
    /// Only meaningful inside a transaction: the lock is held until commit or
    /// rollback. A concurrent caller blocks here and, once the holder commits,
    /// re-evaluates the predicate against the new row version, so a row that
    /// was re-keyed or deleted in the meantime is not returned.
    pub async fn find_for_update<'e, E>(
        executor: E,
        owner_id: &str,
        access_credential: &str,
    ) -> Result<Option<SessionRow>, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let query = format!(
            "SELECT {COLUMNS} FROM user_sessions
             WHERE owner_id = $1 AND access_credential = $2
             FOR UPDATE"
        );
        sqlx::query_as::<_, SessionRow>(&query)
            .bind(owner_id)
            .bind(access_credential)
            .fetch_optional(executor)
            .await
    }

    /// Replace the credentials of the row keyed by `old_access_credential`.
    /// Returns `true` if a row was updated.
    pub async fn rotate<'e, E>(
        executor: E,
        owner_id: &str,
        old_access_credential: &str,
        rotation: &Rotation,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "UPDATE user_sessions
             SET access_credential = $3,
                 refresh_credential_hash = $4,
                 created_at = $5,
                 refresh_expires_at = $6
             WHERE owner_id = $1 AND access_credential = $2",
        )
        .bind(owner_id)
        .bind(old_access_credential)
        .bind(&rotation.new_access_credential)
        .bind(&rotation.new_refresh_credential_hash)
        .bind(rotation.created_at)
        .bind(rotation.refresh_expires_at)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a single session. Returns `true` if a row was deleted.
    pub async fn delete<'e, E>(
        executor: E,
        owner_id: &str,
        access_credential: &str,
    ) -> Result<bool, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query(
            "DELETE FROM user_sessions WHERE owner_id = $1 AND access_credential = $2",
        )
        .bind(owner_id)
        .bind(access_credential)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete all sessions for an owner. Returns the count of deleted rows.
    pub async fn delete_all_for_owner<'e, E>(executor: E, owner_id: &str) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM user_sessions WHERE owner_id = $1")
            .bind(owner_id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete sessions whose refresh credential expired at or before `cutoff`.
    /// Returns the count of deleted rows.
    pub async fn delete_expired<'e, E>(executor: E, cutoff: Timestamp) -> Result<u64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let result = sqlx::query("DELETE FROM user_sessions WHERE refresh_expires_at <= $1")
            .bind(cutoff)
            .execute(executor)
            .await?;
        Ok(result.rows_affected())
    }

    /// Count the sessions an owner currently holds.
    ///
    /// Not used by any request path; integration tests and operators use it
    /// to inspect store state.
    pub async fn count_for_owner<'e, E>(executor: E, owner_id: &str) -> Result<i64, sqlx::Error>
    where
        E: PgExecutor<'e>,
    {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_sessions WHERE owner_id = $1")
            .bind(owner_id)
            .fetch_one(executor)
            .await?;
        Ok(row.0)
    }
}
