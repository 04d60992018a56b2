//! Session row model.

use pairauth_core::session::SessionRecord;
use pairauth_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `user_sessions` table.
#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: DbId,
    pub owner_id: String,
    pub access_credential: String,
    pub refresh_credential_hash: String,
    pub created_at: Timestamp,
    pub refresh_expires_at: Timestamp,
}

impl From<SessionRow> for SessionRecord {
    fn from(row: SessionRow) -> Self {
        Self {
            owner_id: row.owner_id,
            access_credential: row.access_credential,
            refresh_credential_hash: row.refresh_credential_hash,
            created_at: row.created_at,
            refresh_expires_at: row.refresh_expires_at,
        }
    }
}
