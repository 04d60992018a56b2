//! Non-durable [`SessionStore`] kept in process memory.
//!
//! Transactions take an exclusive lock on the whole table and work on a
//! staged copy that replaces the table on commit, so they are fully
//! serialized and a dropped transaction leaves no trace. Intended for tests
//! and local development; nothing survives a restart.

use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use super::store::{
    NewSession, Rotation, SessionRecord, SessionStore, SessionTransaction, StoreError,
};

#[derive(Debug, thiserror::Error)]
#[error("Session already exists for this owner and access credential")]
struct DuplicateSession;

fn is_key(row: &SessionRecord, owner_id: &str, access_credential: &str) -> bool {
    row.owner_id == owner_id && row.access_credential == access_credential
}

/// In-memory session table.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    rows: Arc<Mutex<Vec<SessionRecord>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows currently committed.
    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    /// Whether the table holds no committed rows.
    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }

    /// Number of committed rows belonging to `owner_id`.
    pub async fn count_for_owner(&self, owner_id: &str) -> usize {
        self.rows
            .lock()
            .await
            .iter()
            .filter(|row| row.owner_id == owner_id)
            .count()
    }
}

impl SessionStore for MemorySessionStore {
    type Transaction = MemoryTransaction;

    async fn save(&self, session: &NewSession) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().await;
        if rows
            .iter()
            .any(|row| is_key(row, &session.owner_id, &session.access_credential))
        {
            return Err(StoreError::backend(DuplicateSession));
        }
        rows.push(session.clone().into());
        Ok(())
    }

    async fn find(
        &self,
        owner_id: &str,
        access_credential: &str,
    ) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|row| is_key(row, owner_id, access_credential))
            .cloned())
    }

    async fn begin(&self) -> Result<Self::Transaction, StoreError> {
        let guard = Arc::clone(&self.rows).lock_owned().await;
        let staged = guard.clone();
        Ok(MemoryTransaction { guard, staged })
    }
}

/// Exclusive transaction over a [`MemorySessionStore`].
pub struct MemoryTransaction {
    guard: OwnedMutexGuard<Vec<SessionRecord>>,
    staged: Vec<SessionRecord>,
}

impl SessionTransaction for MemoryTransaction {
    async fn find_for_update(
        &mut self,
        owner_id: &str,
        access_credential: &str,
    ) -> Result<Option<SessionRecord>, StoreError> {
        Ok(self
            .staged
            .iter()
            .find(|row| is_key(row, owner_id, access_credential))
            .cloned())
    }

    async fn update(
        &mut self,
        owner_id: &str,
        old_access_credential: &str,
        rotation: &Rotation,
    ) -> Result<bool, StoreError> {
        let Some(index) = self
            .staged
            .iter()
            .position(|row| is_key(row, owner_id, old_access_credential))
        else {
            return Ok(false);
        };
        let occupied = self.staged.iter().enumerate().any(|(i, row)| {
            i != index && is_key(row, owner_id, &rotation.new_access_credential)
        });
        if occupied {
            return Err(StoreError::backend(DuplicateSession));
        }

        let row = &mut self.staged[index];
        row.access_credential = rotation.new_access_credential.clone();
        row.refresh_credential_hash = rotation.new_refresh_credential_hash.clone();
        row.created_at = rotation.created_at;
        row.refresh_expires_at = rotation.refresh_expires_at;
        Ok(true)
    }

    async fn delete(&mut self, owner_id: &str, access_credential: &str) -> Result<bool, StoreError> {
        let before = self.staged.len();
        self.staged
            .retain(|row| !is_key(row, owner_id, access_credential));
        Ok(self.staged.len() < before)
    }

    async fn delete_all(&mut self, owner_id: &str) -> Result<u64, StoreError> {
        let before = self.staged.len();
        self.staged.retain(|row| row.owner_id != owner_id);
        Ok((before - self.staged.len()) as u64)
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        *self.guard = std::mem::take(&mut self.staged);
        Ok(())
    }
}
