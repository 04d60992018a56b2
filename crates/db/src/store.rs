//! [`SessionStore`] backed by PostgreSQL.
//!
//! Transactions run at the default READ COMMITTED isolation level. Rows are
//! locked with `SELECT ... FOR UPDATE` before being verified, and every write
//! is conditional on the access credential that was just read, so concurrent
//! rotations or revocations of one row serialize and the later one sees zero
//! matching rows. A [`PgSessionTransaction`] dropped before commit is rolled
//! back by sqlx.

use pairauth_core::session::{
    NewSession, Rotation, SessionRecord, SessionStore, SessionTransaction, StoreError,
};
use sqlx::{Postgres, Transaction};

use crate::repositories::SessionRepo;
use crate::DbPool;

/// Session store over a PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: DbPool,
}

impl PgSessionStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl SessionStore for PgSessionStore {
    type Transaction = PgSessionTransaction;

    async fn save(&self, session: &NewSession) -> Result<(), StoreError> {
        SessionRepo::create(&self.pool, session)
            .await
            .map_err(StoreError::backend)?;
        Ok(())
    }

    async fn find(
        &self,
        owner_id: &str,
        access_credential: &str,
    ) -> Result<Option<SessionRecord>, StoreError> {
        let row = SessionRepo::find(&self.pool, owner_id, access_credential)
            .await
            .map_err(StoreError::backend)?;
        Ok(row.map(SessionRecord::from))
    }

    async fn begin(&self) -> Result<Self::Transaction, StoreError> {
        let tx = self.pool.begin().await.map_err(StoreError::backend)?;
        Ok(PgSessionTransaction { tx })
    }
}

/// An open PostgreSQL transaction on `user_sessions`.
pub struct PgSessionTransaction {
    tx: Transaction<'static, Postgres>,
}

impl SessionTransaction for PgSessionTransaction {
    async fn find_for_update(
        &mut self,
        owner_id: &str,
        access_credential: &str,
    ) -> Result<Option<SessionRecord>, StoreError> {
        let row = SessionRepo::find_for_update(&mut *self.tx, owner_id, access_credential)
            .await
            .map_err(StoreError::backend)?;
        Ok(row.map(SessionRecord::from))
    }

    async fn update(
        &mut self,
        owner_id: &str,
        old_access_credential: &str,
        rotation: &Rotation,
    ) -> Result<bool, StoreError> {
        SessionRepo::rotate(&mut *self.tx, owner_id, old_access_credential, rotation)
            .await
            .map_err(StoreError::backend)
    }

    async fn delete(&mut self, owner_id: &str, access_credential: &str) -> Result<bool, StoreError> {
        SessionRepo::delete(&mut *self.tx, owner_id, access_credential)
            .await
            .map_err(StoreError::backend)
    }

    async fn delete_all(&mut self, owner_id: &str) -> Result<u64, StoreError> {
        SessionRepo::delete_all_for_owner(&mut *self.tx, owner_id)
            .await
            .map_err(StoreError::backend)
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(StoreError::backend)
    }
}
