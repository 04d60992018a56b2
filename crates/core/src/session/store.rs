//! Persistence contract consumed by the session rotator.
//!
//! A store holds one [`SessionRecord`] per issued credential pair, addressed
//! by `(owner_id, access_credential)`. Every mutation that depends on a prior
//! read runs inside a [`SessionTransaction`]: the read must lock or otherwise
//! isolate the row so that the conditional write that follows is keyed by the
//! exact value just read. Dropping a transaction without calling
//! [`SessionTransaction::commit`] discards all of its writes.

use std::future::Future;

use crate::types::Timestamp;

/// One persisted session row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub owner_id: String,
    pub access_credential: String,
    pub refresh_credential_hash: String,
    pub created_at: Timestamp,
    pub refresh_expires_at: Timestamp,
}

impl SessionRecord {
    /// Whether the refresh credential can no longer be honored at `now`.
    pub fn is_expired_at(&self, now: Timestamp) -> bool {
        self.refresh_expires_at <= now
    }
}

/// Input for inserting a new session row.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub owner_id: String,
    pub access_credential: String,
    pub refresh_credential_hash: String,
    pub created_at: Timestamp,
    pub refresh_expires_at: Timestamp,
}

impl From<NewSession> for SessionRecord {
    fn from(input: NewSession) -> Self {
        Self {
            owner_id: input.owner_id,
            access_credential: input.access_credential,
            refresh_credential_hash: input.refresh_credential_hash,
            created_at: input.created_at,
            refresh_expires_at: input.refresh_expires_at,
        }
    }
}

/// Replacement values written by a successful rotation.
#[derive(Debug, Clone)]
pub struct Rotation {
    pub new_access_credential: String,
    pub new_refresh_credential_hash: String,
    pub created_at: Timestamp,
    pub refresh_expires_at: Timestamp,
}

/// Store failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backend rejected the operation or could not be reached.
    #[error("Storage backend error: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The operation did not finish before its deadline and was abandoned.
    #[error("Storage operation exceeded its deadline")]
    DeadlineExceeded,
}

impl StoreError {
    /// Wrap any backend error.
    pub fn backend<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Backend(Box::new(err))
    }
}

/// Durable storage of session rows.
pub trait SessionStore: Send + Sync {
    /// Transaction handle returned by [`SessionStore::begin`].
    type Transaction: SessionTransaction;

    /// Insert a new row. Fails if a row with the same owner and access
    /// credential already exists.
    fn save(
        &self,
        session: &NewSession,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Point lookup outside of any transaction.
    fn find(
        &self,
        owner_id: &str,
        access_credential: &str,
    ) -> impl Future<Output = Result<Option<SessionRecord>, StoreError>> + Send;

    /// Open a transaction.
    fn begin(&self) -> impl Future<Output = Result<Self::Transaction, StoreError>> + Send;
}

/// An open, uncommitted unit of work against a [`SessionStore`].
pub trait SessionTransaction: Send {
    /// Look up a row and hold it for the rest of the transaction, so that no
    /// concurrent transaction can change or delete it before commit.
    fn find_for_update(
        &mut self,
        owner_id: &str,
        access_credential: &str,
    ) -> impl Future<Output = Result<Option<SessionRecord>, StoreError>> + Send;

    /// Replace the credentials of the row currently keyed by
    /// `old_access_credential`. Returns `false` if no such row exists.
    fn update(
        &mut self,
        owner_id: &str,
        old_access_credential: &str,
        rotation: &Rotation,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Delete one row. Returns `false` if no such row exists.
    fn delete(
        &mut self,
        owner_id: &str,
        access_credential: &str,
    ) -> impl Future<Output = Result<bool, StoreError>> + Send;

    /// Delete every row for `owner_id`, returning how many were removed.
    fn delete_all(&mut self, owner_id: &str)
        -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Make all writes of this transaction visible.
    fn commit(self) -> impl Future<Output = Result<(), StoreError>> + Send;
}
