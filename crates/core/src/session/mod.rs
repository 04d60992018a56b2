//! Session lifecycle: issuing, rotating, and revoking credential pairs.
//!
//! A session is one row binding an owner to its current access credential
//! and the hash of its current refresh credential. [`SessionRotator`] owns the
//! rules; the row itself lives in a [`SessionStore`].
//!
//! Rotation and single revocation follow the same sequence inside one store
//! transaction: lock the row keyed by `(owner_id, access_credential)`, check
//! the refresh expiry, verify the presented refresh credential against the
//! stored hash, then write keyed by the value just read. Two callers racing
//! with the same stale credentials therefore cannot both succeed: the loser
//! finds the row re-keyed or gone and gets [`SessionError::SessionNotFound`].

pub mod memory;
pub mod store;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};

use crate::credential::{generate_refresh_credential, DEFAULT_CREDENTIAL_LENGTH};
use crate::hashing::SecretHasher;
use crate::types::Timestamp;

pub use memory::MemorySessionStore;
pub use store::{
    NewSession, Rotation, SessionRecord, SessionStore, SessionTransaction, StoreError,
};

/// Default refresh credential lifetime in days.
pub const DEFAULT_REFRESH_TTL_DAYS: i64 = 30;

/// Default upper bound on a single store round (begin through commit).
pub const DEFAULT_STORE_TIMEOUT: StdDuration = StdDuration::from_secs(5);

/// Tunables for [`SessionRotator`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long a refresh credential stays valid after issue or rotation.
    pub refresh_ttl: Duration,
    /// Length of generated refresh credentials.
    pub credential_length: usize,
    /// Deadline for each store round. Work still pending when it elapses is
    /// dropped, which rolls back any open transaction.
    pub store_timeout: StdDuration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_ttl: Duration::days(DEFAULT_REFRESH_TTL_DAYS),
            credential_length: DEFAULT_CREDENTIAL_LENGTH,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }
}

/// Failures surfaced by session operations.
///
/// The first three variants are terminal for the presented credentials; the
/// caller has to authorize from scratch. [`SessionError::Storage`] is
/// transient and may be retried.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No row matches the owner and access credential. Covers sessions that
    /// never existed, were rotated away, or were revoked.
    #[error("Session not found")]
    SessionNotFound,

    /// The row exists but its refresh credential has expired.
    #[error("Session has expired")]
    SessionExpired,

    /// The presented refresh credential does not match the stored hash.
    #[error("Invalid refresh credential")]
    InvalidCredential,

    #[error(transparent)]
    Storage(#[from] StoreError),

    /// Hashing or blocking-task failure.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl SessionError {
    /// Whether the error means the presented credentials are not honored
    /// (as opposed to an infrastructure failure).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::SessionNotFound | Self::SessionExpired | Self::InvalidCredential
        )
    }
}

/// A freshly minted refresh credential.
///
/// The plaintext exists only here; the store keeps its hash.
#[derive(Debug, Clone)]
pub struct IssuedRefresh {
    pub refresh_credential: String,
    pub refresh_expires_at: Timestamp,
}

/// Issues, rotates, and revokes sessions against a [`SessionStore`].
pub struct SessionRotator<S, H> {
    store: S,
    hasher: Arc<H>,
    config: SessionConfig,
}

impl<S, H> SessionRotator<S, H>
where
    S: SessionStore,
    H: SecretHasher,
{
    pub fn new(store: S, hasher: H, config: SessionConfig) -> Self {
        Self {
            store,
            hasher: Arc::new(hasher),
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create a new session for `owner_id` keyed by `access_credential`.
    ///
    /// Returns the plaintext refresh credential. It cannot be recovered later.
    pub async fn issue_session(
        &self,
        owner_id: &str,
        access_credential: &str,
    ) -> Result<IssuedRefresh, SessionError> {
        let refresh_credential = generate_refresh_credential(self.config.credential_length);
        let refresh_credential_hash = self.hash_secret(refresh_credential.clone()).await?;

        let now = Utc::now();
        let session = NewSession {
            owner_id: owner_id.to_string(),
            access_credential: access_credential.to_string(),
            refresh_credential_hash,
            created_at: now,
            refresh_expires_at: self.expiry_from(now)?,
        };

        self.within_deadline(async {
            self.store.save(&session).await?;
            Ok(())
        })
        .await?;

        tracing::info!(owner_id, refresh_expires_at = %session.refresh_expires_at, "Session issued");

        Ok(IssuedRefresh {
            refresh_credential,
            refresh_expires_at: session.refresh_expires_at,
        })
    }

    /// Exchange a valid refresh credential for a new one, re-keying the
    /// session under `new_access_credential`.
    ///
    /// On success the old access credential no longer addresses any row and
    /// the refresh window restarts from now.
    pub async fn rotate_session(
        &self,
        owner_id: &str,
        old_access_credential: &str,
        old_refresh_credential: &str,
        new_access_credential: &str,
    ) -> Result<IssuedRefresh, SessionError> {
        // Hash before opening the transaction so the row lock is held only
        // for verification and the write.
        let refresh_credential = generate_refresh_credential(self.config.credential_length);
        let new_refresh_credential_hash = self.hash_secret(refresh_credential.clone()).await?;

        let now = Utc::now();
        let rotation = Rotation {
            new_access_credential: new_access_credential.to_string(),
            new_refresh_credential_hash,
            created_at: now,
            refresh_expires_at: self.expiry_from(now)?,
        };

        self.within_deadline(async {
            let mut tx = self.store.begin().await?;
            self.lock_verified(&mut tx, owner_id, old_access_credential, old_refresh_credential)
                .await?;

            if !tx.update(owner_id, old_access_credential, &rotation).await? {
                return Err(SessionError::SessionNotFound);
            }
            tx.commit().await?;
            Ok(())
        })
        .await?;

        tracing::info!(owner_id, refresh_expires_at = %rotation.refresh_expires_at, "Session rotated");

        Ok(IssuedRefresh {
            refresh_credential,
            refresh_expires_at: rotation.refresh_expires_at,
        })
    }

    /// Delete one session after proving possession of its refresh credential.
    ///
    /// Not idempotent: repeating the call yields
    /// [`SessionError::SessionNotFound`], which callers should read as
    /// "already revoked".
    pub async fn revoke_session(
        &self,
        owner_id: &str,
        access_credential: &str,
        refresh_credential: &str,
    ) -> Result<(), SessionError> {
        self.within_deadline(async {
            let mut tx = self.store.begin().await?;
            self.lock_verified(&mut tx, owner_id, access_credential, refresh_credential)
                .await?;

            if !tx.delete(owner_id, access_credential).await? {
                return Err(SessionError::SessionNotFound);
            }
            tx.commit().await?;
            Ok(())
        })
        .await?;

        tracing::info!(owner_id, "Session revoked");
        Ok(())
    }

    /// Delete every session of `owner_id` without checking any credential.
    ///
    /// Callers must authenticate the request by other means first. Returns
    /// the number of sessions removed; zero is not an error.
    pub async fn revoke_all_sessions(&self, owner_id: &str) -> Result<u64, SessionError> {
        let removed = self
            .within_deadline(async {
                let mut tx = self.store.begin().await?;
                let removed = tx.delete_all(owner_id).await?;
                tx.commit().await?;
                Ok(removed)
            })
            .await?;

        tracing::info!(owner_id, removed, "All sessions revoked");
        Ok(removed)
    }

    /// Read-only lookup of the session keyed by `(owner_id, access_credential)`.
    pub async fn session(
        &self,
        owner_id: &str,
        access_credential: &str,
    ) -> Result<SessionRecord, SessionError> {
        self.within_deadline(async {
            self.store
                .find(owner_id, access_credential)
                .await?
                .ok_or(SessionError::SessionNotFound)
        })
        .await
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// End of a refresh window opened at `now`.
    fn expiry_from(&self, now: Timestamp) -> Result<Timestamp, SessionError> {
        now.checked_add_signed(self.config.refresh_ttl)
            .ok_or_else(|| SessionError::Internal("refresh_ttl is out of range".into()))
    }

    /// Lock the row and run the not-found, expired, and hash checks in that
    /// order. The transaction is left open for the caller's write.
    async fn lock_verified(
        &self,
        tx: &mut S::Transaction,
        owner_id: &str,
        access_credential: &str,
        refresh_credential: &str,
    ) -> Result<SessionRecord, SessionError> {
        let record = tx
            .find_for_update(owner_id, access_credential)
            .await?
            .ok_or(SessionError::SessionNotFound)?;

        if record.is_expired_at(Utc::now()) {
            tracing::debug!(owner_id, "Refresh credential expired");
            return Err(SessionError::SessionExpired);
        }

        let matches = self
            .verify_secret(
                record.refresh_credential_hash.clone(),
                refresh_credential.to_string(),
            )
            .await?;
        if !matches {
            tracing::debug!(owner_id, "Refresh credential mismatch");
            return Err(SessionError::InvalidCredential);
        }

        Ok(record)
    }

    /// Run one store round under the configured deadline.
    async fn within_deadline<T, F>(&self, work: F) -> Result<T, SessionError>
    where
        F: Future<Output = Result<T, SessionError>>,
    {
        match tokio::time::timeout(self.config.store_timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    timeout_ms = self.config.store_timeout.as_millis() as u64,
                    "Session store round exceeded its deadline"
                );
                Err(SessionError::Storage(StoreError::DeadlineExceeded))
            }
        }
    }

    async fn hash_secret(&self, secret: String) -> Result<String, SessionError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.hash(&secret))
            .await
            .map_err(|e| SessionError::Internal(format!("Hashing task failed: {e}")))?
            .map_err(|e| SessionError::Internal(e.to_string()))
    }

    async fn verify_secret(&self, hash: String, secret: String) -> Result<bool, SessionError> {
        let hasher = Arc::clone(&self.hasher);
        tokio::task::spawn_blocking(move || hasher.verify(&hash, &secret))
            .await
            .map_err(|e| SessionError::Internal(format!("Verification task failed: {e}")))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::hashing::{fast_hasher, Argon2Hasher};

    type TestRotator = SessionRotator<MemorySessionStore, Argon2Hasher>;

    fn rotator() -> TestRotator {
        SessionRotator::new(
            MemorySessionStore::new(),
            fast_hasher(),
            SessionConfig::default(),
        )
    }

    /// Insert a row directly with a known refresh credential and expiry.
    async fn seed(
        rotator: &TestRotator,
        owner_id: &str,
        access: &str,
        refresh: &str,
        created_at: Timestamp,
        refresh_expires_at: Timestamp,
    ) {
        let hash = fast_hasher().hash(refresh).expect("hash");
        rotator
            .store()
            .save(&NewSession {
                owner_id: owner_id.to_string(),
                access_credential: access.to_string(),
                refresh_credential_hash: hash,
                created_at,
                refresh_expires_at,
            })
            .await
            .expect("seed save");
    }

    // -- issue --------------------------------------------------------------

    #[tokio::test]
    async fn issue_stores_hash_of_returned_credential() {
        let rotator = rotator();
        let issued = rotator.issue_session("u1", "a1").await.expect("issue");

        assert_eq!(issued.refresh_credential.len(), DEFAULT_CREDENTIAL_LENGTH);
        assert!(issued
            .refresh_credential
            .chars()
            .all(|c| c.is_ascii_alphanumeric()));

        let record = rotator.session("u1", "a1").await.expect("row");
        assert_ne!(record.refresh_credential_hash, issued.refresh_credential);
        assert!(fast_hasher().verify(&record.refresh_credential_hash, &issued.refresh_credential));
        assert_eq!(
            record.refresh_expires_at,
            record.created_at + Duration::days(30)
        );
        assert_eq!(record.refresh_expires_at, issued.refresh_expires_at);
    }

    #[tokio::test]
    async fn issue_allows_many_sessions_per_owner() {
        let rotator = rotator();
        rotator.issue_session("u1", "a1").await.expect("first");
        rotator.issue_session("u1", "a2").await.expect("second");
        assert_eq!(rotator.store().count_for_owner("u1").await, 2);
    }

    #[tokio::test]
    async fn issue_with_duplicate_key_is_a_storage_error() {
        let rotator = rotator();
        rotator.issue_session("u1", "a1").await.expect("first");
        let err = rotator.issue_session("u1", "a1").await;
        assert_matches!(err, Err(SessionError::Storage(StoreError::Backend(_))));
    }

    // -- rotate -------------------------------------------------------------

    #[tokio::test]
    async fn rotation_consumes_the_old_pair() {
        let rotator = rotator();
        let r1 = rotator.issue_session("u1", "a1").await.expect("issue");
        let before = rotator.session("u1", "a1").await.expect("row");

        let r2 = rotator
            .rotate_session("u1", "a1", &r1.refresh_credential, "a2")
            .await
            .expect("rotate");
        assert_ne!(r1.refresh_credential, r2.refresh_credential);

        assert_matches!(
            rotator.session("u1", "a1").await,
            Err(SessionError::SessionNotFound)
        );
        let after = rotator.session("u1", "a2").await.expect("rotated row");
        assert_ne!(after.refresh_credential_hash, before.refresh_credential_hash);
        assert!(fast_hasher().verify(&after.refresh_credential_hash, &r2.refresh_credential));
        assert_eq!(rotator.store().len().await, 1);
    }

    #[tokio::test]
    async fn stale_credentials_cannot_rotate_twice() {
        let rotator = rotator();
        let r1 = rotator.issue_session("u1", "a1").await.expect("issue");

        let r2 = rotator
            .rotate_session("u1", "a1", &r1.refresh_credential, "a2")
            .await
            .expect("first rotation");

        let replay = rotator
            .rotate_session("u1", "a1", &r1.refresh_credential, "a3")
            .await;
        assert_matches!(replay, Err(SessionError::SessionNotFound));

        // The chain continues from the new pair.
        rotator
            .rotate_session("u1", "a2", &r2.refresh_credential, "a3")
            .await
            .expect("second rotation");
    }

    #[tokio::test]
    async fn wrong_refresh_credential_leaves_row_untouched() {
        let rotator = rotator();
        rotator.issue_session("u1", "a1").await.expect("issue");
        let before = rotator.session("u1", "a1").await.expect("row");

        let err = rotator
            .rotate_session("u1", "a1", "not-the-credential", "a2")
            .await;
        assert_matches!(err, Err(SessionError::InvalidCredential));

        let after = rotator.session("u1", "a1").await.expect("row still there");
        assert_eq!(before, after);
        assert_matches!(
            rotator.session("u1", "a2").await,
            Err(SessionError::SessionNotFound)
        );
    }

    #[tokio::test]
    async fn expired_session_is_rejected_even_with_matching_credential() {
        let rotator = rotator();
        let now = Utc::now();
        seed(
            &rotator,
            "u1",
            "a1",
            "r1",
            now - Duration::days(31),
            now - Duration::days(1),
        )
        .await;

        assert_matches!(
            rotator.rotate_session("u1", "a1", "r1", "a2").await,
            Err(SessionError::SessionExpired)
        );
        assert_matches!(
            rotator.revoke_session("u1", "a1", "r1").await,
            Err(SessionError::SessionExpired)
        );
        assert!(rotator.session("u1", "a1").await.is_ok());
    }

    #[tokio::test]
    async fn rotation_slides_the_refresh_window() {
        let rotator = rotator();
        let now = Utc::now();
        let old_expiry = now + Duration::days(20);
        seed(&rotator, "u1", "a1", "r1", now - Duration::days(10), old_expiry).await;

        let issued = rotator
            .rotate_session("u1", "a1", "r1", "a2")
            .await
            .expect("rotate");

        let record = rotator.session("u1", "a2").await.expect("row");
        assert!(record.refresh_expires_at > old_expiry);
        assert_eq!(record.refresh_expires_at, record.created_at + Duration::days(30));
        assert_eq!(record.refresh_expires_at, issued.refresh_expires_at);
    }

    #[tokio::test]
    async fn unknown_owner_or_access_is_not_found() {
        let rotator = rotator();
        let r1 = rotator.issue_session("u1", "a1").await.expect("issue");

        assert_matches!(
            rotator
                .rotate_session("u2", "a1", &r1.refresh_credential, "a2")
                .await,
            Err(SessionError::SessionNotFound)
        );
        assert_matches!(
            rotator
                .rotate_session("u1", "zz", &r1.refresh_credential, "a2")
                .await,
            Err(SessionError::SessionNotFound)
        );
    }

    #[tokio::test]
    async fn out_of_range_refresh_ttl_is_an_internal_error() {
        let rotator = SessionRotator::new(
            MemorySessionStore::new(),
            fast_hasher(),
            SessionConfig {
                refresh_ttl: Duration::days(100_000_000),
                ..SessionConfig::default()
            },
        );

        assert_matches!(
            rotator.issue_session("u1", "a1").await,
            Err(SessionError::Internal(_))
        );
        assert!(rotator.store().is_empty().await);
    }

    #[tokio::test]
    async fn rotation_onto_an_occupied_access_key_fails_and_keeps_both_rows() {
        let rotator = rotator();
        let r1 = rotator.issue_session("u1", "a1").await.expect("issue a1");
        let r2 = rotator.issue_session("u1", "a2").await.expect("issue a2");

        assert_matches!(
            rotator
                .rotate_session("u1", "a1", &r1.refresh_credential, "a2")
                .await,
            Err(SessionError::Storage(StoreError::Backend(_)))
        );
        assert_eq!(rotator.store().count_for_owner("u1").await, 2);

        // Neither session was consumed.
        rotator
            .rotate_session("u1", "a1", &r1.refresh_credential, "a3")
            .await
            .expect("a1 still rotatable");
        rotator
            .rotate_session("u1", "a2", &r2.refresh_credential, "a4")
            .await
            .expect("a2 still rotatable");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_rotations_with_same_credentials_have_one_winner() {
        let rotator = Arc::new(rotator());
        let r1 = rotator.issue_session("u1", "a1").await.expect("issue");

        let handles: Vec<_> = ["a2", "a3"]
            .into_iter()
            .map(|new_access| {
                let rotator = Arc::clone(&rotator);
                let refresh = r1.refresh_credential.clone();
                tokio::spawn(async move {
                    rotator
                        .rotate_session("u1", "a1", &refresh, new_access)
                        .await
                        .map(|issued| (new_access, issued))
                })
            })
            .collect();

        let mut winners = Vec::new();
        for handle in handles {
            match handle.await.expect("task") {
                Ok(win) => winners.push(win),
                Err(err) => assert_matches!(err, SessionError::SessionNotFound),
            }
        }

        assert_eq!(winners.len(), 1, "exactly one rotation must succeed");
        let (winner_access, issued) = &winners[0];
        let record = rotator.session("u1", winner_access).await.expect("winner row");
        assert!(fast_hasher().verify(&record.refresh_credential_hash, &issued.refresh_credential));
        assert_eq!(rotator.store().len().await, 1);
    }

    #[tokio::test]
    async fn store_round_past_deadline_is_a_storage_error() {
        let config = SessionConfig {
            store_timeout: StdDuration::from_millis(50),
            ..SessionConfig::default()
        };
        let rotator = SessionRotator::new(MemorySessionStore::new(), fast_hasher(), config);
        let r1 = rotator.issue_session("u1", "a1").await.expect("issue");

        // Hold the table so the rotation cannot begin its transaction.
        let blocker = rotator.store().begin().await.expect("begin");
        let err = rotator
            .rotate_session("u1", "a1", &r1.refresh_credential, "a2")
            .await;
        assert_matches!(err, Err(SessionError::Storage(StoreError::DeadlineExceeded)));
        drop(blocker);

        // Nothing was written; the original pair still works.
        rotator
            .rotate_session("u1", "a1", &r1.refresh_credential, "a2")
            .await
            .expect("rotate after blocker released");
    }

    // -- revoke -------------------------------------------------------------

    #[tokio::test]
    async fn revoke_succeeds_once() {
        let rotator = rotator();
        let r1 = rotator.issue_session("u1", "a1").await.expect("issue");

        rotator
            .revoke_session("u1", "a1", &r1.refresh_credential)
            .await
            .expect("first revoke");
        assert_matches!(
            rotator
                .revoke_session("u1", "a1", &r1.refresh_credential)
                .await,
            Err(SessionError::SessionNotFound)
        );
        assert!(rotator.store().is_empty().await);
    }

    #[tokio::test]
    async fn revoke_with_wrong_credential_keeps_the_row() {
        let rotator = rotator();
        rotator.issue_session("u1", "a1").await.expect("issue");

        assert_matches!(
            rotator.revoke_session("u1", "a1", "guess").await,
            Err(SessionError::InvalidCredential)
        );
        assert!(rotator.session("u1", "a1").await.is_ok());
    }

    #[tokio::test]
    async fn revoke_all_wipes_one_owner_only() {
        let rotator = rotator();
        rotator.issue_session("u1", "a1").await.expect("issue");
        rotator.issue_session("u1", "a2").await.expect("issue");
        rotator.issue_session("u2", "b1").await.expect("issue");

        assert_eq!(rotator.revoke_all_sessions("u1").await.expect("revoke all"), 2);
        assert_eq!(rotator.store().count_for_owner("u1").await, 0);
        assert!(rotator.session("u2", "b1").await.is_ok());

        assert_eq!(rotator.revoke_all_sessions("u1").await.expect("empty"), 0);
    }

    #[test]
    fn rejection_classification() {
        assert!(SessionError::SessionNotFound.is_rejection());
        assert!(SessionError::SessionExpired.is_rejection());
        assert!(SessionError::InvalidCredential.is_rejection());
        assert!(!SessionError::Storage(StoreError::DeadlineExceeded).is_rejection());
        assert!(!SessionError::Internal("boom".into()).is_rejection());
    }
}
