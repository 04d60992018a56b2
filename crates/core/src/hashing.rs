//! Salted one-way hashing of refresh credentials.
//!
//! Refresh credentials are stored only as Argon2id PHC strings. The salt is
//! generated per hash via [`OsRng`] and embedded in the PHC string together
//! with the algorithm parameters, so verification needs nothing but the
//! stored value.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};

/// Failure to produce a hash.
#[derive(Debug, thiserror::Error)]
#[error("Secret hashing failed: {0}")]
pub struct HashError(String);

/// One-way, salted, deliberately slow transform for stored secrets.
///
/// Implementations are synchronous and CPU-bound; async callers should run
/// them on a blocking thread.
pub trait SecretHasher: Send + Sync + 'static {
    /// Hash `secret`, returning a self-describing hash string.
    fn hash(&self, secret: &str) -> Result<String, HashError>;

    /// Check `secret` against a stored hash.
    ///
    /// Returns `false` both when the secret does not match and when the
    /// stored hash cannot be parsed; callers never learn which.
    fn verify(&self, hash: &str, secret: &str) -> bool;
}

/// Argon2id implementation of [`SecretHasher`].
#[derive(Clone)]
pub struct Argon2Hasher {
    argon2: Argon2<'static>,
}

impl Argon2Hasher {
    /// Build a hasher with explicit cost parameters.
    pub fn with_params(params: Params) -> Self {
        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }
}

impl Default for Argon2Hasher {
    /// Argon2id with the crate's default (OWASP-recommended) parameters.
    fn default() -> Self {
        Self {
            argon2: Argon2::default(),
        }
    }
}

impl SecretHasher for Argon2Hasher {
    fn hash(&self, secret: &str) -> Result<String, HashError> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(secret.as_bytes(), &salt)
            .map_err(|e| HashError(e.to_string()))?;
        Ok(hash.to_string())
    }

    fn verify(&self, hash: &str, secret: &str) -> bool {
        // The output comparison inside `verify_password` is constant-time.
        match PasswordHash::new(hash) {
            Ok(parsed) => self
                .argon2
                .verify_password(secret.as_bytes(), &parsed)
                .is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
pub(crate) fn fast_hasher() -> Argon2Hasher {
    // Minimum-cost parameters keep unit tests quick.
    let params = Params::new(Params::MIN_M_COST * 2, 1, 1, None).expect("valid argon2 params");
    Argon2Hasher::with_params(params)
}
