//! JWT access-credential generation and verification.
//!
//! Access credentials are HS512-signed JWTs carrying the owner id as `sub`
//! and a random `jti`, so every issued credential is a distinct string and
//! can serve as the session lookup key. The signing secret is injected
//! through configuration; every instance sharing it accepts credentials
//! issued by any other.

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use pairauth_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{env_or, ConfigError};

/// JWT claims embedded in every access credential.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject -- the opaque owner id (`guid`).
    pub sub: String,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier (UUID v4).
    pub jti: String,
}

/// Configuration for access-credential signing and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC secret used to sign and verify tokens.
    pub secret: String,
    /// Access token lifetime in minutes (default: 30).
    pub access_token_expiry_mins: i64,
}

/// Default access token expiry in minutes.
pub const DEFAULT_ACCESS_EXPIRY_MINS: i64 = 30;

/// Upper bound for `JWT_ACCESS_EXPIRY_MINS` (one week).
pub const MAX_ACCESS_EXPIRY_MINS: i64 = 7 * 24 * 60;

impl JwtConfig {
    /// Load JWT configuration through `lookup`.
    ///
    /// | Env Var                  | Required | Default |
    /// |--------------------------|----------|---------|
    /// | `JWT_SECRET`             | **yes**  | --      |
    /// | `JWT_ACCESS_EXPIRY_MINS` | no       | `30`    |
    ///
    /// The expiry must lie in `1..=MAX_ACCESS_EXPIRY_MINS`.
    pub fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup("JWT_SECRET")
            .filter(|s| !s.is_empty())
            .ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let access_token_expiry_mins =
            env_or(lookup, "JWT_ACCESS_EXPIRY_MINS", DEFAULT_ACCESS_EXPIRY_MINS)?;
        if !(1..=MAX_ACCESS_EXPIRY_MINS).contains(&access_token_expiry_mins) {
            return Err(ConfigError::Invalid {
                var: "JWT_ACCESS_EXPIRY_MINS",
                value: access_token_expiry_mins.to_string(),
            });
        }

        Ok(Self {
            secret,
            access_token_expiry_mins,
        })
    }

    /// Access token lifetime as a duration.
    pub fn access_ttl(&self) -> Duration {
        Duration::minutes(self.access_token_expiry_mins)
    }
}

/// A freshly signed access credential.
#[derive(Debug, Clone)]
pub struct IssuedAccess {
    pub token: String,
    pub expires_at: Timestamp,
}

/// Outcome of checking an access credential.
#[derive(Debug, Clone)]
pub enum AccessVerdict {
    /// Signature verified and not yet expired.
    Valid(Claims),
    /// Signature verified but the token has expired.
    Expired,
    /// Malformed, tampered, or signed with another key.
    Invalid,
}

/// Sign a new access credential for `owner_id` with the configured TTL.
pub fn generate_access_token(
    owner_id: &str,
    config: &JwtConfig,
) -> Result<IssuedAccess, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let expires_at = now + config.access_ttl();

    let claims = Claims {
        sub: owner_id.to_string(),
        exp: expires_at.timestamp(),
        iat: now.timestamp(),
        jti: Uuid::new_v4().to_string(),
    };

    let token = encode(
        &Header::new(Algorithm::HS512),
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )?;

    Ok(IssuedAccess { token, expires_at })
}

/// Verify an access credential's signature and expiry.
///
/// The signature is checked before the expiry, so [`AccessVerdict::Expired`]
/// is only reported for tokens issued with our secret.
pub fn verify_access_token(token: &str, config: &JwtConfig) -> AccessVerdict {
    let key = DecodingKey::from_secret(config.secret.as_bytes());
    let validation = Validation::new(Algorithm::HS512);

    match decode::<Claims>(token, &key, &validation) {
        Ok(data) => AccessVerdict::Valid(data.claims),
        Err(e) if matches!(e.kind(), ErrorKind::ExpiredSignature) => AccessVerdict::Expired,
        Err(_) => AccessVerdict::Invalid,
    }
}
