//! Refresh credential generation.
//!
//! Refresh credentials are opaque strings drawn uniformly from `[A-Za-z0-9]`.
//! They come from the thread-local CSPRNG returned by [`rand::rng`], which is
//! seeded from the operating system once and is never reseeded per call.

use rand::distr::Alphanumeric;
use rand::Rng;

/// Default refresh credential length in characters.
pub const DEFAULT_CREDENTIAL_LENGTH: usize = 30;

/// Generate a random alphanumeric refresh credential of `length` characters.
pub fn generate_refresh_credential(length: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}
