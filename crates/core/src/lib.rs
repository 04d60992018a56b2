//! Domain logic for paired access/refresh credential sessions.
//!
//! - [`session`] -- the session rotator and the store contract it runs against.
//! - [`hashing`] -- salted one-way hashing of refresh credentials.
//! - [`credential`] -- random refresh credential generation.

pub mod credential;
pub mod error;
pub mod hashing;
pub mod session;
pub mod types;
