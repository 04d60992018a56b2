//! Access credential primitives used by the HTTP boundary.
//!
//! - [`jwt`] -- HS512 access-token issue and verification.
//! - [`cookies`] -- cookie transport of the access/refresh pair.

pub mod cookies;
pub mod jwt;
