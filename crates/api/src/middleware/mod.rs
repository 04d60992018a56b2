//! Request extractors.
//!
//! - [`auth::Guid`] -- Validated `guid` query parameter.
//! - [`auth::AccessSession`] -- Signed, unexpired access cookie bound to `guid`.

pub mod auth;
