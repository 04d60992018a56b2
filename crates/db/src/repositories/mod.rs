//! Repository layer: one unit struct per table, associated async functions
//! taking any PostgreSQL executor (pool, connection, or transaction).

pub mod session_repo;

pub use session_repo::SessionRepo;
