//! # Tasklist Shared Library
//!
//! Domain types, persistence, credentials, and the relationship bookkeeping used
//! by the Tasklist API server.
//!
//! ## Module Organization
//!
//! - `models`: Documents and their PostgreSQL operations
//! - `store`: Persistence interface with PostgreSQL and in-memory backends
//! - `populate`: Reference expansion for read endpoints
//! - `relations`: Project/task and person/profile back-reference maintenance
//! - `auth`: Password hashing, JWT tokens, request authentication, role checks
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod models;
pub mod populate;
pub mod relations;
pub mod store;

/// Current version of the Tasklist shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
