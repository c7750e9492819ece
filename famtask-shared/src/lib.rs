//! # FamTask Shared Library
//!
//! This crate contains the data models, database layer, and session
//! plumbing shared by the FamTask API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models (users, families, memberships, join
//!   requests, tasks, points)
//! - `auth`: Password hashing
//! - `db`: Connection pool and migration runner
//! - `session`: Redis-backed session store and auth context

pub mod auth;
pub mod db;
pub mod models;
pub mod session;

/// Current version of the FamTask shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
