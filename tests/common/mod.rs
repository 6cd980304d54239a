//! Common test infrastructure
//!
//! Builds a temporary video database and wraps the store so tests can count
//! the queries the resolver issues.

mod fixtures;

pub use fixtures::*;
