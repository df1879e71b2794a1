//! Test support for the `bureau` simulation.
//!
//! Provides the pieces integration tests keep rebuilding: a recording event
//! sink with assertion helpers, deterministic duration oracles, and small
//! configuration fixtures.

pub mod fixtures;
pub mod oracle;
pub mod reporter;

pub use fixtures::*;
pub use oracle::*;
pub use reporter::*;
