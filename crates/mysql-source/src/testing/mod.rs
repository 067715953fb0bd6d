//! Testing utilities for the MySQL adapter
//!
//! Docker container management for integration tests against a real server.

pub mod container;

pub use container::MySQLContainer;
