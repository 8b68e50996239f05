//! # crudkit-test
//!
//! Integration tests for crudkit.
//!
//! This crate contains:
//! - Shared fixtures: the `user` table, a typed `User` entity and recording
//!   observers
//! - Executor property tests against the in-memory driver
//! - End-to-end tests against SQLite

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Test utilities and helpers
pub mod utils;
