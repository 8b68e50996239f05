//! Error handling for crudkit.
//!
//! This module provides a unified error type and result alias used
//! across all crudkit components.

mod crud;

pub use crud::{CrudError, ErrorCode};

/// Result type alias for crudkit operations.
pub type CrudResult<T> = std::result::Result<T, CrudError>;
