//! # crudkit-common
//!
//! Common types, errors, and configuration for crudkit.
//!
//! This crate provides the foundational types shared by every crudkit
//! component. It includes:
//!
//! - **Types**: bindable `Value`s, field-named `Record`s, `TableSchema`
//!   descriptors, result `Row`s and the SQL `Dialect`
//! - **Errors**: Unified error handling with `CrudError`
//! - **Config**: Executor configuration loadable from TOML
//! - **Constants**: Defaults and log markers
//!
//! ## Example
//!
//! ```rust
//! use crudkit_common::types::{Record, TableSchema, Value};
//! use crudkit_common::error::CrudResult;
//!
//! fn example() -> CrudResult<()> {
//!     let schema = TableSchema::new("user", "id").with_int_fields(["id", "age"]);
//!     schema.validate()?;
//!
//!     let user = Record::new().with("id", 7).with("name", "Ada");
//!     assert_eq!(user.value("name"), Some(&Value::from("Ada")));
//!     Ok(())
//! }
//! # example().unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod constants;
pub mod error;
pub mod types;

// Re-export commonly used items at the crate root
pub use config::ExecutorConfig;
pub use constants::*;
pub use error::{CrudError, CrudResult, ErrorCode};
pub use types::{
    Datum, Dialect, Entity, FromRow, ParamType, Record, Row, TableSchema, Value,
};
