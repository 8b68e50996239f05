//! Core types for crudkit.
//!
//! This module defines the data carriers that flow between the query
//! builder, the compiler and the executor.

mod dialect;
mod record;
mod row;
mod schema;
mod value;

pub use dialect::Dialect;
pub use record::{Datum, Record};
pub use row::{FromRow, Row};
pub use schema::{Entity, TableSchema};
pub use value::{ParamType, Value};
