//! # crudkit-query
//!
//! The query specification builder and the SQL compiler.
//!
//! A [`QuerySpec`] describes one INSERT, SELECT, UPDATE or DELETE against a
//! single table. [`QuerySpec::compile`] validates it and renders
//! parameterized SQL with `:field` placeholders plus the ordered list of
//! fields to bind.
//!
//! ## Example
//!
//! ```rust
//! use crudkit_common::{Dialect, Record, TableSchema};
//! use crudkit_query::{QuerySpec, ResultShape};
//!
//! let user = Record::new().with("id", 7).with("name", "Ada").with("age", 36);
//!
//! let compiled = QuerySpec::new(TableSchema::new("user", "id"))?
//!     .insert_object(&user)?
//!     .return_insert_id(true)
//!     .compile(Dialect::MySql)?;
//!
//! assert_eq!(compiled.sql, "INSERT INTO user (name,age) VALUES (:name,:age)");
//! assert_eq!(compiled.bind_fields, vec!["name", "age"]);
//! assert_eq!(compiled.shape, ResultShape::InsertId);
//! # Ok::<(), crudkit_common::CrudError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod compile;
pub mod fields;
mod filter;
pub mod object;
mod render;
pub mod spec;

pub use compile::{CompiledQuery, ResultShape};
pub use fields::{FieldKind, FieldList, IntoFields};
pub use render::render_limit;
pub use spec::{BindData, Carrier, Limit, LockClause, Operation, QuerySpec};
