//! Table schema descriptors.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use super::record::Record;
use crate::error::{CrudError, CrudResult};

/// Per-table metadata consumed by the query builder and the executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    /// Table name.
    pub table: String,
    /// Primary-key field, the default filter for by-key operations.
    pub primary_key: String,
    /// Fields that must bind as integer parameters.
    #[serde(default)]
    pub int_fields: BTreeSet<String>,
}

impl TableSchema {
    /// Creates a schema with no integer fields.
    pub fn new(table: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            primary_key: primary_key.into(),
            int_fields: BTreeSet::new(),
        }
    }

    /// Adds integer-typed fields.
    pub fn with_int_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.int_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Returns true if the field binds as an integer.
    pub fn is_int_field(&self, field: &str) -> bool {
        self.int_fields.contains(field)
    }

    /// Returns the integer fields as a list.
    pub fn int_field_list(&self) -> Vec<String> {
        self.int_fields.iter().cloned().collect()
    }

    /// Validates the descriptor.
    pub fn validate(&self) -> CrudResult<()> {
        if self.table.trim().is_empty() {
            return Err(CrudError::configuration("table name is empty"));
        }
        if self.primary_key.trim().is_empty() {
            return Err(CrudError::configuration(format!(
                "table '{}' has no primary key field",
                self.table
            )));
        }
        Ok(())
    }
}

/// A typed row of a table.
///
/// Implementors describe their table and enumerate their fields explicitly,
/// which is what the data-object builder methods consume.
pub trait Entity {
    /// Returns the table descriptor.
    fn table_schema() -> TableSchema;

    /// Enumerates this entity's fields.
    fn to_record(&self) -> Record;
}
