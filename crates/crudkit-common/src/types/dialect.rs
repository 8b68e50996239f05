//! Target SQL dialects.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CrudError;

/// The database family SQL is rendered for.
///
/// Only the LIMIT clause and sequence support differ between dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Dialect {
    /// MySQL / MariaDB: `LIMIT count,offset`.
    #[default]
    MySql,
    /// PostgreSQL: `LIMIT count OFFSET offset`.
    Postgres,
    /// SQLite: `LIMIT count OFFSET offset`.
    Sqlite,
}

impl Dialect {
    /// Returns the canonical configuration name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Dialect::MySql => "mysql",
            Dialect::Postgres => "pgsql",
            Dialect::Sqlite => "sqlite",
        }
    }

    /// Returns true if the dialect has `nextval()` sequences.
    pub const fn supports_sequences(&self) -> bool {
        matches!(self, Dialect::Postgres)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = CrudError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "pgsql" | "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "sqlite" | "sqlite3" => Ok(Dialect::Sqlite),
            other => Err(CrudError::configuration(format!(
                "unsupported SQL dialect: '{}'",
                other
            ))),
        }
    }
}

impl TryFrom<String> for Dialect {
    type Error = CrudError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Dialect> for String {
    fn from(d: Dialect) -> Self {
        d.as_str().to_string()
    }
}
