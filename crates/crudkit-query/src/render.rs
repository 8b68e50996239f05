//! SQL text rendering.

use crudkit_common::constants::SELECT_ALL;
use crudkit_common::{CrudError, CrudResult, Dialect};

use crate::fields::merge_unique;
use crate::filter::Filter;
use crate::spec::{Limit, Operation};

/// Renders a LIMIT clause, including its leading space.
///
/// A zero row cap renders nothing.
pub fn render_limit(limit: Option<Limit>, dialect: Dialect) -> CrudResult<String> {
    let check = |n: i64| {
        if n < 0 {
            Err(CrudError::invalid_spec(format!("Invalid SQL limit number: {}", n)))
        } else {
            Ok(n)
        }
    };

    match limit {
        None => Ok(String::new()),
        Some(Limit::Rows(count)) => match check(count)? {
            0 => Ok(String::new()),
            count => Ok(format!(" LIMIT {}", count)),
        },
        Some(Limit::Page { count, offset }) => {
            let (count, offset) = (check(count)?, check(offset)?);
            Ok(match dialect {
                Dialect::MySql => format!(" LIMIT {},{}", count, offset),
                Dialect::Postgres | Dialect::Sqlite => {
                    format!(" LIMIT {} OFFSET {}", count, offset)
                }
            })
        }
    }
}

/// Validated inputs for rendering one statement.
pub(crate) struct RenderParts<'a> {
    pub operation: Operation,
    pub table: &'a str,
    pub cru_fields: &'a [String],
    pub update_sql: Option<&'a str>,
    pub filter: &'a Filter,
    pub group_by: Option<&'a str>,
    pub order_by: Option<&'a str>,
    pub limit: &'a str,
    pub lock: Option<&'a str>,
}

/// Rendered statement text.
pub(crate) struct Rendered {
    pub sql: String,
    pub bind_fields: Vec<String>,
    /// True when a SELECT projects exactly one non-`*` column.
    pub single_column: bool,
}

pub(crate) fn render(parts: &RenderParts<'_>) -> Rendered {
    let table = parts.table;
    let filter = &parts.filter.clause;

    match parts.operation {
        Operation::Insert => {
            let placeholders: Vec<String> =
                parts.cru_fields.iter().map(|f| format!(":{}", f)).collect();
            Rendered {
                sql: format!(
                    "INSERT INTO {} ({}) VALUES ({})",
                    table,
                    parts.cru_fields.join(","),
                    placeholders.join(",")
                ),
                bind_fields: parts.cru_fields.to_vec(),
                single_column: false,
            }
        }
        Operation::Select => {
            let single_column =
                parts.cru_fields.len() == 1 && parts.cru_fields[0] != SELECT_ALL;
            let group = parts
                .group_by
                .map(|g| format!(" GROUP BY {}", g))
                .unwrap_or_default();
            let order = parts
                .order_by
                .map(|o| format!(" ORDER BY {}", o))
                .unwrap_or_default();
            let lock = parts.lock.map(|l| format!(" {}", l)).unwrap_or_default();
            Rendered {
                sql: format!(
                    "SELECT {} FROM {}{}{}{}{}{}",
                    parts.cru_fields.join(","),
                    table,
                    filter,
                    group,
                    order,
                    parts.limit,
                    lock
                ),
                bind_fields: parts.filter.fields.clone(),
                single_column,
            }
        }
        Operation::Update => {
            let set = match parts.update_sql {
                Some(sql) => sql.to_string(),
                None => parts
                    .cru_fields
                    .iter()
                    .map(|f| format!("{f}=:{f}"))
                    .collect::<Vec<_>>()
                    .join(","),
            };
            Rendered {
                sql: format!("UPDATE {} SET {}{}", table, set, filter),
                bind_fields: merge_unique(parts.cru_fields, &parts.filter.fields),
                single_column: false,
            }
        }
        Operation::Delete => Rendered {
            sql: format!("DELETE FROM {}{}", table, filter),
            bind_fields: parts.filter.fields.clone(),
            single_column: false,
        },
    }
}
