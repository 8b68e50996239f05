//! Filter resolution.

use crudkit_common::{CrudError, CrudResult};

use crate::fields::{merge_unique, FieldKind};
use crate::spec::{BindData, Operation, QuerySpec};

/// A resolved WHERE clause and the fields it binds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Filter {
    /// Either empty or ` WHERE <condition>`.
    pub clause: String,
    /// Bind fields in order of first appearance.
    pub fields: Vec<String>,
}

/// Merges the main and patch filters and applies the defaulting rules.
///
/// `where_sql` is the main filter text after trimming.
pub(crate) fn resolve_filter(
    spec: &QuerySpec,
    operation: Operation,
    where_sql: Option<String>,
    data: &BindData,
) -> CrudResult<Filter> {
    let main_fields = spec.where_fields.normalize(FieldKind::Column)?;
    let main_sql = where_sql.or_else(|| {
        (!main_fields.is_empty()).then(|| {
            main_fields
                .iter()
                .map(|f| format!("{f}=:{f}"))
                .collect::<Vec<_>>()
                .join(" AND ")
        })
    });

    let patch_sql: Vec<&str> = spec
        .patch_sql
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .collect();
    let patch_fields = spec.patch_fields.normalize(FieldKind::Column)?;

    let sql = match (main_sql, patch_sql.is_empty()) {
        (main, true) => main,
        (main, false) => Some(
            format!("{} {}", main.unwrap_or_default(), patch_sql.join(" "))
                .trim()
                .to_string(),
        ),
    };
    let fields = merge_unique(&main_fields, &patch_fields);

    if spec.no_where {
        if sql.is_some() || !fields.is_empty() {
            return Err(CrudError::invalid_spec(
                "no_where conflicts with filter text or fields",
            ));
        }
        return Ok(Filter::default());
    }

    if let Some(sql) = sql {
        return Ok(Filter {
            clause: format!(" WHERE {}", sql),
            fields,
        });
    }

    if !fields.is_empty() {
        return Err(CrudError::invalid_spec(
            "filter bind fields given without filter text",
        ));
    }

    if data.is_absent() {
        if operation == Operation::Select {
            return Ok(Filter::default());
        }
        return Err(CrudError::invalid_spec(format!(
            "{} has no filter and no data; use no_where(true) to affect every row",
            operation
        )));
    }

    let pk = spec.primary_key();
    Ok(Filter {
        clause: format!(" WHERE {pk}=:{pk}"),
        fields: vec![pk.to_string()],
    })
}
