//! SQL text and bind construction for the PostgreSQL session.
//!
//! Identifiers only ever come from `'static` [`Table`] metadata and are
//! double-quoted; every value goes through a bind parameter.

use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{Postgres, QueryBuilder, Row};
use uuid::Uuid;

use crudkit_core::error::{AppError, ErrorKind, IntegrityViolation};
use crudkit_core::result::AppResult;
use crudkit_core::traits::{Column, ListWindow, Table};
use crudkit_core::types::{
    ColumnKind, FieldMap, FieldValue, FilterField, FilterOp, FilterSpec, FilterValue, Record,
};

pub(crate) type Builder = QueryBuilder<'static, Postgres>;

/// Push a quoted identifier.
pub(crate) fn push_ident(qb: &mut Builder, name: &str) {
    qb.push('"');
    qb.push(name.replace('"', "\"\""));
    qb.push('"');
}

/// Push the table's column list.
pub(crate) fn push_columns(qb: &mut Builder, table: &Table) {
    for (i, column) in table.columns.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_ident(qb, column.name);
    }
}

/// Push `value` as a bind parameter typed after the column.
pub(crate) fn push_value(qb: &mut Builder, column: &Column, value: &FieldValue) -> AppResult<()> {
    match (column.kind, value) {
        (ColumnKind::Bool, FieldValue::Null) => qb.push_bind(None::<bool>),
        (ColumnKind::Int, FieldValue::Null) => qb.push_bind(None::<i64>),
        (ColumnKind::Float, FieldValue::Null) => qb.push_bind(None::<f64>),
        (ColumnKind::Text, FieldValue::Null) => qb.push_bind(None::<String>),
        (ColumnKind::Uuid, FieldValue::Null) => qb.push_bind(None::<Uuid>),
        (ColumnKind::Timestamp, FieldValue::Null) => qb.push_bind(None::<DateTime<Utc>>),
        (ColumnKind::Json, FieldValue::Null) => qb.push_bind(None::<serde_json::Value>),
        (ColumnKind::Bool, FieldValue::Bool(v)) => qb.push_bind(*v),
        (ColumnKind::Int, FieldValue::Int(v)) => qb.push_bind(*v),
        (ColumnKind::Float, FieldValue::Float(v)) => qb.push_bind(*v),
        (ColumnKind::Float, FieldValue::Int(v)) => qb.push_bind(*v as f64),
        (ColumnKind::Text, FieldValue::Text(v)) => qb.push_bind(v.clone()),
        (ColumnKind::Uuid, FieldValue::Uuid(v)) => qb.push_bind(*v),
        (ColumnKind::Timestamp, FieldValue::Timestamp(v)) => qb.push_bind(*v),
        (ColumnKind::Json, FieldValue::Json(v)) => qb.push_bind(v.clone()),
        (kind, other) => {
            return Err(AppError::validation(format!(
                "Column '{}' expects {kind}, got {other:?}",
                column.name
            )));
        }
    };
    Ok(())
}

/// Push `"pk" = $n`.
pub(crate) fn push_key_match(qb: &mut Builder, table: &Table, key: &FieldValue) -> AppResult<()> {
    let pk = table.primary_key_column()?;
    push_ident(qb, pk.name);
    qb.push(" = ");
    push_value(qb, pk, key)
}

/// Push `"a", "b"` for the given payload columns.
pub(crate) fn push_payload_columns(qb: &mut Builder, values: &FieldMap) {
    for (i, name) in values.columns().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_ident(qb, name);
    }
}

/// Push `$1, $2` for the given payload values.
pub(crate) fn push_payload_values(
    qb: &mut Builder,
    table: &Table,
    values: &FieldMap,
) -> AppResult<()> {
    for (i, (name, value)) in values.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_value(qb, table.require_column(name)?, value)?;
    }
    Ok(())
}

/// Push `"a" = $1, "b" = $2`.
pub(crate) fn push_assignments(qb: &mut Builder, table: &Table, values: &FieldMap) -> AppResult<()> {
    for (i, (name, value)) in values.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        let column = table.require_column(name)?;
        push_ident(qb, column.name);
        qb.push(" = ");
        push_value(qb, column, value)?;
    }
    Ok(())
}

/// Push the `WHERE` clause for a filter, if it constrains anything.
pub(crate) fn push_where(
    qb: &mut Builder,
    table: &Table,
    filter: Option<&FilterSpec>,
) -> AppResult<()> {
    let Some(spec) = filter else {
        return Ok(());
    };
    let mut sep = " WHERE ";

    for field in spec.fields() {
        qb.push(sep);
        sep = " AND ";
        push_condition(qb, table, field)?;
    }

    if let Some(search) = spec.search_term() {
        if !search.fields.is_empty() {
            qb.push(sep);
            sep = " AND ";
            qb.push("(");
            for (i, name) in search.fields.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                push_ident(qb, table.require_column(name)?.name);
                qb.push(" ILIKE ");
                qb.push_bind(format!("%{}%", escape_like(&search.term)));
            }
            qb.push(")");
        }
    }

    if let Some(range) = spec.date_bounds() {
        let column = table.require_column(&range.field)?;
        if let Some(from) = range.from {
            qb.push(sep);
            sep = " AND ";
            push_ident(qb, column.name);
            qb.push(" >= ");
            qb.push_bind(from);
        }
        if let Some(to) = range.to {
            qb.push(sep);
            push_ident(qb, column.name);
            qb.push(" <= ");
            qb.push_bind(to);
        }
    }

    Ok(())
}

fn push_condition(qb: &mut Builder, table: &Table, field: &FilterField) -> AppResult<()> {
    let column = table.require_column(&field.field)?;

    match (field.op, &field.value) {
        (FilterOp::IsNull | FilterOp::IsNotNull, _) => {
            push_ident(qb, column.name);
            qb.push(" ");
            qb.push(field.op.as_sql());
        }
        (FilterOp::In, FilterValue::List(values)) if values.is_empty() => {
            qb.push("FALSE");
        }
        (FilterOp::NotIn, FilterValue::List(values)) if values.is_empty() => {
            push_ident(qb, column.name);
            qb.push(" IS NOT NULL");
        }
        (FilterOp::In | FilterOp::NotIn, FilterValue::List(values)) => {
            push_ident(qb, column.name);
            qb.push(" ");
            qb.push(field.op.as_sql());
            qb.push(" (");
            for (i, value) in values.iter().enumerate() {
                if i > 0 {
                    qb.push(", ");
                }
                push_value(qb, column, value)?;
            }
            qb.push(")");
        }
        (op, FilterValue::Single(value)) => {
            push_ident(qb, column.name);
            qb.push(" ");
            qb.push(op.as_sql());
            qb.push(" ");
            push_value(qb, column, value)?;
        }
        (op, _) => {
            return Err(AppError::validation(format!(
                "Operator '{}' needs a different operand for '{}'",
                op.as_sql(),
                field.field
            )));
        }
    }
    Ok(())
}

/// Push `ORDER BY … LIMIT … OFFSET …`.
pub(crate) fn push_window(qb: &mut Builder, table: &Table, window: &ListWindow) -> AppResult<()> {
    for (i, sort) in window.order.iter().enumerate() {
        qb.push(if i == 0 { " ORDER BY " } else { ", " });
        push_ident(qb, table.require_column(&sort.field)?.name);
        qb.push(" ");
        qb.push(sort.direction.as_sql());
    }
    if let Some(limit) = window.limit {
        qb.push(" LIMIT ");
        qb.push_bind(to_i64(limit)?);
    }
    if window.offset > 0 {
        qb.push(" OFFSET ");
        qb.push_bind(to_i64(window.offset)?);
    }
    Ok(())
}

fn to_i64(n: u64) -> AppResult<i64> {
    i64::try_from(n).map_err(|_| AppError::validation(format!("{n} is out of range")))
}

/// Escape `LIKE` metacharacters so the term matches literally.
pub(crate) fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Decode a row into a [`Record`] using the table's column kinds.
pub(crate) fn decode_row(table: &Table, row: &PgRow) -> AppResult<Record> {
    let mut record = Record::new();
    for column in table.columns {
        let value = decode_column(row, column).map_err(|e| {
            AppError::with_source(
                ErrorKind::Database,
                format!("Failed to decode column '{}.{}'", table.name, column.name),
                e,
            )
        })?;
        record.insert(column.name, value);
    }
    Ok(record)
}

fn decode_column(row: &PgRow, column: &Column) -> Result<FieldValue, sqlx::Error> {
    let name = column.name;
    Ok(match column.kind {
        ColumnKind::Bool => row.try_get::<Option<bool>, _>(name)?.into(),
        ColumnKind::Int => row.try_get::<Option<i64>, _>(name)?.into(),
        ColumnKind::Float => row.try_get::<Option<f64>, _>(name)?.into(),
        ColumnKind::Text => row.try_get::<Option<String>, _>(name)?.into(),
        ColumnKind::Uuid => row.try_get::<Option<Uuid>, _>(name)?.into(),
        ColumnKind::Timestamp => row.try_get::<Option<DateTime<Utc>>, _>(name)?.into(),
        ColumnKind::Json => row
            .try_get::<Option<serde_json::Value>, _>(name)?
            .map_or(FieldValue::Null, FieldValue::Json),
    })
}

/// Map a sqlx error into an [`AppError`], classifying integrity violations.
pub(crate) fn classify(err: sqlx::Error, context: &str) -> AppError {
    let violation = match &err {
        sqlx::Error::Database(db_err) => {
            let violation = match db_err.kind() {
                sqlx::error::ErrorKind::UniqueViolation => Some(IntegrityViolation::Unique),
                sqlx::error::ErrorKind::ForeignKeyViolation => Some(IntegrityViolation::ForeignKey),
                sqlx::error::ErrorKind::NotNullViolation => Some(IntegrityViolation::NotNull),
                sqlx::error::ErrorKind::CheckViolation => Some(IntegrityViolation::Check),
                _ => None,
            };
            violation.map(|v| (v, db_err.constraint().map(str::to_string)))
        }
        _ => None,
    };

    match violation {
        Some((violation, constraint)) => {
            let message = match constraint {
                Some(name) => format!("{context}: {violation} ({name})"),
                None => format!("{context}: {violation}"),
            };
            AppError::with_source(ErrorKind::Database, message, err).with_violation(violation)
        }
        None => AppError::with_source(ErrorKind::Database, format!("{context}: {err}"), err),
    }
}
