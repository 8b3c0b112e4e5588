//! Typed column values and column → value maps.
//!
//! [`FieldValue`] is the closed set of values that cross the storage
//! boundary. [`FieldMap`] carries write payloads into storage and rows
//! ([`Record`]) back out of it.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::result::AppResult;
use crate::traits::entity::Table;

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// Boolean.
    Bool,
    /// 64-bit signed integer.
    Int,
    /// Double-precision float.
    Float,
    /// Text.
    Text,
    /// UUID.
    Uuid,
    /// Timestamp with time zone.
    Timestamp,
    /// Arbitrary JSON document.
    Json,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::Uuid => "uuid",
            Self::Timestamp => "timestamp",
            Self::Json => "json",
        };
        f.write_str(name)
    }
}

/// A single typed column value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// SQL `NULL`.
    Null,
    /// Boolean value.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// Text value.
    Text(String),
    /// UUID value.
    Uuid(Uuid),
    /// Timestamp value.
    Timestamp(DateTime<Utc>),
    /// JSON document.
    Json(serde_json::Value),
}

impl FieldValue {
    /// Whether this is `NULL`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The column kind this value belongs to, `None` for `NULL`.
    pub fn kind(&self) -> Option<ColumnKind> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ColumnKind::Bool),
            Self::Int(_) => Some(ColumnKind::Int),
            Self::Float(_) => Some(ColumnKind::Float),
            Self::Text(_) => Some(ColumnKind::Text),
            Self::Uuid(_) => Some(ColumnKind::Uuid),
            Self::Timestamp(_) => Some(ColumnKind::Timestamp),
            Self::Json(_) => Some(ColumnKind::Json),
        }
    }

    /// Borrow the text content, if any.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Coerce a JSON value into a column of the given kind.
    pub fn from_json(kind: ColumnKind, value: &serde_json::Value) -> AppResult<Self> {
        use serde_json::Value;

        let mismatch = || AppError::validation(format!("Expected a {kind} value, got {value}"));

        Ok(match (kind, value) {
            (_, Value::Null) => Self::Null,
            (ColumnKind::Json, v) => Self::Json(v.clone()),
            (ColumnKind::Bool, Value::Bool(b)) => Self::Bool(*b),
            (ColumnKind::Int, Value::Number(n)) => Self::Int(n.as_i64().ok_or_else(mismatch)?),
            (ColumnKind::Float, Value::Number(n)) => {
                Self::Float(n.as_f64().ok_or_else(mismatch)?)
            }
            (ColumnKind::Text, Value::String(s)) => Self::Text(s.clone()),
            (ColumnKind::Uuid | ColumnKind::Timestamp, Value::String(s)) => Self::parse(kind, s)?,
            _ => return Err(mismatch()),
        })
    }

    /// Parse a textual value (query string, path segment) into a column of
    /// the given kind.
    ///
    /// Timestamps accept RFC 3339 or a bare `YYYY-MM-DD` date (midnight UTC).
    pub fn parse(kind: ColumnKind, raw: &str) -> AppResult<Self> {
        let invalid = || AppError::validation(format!("'{raw}' is not a valid {kind} value"));

        Ok(match kind {
            ColumnKind::Bool => match raw.to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" => Self::Bool(true),
                "false" | "0" | "no" => Self::Bool(false),
                _ => return Err(invalid()),
            },
            ColumnKind::Int => Self::Int(raw.parse().map_err(|_| invalid())?),
            ColumnKind::Float => Self::Float(raw.parse().map_err(|_| invalid())?),
            ColumnKind::Text => Self::Text(raw.to_string()),
            ColumnKind::Uuid => Self::Uuid(Uuid::parse_str(raw).map_err(|_| invalid())?),
            ColumnKind::Timestamp => Self::Timestamp(parse_timestamp(raw).ok_or_else(invalid)?),
            ColumnKind::Json => Self::Json(serde_json::from_str(raw).map_err(|_| invalid())?),
        })
    }

    /// Render as JSON.
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(i) => Value::from(*i),
            Self::Float(f) => Value::from(*f),
            Self::Text(s) => Value::String(s.clone()),
            Self::Uuid(u) => Value::String(u.to_string()),
            Self::Timestamp(t) => Value::String(t.to_rfc3339()),
            Self::Json(v) => v.clone(),
        }
    }

    /// SQL-style comparison: `None` when either side is `NULL` or the kinds
    /// are not comparable.
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            (Self::Int(a), Self::Int(b)) => Some(a.cmp(b)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Int(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Uuid(a), Self::Uuid(b)) => Some(a.cmp(b)),
            (Self::Timestamp(a), Self::Timestamp(b)) => Some(a.cmp(b)),
            (Self::Json(a), Self::Json(b)) if a == b => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => f.write_str(s),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            Self::Json(v) => write!(f, "{v}"),
        }
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<Uuid> for FieldValue {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// An ordered column → value map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap(BTreeMap<String, FieldValue>);

/// A row read back from storage.
pub type Record = FieldMap;

impl FieldMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a map from a serializable schema, coercing every field to the
    /// kind of the matching column of `table`.
    ///
    /// The payload must serialize to a JSON object. Fields skipped during
    /// serialization are absent from the map; unknown fields are rejected.
    pub fn from_serializable<T: Serialize>(table: &Table, payload: &T) -> AppResult<Self> {
        let serde_json::Value::Object(object) = serde_json::to_value(payload)? else {
            return Err(AppError::internal(format!(
                "Payload for '{}' did not serialize to an object",
                table.name
            )));
        };

        let mut map = Self::new();
        for (name, value) in &object {
            let column = table.column(name).ok_or_else(|| {
                AppError::validation(format!("Unknown field '{name}' for '{}'", table.name))
            })?;
            map.insert(name.clone(), FieldValue::from_json(column.kind, value)?);
        }
        Ok(map)
    }

    /// Insert or replace a value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(column.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(column, value);
        self
    }

    /// Look up a value.
    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.0.get(column)
    }

    /// Whether a column is present.
    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map carries no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in column-name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.0.iter()
    }

    /// Column names in order.
    pub fn columns(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Overlay another map on top of this one.
    pub fn merge(&mut self, other: &FieldMap) {
        for (column, value) in other.iter() {
            self.0.insert(column.clone(), value.clone());
        }
    }

    /// Render as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    fn required(&self, column: &str) -> AppResult<&FieldValue> {
        self.0
            .get(column)
            .ok_or_else(|| AppError::internal(format!("Column '{column}' missing from row")))
    }

    fn wrong_type(column: &str, expected: ColumnKind, got: &FieldValue) -> AppError {
        AppError::internal(format!(
            "Column '{column}' expected {expected}, found {got:?}"
        ))
    }

    /// Read a non-null UUID column.
    pub fn uuid(&self, column: &str) -> AppResult<Uuid> {
        match self.required(column)? {
            FieldValue::Uuid(u) => Ok(*u),
            other => Err(Self::wrong_type(column, ColumnKind::Uuid, other)),
        }
    }

    /// Read a non-null integer column.
    pub fn int(&self, column: &str) -> AppResult<i64> {
        match self.required(column)? {
            FieldValue::Int(i) => Ok(*i),
            other => Err(Self::wrong_type(column, ColumnKind::Int, other)),
        }
    }

    /// Read a non-null text column.
    pub fn text(&self, column: &str) -> AppResult<String> {
        match self.required(column)? {
            FieldValue::Text(s) => Ok(s.clone()),
            other => Err(Self::wrong_type(column, ColumnKind::Text, other)),
        }
    }

    /// Read a nullable text column.
    pub fn opt_text(&self, column: &str) -> AppResult<Option<String>> {
        match self.required(column)? {
            FieldValue::Null => Ok(None),
            FieldValue::Text(s) => Ok(Some(s.clone())),
            other => Err(Self::wrong_type(column, ColumnKind::Text, other)),
        }
    }

    /// Read a non-null timestamp column.
    pub fn timestamp(&self, column: &str) -> AppResult<DateTime<Utc>> {
        match self.required(column)? {
            FieldValue::Timestamp(t) => Ok(*t),
            other => Err(Self::wrong_type(column, ColumnKind::Timestamp, other)),
        }
    }
}

impl FromIterator<(String, FieldValue)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
