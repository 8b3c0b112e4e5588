//! Entity capabilities and static table metadata.
//!
//! Every persisted resource implements [`Entity`]. The entity owns its
//! create, update and detail schemas as associated types, and describes its
//! storage shape through a `'static` [`Table`].

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::AppError;
use crate::result::AppResult;
use crate::types::value::{ColumnKind, FieldValue, Record};

/// Name of the creation timestamp column.
pub const CREATED_AT: &str = "created_at";
/// Name of the last-update timestamp column.
pub const UPDATED_AT: &str = "updated_at";

/// Value the storage layer fills in when a column is absent on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnDefault {
    /// A fresh random UUID.
    RandomUuid,
    /// The current timestamp.
    Now,
    /// The next value of a per-table integer sequence.
    Sequence,
}

/// A single column of a [`Table`].
#[derive(Debug, Clone, Copy)]
pub struct Column {
    /// Column name.
    pub name: &'static str,
    /// Storage type.
    pub kind: ColumnKind,
    /// Whether `NULL` is accepted.
    pub nullable: bool,
    /// Whether values must be distinct across rows.
    pub unique: bool,
    /// Server-side default.
    pub default: Option<ColumnDefault>,
}

impl Column {
    /// A required, non-unique column without a default.
    pub const fn new(name: &'static str, kind: ColumnKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            unique: false,
            default: None,
        }
    }

    /// Accept `NULL`.
    pub const fn nullable(self) -> Self {
        Self {
            nullable: true,
            ..self
        }
    }

    /// Enforce distinct values.
    pub const fn unique(self) -> Self {
        Self {
            unique: true,
            ..self
        }
    }

    /// Fill the column on insert when absent.
    pub const fn default(self, default: ColumnDefault) -> Self {
        Self {
            default: Some(default),
            ..self
        }
    }
}

/// Static description of an entity's table.
#[derive(Debug)]
pub struct Table {
    /// Human-facing entity name used in error messages.
    pub entity_name: &'static str,
    /// Table name.
    pub name: &'static str,
    /// Primary key column.
    pub primary_key: &'static str,
    /// All columns, primary key included.
    pub columns: &'static [Column],
    /// Text columns matched by the compound `search` term.
    pub search_columns: &'static [&'static str],
    /// Column constrained by `date_from` / `date_to`.
    pub date_column: Option<&'static str>,
}

impl Table {
    /// Look up a column by name.
    pub fn column(&self, name: &str) -> Option<&'static Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Look up a column, rejecting unknown names as a validation error.
    pub fn require_column(&self, name: &str) -> AppResult<&'static Column> {
        self.column(name).ok_or_else(|| {
            AppError::validation(format!(
                "'{name}' is not a field of {}",
                self.entity_name
            ))
        })
    }

    /// The primary key column.
    pub fn primary_key_column(&self) -> AppResult<&'static Column> {
        self.column(self.primary_key).ok_or_else(|| {
            AppError::internal(format!(
                "Table '{}' does not declare its primary key '{}'",
                self.name, self.primary_key
            ))
        })
    }

    /// Whether the table carries an `updated_at` column.
    pub fn tracks_updates(&self) -> bool {
        self.column(UPDATED_AT).is_some()
    }

    /// Column names in declaration order.
    pub fn column_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.columns.iter().map(|c| c.name)
    }
}

/// Identifier types usable as a primary key.
pub trait EntityId:
    Clone + fmt::Debug + fmt::Display + PartialEq + Send + Sync + Into<FieldValue> + 'static
{
}

impl<T> EntityId for T where
    T: Clone + fmt::Debug + fmt::Display + PartialEq + Send + Sync + Into<FieldValue> + 'static
{
}

/// Records with a unique, immutable identifier.
pub trait HasId {
    /// Primary key type.
    type Id: EntityId;

    /// The primary key.
    fn id(&self) -> &Self::Id;
}

/// Records carrying creation and last-update timestamps.
pub trait HasTimestamps {
    /// When the record was inserted.
    fn created_at(&self) -> DateTime<Utc>;

    /// When the record was last written.
    fn updated_at(&self) -> DateTime<Utc>;
}

/// A persisted resource.
pub trait Entity: HasId + HasTimestamps + Clone + Send + Sync + Sized + 'static {
    /// Payload accepted on create. Serializes to a column → value object.
    type Create: Serialize + Send + Sync + 'static;
    /// Sparse payload accepted on update. Absent fields must be skipped
    /// during serialization.
    type Update: Serialize + Send + Sync + 'static;
    /// Shape returned to callers.
    type Detail: Serialize + From<Self> + Send + 'static;

    /// Table metadata.
    fn table() -> &'static Table;

    /// Decode a storage row.
    fn from_record(record: Record) -> AppResult<Self>;

    /// Entity name used in messages.
    fn entity_name() -> &'static str {
        Self::table().entity_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static TABLE: Table = Table {
        entity_name: "Gadget",
        name: "gadgets",
        primary_key: "id",
        columns: &[
            Column::new("id", ColumnKind::Int).default(ColumnDefault::Sequence),
            Column::new("serial", ColumnKind::Text).unique(),
            Column::new("note", ColumnKind::Text).nullable(),
            Column::new(UPDATED_AT, ColumnKind::Timestamp).default(ColumnDefault::Now),
        ],
        search_columns: &["serial"],
        date_column: None,
    };

    #[test]
    fn test_column_builders() {
        let serial = TABLE.column("serial").expect("serial");
        assert!(serial.unique);
        assert!(!serial.nullable);
        assert!(TABLE.column("note").expect("note").nullable);
        assert_eq!(
            TABLE.primary_key_column().expect("pk").default,
            Some(ColumnDefault::Sequence)
        );
    }

    #[test]
    fn test_require_column_rejects_unknown() {
        let err = TABLE.require_column("colour").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Validation);
        assert!(err.message.contains("Gadget"));
    }

    #[test]
    fn test_tracks_updates() {
        assert!(TABLE.tracks_updates());
        assert_eq!(TABLE.column_names().count(), 4);
    }
}
