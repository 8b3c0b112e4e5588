//! Example entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crudkit_core::define_id;
use crudkit_core::result::AppResult;
use crudkit_core::traits::entity::{CREATED_AT, UPDATED_AT};
use crudkit_core::traits::{Column, ColumnDefault, Entity, HasId, HasTimestamps, Table};
use crudkit_core::types::{ColumnKind, Record};

use super::schema::{ExampleCreate, ExampleDetail, ExampleUpdate};

define_id!(
    /// Unique identifier for an example.
    ExampleId
);

/// Storage layout of the `examples` table.
pub static EXAMPLE_TABLE: Table = Table {
    entity_name: "Example",
    name: "examples",
    primary_key: "id",
    columns: &[
        Column::new("id", ColumnKind::Uuid).default(ColumnDefault::RandomUuid),
        Column::new("name", ColumnKind::Text).unique(),
        Column::new(CREATED_AT, ColumnKind::Timestamp).default(ColumnDefault::Now),
        Column::new(UPDATED_AT, ColumnKind::Timestamp).default(ColumnDefault::Now),
    ],
    search_columns: &["name"],
    date_column: Some(CREATED_AT),
};

/// A named example record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    /// Unique example identifier.
    pub id: ExampleId,
    /// Unique display name.
    pub name: String,
    /// When the example was created.
    pub created_at: DateTime<Utc>,
    /// When the example was last updated.
    pub updated_at: DateTime<Utc>,
}

impl HasId for Example {
    type Id = ExampleId;

    fn id(&self) -> &ExampleId {
        &self.id
    }
}

impl HasTimestamps for Example {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Entity for Example {
    type Create = ExampleCreate;
    type Update = ExampleUpdate;
    type Detail = ExampleDetail;

    fn table() -> &'static Table {
        &EXAMPLE_TABLE
    }

    fn from_record(record: Record) -> AppResult<Self> {
        Ok(Self {
            id: ExampleId::from_uuid(record.uuid("id")?),
            name: record.text("name")?,
            created_at: record.timestamp(CREATED_AT)?,
            updated_at: record.timestamp(UPDATED_AT)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crudkit_core::types::FieldValue;

    #[test]
    fn test_from_record() {
        let id = ExampleId::new();
        let now = Utc::now();
        let record = Record::new()
            .with("id", id)
            .with("name", "first")
            .with(CREATED_AT, now)
            .with(UPDATED_AT, now);

        let example = Example::from_record(record).expect("decode");
        assert_eq!(example.id, id);
        assert_eq!(example.name, "first");
        assert_eq!(example.updated_at(), now);
    }

    #[test]
    fn test_from_record_rejects_null_name() {
        let record = Record::new()
            .with("id", ExampleId::new())
            .with("name", FieldValue::Null)
            .with(CREATED_AT, Utc::now())
            .with(UPDATED_AT, Utc::now());
        assert!(Example::from_record(record).is_err());
    }

    #[test]
    fn test_table_metadata() {
        assert_eq!(Example::entity_name(), "Example");
        assert!(EXAMPLE_TABLE.column("name").expect("name").unique);
        assert!(EXAMPLE_TABLE.tracks_updates());
    }
}
