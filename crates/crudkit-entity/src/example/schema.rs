//! Request and response schemas for the example resource.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::model::{Example, ExampleId};

/// Data required to create an example.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct ExampleCreate {
    /// Display name; must be unique.
    #[validate(length(min = 1, max = 255))]
    #[schema(min_length = 1, max_length = 255)]
    pub name: String,
}

/// Sparse changes to an example. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct ExampleUpdate {
    /// New display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 255))]
    #[schema(min_length = 1, max_length = 255)]
    pub name: Option<String>,
}

/// An example as returned to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ExampleDetail {
    #[schema(value_type = String, format = Uuid)]
    pub id: ExampleId,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Example> for ExampleDetail {
    fn from(example: Example) -> Self {
        Self {
            id: example.id,
            name: example.name,
            created_at: example.created_at,
            updated_at: example.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crudkit_core::types::FieldMap;

    use crate::example::EXAMPLE_TABLE;

    #[test]
    fn test_empty_update_serializes_to_no_fields() {
        let fields = FieldMap::from_serializable(&EXAMPLE_TABLE, &ExampleUpdate::default())
            .expect("map");
        assert!(fields.is_empty());
    }

    #[test]
    fn test_create_validation() {
        assert!(ExampleCreate { name: String::new() }.validate().is_err());
        assert!(ExampleCreate { name: "x".repeat(256) }.validate().is_err());
        assert!(ExampleCreate { name: "ok".into() }.validate().is_ok());
    }

    #[test]
    fn test_update_validation_ignores_absent_name() {
        assert!(ExampleUpdate::default().validate().is_ok());
        assert!(ExampleUpdate { name: Some(String::new()) }.validate().is_err());
    }
}
