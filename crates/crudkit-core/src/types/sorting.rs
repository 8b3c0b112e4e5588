//! Sorting types for list endpoints.

use serde::{Deserialize, Serialize};

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

impl SortDirection {
    /// Return the SQL keyword for this direction.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// A sort specification consisting of a field name and direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortField {
    /// Column or field name to sort by.
    pub field: String,
    /// Sort direction.
    #[serde(default)]
    pub direction: SortDirection,
}

impl SortField {
    /// Create a new sort field.
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Create an ascending sort on the given field.
    pub fn asc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    /// Create a descending sort on the given field.
    pub fn desc(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Desc)
    }

    /// Parse an `order_by` value: comma-separated fields, `-` prefix for
    /// descending, optional `+` prefix for ascending. Blank entries are ignored.
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix('-') {
                Some(field) => Self::desc(field),
                None => Self::asc(s.strip_prefix('+').unwrap_or(s)),
            })
            .collect()
    }
}

/// Append an ascending sort on `primary_key` unless the order already
/// mentions it, so that every ordering is total.
pub fn with_tiebreaker(sort: &[SortField], primary_key: &str) -> Vec<SortField> {
    let mut order = sort.to_vec();
    if !order.iter().any(|s| s.field == primary_key) {
        order.push(SortField::asc(primary_key));
    }
    order
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list() {
        let order = SortField::parse_list("-created_at, name,,+id");
        assert_eq!(
            order,
            vec![
                SortField::desc("created_at"),
                SortField::asc("name"),
                SortField::asc("id"),
            ]
        );
    }

    #[test]
    fn test_tiebreaker_appended_once() {
        let order = with_tiebreaker(&[SortField::desc("name")], "id");
        assert_eq!(order.last(), Some(&SortField::asc("id")));

        let order = with_tiebreaker(&[SortField::desc("id")], "id");
        assert_eq!(order, vec![SortField::desc("id")]);
    }
}
