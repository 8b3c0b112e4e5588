//! Core type definitions shared by every CrudKit crate.

pub mod filter;
pub mod id;
pub mod pagination;
pub mod sorting;
pub mod value;

pub use filter::{DateRange, FilterField, FilterOp, FilterSpec, FilterValue, SearchTerm};
pub use pagination::{PageRequest, PageResponse};
pub use sorting::{SortDirection, SortField};
pub use value::{ColumnKind, FieldMap, FieldValue, Record};
