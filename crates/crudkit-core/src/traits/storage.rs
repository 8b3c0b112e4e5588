//! Storage session traits for pluggable relational backends.
//!
//! A [`StorageSession`] is one transactional conversation with the backend.
//! Writes made through it stay invisible to other sessions until
//! [`commit`](StorageSession::commit); dropping a session without
//! committing discards them. The traits are defined here in
//! `crudkit-core` and implemented in `crudkit-database`.
//!
//! Backends classify their own errors: integrity failures come back as
//! [`AppError::integrity`](crate::AppError::integrity), never as raw
//! driver errors.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::traits::entity::Table;
use crate::types::filter::FilterSpec;
use crate::types::sorting::SortField;
use crate::types::value::{FieldMap, FieldValue, Record};

/// Ordering and bounds of a list query.
#[derive(Debug, Clone, Default)]
pub struct ListWindow {
    /// Total ordering applied to matching rows.
    pub order: Vec<SortField>,
    /// Maximum number of rows; `None` for all.
    pub limit: Option<u64>,
    /// Rows skipped before the first returned one.
    pub offset: u64,
}

impl ListWindow {
    /// All rows in the given order.
    pub fn unbounded(order: Vec<SortField>) -> Self {
        Self {
            order,
            limit: None,
            offset: 0,
        }
    }

    /// One slice of rows in the given order.
    pub fn slice(order: Vec<SortField>, limit: u64, offset: u64) -> Self {
        Self {
            order,
            limit: Some(limit),
            offset,
        }
    }
}

/// One transactional session against a relational backend.
#[async_trait]
pub trait StorageSession: Send {
    /// Insert a row and return it as stored.
    async fn insert_returning(&mut self, table: &'static Table, values: &FieldMap)
        -> AppResult<Record>;

    /// Update the row keyed by `key`; `None` when no row matched.
    async fn update_returning(
        &mut self,
        table: &'static Table,
        key: &FieldValue,
        values: &FieldMap,
    ) -> AppResult<Option<Record>>;

    /// Insert `values` (which carry the primary key), or apply `updates` to
    /// the existing row with that key. One atomic statement.
    async fn upsert_returning(
        &mut self,
        table: &'static Table,
        values: &FieldMap,
        updates: &FieldMap,
    ) -> AppResult<Record>;

    /// Delete the row keyed by `key`; returns the number of rows removed.
    async fn delete(&mut self, table: &'static Table, key: &FieldValue) -> AppResult<u64>;

    /// Fetch one row by primary key.
    async fn fetch_by_key(
        &mut self,
        table: &'static Table,
        key: &FieldValue,
    ) -> AppResult<Option<Record>>;

    /// Fetch every row whose primary key is in `keys`.
    async fn fetch_by_keys(
        &mut self,
        table: &'static Table,
        keys: &[FieldValue],
    ) -> AppResult<Vec<Record>>;

    /// Rows matching `filter`, ordered and windowed.
    async fn list(
        &mut self,
        table: &'static Table,
        filter: Option<&FilterSpec>,
        window: &ListWindow,
    ) -> AppResult<Vec<Record>>;

    /// Number of rows matching `filter`.
    async fn count(&mut self, table: &'static Table, filter: Option<&FilterSpec>) -> AppResult<u64>;

    /// Make every pending write durable and visible; ends the transaction.
    async fn commit(&mut self) -> AppResult<()>;

    /// Push pending writes to the backend without ending the transaction.
    async fn flush(&mut self) -> AppResult<()>;

    /// Discard every pending write; ends the transaction.
    async fn rollback(&mut self) -> AppResult<()>;

    /// Re-read a row after a write.
    async fn refresh(&mut self, table: &'static Table, key: &FieldValue) -> AppResult<Record> {
        self.fetch_by_key(table, key).await?.ok_or_else(|| {
            crate::AppError::not_found(format!(
                "{} object with id={key} not found",
                table.entity_name
            ))
        })
    }
}

/// Opens sessions against a configured backend.
#[async_trait]
pub trait SessionFactory: Send + Sync + 'static {
    /// Backend name for logs and health output.
    fn backend(&self) -> &'static str;

    /// Open a new session.
    async fn open(&self) -> AppResult<Box<dyn StorageSession>>;

    /// Check that the backend is reachable.
    async fn ping(&self) -> AppResult<()>;
}
