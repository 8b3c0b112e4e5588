//! Generic repository trait for entity persistence.

use async_trait::async_trait;

use crate::result::AppResult;
use crate::traits::entity::Entity;
use crate::types::filter::FilterSpec;
use crate::types::pagination::{PageRequest, PageResponse};
use crate::types::value::FieldMap;

/// How a write ends its transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WriteMode {
    /// Commit the unit of work after the write.
    #[default]
    Commit,
    /// Send the write to storage but keep the transaction open.
    Flush,
}

/// Generic CRUD repository over one entity type.
///
/// Every write is followed by a refresh from storage, so returned entities
/// carry server-assigned defaults. A storage error during a write rolls the
/// unit of work back before it is returned.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// Fetch by primary key. With `raise_error`, absence is a
    /// [`NotFound`](crate::ErrorKind::NotFound) error instead of `None`.
    async fn get(&self, id: &E::Id, raise_error: bool) -> AppResult<Option<E>>;

    /// One page of the entities matching `filter`, in its sort order.
    async fn get_all(
        &self,
        filter: Option<&FilterSpec>,
        page: PageRequest,
    ) -> AppResult<PageResponse<E>>;

    /// Every entity matching `filter`; with `unique`, deduplicated by
    /// primary key.
    async fn get_all_raw(&self, filter: Option<&FilterSpec>, unique: bool) -> AppResult<Vec<E>>;

    /// Entities whose key is in `ids`. Order is not guaranteed; absent ids
    /// are skipped.
    async fn get_by_ids(&self, ids: &[E::Id]) -> AppResult<Vec<E>>;

    /// Insert a row.
    async fn create(&self, fields: FieldMap, mode: WriteMode) -> AppResult<E>;

    /// Apply `fields` to an existing row.
    async fn update(&self, id: &E::Id, fields: FieldMap, mode: WriteMode) -> AppResult<E>;

    /// Remove a row; absence is `NotFound`.
    async fn delete(&self, id: &E::Id, mode: WriteMode) -> AppResult<()>;

    /// Insert the row under `id`, or apply `fields` to it if it exists.
    async fn upsert(&self, id: &E::Id, fields: FieldMap, mode: WriteMode) -> AppResult<E>;
}
