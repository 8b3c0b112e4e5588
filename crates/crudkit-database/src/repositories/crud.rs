//! Generic CRUD repository over any [`Entity`].

use std::collections::HashSet;
use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, warn};

use crudkit_core::error::AppError;
use crudkit_core::result::AppResult;
use crudkit_core::traits::entity::UPDATED_AT;
use crudkit_core::traits::{Entity, HasId, ListWindow, Repository, StorageSession, WriteMode};
use crudkit_core::types::sorting::with_tiebreaker;
use crudkit_core::types::{FieldMap, FieldValue, FilterSpec, PageRequest, PageResponse, Record};

use crate::unit_of_work::UnitOfWork;

/// Repository for one entity type on one unit of work.
pub struct CrudRepository<E> {
    uow: UnitOfWork,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for CrudRepository<E> {
    fn clone(&self) -> Self {
        Self {
            uow: self.uow.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> CrudRepository<E> {
    /// Create a repository bound to a unit of work.
    pub fn new(uow: UnitOfWork) -> Self {
        Self {
            uow,
            _entity: PhantomData,
        }
    }

    /// The unit of work this repository writes through.
    pub fn unit_of_work(&self) -> &UnitOfWork {
        &self.uow
    }

    fn not_found(id: &E::Id) -> AppError {
        AppError::not_found(format!("{} object with id={id} not found", E::entity_name()))
    }

    fn decode_all(rows: Vec<Record>) -> AppResult<Vec<E>> {
        rows.into_iter().map(E::from_record).collect()
    }

    fn order_for(filter: Option<&FilterSpec>) -> ListWindow {
        let requested = filter.map(FilterSpec::sort).unwrap_or_default();
        ListWindow::unbounded(with_tiebreaker(requested, E::table().primary_key))
    }

    /// Finish a write: on failure roll back storage errors, otherwise
    /// commit or flush and re-read the row.
    async fn apply_changes(
        session: &mut dyn StorageSession,
        outcome: AppResult<Record>,
        mode: WriteMode,
    ) -> AppResult<E> {
        let table = E::table();
        let record = match outcome {
            Ok(record) => record,
            Err(err) => return Err(Self::abort(session, err).await),
        };
        let key = record
            .get(table.primary_key)
            .cloned()
            .ok_or_else(|| AppError::internal(format!("Row of '{}' has no primary key", table.name)))?;

        Self::finish(session, mode).await?;
        let refreshed = session.refresh(table, &key).await?;
        E::from_record(refreshed)
    }

    async fn finish(session: &mut dyn StorageSession, mode: WriteMode) -> AppResult<()> {
        let finished = match mode {
            WriteMode::Commit => session.commit().await,
            WriteMode::Flush => session.flush().await,
        };
        match finished {
            Ok(()) => Ok(()),
            Err(err) => Err(Self::abort(session, err).await),
        }
    }

    /// Roll back after a storage error; other errors leave the session as is.
    async fn abort(session: &mut dyn StorageSession, err: AppError) -> AppError {
        if err.is_database() {
            debug!(entity = E::entity_name(), error = %err, "Rolling back after storage error");
            if let Err(rollback_err) = session.rollback().await {
                warn!(error = %rollback_err, "Rollback failed");
            }
        }
        err
    }
}

#[async_trait]
impl<E: Entity> Repository<E> for CrudRepository<E> {
    async fn get(&self, id: &E::Id, raise_error: bool) -> AppResult<Option<E>> {
        let key: FieldValue = id.clone().into();
        let row = self.uow.session().await.fetch_by_key(E::table(), &key).await?;
        match row {
            Some(row) => E::from_record(row).map(Some),
            None if raise_error => Err(Self::not_found(id)),
            None => Ok(None),
        }
    }

    async fn get_all(
        &self,
        filter: Option<&FilterSpec>,
        page: PageRequest,
    ) -> AppResult<PageResponse<E>> {
        let table = E::table();
        if let Some(spec) = filter {
            spec.validate(table)?;
        }
        let window = Self::order_for(filter);
        let window = ListWindow::slice(window.order, page.limit(), page.offset());

        let mut session = self.uow.session().await;
        let total = session.count(table, filter).await?;
        let rows = session.list(table, filter, &window).await?;
        drop(session);

        Ok(PageResponse::new(Self::decode_all(rows)?, page, total))
    }

    async fn get_all_raw(&self, filter: Option<&FilterSpec>, unique: bool) -> AppResult<Vec<E>> {
        let table = E::table();
        if let Some(spec) = filter {
            spec.validate(table)?;
        }
        let window = Self::order_for(filter);

        let rows = self.uow.session().await.list(table, filter, &window).await?;
        let mut items = Self::decode_all(rows)?;
        if unique {
            let mut seen = HashSet::new();
            items.retain(|item| seen.insert(item.id().to_string()));
        }
        Ok(items)
    }

    async fn get_by_ids(&self, ids: &[E::Id]) -> AppResult<Vec<E>> {
        let keys: Vec<FieldValue> = ids.iter().cloned().map(Into::into).collect();
        let rows = self.uow.session().await.fetch_by_keys(E::table(), &keys).await?;
        Self::decode_all(rows)
    }

    async fn create(&self, fields: FieldMap, mode: WriteMode) -> AppResult<E> {
        let table = E::table();
        let mut session = self.uow.session().await;
        let outcome = session.insert_returning(table, &fields).await;
        let created = Self::apply_changes(&mut **session, outcome, mode).await?;
        debug!(entity = E::entity_name(), id = %created.id(), "Created");
        Ok(created)
    }

    async fn update(&self, id: &E::Id, fields: FieldMap, mode: WriteMode) -> AppResult<E> {
        let table = E::table();
        let key: FieldValue = id.clone().into();
        let mut fields = fields;
        if table.tracks_updates() {
            fields.insert(UPDATED_AT, Utc::now());
        }

        let mut session = self.uow.session().await;
        let outcome = session
            .update_returning(table, &key, &fields)
            .await
            .and_then(|row| row.ok_or_else(|| Self::not_found(id)));
        Self::apply_changes(&mut **session, outcome, mode).await
    }

    async fn delete(&self, id: &E::Id, mode: WriteMode) -> AppResult<()> {
        let key: FieldValue = id.clone().into();
        let mut session = self.uow.session().await;
        match session.delete(E::table(), &key).await {
            Ok(0) => Err(Self::not_found(id)),
            Ok(_) => {
                Self::finish(&mut **session, mode).await?;
                debug!(entity = E::entity_name(), id = %id, "Deleted");
                Ok(())
            }
            Err(err) => Err(Self::abort(&mut **session, err).await),
        }
    }

    async fn upsert(&self, id: &E::Id, fields: FieldMap, mode: WriteMode) -> AppResult<E> {
        let table = E::table();
        let key: FieldValue = id.clone().into();

        let mut values = fields.clone();
        values.insert(table.primary_key, key);
        let mut updates = fields;
        if table.tracks_updates() {
            updates.insert(UPDATED_AT, Utc::now());
        }

        let mut session = self.uow.session().await;
        let outcome = session.upsert_returning(table, &values, &updates).await;
        Self::apply_changes(&mut **session, outcome, mode).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crudkit_core::error::{ErrorKind, IntegrityViolation};
    use crudkit_core::types::{FilterField, SortField};
    use crudkit_entity::example::{EXAMPLE_TABLE, Example, ExampleId};

    use crate::session::MemoryStore;

    fn repo(store: &MemoryStore) -> CrudRepository<Example> {
        CrudRepository::new(UnitOfWork::new(Box::new(store.session())))
    }

    fn named(name: &str) -> FieldMap {
        FieldMap::new().with("name", name)
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let store = MemoryStore::new();
        let repo = repo(&store);
        let created = repo.create(named("alpha"), WriteMode::Commit).await.expect("create");

        let fetched = repo.get(&created.id, true).await.expect("get").expect("present");
        assert_eq!(fetched, created);
        assert_eq!(store.committed_rows(&EXAMPLE_TABLE).await, 1);
    }

    #[tokio::test]
    async fn test_get_missing() {
        let store = MemoryStore::new();
        let repo = repo(&store);
        let id = ExampleId::new();

        assert!(repo.get(&id, false).await.expect("get").is_none());
        let err = repo.get(&id, true).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
        assert!(err.message.contains(&id.to_string()));
    }

    #[tokio::test]
    async fn test_update_refreshes_timestamp() {
        let store = MemoryStore::new();
        let repo = repo(&store);
        let created = repo.create(named("alpha"), WriteMode::Commit).await.expect("create");
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let updated = repo
            .update(&created.id, named("beta"), WriteMode::Commit)
            .await
            .expect("update");
        assert_eq!(updated.name, "beta");
        assert_eq!(updated.created_at, created.created_at);
        assert!(updated.updated_at > created.updated_at);

        let err = repo
            .update(&ExampleId::new(), named("gamma"), WriteMode::Commit)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryStore::new();
        let repo = repo(&store);
        let created = repo.create(named("alpha"), WriteMode::Commit).await.expect("create");

        repo.delete(&created.id, WriteMode::Commit).await.expect("delete");
        assert!(repo.get(&created.id, false).await.expect("get").is_none());

        let err = repo.delete(&created.id, WriteMode::Commit).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_unique_violation_rolls_back() {
        let store = MemoryStore::new();
        let repo = repo(&store);
        repo.create(named("alpha"), WriteMode::Commit).await.expect("create");
        repo.create(named("pending"), WriteMode::Flush).await.expect("flush");

        let err = repo.create(named("alpha"), WriteMode::Commit).await.unwrap_err();
        assert_eq!(err.violation, Some(IntegrityViolation::Unique));
        assert_eq!(err.status_code(), 409);

        let all = repo.get_all_raw(None, false).await.expect("list");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "alpha");
    }

    #[tokio::test]
    async fn test_flush_is_visible_in_session_only() {
        let store = MemoryStore::new();
        let repo = repo(&store);
        let created = repo.create(named("draft"), WriteMode::Flush).await.expect("flush");

        assert!(repo.get(&created.id, false).await.expect("get").is_some());
        assert_eq!(store.committed_rows(&EXAMPLE_TABLE).await, 0);

        repo.unit_of_work().commit().await.expect("commit");
        assert_eq!(store.committed_rows(&EXAMPLE_TABLE).await, 1);
    }

    #[tokio::test]
    async fn test_page_sweep_covers_each_match_once() {
        let store = MemoryStore::new();
        let repo = repo(&store);
        for i in 0..7 {
            repo.create(named(&format!("item-{i}")), WriteMode::Flush)
                .await
                .expect("create");
        }
        repo.create(named("other"), WriteMode::Commit).await.expect("create");

        let filter = FilterSpec::new()
            .with(FilterField::ilike("name", "item-%"))
            .order_by(SortField::desc("created_at"));

        let mut seen = Vec::new();
        for page in 1..=3 {
            let result = repo
                .get_all(Some(&filter), PageRequest::new(page, 3, 100))
                .await
                .expect("page");
            assert_eq!(result.total_items, 7);
            assert_eq!(result.total_pages, 3);
            seen.extend(result.items.into_iter().map(|e| e.id));
        }
        let mut unique = seen.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(seen.len(), 7);
        assert_eq!(unique.len(), 7);
    }

    #[tokio::test]
    async fn test_get_all_rejects_unknown_sort() {
        let store = MemoryStore::new();
        let repo = repo(&store);
        let filter = FilterSpec::new().order_by(SortField::asc("colour"));
        let err = repo
            .get_all(Some(&filter), PageRequest::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_get_by_ids_skips_missing() {
        let store = MemoryStore::new();
        let repo = repo(&store);
        let a = repo.create(named("a"), WriteMode::Commit).await.expect("create");
        let b = repo.create(named("b"), WriteMode::Commit).await.expect("create");

        let found = repo
            .get_by_ids(&[a.id, ExampleId::new(), b.id])
            .await
            .expect("batch");
        assert_eq!(found.len(), 2);
        assert!(repo.get_by_ids(&[]).await.expect("empty").is_empty());
    }

    #[tokio::test]
    async fn test_upsert_creates_then_updates_in_place() {
        let store = MemoryStore::new();
        let repo = repo(&store);
        let id = ExampleId::new();

        let created = repo.upsert(&id, named("first"), WriteMode::Commit).await.expect("insert");
        assert_eq!(created.id, id);

        let updated = repo.upsert(&id, named("second"), WriteMode::Commit).await.expect("update");
        assert_eq!(updated.id, id);
        assert_eq!(updated.name, "second");
        assert_eq!(updated.created_at, created.created_at);
        assert_eq!(store.committed_rows(&EXAMPLE_TABLE).await, 1);
    }
}
