//! Generic CRUD service.

use std::marker::PhantomData;

use tracing::info;

use crudkit_core::error::AppError;
use crudkit_core::result::AppResult;
use crudkit_core::traits::{Entity, HasId, Repository, WriteMode};
use crudkit_core::types::{FieldMap, FilterSpec, PageRequest, PageResponse};
use crudkit_database::repositories::CrudRepository;
use crudkit_database::unit_of_work::UnitOfWork;

/// Message for an update payload that carries no fields.
pub const EMPTY_UPDATE_MESSAGE: &str = "No data provided for updating";

/// Business boundary for one entity type.
///
/// Writes commit the unit of work by default. A [`deferred`](Self::deferred)
/// service only flushes, leaving the commit to the caller.
#[derive(Debug, Clone)]
pub struct CrudService<E, R = CrudRepository<E>> {
    /// The repository all operations go through.
    repository: R,
    /// How writes end.
    mode: WriteMode,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> CrudService<E> {
    /// Creates a service over the generic repository on a unit of work.
    pub fn for_unit_of_work(uow: UnitOfWork) -> Self {
        Self::new(CrudRepository::new(uow))
    }
}

impl<E, R> CrudService<E, R>
where
    E: Entity,
    R: Repository<E>,
{
    /// Creates a new service that commits every write.
    pub fn new(repository: R) -> Self {
        Self {
            repository,
            mode: WriteMode::Commit,
            _entity: PhantomData,
        }
    }

    /// Switches to flush-only writes.
    pub fn deferred(mut self) -> Self {
        self.mode = WriteMode::Flush;
        self
    }

    /// How writes end.
    pub fn write_mode(&self) -> WriteMode {
        self.mode
    }

    /// The underlying repository.
    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Gets an entity by id; `raise_error` turns absence into `NotFound`.
    pub async fn get(&self, id: &E::Id, raise_error: bool) -> AppResult<Option<E>> {
        self.repository.get(id, raise_error).await
    }

    /// Gets an entity that must exist.
    pub async fn get_existing(&self, id: &E::Id) -> AppResult<E> {
        self.repository
            .get(id, true)
            .await?
            .ok_or_else(|| AppError::not_found(format!("{} object with id={id} not found", E::entity_name())))
    }

    /// Lists one page of entities.
    pub async fn get_all(
        &self,
        filter: Option<&FilterSpec>,
        page: PageRequest,
    ) -> AppResult<PageResponse<E>> {
        self.repository.get_all(filter, page).await
    }

    /// Lists every matching entity.
    pub async fn get_all_raw(&self, filter: Option<&FilterSpec>, unique: bool) -> AppResult<Vec<E>> {
        self.repository.get_all_raw(filter, unique).await
    }

    /// Gets the entities with the given ids.
    pub async fn get_by_ids(&self, ids: &[E::Id]) -> AppResult<Vec<E>> {
        self.repository.get_by_ids(ids).await
    }

    /// Creates an entity, optionally under an explicit id.
    pub async fn create(&self, payload: &E::Create, id: Option<E::Id>) -> AppResult<E> {
        let table = E::table();
        let mut fields = FieldMap::from_serializable(table, payload)?;
        if let Some(id) = id {
            fields.insert(table.primary_key, id);
        }

        let created = self.repository.create(fields, self.mode).await?;
        info!(entity = E::entity_name(), id = %created.id(), "Entity created");
        Ok(created)
    }

    /// Applies the fields present in `payload`.
    ///
    /// A payload without fields is rejected before storage is touched.
    pub async fn update(&self, id: &E::Id, payload: &E::Update) -> AppResult<E> {
        let fields = FieldMap::from_serializable(E::table(), payload)?;
        if fields.is_empty() {
            return Err(AppError::bad_request(EMPTY_UPDATE_MESSAGE));
        }

        let updated = self.repository.update(id, fields, self.mode).await?;
        info!(entity = E::entity_name(), id = %id, "Entity updated");
        Ok(updated)
    }

    /// Deletes an entity.
    pub async fn delete(&self, id: &E::Id) -> AppResult<()> {
        self.repository.delete(id, self.mode).await?;
        info!(entity = E::entity_name(), id = %id, "Entity deleted");
        Ok(())
    }

    /// Updates the entity under `id` if it exists, creates it otherwise.
    /// Without an id, always creates with a storage-assigned id.
    pub async fn upsert(&self, id: Option<&E::Id>, payload: &E::Create) -> AppResult<E> {
        let Some(id) = id else {
            return self.create(payload, None).await;
        };

        let fields = FieldMap::from_serializable(E::table(), payload)?;
        let entity = self.repository.upsert(id, fields, self.mode).await?;
        info!(entity = E::entity_name(), id = %id, "Entity upserted");
        Ok(entity)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crudkit_core::error::{ErrorKind, IntegrityViolation};
    use crudkit_core::traits::SessionFactory;
    use crudkit_database::session::MemoryStore;
    use crudkit_entity::example::{Example, ExampleCreate, ExampleId, ExampleUpdate};

    async fn service(store: &MemoryStore) -> CrudService<Example> {
        let uow = UnitOfWork::begin(store).await.expect("session");
        CrudService::for_unit_of_work(uow)
    }

    fn create(name: &str) -> ExampleCreate {
        ExampleCreate { name: name.into() }
    }

    fn rename(name: &str) -> ExampleUpdate {
        ExampleUpdate { name: Some(name.into()) }
    }

    /// Counts every storage call and fails them all.
    #[derive(Default, Clone)]
    struct CountingRepository {
        calls: Arc<AtomicUsize>,
    }

    impl CountingRepository {
        fn hit(&self) -> AppError {
            self.calls.fetch_add(1, Ordering::SeqCst);
            AppError::internal("storage reached")
        }
    }

    #[async_trait]
    impl Repository<Example> for CountingRepository {
        async fn get(&self, _: &ExampleId, _: bool) -> AppResult<Option<Example>> {
            Err(self.hit())
        }
        async fn get_all(&self, _: Option<&FilterSpec>, _: PageRequest) -> AppResult<PageResponse<Example>> {
            Err(self.hit())
        }
        async fn get_all_raw(&self, _: Option<&FilterSpec>, _: bool) -> AppResult<Vec<Example>> {
            Err(self.hit())
        }
        async fn get_by_ids(&self, _: &[ExampleId]) -> AppResult<Vec<Example>> {
            Err(self.hit())
        }
        async fn create(&self, _: FieldMap, _: WriteMode) -> AppResult<Example> {
            Err(self.hit())
        }
        async fn update(&self, _: &ExampleId, _: FieldMap, _: WriteMode) -> AppResult<Example> {
            Err(self.hit())
        }
        async fn delete(&self, _: &ExampleId, _: WriteMode) -> AppResult<()> {
            Err(self.hit())
        }
        async fn upsert(&self, _: &ExampleId, _: FieldMap, _: WriteMode) -> AppResult<Example> {
            Err(self.hit())
        }
    }

    #[tokio::test]
    async fn test_empty_update_never_reaches_storage() {
        let repo = CountingRepository::default();
        let service: CrudService<Example, _> = CrudService::new(repo.clone());

        let err = service
            .update(&ExampleId::new(), &ExampleUpdate::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadRequest);
        assert_eq!(err.message, EMPTY_UPDATE_MESSAGE);
        assert_eq!(repo.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_deferred_mode() {
        let service: CrudService<Example, _> = CrudService::new(CountingRepository::default());
        assert_eq!(service.write_mode(), WriteMode::Commit);
        assert_eq!(service.deferred().write_mode(), WriteMode::Flush);
    }

    #[tokio::test]
    async fn test_create_update_delete_lifecycle() {
        let store = MemoryStore::new();
        let service = service(&store).await;

        let a = service.create(&create("A"), None).await.expect("create");
        assert_eq!(service.get_existing(&a.id).await.expect("get"), a);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;

        let b = service.update(&a.id, &rename("B")).await.expect("update");
        assert_eq!(b.id, a.id);
        assert_eq!(b.name, "B");
        assert!(b.updated_at > a.updated_at);

        service.delete(&a.id).await.expect("delete");
        assert!(service.get(&a.id, false).await.expect("get").is_none());

        let err = service.delete(&a.id).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_create_with_explicit_id() {
        let store = MemoryStore::new();
        let service = service(&store).await;
        let id = ExampleId::new();

        let created = service.create(&create("pinned"), Some(id)).await.expect("create");
        assert_eq!(*created.id(), id);
    }

    #[tokio::test]
    async fn test_upsert_with_and_without_id() {
        let store = MemoryStore::new();
        let service = service(&store).await;

        let fresh = service.upsert(None, &create("fresh")).await.expect("create");
        let replaced = service
            .upsert(Some(&fresh.id), &create("replaced"))
            .await
            .expect("update");
        assert_eq!(replaced.id, fresh.id);
        assert_eq!(replaced.name, "replaced");

        let id = ExampleId::new();
        let created = service.upsert(Some(&id), &create("new")).await.expect("insert");
        assert_eq!(created.id, id);
        assert_eq!(service.get_all_raw(None, true).await.expect("list").len(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_name_conflicts_and_keeps_state() {
        let store = MemoryStore::new();
        let service = service(&store).await;
        let first = service.create(&create("same"), None).await.expect("create");

        let err = service.create(&create("same"), None).await.unwrap_err();
        assert_eq!(err.violation, Some(IntegrityViolation::Unique));

        let all = service.get_all_raw(None, false).await.expect("list");
        assert_eq!(all, vec![first]);
    }

    #[tokio::test]
    async fn test_deferred_writes_commit_once() {
        let store = MemoryStore::new();
        let uow = UnitOfWork::new(store.open().await.expect("session"));
        let service = CrudService::<Example>::for_unit_of_work(uow.clone()).deferred();

        service.create(&create("one"), None).await.expect("create");
        service.create(&create("two"), None).await.expect("create");
        assert_eq!(store.committed_rows(Example::table()).await, 0);

        uow.commit().await.expect("commit");
        assert_eq!(store.committed_rows(Example::table()).await, 2);
    }
}
