//! Service for the example resource.

use crudkit_entity::example::Example;

use crate::crud::CrudService;

/// Example service over the generic repository.
pub type ExampleService = CrudService<Example>;

#[cfg(test)]
mod tests {
    use super::*;
    use crudkit_core::error::ErrorKind;
    use crudkit_core::types::{FilterField, FilterSpec, PageRequest};
    use crudkit_database::session::MemoryStore;
    use crudkit_database::unit_of_work::UnitOfWork;
    use crudkit_entity::example::ExampleCreate;

    #[tokio::test]
    async fn test_filtered_listing() {
        let store = MemoryStore::new();
        let service = ExampleService::for_unit_of_work(UnitOfWork::new(Box::new(store.session())));

        for name in ["alpha", "beta", "alphabet"] {
            service
                .create(&ExampleCreate { name: name.into() }, None)
                .await
                .expect("create");
        }

        let filter = FilterSpec::new().with(FilterField::ilike("name", "ALPHA%"));
        let page = service
            .get_all(Some(&filter), PageRequest::new(1, 10, 100))
            .await
            .expect("list");
        assert_eq!(page.total_items, 2);
        assert!(page.items.iter().all(|e| e.name.starts_with("alpha")));

        let missing = FilterSpec::new().with(FilterField::eq("nickname", "x"));
        let err = service.get_all_raw(Some(&missing), false).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }
}
