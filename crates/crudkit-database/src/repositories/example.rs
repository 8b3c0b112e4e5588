//! Example repository.

use crudkit_entity::example::Example;

use super::crud::CrudRepository;

/// Repository for examples; the generic operations cover everything the
/// resource needs.
pub type ExampleRepository = CrudRepository<Example>;
