//! # crudkit-entity
//!
//! Entity models for CrudKit resources. Each resource module holds the
//! persisted model (implementing [`crudkit_core::traits::Entity`]), its
//! table metadata, and the create/update/detail schemas exchanged with
//! callers. Schemas derive `validator::Validate`.

pub mod example;
