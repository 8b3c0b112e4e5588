//! # crudkit-service
//!
//! Business logic service layer for CrudKit. [`CrudService`] wraps one
//! repository on one unit of work and turns typed create/update schemas
//! into storage writes. Resource services are aliases or thin wrappers
//! over it.
//!
//! Services follow constructor injection: the repository is provided at
//! construction time.

pub mod crud;
pub mod example;

pub use crud::CrudService;
pub use example::ExampleService;
