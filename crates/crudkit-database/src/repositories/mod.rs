//! Repository implementations.

pub mod crud;
pub mod example;

pub use crud::CrudRepository;
pub use example::ExampleRepository;
