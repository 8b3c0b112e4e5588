//! Core traits defined in `crudkit-core` and implemented by other crates.

pub mod entity;
pub mod repository;
pub mod storage;

pub use entity::{Column, ColumnDefault, Entity, EntityId, HasId, HasTimestamps, Table};
pub use repository::{Repository, WriteMode};
pub use storage::{ListWindow, SessionFactory, StorageSession};
