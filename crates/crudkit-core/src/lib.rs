//! # crudkit-core
//!
//! Core crate for CrudKit. Contains the entity and storage capability
//! traits, configuration schemas, typed field values, the
//! filter/sorting/pagination protocol, and the unified error system.
//!
//! This crate has **no** internal dependencies on other CrudKit crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::{AppError, ErrorKind, IntegrityViolation};
pub use result::AppResult;
