//! # crudkit-database
//!
//! Storage backends, the per-request unit of work, and the generic CRUD
//! repository. PostgreSQL is served through sqlx; an in-memory backend
//! with the same semantics serves local runs and tests.

pub mod connection;
pub mod migration;
pub mod repositories;
pub mod session;
pub mod unit_of_work;

pub use connection::DatabasePool;
pub use repositories::CrudRepository;
pub use session::{MemoryStore, PgStore, open_store};
pub use unit_of_work::UnitOfWork;
