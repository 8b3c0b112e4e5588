//! Custom Axum extractors.

pub mod json;
pub mod path;
pub mod query;
pub mod session;

pub use json::ValidatedJson;
pub use path::{IdList, IdPath};
pub use query::ListQuery;
pub use session::DbSession;
