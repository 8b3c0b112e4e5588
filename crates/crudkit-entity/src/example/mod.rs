//! The example resource: a single unique name with timestamps.

pub mod model;
pub mod schema;

pub use model::{EXAMPLE_TABLE, Example, ExampleId};
pub use schema::{ExampleCreate, ExampleDetail, ExampleUpdate};
