//! Example resource endpoints.

use axum::Router;

use crudkit_entity::example::Example;

use crate::state::AppState;

/// Path the example resource is mounted at, under `/api`.
pub const PATH: &str = "/example";

/// GET/POST /api/example, GET /api/example/batch, GET/PATCH/PUT/DELETE /api/example/{id}
pub fn routes() -> Router<AppState> {
    super::resource::routes::<Example>()
}
