//! Per-request unit of work extractor.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crudkit_database::unit_of_work::UnitOfWork;

use crate::error::ApiError;
use crate::state::AppState;

/// A unit of work opened for the current request.
///
/// Dropped with the request; anything not committed by then is rolled back.
#[derive(Debug, Clone)]
pub struct DbSession(pub UnitOfWork);

impl FromRequestParts<AppState> for DbSession {
    type Rejection = ApiError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let uow = UnitOfWork::begin(state.sessions.as_ref()).await?;
        Ok(Self(uow))
    }
}
