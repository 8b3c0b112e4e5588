//! List query extractor: filters, sorting and pagination from the query string.

use std::marker::PhantomData;

use axum::extract::{FromRequestParts, Query};
use axum::http::request::Parts;

use crudkit_core::error::AppError;
use crudkit_core::traits::Entity;
use crudkit_core::types::{FilterSpec, PageRequest};

use crate::error::ApiError;
use crate::state::AppState;

/// Parsed list parameters for entity `E`.
///
/// `page` and `size` select the window; `search`, `date_from`, `date_to`,
/// `order_by`, `<column>` and `<column>__<op>` build the filter. Values are
/// checked against `E`'s table before any storage call.
#[derive(Debug, Clone)]
pub struct ListQuery<E> {
    /// Filter conditions and sort order.
    pub filter: FilterSpec,
    /// Requested page.
    pub page: PageRequest,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> FromRequestParts<AppState> for ListQuery<E> {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;

        let page = PageRequest::from_query(&pairs, &state.config.pagination)?;
        let filter = FilterSpec::from_query(E::table(), &pairs)?;

        Ok(Self {
            filter,
            page,
            _entity: PhantomData,
        })
    }
}
