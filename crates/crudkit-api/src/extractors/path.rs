//! Typed id extractors.

use std::fmt::Display;
use std::str::FromStr;

use axum::extract::{FromRequestParts, Path, Query};
use axum::http::request::Parts;

use crudkit_core::error::AppError;
use crudkit_core::result::AppResult;

use crate::error::ApiError;

/// Query parameter carrying a batch of ids.
pub const IDS_PARAM: &str = "ids";

/// Parses an id from a path or query segment.
pub fn parse_id<T>(raw: &str) -> AppResult<T>
where
    T: FromStr,
    T::Err: Display,
{
    raw.trim()
        .parse()
        .map_err(|e| AppError::validation(format!("Invalid id '{raw}': {e}")))
}

/// The `{id}` path segment parsed as `T`.
#[derive(Debug, Clone)]
pub struct IdPath<T>(pub T);

impl<T, S> FromRequestParts<S> for IdPath<T>
where
    T: FromStr + Send,
    T::Err: Display,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;
        Ok(Self(parse_id(&raw)?))
    }
}

/// Every id passed as `?ids=a,b`, in order. Repeated `ids` params are joined.
#[derive(Debug, Clone)]
pub struct IdList<T>(pub Vec<T>);

impl<T, S> FromRequestParts<S> for IdList<T>
where
    T: FromStr + Send,
    T::Err: Display,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri)
            .map_err(|rejection| AppError::validation(rejection.body_text()))?;

        let ids = pairs
            .iter()
            .filter(|(key, _)| key == IDS_PARAM)
            .flat_map(|(_, value)| value.split(','))
            .filter(|raw| !raw.trim().is_empty())
            .map(parse_id::<T>)
            .collect::<AppResult<Vec<T>>>()?;

        Ok(Self(ids))
    }
}
