//! Generic CRUD handlers, mounted once per entity.
//!
//! Every handler opens its own unit of work through [`DbSession`] and runs a
//! committing [`CrudService`] on it. Responses carry the entity's detail
//! schema.

use std::fmt::Display;
use std::str::FromStr;

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use serde::de::DeserializeOwned;
use utoipa::ToSchema;
use validator::Validate;

use crudkit_core::traits::Entity;
use crudkit_core::types::PageResponse;
use crudkit_service::CrudService;

use crate::error::ApiResult;
use crate::extractors::{DbSession, IdList, IdPath, ListQuery, ValidatedJson};
use crate::state::AppState;

/// An entity that can be served over HTTP.
///
/// Ids parse from path segments; create and update schemas deserialize from
/// JSON and carry validation rules. Every schema is documented in OpenAPI.
pub trait Resource:
    Entity<
        Id: FromStr<Err: Display>,
        Create: DeserializeOwned + Validate + ToSchema,
        Update: DeserializeOwned + Validate + ToSchema,
        Detail: ToSchema,
    >
{
}

impl<E> Resource for E where
    E: Entity<
            Id: FromStr<Err: Display>,
            Create: DeserializeOwned + Validate + ToSchema,
            Update: DeserializeOwned + Validate + ToSchema,
            Detail: ToSchema,
        >
{
}

/// Routes for one resource, to be nested under its path.
///
/// | Method | Path | Action |
/// |---|---|---|
/// | `GET` | `/` | filtered, paginated list |
/// | `POST` | `/` | create, 201 |
/// | `GET` | `/batch?ids=a,b` | fetch several |
/// | `GET` | `/{id}` | fetch one |
/// | `PATCH` | `/{id}` | sparse update |
/// | `PUT` | `/{id}` | create or replace |
/// | `DELETE` | `/{id}` | delete, 204 |
pub fn routes<E: Resource>() -> Router<AppState> {
    Router::new()
        .route("/", get(list::<E>).post(create::<E>))
        .route("/batch", get(batch::<E>))
        .route(
            "/{id}",
            get(fetch::<E>)
                .patch(update::<E>)
                .put(upsert::<E>)
                .delete(remove::<E>),
        )
}

fn service<E: Entity>(DbSession(uow): DbSession) -> CrudService<E> {
    CrudService::for_unit_of_work(uow)
}

/// GET /
pub async fn list<E: Resource>(
    session: DbSession,
    query: ListQuery<E>,
) -> ApiResult<Json<PageResponse<E::Detail>>> {
    let page = service::<E>(session)
        .get_all(Some(&query.filter), query.page)
        .await?;
    Ok(Json(page.map(Into::into)))
}

/// GET /batch
pub async fn batch<E: Resource>(
    session: DbSession,
    IdList(ids): IdList<E::Id>,
) -> ApiResult<Json<Vec<E::Detail>>> {
    let entities = service::<E>(session).get_by_ids(&ids).await?;
    Ok(Json(entities.into_iter().map(Into::into).collect()))
}

/// GET /{id}
pub async fn fetch<E: Resource>(
    session: DbSession,
    IdPath(id): IdPath<E::Id>,
) -> ApiResult<Json<E::Detail>> {
    let entity = service::<E>(session).get_existing(&id).await?;
    Ok(Json(entity.into()))
}

/// POST /
pub async fn create<E: Resource>(
    session: DbSession,
    ValidatedJson(payload): ValidatedJson<E::Create>,
) -> ApiResult<(StatusCode, Json<E::Detail>)> {
    let entity = service::<E>(session).create(&payload, None).await?;
    Ok((StatusCode::CREATED, Json(entity.into())))
}

/// PATCH /{id}
pub async fn update<E: Resource>(
    session: DbSession,
    IdPath(id): IdPath<E::Id>,
    ValidatedJson(payload): ValidatedJson<E::Update>,
) -> ApiResult<Json<E::Detail>> {
    let entity = service::<E>(session).update(&id, &payload).await?;
    Ok(Json(entity.into()))
}

/// PUT /{id}
pub async fn upsert<E: Resource>(
    session: DbSession,
    IdPath(id): IdPath<E::Id>,
    ValidatedJson(payload): ValidatedJson<E::Create>,
) -> ApiResult<Json<E::Detail>> {
    let entity = service::<E>(session).upsert(Some(&id), &payload).await?;
    Ok(Json(entity.into()))
}

/// DELETE /{id}
pub async fn remove<E: Resource>(
    session: DbSession,
    IdPath(id): IdPath<E::Id>,
) -> ApiResult<StatusCode> {
    service::<E>(session).delete(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}
