//! OpenAPI document and Swagger UI.
//!
//! The health endpoint is annotated directly. Resource routes are generic,
//! so their operations are assembled per entity from the entity's schemas.

use axum::Router;
use utoipa::openapi::path::{
    HttpMethod, Operation, OperationBuilder, ParameterBuilder, ParameterIn, PathItemBuilder,
};
use utoipa::openapi::request_body::{RequestBody, RequestBodyBuilder};
use utoipa::openapi::schema::{ArrayBuilder, ObjectBuilder, Type};
use utoipa::openapi::{
    ComponentsBuilder, ContentBuilder, OpenApiBuilder, PathsBuilder, Ref, RefOr, Required,
    ResponseBuilder, Schema,
};
use utoipa::{OpenApi, PartialSchema, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crudkit_core::config::AppConfig;
use crudkit_core::types::PageResponse;
use crudkit_core::types::filter::{DATE_FROM_PARAM, DATE_TO_PARAM, ORDER_BY_PARAM, SEARCH_PARAM};
use crudkit_core::types::pagination::{PAGE_PARAM, SIZE_PARAM};
use crudkit_entity::example::Example;

use crate::error::ApiErrorResponse;
use crate::extractors::path::IDS_PARAM;
use crate::handlers;
use crate::handlers::health::HealthResponse;
use crate::handlers::resource::Resource;
use crate::state::AppState;

/// Where the OpenAPI document is served.
pub const OPENAPI_PATH: &str = "/openapi.json";

const JSON: &str = "application/json";

#[derive(OpenApi)]
#[openapi(
    paths(handlers::health::health),
    components(schemas(ApiErrorResponse, HealthResponse)),
    tags((name = "health", description = "Liveness and storage reachability"))
)]
struct ApiDoc;

/// The full document: health plus every mounted resource.
pub fn openapi(config: &AppConfig) -> utoipa::openapi::OpenApi {
    let mut doc = ApiDoc::openapi();
    doc.merge(resource_doc::<Example>(
        &format!("/api{}", handlers::example::PATH),
        "example",
    ));
    doc.info.title = config.title.clone();
    doc.info.version = env!("CARGO_PKG_VERSION").to_string();
    doc
}

/// Swagger UI at the configured docs path, or nothing when docs are off.
pub fn docs_routes(config: &AppConfig) -> Router<AppState> {
    match config.server.docs() {
        Some(path) => SwaggerUi::new(path.to_string())
            .url(OPENAPI_PATH, openapi(config))
            .into(),
        None => Router::new(),
    }
}

fn schema_ref<T: ToSchema>() -> RefOr<Schema> {
    RefOr::Ref(Ref::from_schema_name(T::name()))
}

fn string_schema() -> Schema {
    Schema::Object(ObjectBuilder::new().schema_type(Type::String).build())
}

fn json_body(description: &str, schema: RefOr<Schema>) -> utoipa::openapi::Response {
    ResponseBuilder::new()
        .description(description)
        .content(JSON, ContentBuilder::new().schema(Some(schema)).build())
        .build()
}

fn json_request(schema: RefOr<Schema>) -> RequestBody {
    RequestBodyBuilder::new()
        .content(JSON, ContentBuilder::new().schema(Some(schema)).build())
        .required(Some(Required::True))
        .build()
}

fn error_body(description: &str) -> utoipa::openapi::Response {
    json_body(description, schema_ref::<ApiErrorResponse>())
}

fn query_param(name: &str, description: &str) -> ParameterBuilder {
    ParameterBuilder::new()
        .name(name)
        .parameter_in(ParameterIn::Query)
        .required(Required::False)
        .description(Some(description))
        .schema(Some(string_schema()))
}

fn operation(tag: &str, summary: String) -> OperationBuilder {
    OperationBuilder::new()
        .tag(tag)
        .summary(Some(summary))
        .response("500", error_body("Server error"))
}

fn with_id(operation: OperationBuilder) -> Operation {
    operation
        .parameter(
            ParameterBuilder::new()
                .name("id")
                .parameter_in(ParameterIn::Path)
                .required(Required::True)
                .schema(Some(string_schema())),
        )
        .response("404", error_body("No row with this id"))
        .response("422", error_body("Malformed id or payload"))
        .build()
}

/// Paths and schemas for one resource mounted at `base`.
pub fn resource_doc<E: Resource>(base: &str, tag: &str) -> utoipa::openapi::OpenApi {
    let entity = E::entity_name();

    let list = operation(tag, format!("List {entity} objects"))
        .parameter(query_param(PAGE_PARAM, "1-based page index"))
        .parameter(query_param(SIZE_PARAM, "Page size, capped by configuration"))
        .parameter(query_param(SEARCH_PARAM, "Case-insensitive substring over search columns"))
        .parameter(query_param(ORDER_BY_PARAM, "Comma-separated columns, `-` for descending"))
        .parameter(query_param(DATE_FROM_PARAM, "Inclusive lower date bound"))
        .parameter(query_param(DATE_TO_PARAM, "Inclusive upper date bound"))
        .response(
            "200",
            json_body("One page of results", PageResponse::<E::Detail>::schema()),
        )
        .response("422", error_body("Unknown column or malformed value"))
        .build();

    let create = operation(tag, format!("Create a {entity}"))
        .request_body(Some(json_request(schema_ref::<E::Create>())))
        .response("201", json_body("Created", schema_ref::<E::Detail>()))
        .response("409", error_body("Conflicts with an existing row"))
        .response("422", error_body("Payload failed validation"))
        .build();

    let batch = operation(tag, format!("Fetch several {entity} objects"))
        .parameter(
            query_param(IDS_PARAM, "Comma-separated ids; missing ids are skipped")
                .required(Required::True),
        )
        .response(
            "200",
            json_body(
                "Rows that exist",
                RefOr::T(Schema::Array(
                    ArrayBuilder::new().items(schema_ref::<E::Detail>()).build(),
                )),
            ),
        )
        .response("422", error_body("Malformed id"))
        .build();

    let fetch = with_id(
        operation(tag, format!("Fetch a {entity}"))
            .response("200", json_body("Found", schema_ref::<E::Detail>())),
    );

    let update = with_id(
        operation(tag, format!("Update a {entity}"))
            .request_body(Some(json_request(schema_ref::<E::Update>())))
            .response("200", json_body("Updated", schema_ref::<E::Detail>()))
            .response("400", error_body("No fields to change"))
            .response("409", error_body("Conflicts with an existing row")),
    );

    let upsert = with_id(
        operation(tag, format!("Create or replace a {entity}"))
            .request_body(Some(json_request(schema_ref::<E::Create>())))
            .response("200", json_body("Created or replaced", schema_ref::<E::Detail>()))
            .response("409", error_body("Conflicts with an existing row")),
    );

    let remove = with_id(
        operation(tag, format!("Delete a {entity}"))
            .response("204", ResponseBuilder::new().description("Deleted").build()),
    );

    let paths = PathsBuilder::new()
        .path(
            base,
            PathItemBuilder::new()
                .operation(HttpMethod::Get, list)
                .operation(HttpMethod::Post, create)
                .build(),
        )
        .path(
            format!("{base}/batch"),
            PathItemBuilder::new().operation(HttpMethod::Get, batch).build(),
        )
        .path(
            format!("{base}/{{id}}"),
            PathItemBuilder::new()
                .operation(HttpMethod::Get, fetch)
                .operation(HttpMethod::Patch, update)
                .operation(HttpMethod::Put, upsert)
                .operation(HttpMethod::Delete, remove)
                .build(),
        )
        .build();

    let components = ComponentsBuilder::new()
        .schema_from::<E::Create>()
        .schema_from::<E::Update>()
        .schema_from::<E::Detail>()
        .build();

    OpenApiBuilder::new()
        .paths(paths)
        .components(Some(components))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_lists_resource_operations() {
        let doc = openapi(&AppConfig::default());
        let paths = &doc.paths.paths;

        let collection = paths.get("/api/example").expect("collection path");
        assert!(collection.get.is_some());
        assert!(collection.post.is_some());

        let item = paths.get("/api/example/{id}").expect("item path");
        assert!(item.get.is_some() && item.patch.is_some());
        assert!(item.put.is_some() && item.delete.is_some());

        assert!(paths.contains_key("/api/example/batch"));
        assert!(paths.contains_key("/api/health"));
    }

    #[test]
    fn test_document_registers_schemas() {
        let doc = openapi(&AppConfig::default());
        let schemas = &doc.components.expect("components").schemas;
        for name in ["ExampleCreate", "ExampleUpdate", "ExampleDetail", "ApiErrorResponse"] {
            assert!(schemas.contains_key(name), "{name}");
        }
    }

    #[test]
    fn test_info_follows_config() {
        let mut config = AppConfig::default();
        config.title = "Inventory".to_string();
        assert_eq!(openapi(&config).info.title, "Inventory");
    }
}
