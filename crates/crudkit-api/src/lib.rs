//! # crudkit-api
//!
//! HTTP API layer for CrudKit built on Axum.
//!
//! Provides the generic resource routes, health check, middleware (CORS,
//! compression, logging, panic boundary), extractors, the OpenAPI document
//! with its Swagger UI, and the mapping from `AppError` to the
//! `{"code", "title", "detail"}` response envelope.

pub mod app;
pub mod docs;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod state;

pub use app::{build_app, run_server};
pub use error::{ApiError, ApiErrorResponse, ApiResult};
pub use state::AppState;
