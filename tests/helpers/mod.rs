//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use crudkit_api::{AppState, build_app};
use crudkit_core::config::{AppConfig, Environment, StorageBackend};
use crudkit_core::traits::SessionFactory;
use crudkit_database::session::MemoryStore;

/// Test application backed by the in-memory store
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Store behind the router, for checking committed state
    pub store: MemoryStore,
}

/// Response captured from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    /// Parsed JSON body, `Null` when empty
    pub body: Value,
}

impl TestApp {
    /// Create a new test application
    pub fn new() -> Self {
        let store = MemoryStore::new();
        let router = test_router(Arc::new(store.clone()));
        Self { router, store }
    }

    /// Send a request with an optional JSON body
    pub async fn request(&self, method: &str, uri: &str, body: Option<Value>) -> TestResponse {
        send(&self.router, method, uri, body).await
    }

    /// Create an example and return its JSON
    pub async fn create_example(&self, name: &str) -> Value {
        let response = self
            .request("POST", "/api/example", Some(serde_json::json!({ "name": name })))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body
    }
}

/// Configuration shared by the integration tests
pub fn test_config() -> AppConfig {
    let mut config = AppConfig::default();
    config.environment = Environment::Test;
    config.database.backend = StorageBackend::Memory;
    config.pagination.default_size = 10;
    config.pagination.max_size = 20;
    config
}

/// Full application over any session factory, with test configuration
pub fn test_router(sessions: Arc<dyn SessionFactory>) -> Router {
    build_app(AppState::new(test_config(), sessions))
}

/// Send a request through a router
pub async fn send(router: &Router, method: &str, uri: &str, body: Option<Value>) -> TestResponse {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("Failed to build request");

    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("Router failed");

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Body is not JSON")
    };

    TestResponse { status, body }
}

/// The `id` field of an entity body
pub fn id_of(body: &Value) -> String {
    body["id"].as_str().expect("id").to_string()
}
