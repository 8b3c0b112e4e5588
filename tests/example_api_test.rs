//! Integration tests for the example resource endpoints.

mod helpers;

use std::collections::HashSet;

use axum::http::StatusCode;
use serde_json::json;

use crudkit_core::traits::Entity;
use crudkit_entity::example::Example;
use helpers::{TestApp, id_of};

const MISSING_ID: &str = "00000000-0000-0000-0000-999999999999";

#[tokio::test]
async fn test_create_then_get() {
    let app = TestApp::new();
    let created = app.create_example("first").await;
    assert_eq!(created["name"], "first");
    assert!(created["created_at"].is_string());

    let id = id_of(&created);
    let response = app.request("GET", &format!("/api/example/{id}"), None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body, created);
    assert_eq!(app.store.committed_rows(Example::table()).await, 1);
}

#[tokio::test]
async fn test_get_missing_is_not_found() {
    let app = TestApp::new();
    let response = app
        .request("GET", &format!("/api/example/{MISSING_ID}"), None)
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["code"], 404);
    assert_eq!(response.body["title"], "Not found");
    assert_eq!(
        response.body["detail"],
        format!("Example object with id={MISSING_ID} not found")
    );
}

#[tokio::test]
async fn test_malformed_id_is_rejected() {
    let app = TestApp::new();
    let response = app.request("GET", "/api/example/not-a-uuid", None).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_invalid_payload_is_unprocessable() {
    let app = TestApp::new();

    let response = app
        .request("POST", "/api/example", Some(json!({ "name": "" })))
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(response.body["code"], 422);
    assert_eq!(response.body["detail"], "Provided values are not valid.");

    let response = app
        .request("POST", "/api/example", Some(json!({ "title": "x" })))
        .await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(app.store.committed_rows(Example::table()).await, 0);
}

#[tokio::test]
async fn test_rename_then_delete() {
    let app = TestApp::new();
    let created = app.create_example("A").await;
    let path = format!("/api/example/{}", id_of(&created));

    let response = app.request("PATCH", &path, Some(json!({ "name": "B" }))).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["name"], "B");
    assert_eq!(response.body["id"], created["id"]);
    assert_eq!(response.body["created_at"], created["created_at"]);

    let response = app.request("DELETE", &path, None).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);
    assert!(response.body.is_null());

    let response = app.request("GET", &path, None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);

    let response = app.request("DELETE", &path, None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_empty_update_is_bad_request() {
    let app = TestApp::new();
    let created = app.create_example("unchanged").await;
    let path = format!("/api/example/{}", id_of(&created));

    let response = app.request("PATCH", &path, Some(json!({}))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["title"], "Bad request");
    assert_eq!(response.body["detail"], "No data provided for updating");

    let response = app.request("GET", &path, None).await;
    assert_eq!(response.body, created);
}

#[tokio::test]
async fn test_duplicate_name_conflicts() {
    let app = TestApp::new();
    app.create_example("taken").await;

    let response = app
        .request("POST", "/api/example", Some(json!({ "name": "taken" })))
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.body["code"], 409);
    assert_eq!(response.body["title"], "Conflict");

    assert_eq!(app.store.committed_rows(Example::table()).await, 1);
}

#[tokio::test]
async fn test_put_creates_then_replaces() {
    let app = TestApp::new();
    let path = format!("/api/example/{MISSING_ID}");

    let response = app.request("PUT", &path, Some(json!({ "name": "made" }))).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["id"], MISSING_ID);

    let response = app
        .request("PUT", &path, Some(json!({ "name": "remade" })))
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["name"], "remade");
    assert_eq!(app.store.committed_rows(Example::table()).await, 1);
}

#[tokio::test]
async fn test_page_sweep_sees_every_item_once() {
    let app = TestApp::new();
    for i in 0..7 {
        app.create_example(&format!("item-{i}")).await;
    }

    let mut seen = HashSet::new();
    for page in 1..=3 {
        let response = app
            .request("GET", &format!("/api/example?page={page}&size=3"), None)
            .await;
        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.body["total_items"], 7);
        assert_eq!(response.body["total_pages"], 3);
        for item in response.body["items"].as_array().expect("items") {
            assert!(seen.insert(id_of(item)), "item listed twice");
        }
    }
    assert_eq!(seen.len(), 7);

    let response = app.request("GET", "/api/example?page=4&size=3", None).await;
    assert_eq!(response.body["items"], json!([]));
    assert_eq!(response.body["has_next"], false);
}

#[tokio::test]
async fn test_page_size_is_clamped() {
    let app = TestApp::new();
    let response = app.request("GET", "/api/example?size=500", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["page_size"], 20);
    assert_eq!(response.body["total_pages"], 0);
}

#[tokio::test]
async fn test_filters_search_and_sort() {
    let app = TestApp::new();
    for name in ["apple", "Apricot", "banana", "grape"] {
        app.create_example(name).await;
    }

    let response = app
        .request("GET", "/api/example?name__ilike=ap&order_by=-name", None)
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let names: Vec<_> = response.body["items"]
        .as_array()
        .expect("items")
        .iter()
        .map(|item| item["name"].as_str().expect("name").to_string())
        .collect();
    assert_eq!(names, ["grape", "apple", "Apricot"]);

    let response = app.request("GET", "/api/example?search=NAN", None).await;
    assert_eq!(response.body["total_items"], 1);
    assert_eq!(response.body["items"][0]["name"], "banana");

    let response = app.request("GET", "/api/example?name=banana", None).await;
    assert_eq!(response.body["total_items"], 1);

    let response = app.request("GET", "/api/example?name__not=banana", None).await;
    assert_eq!(response.body["total_items"], 3);

    let response = app
        .request("GET", "/api/example?date_from=2000-01-01", None)
        .await;
    assert_eq!(response.body["total_items"], 4);
}

#[tokio::test]
async fn test_unknown_filter_column_is_rejected() {
    let app = TestApp::new();
    let response = app.request("GET", "/api/example?colour=red", None).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);

    let response = app.request("GET", "/api/example?order_by=colour", None).await;
    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_batch_fetch_skips_missing() {
    let app = TestApp::new();
    let first = id_of(&app.create_example("one").await);
    let second = id_of(&app.create_example("two").await);

    let response = app
        .request(
            "GET",
            &format!("/api/example/batch?ids={first},{MISSING_ID},{second}"),
            None,
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    let ids: HashSet<_> = response.body.as_array().expect("list").iter().map(id_of).collect();
    assert_eq!(ids, HashSet::from([first, second]));
}

#[tokio::test]
async fn test_health_reports_storage() {
    let app = TestApp::new();
    let response = app.request("GET", "/api/health", None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
    assert_eq!(response.body["storage"], "memory");
}

#[tokio::test]
async fn test_unknown_route_renders_envelope() {
    let app = TestApp::new();
    let response = app.request("GET", "/api/nothing-here", None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["code"], 404);
}
