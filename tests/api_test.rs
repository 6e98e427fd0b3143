//! HTTP-level tests for the item routes
//!
//! The router is driven in-process with `oneshot`; storage is in-memory unless
//! a test swaps in a failing store.

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use itemlist::api::{create_router, AppState};
use itemlist::catalog::ItemStore;
use itemlist::storage::local::LocalStorage;
use itemlist::storage::memory::MemoryStorage;
use itemlist::types::{Item, ItemId, ItemUpdate, NewItem};
use itemlist::{Error, Result};
use serde_json::{json, Value};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt; // for oneshot

fn app() -> Router {
    create_router(AppState::with_storage(Arc::new(MemoryStorage::new())))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    let body = match body {
        Some(value) => {
            request = request.header("content-type", "application/json");
            Body::from(value.to_string())
        }
        None => Body::empty(),
    };

    let response = app
        .clone()
        .oneshot(request.body(body).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            panic!("non-JSON body: {}", String::from_utf8_lossy(&bytes))
        })
    };
    (status, json)
}

async fn create(app: &Router, body: Value) -> Value {
    let (status, created) = send(app, "POST", "/items", Some(body)).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {created}");
    created
}

fn gramophone() -> Value {
    json!({
        "category": "audio",
        "name": "Model 102",
        "maker": "HMV",
        "date": "1931-01-01",
        "condition": "working",
        "keywords": ["portable", "78rpm"],
        "description": "Wind-up portable gramophone",
        "location": "attic",
    })
}

#[tokio::test]
async fn create_returns_created_item() {
    let app = app();
    let created = create(&app, gramophone()).await;

    assert_eq!(created["name"], "Model 102");
    assert_eq!(created["category"], "audio");
    assert_eq!(created["maker"], "HMV");
    assert_eq!(created["keywords"], json!(["portable", "78rpm"]));
    assert_eq!(created["image"], Value::Null);
    assert!(created["id"].as_str().is_some());
    assert!(created.get("created_at").is_none());
    assert!(created.get("revision").is_none());
}

#[tokio::test]
async fn create_with_missing_field_is_rejected_and_not_persisted() {
    let app = app();

    for field in ["category", "name", "maker"] {
        let mut body = gramophone();
        body.as_object_mut().unwrap().remove(field);

        let (status, error) = send(&app, "POST", "/items", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(
            error["message"],
            format!("Missing `{field}` in request body")
        );
    }

    let (status, list) = send(&app, "GET", "/items", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["items"], json!([]));
}

#[tokio::test]
async fn create_with_malformed_json_is_bad_request() {
    let app = app();
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/items")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let error: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(error["message"].is_string());
}

#[tokio::test]
async fn list_is_capped_at_ten() {
    let app = app();
    for i in 0..13 {
        let mut body = gramophone();
        body["name"] = json!(format!("Model {i}"));
        create(&app, body).await;
    }

    let (status, list) = send(&app, "GET", "/items", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["items"].as_array().unwrap().len(), 10);
}

#[tokio::test]
async fn get_by_id_round_trips_and_unknown_id_is_not_found() {
    let app = app();
    let created = create(&app, gramophone()).await;
    let id = created["id"].as_str().unwrap();

    let (status, fetched) = send(&app, "GET", &format!("/items/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let unknown = ItemId::generate();
    let (status, error) = send(&app, "GET", &format!("/items/{unknown}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(error["message"].is_string());
}

#[tokio::test]
async fn get_with_malformed_id_is_internal_error() {
    let app = app();
    let (status, error) = send(&app, "GET", "/items/not-an-id", None).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error, json!({ "message": "Internal server error" }));
}

#[tokio::test]
async fn update_with_mismatched_id_is_rejected() {
    let app = app();
    let created = create(&app, gramophone()).await;
    let id = created["id"].as_str().unwrap();
    let other = ItemId::generate().to_string();

    let (status, error) = send(
        &app,
        "PUT",
        &format!("/items/{id}"),
        Some(json!({ "id": other, "name": "Hijacked" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        error["message"],
        format!("Request path id ({id}) and request body id ({other}) must match")
    );

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/items/{id}"),
        Some(json!({ "name": "No id" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, fetched) = send(&app, "GET", &format!("/items/{id}"), None).await;
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn update_applies_only_allow_listed_fields() {
    let app = app();
    let created = create(&app, gramophone()).await;
    let id = created["id"].as_str().unwrap();

    let update = json!({
        "id": id,
        "name": "Model 102 (restored)",
        "location": "living room",
        "borough": "Brooklyn",
    });

    for _ in 0..2 {
        let (status, body) =
            send(&app, "PUT", &format!("/items/{id}"), Some(update.clone())).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);
    }

    let (_, fetched) = send(&app, "GET", &format!("/items/{id}"), None).await;
    assert_eq!(fetched["name"], "Model 102 (restored)");
    assert_eq!(fetched["location"], "living room");
    assert_eq!(fetched["maker"], created["maker"]);
    assert_eq!(fetched["keywords"], created["keywords"]);
    assert_eq!(fetched["description"], created["description"]);
    assert!(fetched.get("borough").is_none());
}

#[tokio::test]
async fn update_of_absent_item_is_no_content() {
    let app = app();
    let id = ItemId::generate();

    let (status, _) = send(
        &app,
        "PUT",
        &format!("/items/{id}"),
        Some(json!({ "id": id.to_string(), "name": "Ghost" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/items/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_is_idempotent() {
    let app = app();
    let created = create(&app, gramophone()).await;
    let id = created["id"].as_str().unwrap();
    let uri = format!("/items/{id}");

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn unmatched_requests_get_json_not_found() {
    let app = app();
    let expected = json!({ "message": "Not Found" });

    for (method, uri) in [
        ("GET", "/unknown"),
        ("POST", "/"),
        ("PATCH", "/items"),
        ("POST", "/items/abc"),
        ("GET", "/items/abc/extra"),
    ] {
        let (status, body) = send(&app, method, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
        assert_eq!(body, expected, "{method} {uri}");
    }
}

/// Store whose every operation fails
struct BrokenStore;

#[async_trait]
impl ItemStore for BrokenStore {
    async fn create(&self, _fields: NewItem) -> Result<Item> {
        Err(Error::storage("connection refused"))
    }

    async fn find(&self, _limit: usize) -> Result<Vec<Item>> {
        Err(Error::storage("connection refused"))
    }

    async fn find_by_id(&self, _id: &ItemId) -> Result<Option<Item>> {
        Err(Error::storage("connection refused"))
    }

    async fn find_by_id_and_update(
        &self,
        _id: &ItemId,
        _update: ItemUpdate,
    ) -> Result<Option<Item>> {
        Err(Error::storage("connection refused"))
    }

    async fn find_by_id_and_remove(&self, _id: &ItemId) -> Result<Option<Item>> {
        Err(Error::storage("connection refused"))
    }
}

#[tokio::test]
async fn store_failures_become_generic_internal_errors() {
    let app = create_router(AppState::new(Arc::new(BrokenStore)));
    let id = ItemId::generate().to_string();
    let expected = json!({ "message": "Internal server error" });

    let requests = [
        ("GET", "/items".to_string(), None),
        ("GET", format!("/items/{id}"), None),
        ("POST", "/items".to_string(), Some(gramophone())),
        (
            "PUT",
            format!("/items/{id}"),
            Some(json!({ "id": id, "name": "x" })),
        ),
        ("DELETE", format!("/items/{id}"), None),
    ];

    for (method, uri, body) in requests {
        let (status, error) = send(&app, method, &uri, body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{method} {uri}");
        assert_eq!(error, expected, "{method} {uri}");
    }
}

#[tokio::test]
async fn validation_runs_before_the_store() {
    let app = create_router(AppState::new(Arc::new(BrokenStore)));

    let (status, _) = send(&app, "POST", "/items", Some(json!({ "name": "x" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn undecodable_path_id_is_json_bad_request() {
    let app = app();

    for method in ["GET", "DELETE"] {
        let (status, error) = send(&app, method, "/items/%FF%FE", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{method}");
        assert!(error["message"].is_string(), "{method}");
    }

    let (status, error) = send(
        &app,
        "PUT",
        "/items/%FF%FE",
        Some(json!({ "id": "x", "name": "y" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(error["message"].is_string());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_requests_on_disk_never_fail() {
    let temp_dir = TempDir::new().unwrap();
    let storage = Arc::new(LocalStorage::new(temp_dir.path()).unwrap());
    let app = create_router(AppState::with_storage(storage));

    let created = create(&app, gramophone()).await;
    let id = created["id"].as_str().unwrap().to_string();
    let uri = format!("/items/{id}");

    let mut handles = Vec::new();
    for i in 0..50 {
        let app = app.clone();
        let uri = uri.clone();
        let body = json!({ "id": id, "condition": format!("pass {i}") });
        handles.push(tokio::spawn(async move {
            send(&app, "PUT", &uri, Some(body)).await.0
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap(), StatusCode::NO_CONTENT);
    }

    let (status, fetched) = send(&app, "GET", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(fetched["condition"].as_str().unwrap().starts_with("pass "));
    assert_eq!(fetched["name"], created["name"]);

    // Reads racing the delete see the item or a 404, never a 500
    let mut handles = Vec::new();
    {
        let app = app.clone();
        let uri = uri.clone();
        handles.push(tokio::spawn(async move {
            send(&app, "DELETE", &uri, None).await.0
        }));
    }
    for i in 0..20 {
        let app = app.clone();
        let uri = if i % 2 == 0 { uri.clone() } else { "/items".to_string() };
        handles.push(tokio::spawn(async move { send(&app, "GET", &uri, None).await.0 }));
    }
    for handle in handles {
        let status = handle.await.unwrap();
        assert!(
            matches!(
                status,
                StatusCode::OK | StatusCode::NO_CONTENT | StatusCode::NOT_FOUND
            ),
            "unexpected status {status}"
        );
    }
}
