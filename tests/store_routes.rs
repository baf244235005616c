use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use schema_studio::{
    state::AppState,
    test_helpers::{CountingRenderer, FakeDumpRunner, test_router, test_state},
};

fn state(root: &std::path::Path) -> Arc<AppState> {
    test_state(
        root,
        FakeDumpRunner::succeeding(""),
        Arc::new(CountingRenderer::default()),
    )
}

async fn json_response(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
    let response = test_router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let body = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    (status, json)
}

fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn file_crud_flow() {
    let tmp = tempfile::tempdir().unwrap();
    let state = state(tmp.path());

    let (status, body) = json_response(&state, get("/api/files")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!([]));

    let (status, body) = json_response(
        &state,
        json_request("POST", "/api/files", json!({ "filename": "schema.sql" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["message"].as_str().unwrap().contains("schema.sql"));

    let (status, _) = json_response(
        &state,
        json_request("POST", "/api/files", json!({ "filename": "schema.sql" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = json_response(
        &state,
        json_request(
            "PUT",
            "/api/files/schema.sql",
            json!({ "content": "CREATE TABLE t (id int);" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = json_response(&state, get("/api/files/schema.sql")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "filename": "schema.sql", "content": "CREATE TABLE t (id int);" })
    );

    let (status, body) = json_response(&state, get("/api/files")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["schema.sql"]));
}

#[tokio::test]
async fn file_errors_are_json() {
    let tmp = tempfile::tempdir().unwrap();
    let state = state(tmp.path());

    let (status, body) = json_response(&state, get("/api/files/missing.sql")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("missing.sql"));

    let (status, _) = json_response(
        &state,
        json_request("POST", "/api/files", json!({ "filename": ".." })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = json_response(
        &state,
        json_request("PUT", "/api/files/..%2Fescape.txt", json!({ "content": "x" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(!tmp.path().join("escape.txt").exists());
}

#[tokio::test]
async fn profile_crud_flow() {
    let tmp = tempfile::tempdir().unwrap();
    let state = state(tmp.path());

    let (status, _) = json_response(
        &state,
        json_request("POST", "/api/databases", json!({ "filename": "shop.json" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = json_response(&state, get("/api/databases/shop.json")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["engine"], "postgres");
    assert_eq!(body["host"], "localhost");
    assert_eq!(body["port"], 5432);
    assert_eq!(body["database_name"], "my_database");

    let (status, _) = json_response(
        &state,
        json_request(
            "PUT",
            "/api/databases/shop.json",
            json!({
                "dbType": "MySQL",
                "host": "db",
                "port": "3306",
                "user": "app",
                "password": "pw",
                "dbname": "shop"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = json_response(&state, get("/api/databases/shop.json")).await;
    assert_eq!(body["engine"], "mysql");
    assert_eq!(body["port"], 3306);
    assert_eq!(body["database_name"], "shop");

    let (status, body) = json_response(&state, get("/api/databases")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(["shop.json"]));
}

#[tokio::test]
async fn profile_validation() {
    let tmp = tempfile::tempdir().unwrap();
    let state = state(tmp.path());

    let (status, _) = json_response(
        &state,
        json_request("POST", "/api/databases", json!({ "filename": "shop" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = json_response(
        &state,
        json_request(
            "PUT",
            "/api/databases/shop.json",
            json!({ "engine": "oracle", "host": "db" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("oracle"));

    let (status, _) = json_response(&state, get("/api/databases/none.json")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_and_unknown_routes() {
    let tmp = tempfile::tempdir().unwrap();
    let state = state(tmp.path());

    let (status, body) = json_response(&state, get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "ok": true }));

    let (status, body) = json_response(&state, get("/api/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].is_string());
}
