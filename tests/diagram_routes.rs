use std::sync::Arc;

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use schema_studio::{
    diagram::DumpError,
    routes::route_list::routes,
    state::AppState,
    test_helpers::{CountingRenderer, FakeDumpRunner, test_router, test_state},
};

const SHOP_DUMP: &str = r#"
SET statement_timeout = 0;
SELECT pg_catalog.set_config('search_path', '', false);

CREATE TABLE public.customers (
    id integer NOT NULL,
    email character varying(255) NOT NULL
);

CREATE TABLE public.orders (
    id integer NOT NULL,
    customer_id integer NOT NULL,
    total numeric(10,2)
);

ALTER TABLE ONLY public.customers
    ADD CONSTRAINT customers_pkey PRIMARY KEY (id);

ALTER TABLE ONLY public.orders
    ADD CONSTRAINT orders_pkey PRIMARY KEY (id);

ALTER TABLE ONLY public.orders
    ADD CONSTRAINT orders_customer_id_fkey FOREIGN KEY (customer_id) REFERENCES public.customers(id);
"#;

const PASSWORD: &str = "s3cr3t-pa55";

fn diagram_request(engine: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/generate-schema-diagram")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "engine": engine,
                "host": "localhost",
                "port": 5432,
                "user": "root",
                "password": PASSWORD,
                "database_name": "shop"
            })
            .to_string(),
        ))
        .unwrap()
}

async fn json_response(state: &Arc<AppState>, request: Request<Body>) -> (StatusCode, Value) {
    let response = test_router(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let body = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: Value = serde_json::from_slice(&body).unwrap();
    (status, json)
}

#[tokio::test]
async fn shop_schema_renders_two_entities_and_one_edge() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = FakeDumpRunner::succeeding(SHOP_DUMP);
    let state = test_state(tmp.path(), runner.clone(), Arc::new(CountingRenderer::default()));

    let (status, body) = json_response(&state, diagram_request("postgres")).await;

    assert_eq!(status, StatusCode::OK);
    let svg = body["diagram"].as_str().unwrap();
    assert!(svg.starts_with("<svg"));
    assert_eq!(svg.matches("class=\"entity\"").count(), 2);
    assert_eq!(svg.matches("class=\"relationship\"").count(), 1);
    assert_eq!(body["tables"], 2);
    assert_eq!(body["relationships"], 1);

    let commands = runner.commands();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].program, "pg_dump");
    assert!(commands[0].args.contains(&"shop".to_string()));
    assert!(!commands[0].args.iter().any(|arg| arg.contains(PASSWORD)));
}

#[tokio::test]
async fn mongodb_is_rejected_without_spawning() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = FakeDumpRunner::succeeding(SHOP_DUMP);
    let state = test_state(tmp.path(), runner.clone(), Arc::new(CountingRenderer::default()));

    let (status, body) = json_response(&state, diagram_request("mongodb")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "unsupported engine");
    assert_eq!(runner.spawns(), 0);
}

#[tokio::test]
async fn failed_dump_hides_the_password() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = FakeDumpRunner::failing(DumpError::Exited {
        program: "pg_dump".to_string(),
        status: "status 1".to_string(),
        stderr: format!("FATAL: password authentication failed for user \"root\" ({PASSWORD})"),
    });
    let state = test_state(tmp.path(), runner, Arc::new(CountingRenderer::default()));

    let request = diagram_request("postgres");
    let response = test_router(state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let raw = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(raw.to_vec()).unwrap();
    assert!(!text.contains(PASSWORD));

    let body: Value = serde_json::from_str(&text).unwrap();
    assert_eq!(body["error"], "dump failed");
    assert!(body["details"].as_str().unwrap().contains("password authentication failed"));
    assert!(body["hint"].as_str().unwrap().contains("verify credentials"));
}

#[tokio::test]
async fn invalid_sql_never_reaches_the_renderer() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = FakeDumpRunner::succeeding("CREATE TABLE broken (id int");
    let renderer = Arc::new(CountingRenderer::default());
    let state = test_state(tmp.path(), runner, renderer.clone());

    let (status, body) = json_response(&state, diagram_request("postgres")).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "schema conversion failed");
    assert!(body["details"].as_str().unwrap().contains("line 1"));
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn repeated_requests_give_the_same_document() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = FakeDumpRunner::succeeding(SHOP_DUMP);
    let state = test_state(tmp.path(), runner.clone(), Arc::new(CountingRenderer::default()));

    let (_, first) = json_response(&state, diagram_request("postgres")).await;
    let (_, second) = json_response(&state, diagram_request("postgres")).await;

    assert_eq!(first["diagram"], second["diagram"]);
    assert_eq!(runner.spawns(), 2);
}

#[tokio::test]
async fn mysql_requests_use_mysqldump() {
    let tmp = tempfile::tempdir().unwrap();
    let dump = "CREATE TABLE `authors` (`id` int NOT NULL, PRIMARY KEY (`id`)) ENGINE=InnoDB;\n\
                CREATE TABLE `books` (`id` int NOT NULL, `author_id` int, PRIMARY KEY (`id`), \
                CONSTRAINT `books_author_fk` FOREIGN KEY (`author_id`) REFERENCES `authors` (`id`)) ENGINE=InnoDB;";
    let runner = FakeDumpRunner::succeeding(dump);
    let state = test_state(tmp.path(), runner.clone(), Arc::new(CountingRenderer::default()));

    let (status, body) = json_response(&state, diagram_request("mysql")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["relationships"], 1);
    let commands = runner.commands();
    assert_eq!(commands[0].program, "mysqldump");
    assert!(commands[0].env.iter().any(|(key, _)| key == "MYSQL_PWD"));
}

#[tokio::test]
async fn malformed_body_gets_json_error() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = FakeDumpRunner::succeeding(SHOP_DUMP);
    let state = test_state(tmp.path(), runner.clone(), Arc::new(CountingRenderer::default()));

    let (status, body) = json_response(
        &state,
        Request::builder()
            .method("POST")
            .uri("/generate-schema-diagram")
            .header("content-type", "application/json")
            .body(Body::from("{\"host\": \"localhost\"}"))
            .unwrap(),
    )
    .await;

    assert!(status.is_client_error());
    assert!(body["error"].is_string());
    assert_eq!(runner.spawns(), 0);
}

fn raw_diagram_request(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/generate-schema-diagram")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn numeric_passwords_are_accepted_and_never_echoed() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = FakeDumpRunner::succeeding(SHOP_DUMP);
    let state = test_state(tmp.path(), runner.clone(), Arc::new(CountingRenderer::default()));

    let request = raw_diagram_request(json!({
        "engine": "postgres",
        "host": "localhost",
        "user": "root",
        "password": 98765432,
        "database_name": "shop"
    }));
    let (status, _) = json_response(&state, request).await;
    assert_eq!(status, StatusCode::OK);
    assert!(
        runner.commands()[0]
            .env
            .contains(&("PGPASSWORD".to_string(), "98765432".to_string()))
    );

    let request = raw_diagram_request(json!({
        "engine": "postgres",
        "password": [98765432, PASSWORD],
        "database_name": "shop"
    }));
    let response = test_router(state.clone()).oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
    let raw = body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(raw.to_vec()).unwrap();
    assert!(!text.contains(PASSWORD));
    assert!(!text.contains("98765432"));
    assert_eq!(runner.spawns(), 1);
}

#[tokio::test]
async fn option_like_database_names_are_refused() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = FakeDumpRunner::succeeding(SHOP_DUMP);
    let state = test_state(tmp.path(), runner.clone(), Arc::new(CountingRenderer::default()));

    let request = raw_diagram_request(json!({
        "engine": "mysql",
        "host": "localhost",
        "port": 3306,
        "user": "root",
        "password": PASSWORD,
        "database_name": "--result-file=/tmp/out.sql"
    }));
    let (status, body) = json_response(&state, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "dump failed");
    assert!(body["details"].as_str().unwrap().contains("must not start with '-'"));
    assert_eq!(runner.spawns(), 0);
}

#[tokio::test]
async fn saved_profiles_drive_diagram_generation() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = FakeDumpRunner::succeeding(SHOP_DUMP);
    let state = test_state(tmp.path(), runner.clone(), Arc::new(CountingRenderer::default()));

    let (status, _) = json_response(
        &state,
        Request::builder()
            .method("POST")
            .uri("/api/databases/missing.json/diagram")
            .body(Body::empty())
            .unwrap(),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(runner.spawns(), 0);

    state.profiles.create("shop.json").await.unwrap();
    let (status, body) = json_response(
        &state,
        Request::builder()
            .method("POST")
            .uri("/api/databases/shop.json/diagram")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["tables"], 2);
    assert!(runner.commands()[0].args.contains(&"my_database".to_string()));
}

#[tokio::test]
async fn route_catalog_lists_diagram_endpoint() {
    assert!(
        routes()
            .iter()
            .any(|route| route.method == "POST" && route.path == "/generate-schema-diagram")
    );

    let tmp = tempfile::tempdir().unwrap();
    let runner = FakeDumpRunner::succeeding(SHOP_DUMP);
    let state = test_state(tmp.path(), runner, Arc::new(CountingRenderer::default()));
    let (status, body) = json_response(
        &state,
        Request::builder()
            .uri("/api/routes.json")
            .body(Body::empty())
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(
        body.as_array()
            .unwrap()
            .iter()
            .any(|route| route["handler"] == "generate")
    );
}
