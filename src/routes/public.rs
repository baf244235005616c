use axum::{Json, Router, routing::get};

use crate::routes::route_list::{RouteInfo, routes};

pub fn router() -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/routes.json", get(list_routes_json))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

async fn list_routes_json() -> Json<&'static [RouteInfo]> {
    Json(routes())
}
