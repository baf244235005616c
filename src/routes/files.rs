use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;

use crate::{
    response::{ApiResult, MessageBody},
    state::AppState,
    storage::StoredFile,
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/files", get(list_files).post(create_file))
        .route("/api/files/{name}", get(get_file).put(save_file))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct CreateFileRequest {
    pub filename: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct SaveFileRequest {
    pub content: String,
}

async fn list_files(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.files.list().await?))
}

async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<StoredFile>> {
    Ok(Json(state.files.get(&name).await?))
}

async fn create_file(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateFileRequest>,
) -> ApiResult<(StatusCode, Json<MessageBody>)> {
    state.files.create(&request.filename, &request.content).await?;
    Ok((
        StatusCode::CREATED,
        MessageBody::new(format!("{} created", request.filename)),
    ))
}

async fn save_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(request): Json<SaveFileRequest>,
) -> ApiResult<Json<MessageBody>> {
    state.files.put(&name, &request.content).await?;
    Ok(MessageBody::new(format!("{name} saved")))
}
