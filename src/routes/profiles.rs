use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::get,
};
use serde::Deserialize;

use crate::{
    error::AppError,
    response::{ApiResult, MessageBody},
    state::AppState,
    storage::ConnectionProfile,
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/databases", get(list_profiles).post(create_profile))
        .route("/api/databases/{name}", get(get_profile).put(save_profile))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub filename: String,
}

async fn list_profiles(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.profiles.list().await?))
}

async fn get_profile(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<ConnectionProfile>> {
    Ok(Json(state.profiles.get(&name).await?))
}

async fn create_profile(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateProfileRequest>,
) -> ApiResult<(StatusCode, Json<MessageBody>)> {
    state.profiles.create(&request.filename).await?;
    Ok((
        StatusCode::CREATED,
        MessageBody::new(format!("{} created", request.filename)),
    ))
}

async fn save_profile(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(mut profile): Json<ConnectionProfile>,
) -> ApiResult<Json<MessageBody>> {
    let engine = state
        .pipeline
        .engines()
        .resolve(&profile.engine)
        .map_err(|err| AppError::bad_request(err.to_string()))?;
    profile.engine = engine.to_string();
    state.profiles.put(&name, &profile).await?;
    Ok(MessageBody::new(format!("{name} saved")))
}
