use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    diagram::{Diagram, DiagramRequest, OutputFormat},
    response::ApiResult,
    state::AppState,
};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/generate-schema-diagram", post(generate))
        .route("/api/databases/{name}/diagram", post(generate_from_profile))
        .with_state(state)
}

#[derive(Debug, Serialize)]
pub struct DiagramResponse {
    pub diagram: String,
    pub format: OutputFormat,
    pub tables: usize,
    pub relationships: usize,
    pub generated_at: DateTime<Utc>,
}

impl From<Diagram> for DiagramResponse {
    fn from(diagram: Diagram) -> Self {
        Self {
            diagram: diagram.document,
            format: diagram.format,
            tables: diagram.tables,
            relationships: diagram.relationships,
            generated_at: diagram.generated_at,
        }
    }
}

async fn generate(
    State(state): State<Arc<AppState>>,
    Json(request): Json<DiagramRequest>,
) -> ApiResult<Json<DiagramResponse>> {
    let diagram = state.pipeline.generate(request).await?;
    Ok(Json(diagram.into()))
}

async fn generate_from_profile(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<DiagramResponse>> {
    let profile = state.profiles.get(&name).await?;
    let diagram = state.pipeline.generate(profile.into()).await?;
    Ok(Json(diagram.into()))
}
