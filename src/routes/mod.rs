use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

pub mod diagram;
pub mod files;
pub mod profiles;
pub mod public;
pub mod route_list;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(public::router())
        .merge(diagram::router(state.clone()))
        .merge(files::router(state.clone()))
        .merge(profiles::router(state))
}
