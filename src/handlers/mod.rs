// HTTP handlers

pub mod docs;
pub mod generation;

use crate::app::AppState;
use axum::{
    routing::{get, post},
    Router,
};

// Generation routes, mounted behind the auth middleware
pub fn generation_routes() -> Router<AppState> {
    Router::new()
        .route("/model", post(generation::generate_model))
        .route("/jewelry", post(generation::generate_jewelry))
        .route("/template", post(generation::generate_template))
        .route("/{id}/status", get(generation::generation_status))
}
