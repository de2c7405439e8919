use axum::{extract::DefaultBodyLimit, http::Method, routing::get, Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

pub mod files;

// Room for multipart boundaries and part headers around the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .max_age(std::time::Duration::from_secs(3600));

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .merge(files::routes())
        .layer(DefaultBodyLimit::max(state.config.max_file_size + MULTIPART_OVERHEAD))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Sheet insights API is running" }))
}

async fn health_check() -> &'static str {
    "OK"
}
