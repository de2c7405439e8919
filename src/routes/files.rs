use axum::{
    extract::{multipart::MultipartError, Multipart, Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;

use crate::{
    error::AppError,
    models::Visualization,
    services::file_store::{FileRecord, Upload},
    AppState,
};

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/upload", post(upload_file))
        .route("/api/query", post(process_query))
        .route("/api/files/:file_id", get(get_file_info))
}

#[derive(Debug, Deserialize)]
pub struct UploadParams {
    user_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file_id: String,
    pub filename: String,
    pub row_count: usize,
    pub columns: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    file_id: String,
    query: String,
    #[serde(default)]
    conversation_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct QueryResponse {
    answer: String,
    visualization: Visualization,
    query_metadata: Map<String, Value>,
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge(e.body_text())
    } else {
        AppError::InvalidInput(format!("Malformed upload: {}", e.body_text()))
    }
}

async fn upload_file(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UploadParams>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    let start = std::time::Instant::now();
    let user_id = params
        .user_id
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| AppError::InvalidInput("User ID is required".to_string()))?;

    let mut upload: Option<(String, Bytes)> = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;
        let data = field.bytes().await.map_err(multipart_error)?;
        upload = Some((filename, data));
        break;
    }
    let (filename, data) =
        upload.ok_or_else(|| AppError::InvalidInput("No file provided".to_string()))?;

    if data.len() > state.config.max_file_size {
        return Err(AppError::PayloadTooLarge(format!(
            "{} is {} bytes, limit is {}",
            filename,
            data.len(),
            state.config.max_file_size
        )));
    }
    tracing::info!("Upload from {}: {} ({} bytes)", user_id, filename, data.len());

    let file_size = data.len();
    let (table, metadata) = state.processor.process(data, &filename)?;
    let record = state.store.save(
        &Upload {
            user_id: &user_id,
            filename: &filename,
            file_size,
        },
        table,
        &metadata,
    )?;

    tracing::info!("Upload {} stored as {} in {:?}", filename, record.id, start.elapsed());
    Ok(Json(UploadResponse {
        columns: record.columns(),
        file_id: record.id,
        filename,
        row_count: record.row_count,
    }))
}

async fn process_query(
    State(state): State<Arc<AppState>>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, AppError> {
    tracing::info!(
        "Query on file {} (conversation {}): {}",
        request.file_id,
        request.conversation_id.as_deref().unwrap_or("-"),
        request.query
    );

    let table = state
        .store
        .load_table(&request.file_id)?
        .ok_or_else(|| AppError::NotFound("File data not found".to_string()))?;

    let result = state.engine.answer(&table, &request.query);

    Ok(Json(QueryResponse {
        answer: result.answer,
        visualization: result.visualization,
        query_metadata: result.metadata,
    }))
}

async fn get_file_info(
    State(state): State<Arc<AppState>>,
    Path(file_id): Path<String>,
) -> Result<Json<FileRecord>, AppError> {
    state
        .store
        .file_record(&file_id)?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))
}
