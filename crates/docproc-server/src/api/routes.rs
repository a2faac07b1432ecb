//! HTTP endpoints: trigger, status lookup, liveness.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use docproc_core::error::StoreError;
use docproc_core::store::{DocumentStore, ItemKey};
use docproc_core::{DocumentRecord, Processor};

use super::error::ApiError;

/// Shared handler state: the processor and direct store access for lookups.
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<Processor>,
    pub store: Arc<dyn DocumentStore>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/process", post(process_document))
        .route("/status/:document_id", get(document_status))
        .route("/health", get(health))
        .with_state(state)
}

#[derive(Deserialize)]
pub struct ProcessRequest {
    record: DocumentRecord,
}

#[derive(Serialize)]
struct ProcessAccepted {
    message: &'static str,
    document_id: String,
    status: &'static str,
}

/// `POST /process` — validate the record, acknowledge immediately, and hand
/// the document off to a detached background run. Pipeline failures after
/// this point are recorded in the store, never surfaced here.
async fn process_document(
    State(state): State<AppState>,
    Json(request): Json<ProcessRequest>,
) -> Result<Json<ProcessAccepted>, ApiError> {
    let record = request.record;
    docproc_core::accept(&record).map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let document_id = record.document_id.clone();
    info!(document_id = %document_id, "accepted document for processing");

    let processor = state.processor.clone();
    tokio::spawn(async move {
        processor.process(record).await;
    });

    Ok(Json(ProcessAccepted {
        message: "Document processing started",
        document_id,
        status: "processing",
    }))
}

/// `GET /status/:document_id` — the stored item verbatim, or 404.
async fn document_status(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.store.get(&ItemKey::document(&document_id)) {
        Ok(item) => Ok(Json(item)),
        Err(StoreError::NotFound) => {
            Err(ApiError::NotFound(format!("document {document_id} not found")))
        }
        Err(e) => Err(ApiError::Internal(e.to_string())),
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

/// `GET /health` — constant liveness payload.
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        service: "docproc",
    })
}
