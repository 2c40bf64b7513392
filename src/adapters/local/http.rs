//! Inbound trigger for the monolith deployment.
//!
//! Stands in for the external event system: whoever finishes an upload
//! posts the event here and it lands on the job queue.

use crate::domain::jobs::{Job, SourceAsset};
use crate::ports::queue::JobQueuePort;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

#[derive(Clone)]
pub struct TriggerState {
    queue: Arc<dyn JobQueuePort>,
}

impl TriggerState {
    pub fn new(queue: Arc<dyn JobQueuePort>) -> Self {
        Self { queue }
    }
}

#[derive(Debug, Serialize)]
struct Accepted {
    video_id: String,
    status: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, error: impl Into<String>) -> Response {
    (status, Json(ErrorBody { error: error.into() })).into_response()
}

/// Build the Axum router.
pub fn router(state: TriggerState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/events/upload-completed", post(handle_upload_completed))
        .route("/health", get(handle_health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Upload-completed event handler. Returns as soon as the job is queued;
/// processing happens on the worker.
async fn handle_upload_completed(
    State(state): State<TriggerState>,
    Json(asset): Json<SourceAsset>,
) -> Response {
    if let Err(reason) = asset.validate() {
        return error_response(StatusCode::BAD_REQUEST, reason);
    }

    let video_id = asset.video_id.clone();
    match state.queue.enqueue_job(Job::UploadCompleted(asset)).await {
        Ok(()) => {
            info!(video_id = %video_id, "upload-completed event queued");
            (
                StatusCode::ACCEPTED,
                Json(Accepted {
                    video_id,
                    status: "queued",
                }),
            )
                .into_response()
        }
        Err(e) => {
            warn!(video_id = %video_id, error = %e, "failed to queue upload-completed event");
            error_response(StatusCode::SERVICE_UNAVAILABLE, "job queue unavailable")
        }
    }
}

async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
