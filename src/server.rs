//! HTTP surface: the generation endpoint, job lookup, health and the
//! static outputs directory.

use crate::generator::VideoGenerator;
use crate::job::{JobId, JobRecord};
use crate::request::{VideoRequest, VideoResponse};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub generator: Arc<VideoGenerator>,
}

impl AppState {
    pub fn new(generator: Arc<VideoGenerator>) -> Self {
        Self { generator }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),
}

#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
        };
        (status, Json(ErrorBody { detail: self.to_string() })).into_response()
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

pub fn create_router(state: AppState) -> Router {
    let outputs = ServeDir::new(&state.generator.config().outputs_dir);

    Router::new()
        .route("/generate-video", post(generate_video))
        .route("/jobs/:job_id", get(get_job))
        .route("/health", get(health))
        .nest_service("/outputs", outputs)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
        .with_state(state)
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

async fn generate_video(
    State(state): State<AppState>,
    Json(request): Json<VideoRequest>,
) -> Json<VideoResponse> {
    Json(state.generator.generate(&request).await)
}

async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<JobRecord>, ApiError> {
    JobId::parse(&job_id)
        .and_then(|id| state.generator.job(&id))
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("job {}", job_id)))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}
