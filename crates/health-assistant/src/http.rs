/// HTTP JSON API for browser dashboards.
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::error;

use triage_engine::{classify, ClassificationRequest, ClassificationResult};

use crate::api::{
    ClassifyBatchParams, ClassifyBatchResponse, DocumentInsightsResponse, HealthResponse,
};
use crate::error::AppError;
use crate::prediction::{PredictionRequest, PredictionResponse};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/classify", post(classify_message))
        .route("/classify/batch", post(classify_batch))
        .route("/classify/document", post(classify_document))
        .route("/ai-health-prediction", post(predict_health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Error body shape: `{"error": ..., "details": ...}`.
pub struct ApiError {
    status: StatusCode,
    error: String,
    details: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self.details {
            Some(details) => serde_json::json!({ "error": self.error, "details": details }),
            None => serde_json::json!({ "error": self.error }),
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status = match &err {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            AppError::Config(_) | AppError::Rules(_) | AppError::Model(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        ApiError {
            status,
            error: err.to_string(),
            details: None,
        }
    }
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        rules: state.chat_rules.len(),
        document_rules: state.document_rules.len(),
    })
}

async fn classify_message(
    State(state): State<AppState>,
    Json(request): Json<ClassificationRequest>,
) -> Json<ClassificationResult> {
    Json(classify(&request, &state.chat_rules))
}

async fn classify_batch(
    State(state): State<AppState>,
    Json(params): Json<ClassifyBatchParams>,
) -> Result<Json<ClassifyBatchResponse>, ApiError> {
    Ok(Json(state.classify_batch(&params.texts)?))
}

async fn classify_document(
    State(state): State<AppState>,
    Json(request): Json<ClassificationRequest>,
) -> Json<DocumentInsightsResponse> {
    Json(state.classify_document(&request.text))
}

async fn predict_health(
    State(state): State<AppState>,
    Json(request): Json<PredictionRequest>,
) -> Result<Json<PredictionResponse>, ApiError> {
    match state.predictor.predict(&request).await {
        Ok(response) => Ok(Json(response)),
        Err(err @ AppError::RateLimited { .. }) => Err(err.into()),
        Err(err) => {
            error!(error = %err, "health prediction failed");
            Err(ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                error: "Failed to generate health prediction".to_string(),
                details: Some(err.to_string()),
            })
        }
    }
}
