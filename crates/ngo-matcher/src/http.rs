//! HTTP API for the recommendation engine
//!
//! ## Endpoints
//!
//! - `POST /api/recommendations` - Analyze a conversation and recommend NGOs
//! - `GET /api/recommendations/{id}` - NGO details with booking information
//! - `GET /api/categories` - Configured legal-aid categories
//! - `GET /health` - Liveness probe

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tracing::error;

use ngo_common::api::{
    CategoryListResponse, ErrorResponse, RecommendNgosResponse, RecommendationDetailsResponse,
};

use crate::engine::{parse_request, RecommendationEngine, HISTORY_REQUIRED};
use crate::error::AppError;

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if !self.is_client_error() {
            error!(error = %self, "request failed");
        }
        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

pub fn create_router(engine: Arc<RecommendationEngine>) -> Router {
    Router::new()
        .route("/api/recommendations", post(recommend_ngos))
        .route("/api/recommendations/{id}", get(get_recommendation_details))
        .route("/api/categories", get(list_categories))
        .route("/health", get(health))
        .with_state(engine)
}

/// POST /api/recommendations
///
/// The body is read raw so that missing or non-JSON input maps onto the same
/// validation error as a missing `conversationHistory`.
async fn recommend_ngos(
    State(engine): State<Arc<RecommendationEngine>>,
    body: Bytes,
) -> Result<Json<RecommendNgosResponse>, AppError> {
    let value: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|_| AppError::Validation(HISTORY_REQUIRED.to_string()))?;
    let params = parse_request(value)?;
    let response = engine
        .recommend(&params.conversation_history, params.last_message.as_deref())
        .await?;
    Ok(Json(response))
}

/// GET /api/recommendations/{id}
async fn get_recommendation_details(
    State(engine): State<Arc<RecommendationEngine>>,
    Path(id): Path<String>,
) -> Result<Json<RecommendationDetailsResponse>, AppError> {
    Ok(Json(engine.details(&id).await?))
}

async fn list_categories(
    State(engine): State<Arc<RecommendationEngine>>,
) -> Json<CategoryListResponse> {
    Json(CategoryListResponse {
        categories: engine.patterns().category_infos(),
    })
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
