//! Request Handlers

use super::{errors::ApiError, middleware::RequestId, models::HealthResponse};
use crate::games::types::{ProcessMessage, RoundId};
use crate::games::vrf_process::{RoundRecord, VrfProcess};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Shared application state
pub struct AppState {
    pub process: Arc<VrfProcess>,
    pub version: String,
}

/// GET /health
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "Running".to_string(),
        process_id: state.process.process_id().to_string(),
        public_key: state.process.public_key_hex(),
        rounds_served: state.process.rounds_served(),
        version: state.version.clone(),
    })
}

/// POST /message
///
/// Body is a process message; the response is the reply envelope.
pub async fn message_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Json(message): Json<ProcessMessage>,
) -> Result<Json<Value>, ApiError> {
    debug!("[{}] {:?} for {}", request_id.0, message.action(), message.process);

    state
        .process
        .handle(&message)
        .map(Json)
        .map_err(|e| ApiError::from_service(request_id.0, e))
}

/// GET /rounds/:round_id
pub async fn round_handler(
    Extension(request_id): Extension<RequestId>,
    State(state): State<Arc<AppState>>,
    Path(round_id): Path<String>,
) -> Result<Json<RoundRecord>, ApiError> {
    state
        .process
        .record(&RoundId::from(round_id.as_str()))
        .map(Json)
        .ok_or_else(|| ApiError::not_found(request_id.0, format!("Round {} not found", round_id)))
}
