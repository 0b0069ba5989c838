//! Route Definitions

use super::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        // Process messages: GetRandomNumber / VerifyResult
        .route("/message", post(message_handler))
        .route("/rounds/:round_id", get(round_handler))
        .with_state(state)
}
