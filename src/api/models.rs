//! API Response Models

use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub process_id: String,
    pub public_key: String,
    pub rounds_served: usize,
    pub version: String,
}
