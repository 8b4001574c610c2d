//! 헬스 체크 endpoint.

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::state::AppState;

/// 헬스 체크 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// 항상 "available"
    pub status: String,
    pub system_info: SystemInfo,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SystemInfo {
    pub environment: String,
    pub version: String,
    pub uptime_secs: i64,
    /// 저장소 종류 ("postgres" | "memory")
    pub store: String,
}

/// GET /healthcheck
pub async fn healthcheck(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "available".to_string(),
        system_info: SystemInfo {
            environment: state.config.server.environment.clone(),
            version: state.version.clone(),
            uptime_secs: state.uptime_secs(),
            store: state.repos.backend.to_string(),
        },
    })
}

pub fn health_router() -> Router<Arc<AppState>> {
    Router::new().route("/healthcheck", get(healthcheck))
}
