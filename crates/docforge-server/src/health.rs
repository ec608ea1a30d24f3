//! Health check endpoint

use axum::Json;
use axum::extract::State;
use chrono::Utc;
use serde::Serialize;

use docforge_core::ServiceResponse;

use crate::AppState;

#[derive(Debug, Serialize)]
pub(crate) struct HealthStatus {
    status: &'static str,
    timestamp: String,
    uptime: u64,
}

pub(crate) async fn health_check(
    State(state): State<AppState>,
) -> Json<ServiceResponse<HealthStatus>> {
    Json(ServiceResponse::success(
        "Service is healthy",
        HealthStatus {
            status: "ok",
            timestamp: Utc::now().to_rfc3339(),
            uptime: state.uptime_secs(),
        },
        200,
    ))
}
