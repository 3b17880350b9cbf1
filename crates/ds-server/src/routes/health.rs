use axum::Json;
use crate::schemas::HealthResponse;

/// Liveness probe. The listener is only bound once the pipeline is loaded.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ready".to_string(),
    })
}
