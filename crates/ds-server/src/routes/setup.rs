use std::sync::Arc;
use axum::extract::State;
use axum::Json;
use crate::schemas::SetupInfo;
use crate::state::AppState;

pub async fn setup_info(State(state): State<Arc<AppState>>) -> Json<SetupInfo> {
    Json(SetupInfo {
        config: state.config.clone(),
        started_at: state.started_at,
        pipeline_ready: state.is_ready(),
    })
}
