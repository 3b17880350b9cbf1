use std::sync::Arc;
use chrono::{DateTime, Utc};
use ds_core::delivery::Delivery;
use ds_core::ChampionOrchestrator;
use crate::config::ServiceConfig;

pub struct AppState {
    pub orchestrator: Arc<ChampionOrchestrator>,
    pub delivery: Delivery,
    pub config: ServiceConfig,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(orchestrator: Arc<ChampionOrchestrator>, delivery: Delivery, config: ServiceConfig) -> Self {
        Self {
            orchestrator,
            delivery,
            config,
            started_at: Utc::now(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.orchestrator.inference().is_ready()
    }
}
