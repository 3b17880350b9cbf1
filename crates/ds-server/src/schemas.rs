use chrono::{DateTime, Utc};
use ds_core::seed::AUTO_SEED;
use ds_core::{ParameterOverride, Strategy};
use serde::{Deserialize, Serialize};
use crate::config::ServiceConfig;

fn auto_seed() -> i64 {
    AUTO_SEED
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerateRequest {
    /// Base64 encoded source images, the first one is the reference view.
    pub prompt_images: Vec<String>,
    #[serde(default = "auto_seed")]
    pub seed: i64,
    #[serde(default)]
    pub params: Option<ParameterOverride>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenerateResponse {
    pub ply_file_base64: String,
    pub seed: u32,
    pub strategy: Strategy,
    pub compressed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SetupInfo {
    #[serde(flatten)]
    pub config: ServiceConfig,
    pub started_at: DateTime<Utc>,
    pub pipeline_ready: bool,
}
