use std::env;
use std::fmt::Display;
use std::str::FromStr;
use anyhow::{anyhow, Context};
use ds_core::delivery::DEFAULT_CHUNK_SIZE;
use ds_core::inference::InferenceConfig;
use ds_core::pipeline::{Device, FusionMode};
use ds_core::GenerationParameters;
use log::info;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceConfig {
    pub api_title: String,
    pub host: String,
    pub port: u16,
    pub model_id: String,
    pub device: Device,
    pub fusion_mode: FusionMode,
    pub compression: bool,
    pub worker_url: String,
    pub judge_url: String,
    pub http_timeout_secs: u64,
    pub warmup: bool,
    pub stream_chunk_size: usize,
    pub max_upload_bytes: usize,
    pub defaults: GenerationParameters,
}

impl ServiceConfig {
    /// Read the process environment, seeded from `.env` when one exists.
    pub fn load() -> anyhow::Result<Self> {
        match dotenvy::dotenv() {
            Ok(path) => info!("Loaded environment from {}", path.display()),
            Err(e) if e.not_found() => {}
            Err(e) => return Err(e).context("failed to read .env"),
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let base = GenerationParameters::default();
        let defaults = GenerationParameters {
            sparse_structure_steps: parse_var(&lookup, "SPARSE_STRUCTURE_STEPS", base.sparse_structure_steps)?,
            sparse_structure_cfg_strength: parse_var(
                &lookup,
                "SPARSE_STRUCTURE_CFG_STRENGTH",
                base.sparse_structure_cfg_strength,
            )?,
            slat_steps: parse_var(&lookup, "SLAT_STEPS", base.slat_steps)?,
            slat_cfg_strength: parse_var(&lookup, "SLAT_CFG_STRENGTH", base.slat_cfg_strength)?,
            num_oversamples: parse_var(&lookup, "NUM_OVERSAMPLES", base.num_oversamples)?,
        };

        let device = match lookup("GPU") {
            Some(raw) if raw.trim().eq_ignore_ascii_case("cpu") => Device::Cpu,
            Some(raw) => Device::Cuda(
                raw.trim()
                    .parse()
                    .with_context(|| format!("GPU must be a device index or 'cpu', got '{raw}'"))?,
            ),
            None => Device::Cuda(0),
        };

        let fusion_mode = match lookup("FUSION_MODE") {
            Some(raw) => raw.parse().map_err(|e: String| anyhow!("FUSION_MODE: {e}"))?,
            None => FusionMode::default(),
        };

        Ok(Self {
            api_title: lookup("API_TITLE").unwrap_or_else(|| "Champion 3D Generation Service".to_string()),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_var(&lookup, "PORT", 10006)?,
            model_id: lookup("MODEL_ID").unwrap_or_else(|| "microsoft/TRELLIS-image-large".to_string()),
            device,
            fusion_mode,
            compression: parse_bool(&lookup, "COMPRESSION", false)?,
            worker_url: lookup("WORKER_URL").unwrap_or_else(|| "http://127.0.0.1:5000".to_string()),
            judge_url: lookup("JUDGE_URL").unwrap_or_else(|| "http://127.0.0.1:8095".to_string()),
            http_timeout_secs: parse_var(&lookup, "HTTP_TIMEOUT_SECS", 900)?,
            warmup: parse_bool(&lookup, "WARMUP", true)?,
            stream_chunk_size: parse_var(&lookup, "STREAM_CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
            max_upload_bytes: parse_var(&lookup, "MAX_UPLOAD_BYTES", 32 * 1024 * 1024)?,
            defaults,
        })
    }

    pub fn inference_config(&self) -> InferenceConfig {
        InferenceConfig {
            model_id: self.model_id.clone(),
            device: self.device,
            fusion_mode: self.fusion_mode,
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow!("{key} must be a valid value, got '{raw}': {e}")),
        None => Ok(default),
    }
}

fn parse_bool(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> anyhow::Result<bool> {
    match lookup(key).map(|raw| raw.trim().to_ascii_lowercase()) {
        Some(raw) => match raw.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(anyhow!("{key} must be a boolean, got '{raw}'")),
        },
        None => Ok(default),
    }
}
