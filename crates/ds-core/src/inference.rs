use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use image::RgbImage;
use log::{info, warn};
use tokio::sync::Mutex;
use crate::candidate::{CandidateResult, Strategy};
use crate::error::{Error, Result};
use crate::params::GenerationParameters;
use crate::pipeline::{Device, FusionMode, ModelLoader, OutputFormat, SamplingPlan, SplatModel};

#[derive(Debug, Clone, PartialEq)]
pub struct InferenceConfig {
    pub model_id: String,
    pub device: Device,
    pub fusion_mode: FusionMode,
}

/// Owns the loaded model and runs one generation at a time against it.
pub struct InferenceService {
    config: InferenceConfig,
    loader: Arc<dyn ModelLoader>,
    model: Mutex<Option<Box<dyn SplatModel>>>,
    ready: AtomicBool,
}

impl InferenceService {
    pub fn new(config: InferenceConfig, loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            config,
            loader,
            model: Mutex::new(None),
            ready: AtomicBool::new(false),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub async fn startup(&self) -> Result<()> {
        let mut slot = self.model.lock().await;
        if slot.is_some() {
            warn!("Pipeline {} is already loaded, ignoring startup", self.config.model_id);
            return Ok(());
        }

        info!("Loading pipeline {}...", self.config.model_id);
        warn!("Fetching model weights - this may take several minutes on first run");

        let start = Instant::now();
        let mut model = self.loader.load(&self.config.model_id).await.map_err(|e| {
            Error::Inference(format!("failed to load {}: {e}", self.config.model_id).into())
        })?;
        info!(
            "Model loaded in {:.2}s. Moving to {}...",
            start.elapsed().as_secs_f32(),
            self.config.device
        );

        model.to_device(self.config.device).await.map_err(|e| {
            Error::Inference(format!("failed to move model to {}: {e}", self.config.device).into())
        })?;

        *slot = Some(model);
        self.ready.store(true, Ordering::Release);
        info!(
            "Pipeline ready. Total startup time: {:.2}s",
            start.elapsed().as_secs_f32()
        );
        Ok(())
    }

    pub async fn shutdown(&self) {
        self.ready.store(false, Ordering::Release);
        let released = self.model.lock().await.take();
        if released.is_some() {
            info!("Pipeline {} released", self.config.model_id);
        }
    }

    /// Free transient device memory. Meant for quiet moments, not after every request.
    pub async fn release_memory(&self) {
        let slot = self.model.lock().await;
        if let Some(model) = slot.as_ref() {
            match model.release_memory().await {
                Ok(()) => info!("Released cached device memory"),
                Err(e) => warn!("Device memory cleanup failed: {e}"),
            }
        }
    }

    /// Run one generation. A single image takes the single-view path, several images are
    /// fused on the multi-view path. Returns the Gaussian representation as PLY bytes.
    pub async fn generate(
        &self,
        images: &[RgbImage],
        seed: u32,
        params: &GenerationParameters,
    ) -> Result<CandidateResult> {
        if !self.is_ready() {
            return Err(Error::NotReady);
        }
        let Some(first) = images.first() else {
            return Err(Error::EmptyInput("no images supplied for generation".into()));
        };

        let slot = self.model.lock().await;
        let model = slot.as_ref().ok_or(Error::NotReady)?;
        let plan = SamplingPlan::from(params);

        info!(
            "Generating seed={seed} from {} image(s) of size {}x{}",
            images.len(),
            first.width(),
            first.height()
        );

        let start = Instant::now();
        let (strategy, outputs) = if images.len() == 1 {
            (Strategy::SingleView, model.generate_single(first, seed, &plan).await)
        } else {
            let mode = self.config.fusion_mode;
            (Strategy::MultiView, model.generate_multi(images, seed, &plan, mode).await)
        };
        let outputs = outputs.map_err(Error::Inference)?;

        let gaussian = outputs
            .iter()
            .find(|r| r.format() == OutputFormat::Gaussian)
            .ok_or_else(|| Error::Inference("pipeline returned no gaussian representation".into()))?;

        let mut buffer = Vec::new();
        gaussian
            .write_to(&mut buffer)
            .map_err(|e| Error::Inference(e.into()))?;
        if buffer.is_empty() {
            return Err(Error::EmptyInput("generated payload is empty".into()));
        }

        info!(
            "Finished {strategy} generation in {:.2}s ({} bytes)",
            start.elapsed().as_secs_f32(),
            buffer.len()
        );

        Ok(CandidateResult {
            payload: buffer,
            seed,
            strategy,
        })
    }
}
