use async_trait::async_trait;
use ds_core::pipeline::{
    Device, EncodedRepresentation, FusionMode, ModelLoader, OutputFormat, Representation,
    Representations, SamplingPlan, SplatModel,
};
use ds_core::BoxError;
use image::RgbImage;
use log::debug;
use serde::{Deserialize, Serialize};
use super::{image_to_base64, WorkerClient};

#[derive(Debug, Serialize)]
struct LoadRequest<'a> {
    model_id: &'a str,
}

#[derive(Debug, Serialize)]
struct DeviceRequest {
    device: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    images: Vec<String>,
    seed: u32,
    plan: &'a SamplingPlan,
    #[serde(skip_serializing_if = "Option::is_none")]
    fusion_mode: Option<FusionMode>,
}

#[derive(Debug, Deserialize)]
struct Ack {}

/// Loads the model inside the worker sidecar.
pub struct RemoteModelLoader {
    worker: WorkerClient,
}

impl RemoteModelLoader {
    pub fn new(worker: WorkerClient) -> Self {
        Self { worker }
    }
}

#[async_trait]
impl ModelLoader for RemoteModelLoader {
    async fn load(&self, model_id: &str) -> Result<Box<dyn SplatModel>, BoxError> {
        let _: Ack = self
            .worker
            .post_json("/pipeline/load", &LoadRequest { model_id })
            .await?;
        Ok(Box::new(RemoteModel {
            worker: self.worker.clone(),
        }))
    }
}

/// Handle to a model living in the worker sidecar. Each call returns the
/// Gaussian output as an already serialized PLY.
pub struct RemoteModel {
    worker: WorkerClient,
}

impl RemoteModel {
    async fn generate(
        &self,
        images: &[RgbImage],
        seed: u32,
        plan: &SamplingPlan,
        fusion_mode: Option<FusionMode>,
    ) -> Result<Representations, BoxError> {
        let images = images
            .iter()
            .map(image_to_base64)
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Sending {} view(s) to worker with seed {seed}", images.len());

        let bytes = self
            .worker
            .post_json_for_bytes(
                "/pipeline/generate",
                &GenerateRequest {
                    images,
                    seed,
                    plan,
                    fusion_mode,
                },
            )
            .await?;

        let cloud: Box<dyn Representation> = Box::new(EncodedRepresentation {
            format: OutputFormat::Gaussian,
            bytes,
        });
        Ok(vec![cloud])
    }
}

#[async_trait]
impl SplatModel for RemoteModel {
    async fn to_device(&mut self, device: Device) -> Result<(), BoxError> {
        let _: Ack = self
            .worker
            .post_json(
                "/pipeline/device",
                &DeviceRequest {
                    device: device.to_string(),
                },
            )
            .await?;
        Ok(())
    }

    async fn generate_single(
        &self,
        image: &RgbImage,
        seed: u32,
        plan: &SamplingPlan,
    ) -> Result<Representations, BoxError> {
        self.generate(std::slice::from_ref(image), seed, plan, None).await
    }

    async fn generate_multi(
        &self,
        images: &[RgbImage],
        seed: u32,
        plan: &SamplingPlan,
        mode: FusionMode,
    ) -> Result<Representations, BoxError> {
        self.generate(images, seed, plan, Some(mode)).await
    }

    async fn release_memory(&self) -> Result<(), BoxError> {
        let _: Ack = self.worker.post_json("/pipeline/release", &()).await?;
        Ok(())
    }
}
