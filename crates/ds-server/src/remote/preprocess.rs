use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ds_core::preprocess::Preprocessor;
use ds_core::BoxError;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use super::{image_from_base64, WorkerClient};

#[derive(Debug, Serialize)]
struct PreprocessRequest {
    image: String,
    seed: u32,
}

#[derive(Debug, Deserialize)]
struct MultiViewResponse {
    images: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SingleViewResponse {
    image: String,
}

/// Background removal and view synthesis, served by the worker sidecar.
pub struct RemotePreprocessor {
    worker: WorkerClient,
}

impl RemotePreprocessor {
    pub fn new(worker: WorkerClient) -> Self {
        Self { worker }
    }

    fn request(image: &[u8], seed: u32) -> PreprocessRequest {
        PreprocessRequest {
            image: STANDARD.encode(image),
            seed,
        }
    }
}

#[async_trait]
impl Preprocessor for RemotePreprocessor {
    async fn to_multi_view(&self, image: &[u8], seed: u32) -> Result<Vec<RgbImage>, BoxError> {
        let response: MultiViewResponse = self
            .worker
            .post_json("/preprocess/multi_view", &Self::request(image, seed))
            .await?;
        let views = response
            .images
            .iter()
            .map(|encoded| image_from_base64(encoded))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(views)
    }

    async fn to_single_view(&self, image: &[u8], seed: u32) -> Result<RgbImage, BoxError> {
        let response: SingleViewResponse = self
            .worker
            .post_json("/preprocess/single_view", &Self::request(image, seed))
            .await?;
        Ok(image_from_base64(&response.image)?)
    }
}
