//! HTTP clients for the sidecar processes that host the model, the image
//! preprocessing stack, the judge and the SPZ codec.

mod codec;
mod judge;
mod model;
mod preprocess;

use std::time::Duration;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ds_core::images::encode_png;
use image::RgbImage;
use reqwest::Response;
use serde::Serialize;
use serde::de::DeserializeOwned;
use crate::error::AppError;

pub use codec::RemoteCodec;
pub use judge::RemoteJudge;
pub use model::{RemoteModel, RemoteModelLoader};
pub use preprocess::RemotePreprocessor;

#[derive(Debug, Clone)]
pub struct WorkerClient {
    client: reqwest::Client,
    base_url: String,
}

impl WorkerClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, AppError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::BackendError(format!("{path}: {e}")))?;

        check_status(path, response)
            .await?
            .json()
            .await
            .map_err(|e| AppError::BackendError(format!("{path}: invalid response body: {e}")))
    }

    /// POST a JSON body and read the response as raw bytes.
    pub async fn post_json_for_bytes<B>(&self, path: &str, body: &B) -> Result<Vec<u8>, AppError>
    where
        B: Serialize + ?Sized,
    {
        let response = self
            .client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(|e| AppError::BackendError(format!("{path}: {e}")))?;

        read_bytes(path, check_status(path, response).await?).await
    }

    pub async fn post_bytes(&self, path: &str, body: &[u8]) -> Result<Vec<u8>, AppError> {
        let response = self
            .client
            .post(self.url(path))
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(body.to_vec())
            .send()
            .await
            .map_err(|e| AppError::BackendError(format!("{path}: {e}")))?;

        read_bytes(path, check_status(path, response).await?).await
    }
}

async fn check_status(path: &str, response: Response) -> Result<Response, AppError> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::BackendError(format!("{path}: HTTP {}: {}", status, body)));
    }
    Ok(response)
}

async fn read_bytes(path: &str, response: Response) -> Result<Vec<u8>, AppError> {
    response
        .bytes()
        .await
        .map(|bytes| bytes.to_vec())
        .map_err(|e| AppError::BackendError(format!("{path}: {e}")))
}

pub(crate) fn image_to_base64(image: &RgbImage) -> Result<String, AppError> {
    let png = encode_png(image).map_err(|e| AppError::BackendError(format!("cannot encode image: {e}")))?;
    Ok(STANDARD.encode(png))
}

pub(crate) fn image_from_base64(encoded: &str) -> Result<RgbImage, AppError> {
    let bytes = STANDARD
        .decode(encoded)
        .map_err(|e| AppError::BackendError(format!("worker returned invalid base64: {e}")))?;
    image::load_from_memory(&bytes)
        .map(|image| image.to_rgb8())
        .map_err(|e| AppError::BackendError(format!("worker returned an undecodable image: {e}")))
}
