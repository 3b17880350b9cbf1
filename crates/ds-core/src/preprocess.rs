use async_trait::async_trait;
use image::RgbImage;
use crate::error::BoxError;

/// Turns an uploaded image into ready-to-infer RGB views.
#[async_trait]
pub trait Preprocessor: Send + Sync {
    /// Views of the subject from several angles (e.g. left and right).
    async fn to_multi_view(&self, image: &[u8], seed: u32) -> Result<Vec<RgbImage>, BoxError>;

    /// A single canonical view of the subject.
    async fn to_single_view(&self, image: &[u8], seed: u32) -> Result<RgbImage, BoxError>;
}
