use async_trait::async_trait;
use ds_core::delivery::Codec;
use ds_core::BoxError;
use super::WorkerClient;

/// SPZ codec exposed by the worker sidecar.
pub struct RemoteCodec {
    worker: WorkerClient,
}

impl RemoteCodec {
    pub fn new(worker: WorkerClient) -> Self {
        Self { worker }
    }
}

#[async_trait]
impl Codec for RemoteCodec {
    async fn compress(&self, payload: &[u8]) -> Result<Vec<u8>, BoxError> {
        Ok(self.worker.post_bytes("/codec/compress", payload).await?)
    }

    async fn decompress(&self, payload: &[u8]) -> Result<Vec<u8>, BoxError> {
        Ok(self.worker.post_bytes("/codec/decompress", payload).await?)
    }
}
