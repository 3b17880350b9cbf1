use std::convert::Infallible;
use std::sync::Arc;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures::Stream;
use log::info;
use crate::error::{BoxError, Error, Result};

pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Binary point-cloud codec (SPZ on the production worker).
#[async_trait]
pub trait Codec: Send + Sync {
    async fn compress(&self, payload: &[u8]) -> std::result::Result<Vec<u8>, BoxError>;

    async fn decompress(&self, payload: &[u8]) -> std::result::Result<Vec<u8>, BoxError>;
}

/// Payload ready to leave the service.
#[derive(Debug, Clone, PartialEq)]
pub struct Packaged {
    pub bytes: Vec<u8>,
    pub compressed: bool,
}

impl Packaged {
    pub fn to_base64(&self) -> String {
        to_base64(&self.bytes)
    }
}

/// Shapes champion payloads for the transport boundary.
pub struct Delivery {
    codec: Arc<dyn Codec>,
    compression: bool,
    chunk_size: usize,
}

impl Delivery {
    pub fn new(codec: Arc<dyn Codec>, compression: bool, chunk_size: usize) -> Self {
        Self {
            codec,
            compression,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Compress unconditionally. Errors never fall back to the raw payload.
    pub async fn compress(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let compressed = self.codec.compress(payload).await.map_err(Error::Codec)?;
        if compressed.is_empty() {
            return Err(Error::Codec("codec produced an empty payload".into()));
        }
        info!(
            "Compressed payload from {} to {} bytes",
            payload.len(),
            compressed.len()
        );
        Ok(compressed)
    }

    /// Compress when configured to, otherwise pass the payload through.
    pub async fn package(&self, payload: Vec<u8>) -> Result<Packaged> {
        if payload.is_empty() {
            return Err(Error::EmptyInput("generated content is empty".into()));
        }
        if !self.compression {
            return Ok(Packaged {
                bytes: payload,
                compressed: false,
            });
        }
        Ok(Packaged {
            bytes: self.compress(&payload).await?,
            compressed: true,
        })
    }

    pub fn stream(
        &self,
        payload: Vec<u8>,
    ) -> impl Stream<Item = std::result::Result<Vec<u8>, Infallible>> + Send + use<> {
        chunked(payload, self.chunk_size)
    }
}

pub fn to_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Split `payload` into ordered chunks of at most `chunk_size` bytes.
pub fn chunked(
    payload: Vec<u8>,
    chunk_size: usize,
) -> impl Stream<Item = std::result::Result<Vec<u8>, Infallible>> + Send + 'static {
    let chunk_size = chunk_size.max(1);
    let starts = (0..payload.len()).step_by(chunk_size);
    // Each chunk is copied out only when the consumer polls for it.
    futures::stream::iter(starts.map(move |start| {
        let end = (start + chunk_size).min(payload.len());
        Ok(payload[start..end].to_vec())
    }))
}
