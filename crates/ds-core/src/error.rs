use thiserror::Error;

/// Error type reported by the collaborators the core talks to (model, judge, codec, preprocessor).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Generation pipeline is not initialized")]
    NotReady,

    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Preprocessing failed: {0}")]
    Preprocess(#[source] BoxError),

    #[error("Generation failed: {0}")]
    Inference(#[source] BoxError),

    #[error("Champion selection failed: {0}")]
    Selection(#[source] BoxError),

    #[error("Compression failed: {0}")]
    Codec(#[source] BoxError),
}

impl Error {
    /// Whether the failure was caused by what the caller sent rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidRequest(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
