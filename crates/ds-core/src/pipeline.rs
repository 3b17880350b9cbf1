//! Contract of the image-to-3D model the inference service drives.

use std::fmt;
use std::io::{self, Write};
use std::str::FromStr;
use async_trait::async_trait;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use crate::error::BoxError;
use crate::gaussian_cloud::GaussianCloud;
use crate::params::{GenerationParameters, SamplerParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    Gaussian,
    Mesh,
}

/// How guidance from several views is combined on the multi-image path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FusionMode {
    #[default]
    Multidiffusion,
    Stochastic,
}

impl FusionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Multidiffusion => "multidiffusion",
            Self::Stochastic => "stochastic",
        }
    }
}

impl FromStr for FusionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "multidiffusion" => Ok(Self::Multidiffusion),
            "stochastic" => Ok(Self::Stochastic),
            other => Err(format!("unknown fusion mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "index")]
pub enum Device {
    Cpu,
    Cuda(u32),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(index) => write!(f, "cuda:{index}"),
        }
    }
}

/// Sampler settings handed to the model for one call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingPlan {
    pub sparse_structure: SamplerParams,
    pub slat: SamplerParams,
    pub num_oversamples: u32,
    pub formats: Vec<OutputFormat>,
}

impl From<&GenerationParameters> for SamplingPlan {
    fn from(params: &GenerationParameters) -> Self {
        Self {
            sparse_structure: params.structure_sampler(),
            slat: params.detail_sampler(),
            num_oversamples: params.num_oversamples,
            formats: vec![OutputFormat::Gaussian],
        }
    }
}

/// One output of the model, able to serialize itself to a standalone binary buffer.
pub trait Representation: Send + Sync {
    fn format(&self) -> OutputFormat;

    fn write_to(&self, out: &mut dyn Write) -> io::Result<()>;
}

impl Representation for GaussianCloud {
    fn format(&self) -> OutputFormat {
        OutputFormat::Gaussian
    }

    fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        self.save_ply(out)
    }
}

/// A representation that arrived already serialized, e.g. from an out-of-process worker.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRepresentation {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
}

impl Representation for EncodedRepresentation {
    fn format(&self) -> OutputFormat {
        self.format
    }

    fn write_to(&self, out: &mut dyn Write) -> io::Result<()> {
        out.write_all(&self.bytes)
    }
}

pub type Representations = Vec<Box<dyn Representation>>;

/// A loaded image-to-3D model.
#[async_trait]
pub trait SplatModel: Send + Sync {
    /// Move weights onto `device`.
    async fn to_device(&mut self, device: Device) -> Result<(), BoxError>;

    async fn generate_single(
        &self,
        image: &RgbImage,
        seed: u32,
        plan: &SamplingPlan,
    ) -> Result<Representations, BoxError>;

    async fn generate_multi(
        &self,
        images: &[RgbImage],
        seed: u32,
        plan: &SamplingPlan,
        mode: FusionMode,
    ) -> Result<Representations, BoxError>;

    /// Drop cached device allocations left behind by previous calls.
    async fn release_memory(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

#[async_trait]
pub trait ModelLoader: Send + Sync {
    async fn load(&self, model_id: &str) -> Result<Box<dyn SplatModel>, BoxError>;
}
