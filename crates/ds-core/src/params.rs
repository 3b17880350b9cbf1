use serde::{Deserialize, Serialize};

/// Sampler settings for one stage of the two-stage pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplerParams {
    pub steps: u32,
    pub cfg_strength: f32,
}

/// Complete sampling configuration used for one generation call.
///
/// The sparse structure stage lays out the coarse occupancy, the structured
/// latent (slat) stage fills in the per-voxel detail.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenerationParameters {
    pub sparse_structure_steps: u32,
    pub sparse_structure_cfg_strength: f32,
    pub slat_steps: u32,
    pub slat_cfg_strength: f32,
    pub num_oversamples: u32,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        Self {
            sparse_structure_steps: 12,
            sparse_structure_cfg_strength: 7.5,
            slat_steps: 12,
            slat_cfg_strength: 3.0,
            num_oversamples: 1,
        }
    }
}

impl GenerationParameters {
    pub fn structure_sampler(&self) -> SamplerParams {
        SamplerParams {
            steps: self.sparse_structure_steps,
            cfg_strength: self.sparse_structure_cfg_strength,
        }
    }

    pub fn detail_sampler(&self) -> SamplerParams {
        SamplerParams {
            steps: self.slat_steps,
            cfg_strength: self.slat_cfg_strength,
        }
    }

    /// Copy of `self` with every field present in `overrides` replaced.
    pub fn overridden(&self, overrides: &ParameterOverride) -> Self {
        Self {
            sparse_structure_steps: overrides
                .sparse_structure_steps
                .unwrap_or(self.sparse_structure_steps),
            sparse_structure_cfg_strength: overrides
                .sparse_structure_cfg_strength
                .unwrap_or(self.sparse_structure_cfg_strength),
            slat_steps: overrides.slat_steps.unwrap_or(self.slat_steps),
            slat_cfg_strength: overrides.slat_cfg_strength.unwrap_or(self.slat_cfg_strength),
            num_oversamples: overrides.num_oversamples.unwrap_or(self.num_oversamples),
        }
    }
}

/// Per-request parameter overrides. A missing or `null` field keeps the default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParameterOverride {
    pub sparse_structure_steps: Option<u32>,
    pub sparse_structure_cfg_strength: Option<f32>,
    pub slat_steps: Option<u32>,
    pub slat_cfg_strength: Option<f32>,
    pub num_oversamples: Option<u32>,
}

pub fn resolve(
    defaults: &GenerationParameters,
    overrides: Option<&ParameterOverride>,
) -> GenerationParameters {
    match overrides {
        Some(overrides) => defaults.overridden(overrides),
        None => *defaults,
    }
}
