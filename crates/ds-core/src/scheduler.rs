use std::sync::Arc;
use image::RgbImage;
use log::info;
use crate::candidate::{CandidateResult, Strategy};
use crate::error::{Error, Result};
use crate::images::decode_rgb;
use crate::inference::InferenceService;
use crate::params::GenerationParameters;
use crate::preprocess::Preprocessor;
use crate::seed::{draw_seed_pair, SeedSource};

/// Encoded images exactly as the client sent them. The first one is the reference image.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImages {
    images: Vec<Vec<u8>>,
}

impl SourceImages {
    pub fn new(images: Vec<Vec<u8>>) -> Result<Self> {
        if images.is_empty() {
            return Err(Error::EmptyInput("no source images supplied".into()));
        }
        if let Some(index) = images.iter().position(Vec::is_empty) {
            return Err(Error::EmptyInput(format!("source image {index} is empty")));
        }
        Ok(Self { images })
    }

    pub fn single(image: Vec<u8>) -> Result<Self> {
        Self::new(vec![image])
    }

    pub fn reference(&self) -> &[u8] {
        &self.images[0]
    }

    pub fn count(&self) -> usize {
        self.images.len()
    }

    /// Strategy used when the caller pins a seed and no duel runs.
    pub fn pinned_strategy(&self) -> Strategy {
        if self.images.len() > 1 {
            Strategy::MultiView
        } else {
            Strategy::SingleView
        }
    }

    fn decode_all(&self) -> Result<Vec<RgbImage>> {
        self.images.iter().map(|bytes| decode_rgb(bytes)).collect()
    }
}

/// Produces the two duel candidates for one request.
pub struct DuelScheduler {
    inference: Arc<InferenceService>,
    preprocessor: Arc<dyn Preprocessor>,
    seeds: Arc<dyn SeedSource>,
}

impl DuelScheduler {
    pub fn new(
        inference: Arc<InferenceService>,
        preprocessor: Arc<dyn Preprocessor>,
        seeds: Arc<dyn SeedSource>,
    ) -> Self {
        Self {
            inference,
            preprocessor,
            seeds,
        }
    }

    pub fn draw_seeds(&self) -> (u32, u32) {
        draw_seed_pair(self.seeds.as_ref())
    }

    /// Prepare the views for `strategy` under `seed` and generate one candidate from them.
    pub async fn run_strategy(
        &self,
        strategy: Strategy,
        source: &SourceImages,
        seed: u32,
        params: &GenerationParameters,
    ) -> Result<CandidateResult> {
        let views = match strategy {
            Strategy::MultiView if source.count() > 1 => {
                info!("[{strategy}] Using {} supplied views (seed={seed})", source.count());
                source.decode_all()?
            }
            Strategy::MultiView => {
                info!("[{strategy}] Preprocessing into left/right views (seed={seed})...");
                let views = self
                    .preprocessor
                    .to_multi_view(source.reference(), seed)
                    .await
                    .map_err(Error::Preprocess)?;
                if views.len() < 2 {
                    return Err(Error::Preprocess(
                        format!("multi-view preprocessing produced {} view(s)", views.len()).into(),
                    ));
                }
                views
            }
            Strategy::SingleView => {
                info!("[{strategy}] Preprocessing into a single canonical view (seed={seed})...");
                let view = self
                    .preprocessor
                    .to_single_view(source.reference(), seed)
                    .await
                    .map_err(Error::Preprocess)?;
                vec![view]
            }
        };

        info!("[{strategy}] Generating 3D from {} view(s)...", views.len());
        self.inference.generate(&views, seed, params).await
    }

    /// Run both strategies with distinct seeds. Index 0 is multi-view, index 1 single-view.
    pub async fn run_pair(
        &self,
        source: &SourceImages,
        seeds: (u32, u32),
        params: &GenerationParameters,
    ) -> Result<[CandidateResult; 2]> {
        let (multi_seed, single_seed) = seeds;
        if multi_seed == single_seed {
            return Err(Error::InvalidRequest(format!(
                "duel strategies must not share seed {multi_seed}"
            )));
        }

        let multi = self
            .run_strategy(Strategy::MultiView, source, multi_seed, params)
            .await?;
        let single = self
            .run_strategy(Strategy::SingleView, source, single_seed, params)
            .await?;
        Ok([multi, single])
    }
}
