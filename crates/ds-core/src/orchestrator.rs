use std::sync::Arc;
use log::info;
use crate::candidate::ChampionResult;
use crate::error::{Error, Result};
use crate::images::warm_up_png;
use crate::inference::InferenceService;
use crate::params::{resolve, GenerationParameters, ParameterOverride};
use crate::preprocess::Preprocessor;
use crate::scheduler::{DuelScheduler, SourceImages};
use crate::seed::{Seed, SeedSource};
use crate::selector::{ChampionSelector, Judge};

const WARM_UP_IMAGE_SIZE: u32 = 64;

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub images: SourceImages,
    pub seed: Seed,
    pub params: Option<ParameterOverride>,
}

/// Runs a request end to end: pinned seeds take one strategy, auto seeds run a duel.
pub struct ChampionOrchestrator {
    defaults: GenerationParameters,
    inference: Arc<InferenceService>,
    scheduler: DuelScheduler,
    selector: ChampionSelector,
}

impl ChampionOrchestrator {
    pub fn new(
        defaults: GenerationParameters,
        inference: Arc<InferenceService>,
        preprocessor: Arc<dyn Preprocessor>,
        judge: Arc<dyn Judge>,
        seeds: Arc<dyn SeedSource>,
    ) -> Self {
        Self {
            defaults,
            scheduler: DuelScheduler::new(inference.clone(), preprocessor, seeds),
            selector: ChampionSelector::new(judge),
            inference,
        }
    }

    pub fn inference(&self) -> &Arc<InferenceService> {
        &self.inference
    }

    pub async fn run(&self, request: &GenerationRequest) -> Result<ChampionResult> {
        if !self.inference.is_ready() {
            return Err(Error::NotReady);
        }
        let params = resolve(&self.defaults, request.params.as_ref());

        match request.seed {
            Seed::Fixed(seed) => {
                let strategy = request.images.pinned_strategy();
                info!("Seed {seed} pinned, running {strategy} only");
                let candidate = self
                    .scheduler
                    .run_strategy(strategy, &request.images, seed, &params)
                    .await?;
                Ok(ChampionResult::unopposed(candidate))
            }
            Seed::Auto => {
                let seeds = self.scheduler.draw_seeds();
                info!(
                    "Starting duel: multi-view (seed={}) vs single-view (seed={})",
                    seeds.0, seeds.1
                );
                let candidates = self
                    .scheduler
                    .run_pair(&request.images, seeds, &params)
                    .await?;
                self.selector
                    .select(request.images.reference(), candidates)
                    .await
            }
        }
    }

    /// Push one duel through every stage, then drop what it left on the device.
    pub async fn warm_up(&self) -> Result<()> {
        info!("Warming up pipeline and judge...");
        let request = warm_up_request(WARM_UP_IMAGE_SIZE)?;
        let result = self.run(&request).await?;
        info!("Warm-up finished, {} won", result.strategy());

        self.inference.release_memory().await;
        Ok(())
    }
}

fn warm_up_request(size: u32) -> Result<GenerationRequest> {
    let image = warm_up_png(size)
        .map_err(|e| Error::Preprocess(format!("cannot build warm-up image: {e}").into()))?;
    Ok(GenerationRequest {
        images: SourceImages::single(image)?,
        seed: Seed::Auto,
        params: None,
    })
}
