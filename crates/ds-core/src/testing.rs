//! In-memory collaborators for exercising the orchestration without a model or network.

use std::collections::VecDeque;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use async_trait::async_trait;
use image::{Rgb, RgbImage};
use crate::error::BoxError;
use crate::gaussian_cloud::{GaussianCloud, Splat};
use crate::images::encode_png;
use crate::inference::{InferenceConfig, InferenceService};
use crate::orchestrator::ChampionOrchestrator;
use crate::params::GenerationParameters;
use crate::pipeline::{
    Device, EncodedRepresentation, FusionMode, ModelLoader, OutputFormat, Representation,
    Representations, SamplingPlan, SplatModel,
};
use crate::preprocess::Preprocessor;
use crate::scheduler::DuelScheduler;
use crate::seed::{OsSeedSource, SeedSource};
use crate::selector::{Judge, Verdict};
use crate::delivery::Codec;

pub fn rgb(size: u32) -> RgbImage {
    RgbImage::from_pixel(size, size, Rgb([90, 120, 150]))
}

pub fn png(size: u32) -> Vec<u8> {
    encode_png(&RgbImage::from_pixel(size, size, Rgb([size as u8, 60, 200]))).unwrap()
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelCall {
    pub seed: u32,
    pub views: usize,
    pub mode: Option<FusionMode>,
    pub plan: SamplingPlan,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputKind {
    Cloud,
    MeshOnly,
    Empty,
}

#[derive(Debug)]
struct ModelState {
    loads: usize,
    releases: usize,
    devices: Vec<Device>,
    calls: Vec<ModelCall>,
    fail_load: bool,
    fail_generation: bool,
    output: OutputKind,
    load_delay: Duration,
    generation_delay: Duration,
    active: usize,
    peak_active: usize,
}

/// Loader handing out [`FakeModel`]s that share one recorded state.
#[derive(Debug, Clone)]
pub struct FakeLoader {
    state: Arc<Mutex<ModelState>>,
}

impl FakeLoader {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ModelState {
                loads: 0,
                releases: 0,
                devices: Vec::new(),
                calls: Vec::new(),
                fail_load: false,
                fail_generation: false,
                output: OutputKind::Cloud,
                load_delay: Duration::ZERO,
                generation_delay: Duration::ZERO,
                active: 0,
                peak_active: 0,
            })),
        }
    }

    pub fn config() -> InferenceConfig {
        InferenceConfig {
            model_id: "test/splat-model".into(),
            device: Device::Cuda(0),
            fusion_mode: FusionMode::Multidiffusion,
        }
    }

    pub fn failing_load(self) -> Self {
        self.state.lock().unwrap().fail_load = true;
        self
    }

    pub fn failing_generation(self) -> Self {
        self.state.lock().unwrap().fail_generation = true;
        self
    }

    pub fn mesh_only(self) -> Self {
        self.state.lock().unwrap().output = OutputKind::MeshOnly;
        self
    }

    pub fn empty_output(self) -> Self {
        self.state.lock().unwrap().output = OutputKind::Empty;
        self
    }

    pub fn slow_load(self, delay: Duration) -> Self {
        self.state.lock().unwrap().load_delay = delay;
        self
    }

    pub fn slow_generation(self, delay: Duration) -> Self {
        self.state.lock().unwrap().generation_delay = delay;
        self
    }

    /// Most generations that were ever in flight at the same time.
    pub fn peak_active(&self) -> usize {
        self.state.lock().unwrap().peak_active
    }

    pub fn loads(&self) -> usize {
        self.state.lock().unwrap().loads
    }

    pub fn releases(&self) -> usize {
        self.state.lock().unwrap().releases
    }

    pub fn devices(&self) -> Vec<Device> {
        self.state.lock().unwrap().devices.clone()
    }

    pub fn calls(&self) -> Vec<ModelCall> {
        self.state.lock().unwrap().calls.clone()
    }
}

#[async_trait]
impl ModelLoader for FakeLoader {
    async fn load(&self, _model_id: &str) -> Result<Box<dyn SplatModel>, BoxError> {
        let delay = self.state.lock().unwrap().load_delay;
        tokio::time::sleep(delay).await;

        let mut state = self.state.lock().unwrap();
        if state.fail_load {
            return Err("weights unavailable".into());
        }
        state.loads += 1;
        Ok(Box::new(FakeModel {
            state: self.state.clone(),
        }))
    }
}

/// Produces a small cloud whose size depends on the seed.
pub struct FakeModel {
    state: Arc<Mutex<ModelState>>,
}

impl FakeModel {
    async fn run(&self, call: ModelCall) -> Result<Representations, BoxError> {
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.active += 1;
            state.peak_active = state.peak_active.max(state.active);
            state.generation_delay
        };
        tokio::time::sleep(delay).await;
        let outputs = self.record(call);
        self.state.lock().unwrap().active -= 1;
        outputs
    }

    fn record(&self, call: ModelCall) -> Result<Representations, BoxError> {
        let mut state = self.state.lock().unwrap();
        let seed = call.seed;
        state.calls.push(call);
        if state.fail_generation {
            return Err("sampler diverged".into());
        }

        let mesh = || -> Box<dyn Representation> {
            Box::new(EncodedRepresentation {
                format: OutputFormat::Mesh,
                bytes: b"mesh".to_vec(),
            })
        };
        let outputs: Representations = match state.output {
            OutputKind::Cloud => {
                let splat = Splat {
                    position: [seed as f32, 0.0, 0.0],
                    opacity: 1.0,
                    rotation: [1.0, 0.0, 0.0, 0.0],
                    ..Default::default()
                };
                let cloud = GaussianCloud::new(vec![splat; seed as usize % 16 + 1]);
                vec![mesh(), Box::new(cloud) as Box<dyn Representation>]
            }
            OutputKind::MeshOnly => vec![mesh()],
            OutputKind::Empty => {
                let empty: Box<dyn Representation> = Box::new(EncodedRepresentation {
                    format: OutputFormat::Gaussian,
                    bytes: Vec::new(),
                });
                vec![empty]
            }
        };
        Ok(outputs)
    }
}

#[async_trait]
impl SplatModel for FakeModel {
    async fn to_device(&mut self, device: Device) -> Result<(), BoxError> {
        self.state.lock().unwrap().devices.push(device);
        Ok(())
    }

    async fn generate_single(
        &self,
        _image: &RgbImage,
        seed: u32,
        plan: &SamplingPlan,
    ) -> Result<Representations, BoxError> {
        self.run(ModelCall {
            seed,
            views: 1,
            mode: None,
            plan: plan.clone(),
        })
        .await
    }

    async fn generate_multi(
        &self,
        images: &[RgbImage],
        seed: u32,
        plan: &SamplingPlan,
        mode: FusionMode,
    ) -> Result<Representations, BoxError> {
        self.run(ModelCall {
            seed,
            views: images.len(),
            mode: Some(mode),
            plan: plan.clone(),
        })
        .await
    }

    async fn release_memory(&self) -> Result<(), BoxError> {
        self.state.lock().unwrap().releases += 1;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreprocessCall {
    MultiView(u32),
    SingleView(u32),
}

#[derive(Debug)]
pub struct FakePreprocessor {
    calls: Mutex<Vec<PreprocessCall>>,
    sources: Mutex<Vec<Vec<u8>>>,
    multi_view_count: AtomicUsize,
    fail_single_view: Mutex<bool>,
}

impl Default for FakePreprocessor {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            sources: Mutex::new(Vec::new()),
            multi_view_count: AtomicUsize::new(2),
            fail_single_view: Mutex::new(false),
        }
    }
}

impl FakePreprocessor {
    pub fn calls(&self) -> Vec<PreprocessCall> {
        self.calls.lock().unwrap().clone()
    }

    /// Source bytes each preprocessing call received, in call order.
    pub fn sources(&self) -> Vec<Vec<u8>> {
        self.sources.lock().unwrap().clone()
    }

    pub fn set_multi_view_count(&self, count: usize) {
        self.multi_view_count.store(count, Ordering::SeqCst);
    }

    pub fn fail_single_view(&self) {
        *self.fail_single_view.lock().unwrap() = true;
    }

    fn record(&self, call: PreprocessCall, image: &[u8]) {
        self.calls.lock().unwrap().push(call);
        self.sources.lock().unwrap().push(image.to_vec());
    }
}

#[async_trait]
impl Preprocessor for FakePreprocessor {
    async fn to_multi_view(&self, image: &[u8], seed: u32) -> Result<Vec<RgbImage>, BoxError> {
        self.record(PreprocessCall::MultiView(seed), image);
        Ok((0..self.multi_view_count.load(Ordering::SeqCst)).map(|_| rgb(8)).collect())
    }

    async fn to_single_view(&self, image: &[u8], seed: u32) -> Result<RgbImage, BoxError> {
        self.record(PreprocessCall::SingleView(seed), image);
        if *self.fail_single_view.lock().unwrap() {
            return Err("background removal failed".into());
        }
        Ok(rgb(8))
    }
}

pub type JudgeCall = (Vec<u8>, Vec<u8>, Vec<u8>);

#[derive(Debug)]
pub struct FakeJudge {
    verdict: Option<Verdict>,
    seen: Mutex<Vec<JudgeCall>>,
}

impl FakeJudge {
    pub fn winner(winner: usize) -> Self {
        Self {
            verdict: Some(Verdict {
                winner,
                score: Some(0.75),
            }),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            verdict: None,
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn seen(&self) -> Vec<JudgeCall> {
        self.seen.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }
}

#[async_trait]
impl Judge for FakeJudge {
    async fn judge(
        &self,
        reference: &[u8],
        candidate_a: &[u8],
        candidate_b: &[u8],
    ) -> Result<Verdict, BoxError> {
        self.seen
            .lock()
            .unwrap()
            .push((reference.to_vec(), candidate_a.to_vec(), candidate_b.to_vec()));
        self.verdict.ok_or_else(|| "judge unreachable".into())
    }
}

const CODEC_MAGIC: &[u8] = b"SPZ0";

/// Reversible stand-in codec: magic prefix followed by the payload XOR-ed and reversed.
#[derive(Debug, Default)]
pub struct FakeCodec {
    failing: bool,
    compressions: AtomicUsize,
}

impl FakeCodec {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn compressions(&self) -> usize {
        self.compressions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Codec for FakeCodec {
    async fn compress(&self, payload: &[u8]) -> Result<Vec<u8>, BoxError> {
        if self.failing {
            return Err("codec crashed".into());
        }
        self.compressions.fetch_add(1, Ordering::SeqCst);
        let mut out = CODEC_MAGIC.to_vec();
        out.extend(payload.iter().rev().map(|b| b ^ 0x5a));
        Ok(out)
    }

    async fn decompress(&self, payload: &[u8]) -> Result<Vec<u8>, BoxError> {
        let body = payload
            .strip_prefix(CODEC_MAGIC)
            .ok_or("missing codec magic")?;
        Ok(body.iter().rev().map(|b| b ^ 0x5a).collect())
    }
}

/// Seeds handed out in a fixed order.
#[derive(Debug)]
pub struct ScriptedSeeds {
    script: Mutex<VecDeque<u32>>,
}

impl ScriptedSeeds {
    pub fn new(seeds: impl IntoIterator<Item = u32>) -> Self {
        Self {
            script: Mutex::new(seeds.into_iter().collect()),
        }
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

impl SeedSource for ScriptedSeeds {
    fn draw(&self, range: Range<u32>) -> u32 {
        let seed = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .expect("seed script exhausted");
        assert!(range.contains(&seed));
        seed
    }
}

/// Fully wired set of fakes around a real [`InferenceService`].
pub struct Harness {
    pub loader: FakeLoader,
    pub inference: Arc<InferenceService>,
    pub preprocessor: Arc<FakePreprocessor>,
    pub judge: Arc<FakeJudge>,
    pub seeds: Arc<dyn SeedSource>,
}

impl Harness {
    pub fn new() -> Self {
        let loader = FakeLoader::new();
        let inference = Arc::new(InferenceService::new(
            FakeLoader::config(),
            Arc::new(loader.clone()),
        ));
        Self {
            loader,
            inference,
            preprocessor: Arc::new(FakePreprocessor::default()),
            judge: Arc::new(FakeJudge::winner(0)),
            seeds: Arc::new(OsSeedSource),
        }
    }

    pub async fn ready() -> Self {
        let harness = Self::new();
        harness.inference.startup().await.unwrap();
        harness
    }

    pub fn with_judge(mut self, judge: FakeJudge) -> Self {
        self.judge = Arc::new(judge);
        self
    }

    pub fn with_seeds(mut self, seeds: impl SeedSource + 'static) -> Self {
        self.seeds = Arc::new(seeds);
        self
    }

    pub fn scheduler(&self) -> DuelScheduler {
        DuelScheduler::new(
            self.inference.clone(),
            self.preprocessor.clone(),
            self.seeds.clone(),
        )
    }

    pub fn orchestrator(&self) -> ChampionOrchestrator {
        ChampionOrchestrator::new(
            GenerationParameters::default(),
            self.inference.clone(),
            self.preprocessor.clone(),
            self.judge.clone(),
            self.seeds.clone(),
        )
    }
}
