use std::sync::{Arc, Mutex};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ds_core::gaussian_cloud::{GaussianCloud, Splat};
use ds_core::images::warm_up_png;
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tracing_subscriber::fmt::MakeWriter;
use crate::config::ServiceConfig;
use crate::routes::create_router;
use crate::state::AppState;

pub const SPZ_MAGIC: &[u8] = b"SPZ0";

pub fn png(size: u32) -> Vec<u8> {
    warm_up_png(size).unwrap()
}

pub fn splats_for(seed: u32) -> usize {
    seed as usize % 16 + 1
}

pub fn decompress(payload: &[u8]) -> Vec<u8> {
    assert!(payload.starts_with(SPZ_MAGIC));
    payload[SPZ_MAGIC.len()..].iter().rev().copied().collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub seed: u32,
    pub views: usize,
    pub fusion_mode: Option<String>,
    pub slat_steps: u64,
}

#[derive(Debug, Default)]
pub struct SidecarLog {
    pub loads: Vec<String>,
    pub devices: Vec<String>,
    pub generations: Vec<Generation>,
    pub preprocess: Vec<(&'static str, u32)>,
    pub releases: usize,
    pub judged: usize,
    pub compressions: usize,
}

/// In-process stand-in for the worker and judge sidecars.
#[derive(Clone, Default)]
pub struct Sidecar {
    log: Arc<Mutex<SidecarLog>>,
    winner: usize,
    judge_down: bool,
}

impl Sidecar {
    pub fn winner(mut self, winner: usize) -> Self {
        self.winner = winner;
        self
    }

    pub fn judge_down(mut self) -> Self {
        self.judge_down = true;
        self
    }

    pub fn log(&self) -> std::sync::MutexGuard<'_, SidecarLog> {
        self.log.lock().unwrap()
    }

    pub async fn spawn(&self) -> String {
        let app = Router::new()
            .route("/pipeline/load", post(load))
            .route("/pipeline/device", post(device))
            .route("/pipeline/generate", post(generate))
            .route("/pipeline/release", post(release))
            .route("/preprocess/multi_view", post(multi_view))
            .route("/preprocess/single_view", post(single_view))
            .route("/judge", post(judge))
            .route("/codec/compress", post(compress))
            .route("/codec/decompress", post(decompress_route))
            .with_state(self.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }
}

async fn load(State(sidecar): State<Sidecar>, Json(body): Json<Value>) -> Json<Value> {
    sidecar.log().loads.push(body["model_id"].as_str().unwrap().to_string());
    Json(json!({}))
}

async fn device(State(sidecar): State<Sidecar>, Json(body): Json<Value>) -> Json<Value> {
    sidecar.log().devices.push(body["device"].as_str().unwrap().to_string());
    Json(json!({}))
}

async fn generate(State(sidecar): State<Sidecar>, Json(body): Json<Value>) -> Vec<u8> {
    let seed = body["seed"].as_u64().unwrap() as u32;
    sidecar.log().generations.push(Generation {
        seed,
        views: body["images"].as_array().unwrap().len(),
        fusion_mode: body["fusion_mode"].as_str().map(str::to_string),
        slat_steps: body["plan"]["slat"]["steps"].as_u64().unwrap(),
    });

    let splat = Splat {
        position: [seed as f32, 0.0, 0.0],
        opacity: 1.0,
        rotation: [1.0, 0.0, 0.0, 0.0],
        ..Default::default()
    };
    GaussianCloud::new(vec![splat; splats_for(seed)]).to_ply_bytes()
}

async fn release(State(sidecar): State<Sidecar>) -> Json<Value> {
    sidecar.log().releases += 1;
    Json(json!({}))
}

async fn multi_view(State(sidecar): State<Sidecar>, Json(body): Json<Value>) -> Json<Value> {
    let seed = body["seed"].as_u64().unwrap() as u32;
    sidecar.log().preprocess.push(("multi_view", seed));
    let view = STANDARD.encode(png(8));
    Json(json!({ "images": [view.clone(), view.clone(), view.clone(), view] }))
}

async fn single_view(State(sidecar): State<Sidecar>, Json(body): Json<Value>) -> Json<Value> {
    let seed = body["seed"].as_u64().unwrap() as u32;
    sidecar.log().preprocess.push(("single_view", seed));
    Json(json!({ "image": STANDARD.encode(png(8)) }))
}

async fn judge(State(sidecar): State<Sidecar>, Json(body): Json<Value>) -> Response {
    if sidecar.judge_down {
        return (StatusCode::SERVICE_UNAVAILABLE, "judge offline").into_response();
    }
    assert_eq!(body["candidates"].as_array().unwrap().len(), 2);
    sidecar.log().judged += 1;
    Json(json!({ "winner": sidecar.winner, "score": 0.9 })).into_response()
}

async fn compress(State(sidecar): State<Sidecar>, body: Bytes) -> Vec<u8> {
    sidecar.log().compressions += 1;
    let mut out = SPZ_MAGIC.to_vec();
    out.extend(body.iter().rev());
    out
}

async fn decompress_route(body: Bytes) -> Vec<u8> {
    decompress(&body)
}

pub struct TestApp {
    pub sidecar: Sidecar,
    pub state: Arc<AppState>,
    pub router: Router,
}

impl TestApp {
    /// Service wired to a fresh sidecar, with the pipeline already loaded.
    pub async fn ready(sidecar: Sidecar, configure: impl FnOnce(&mut ServiceConfig)) -> Self {
        let app = Self::unloaded(sidecar, configure).await;
        app.state.orchestrator.inference().startup().await.unwrap();
        app
    }

    pub async fn unloaded(sidecar: Sidecar, configure: impl FnOnce(&mut ServiceConfig)) -> Self {
        let url = sidecar.spawn().await;
        let mut config = ServiceConfig::from_lookup(|_| None).unwrap();
        config.worker_url = url.clone();
        config.judge_url = url;
        config.warmup = false;
        configure(&mut config);

        let state = Arc::new(crate::build_state(config).unwrap());
        Self {
            sidecar,
            router: create_router(state.clone()),
            state,
        }
    }
}

/// Log sink for asserting on formatted tracing output.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
