use std::sync::Arc;
use axum::body::Body;
use axum::extract::{Multipart, State};
use axum::http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ds_core::scheduler::SourceImages;
use ds_core::{ChampionResult, GenerationRequest, ParameterOverride, Seed, Strategy};
use log::info;
use crate::error::AppError;
use crate::schemas::{GenerateRequest, GenerateResponse};
use crate::state::AppState;

const X_GENERATED_SEED: HeaderName = HeaderName::from_static("x-generated-seed");
const X_CHAMPION_STRATEGY: HeaderName = HeaderName::from_static("x-champion-strategy");

const IMAGE_FIELD: &str = "prompt_image_file";
const SEED_FIELD: &str = "seed";

struct UploadForm {
    images: Vec<Vec<u8>>,
    seed: i64,
}

async fn read_upload(mut multipart: Multipart) -> Result<UploadForm, AppError> {
    let mut form = UploadForm {
        images: Vec::new(),
        seed: ds_core::seed::AUTO_SEED,
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some(IMAGE_FIELD) => {
                let file_name = field.file_name().unwrap_or("<unnamed>").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("cannot read {IMAGE_FIELD}: {e}")))?;
                info!("Received upload {file_name} ({} bytes)", bytes.len());
                form.images.push(bytes.to_vec());
            }
            Some(SEED_FIELD) => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("cannot read seed: {e}")))?;
                form.seed = text
                    .trim()
                    .parse()
                    .map_err(|_| AppError::BadRequest(format!("seed must be an integer, got '{text}'")))?;
            }
            _ => {}
        }
    }

    if form.images.is_empty() {
        return Err(AppError::BadRequest(format!("missing form field '{IMAGE_FIELD}'")));
    }
    Ok(form)
}

async fn run_champion(
    state: &AppState,
    route: &str,
    images: Vec<Vec<u8>>,
    seed: i64,
    params: Option<ParameterOverride>,
) -> Result<ChampionResult, AppError> {
    let request = GenerationRequest {
        images: SourceImages::new(images)?,
        seed: Seed::from_raw(seed)?,
        params,
    };
    info!(
        "{route}: {} image(s), seed {:?}",
        request.images.count(),
        request.seed
    );

    let result = state.orchestrator.run(&request).await?;
    info!(
        "Champion: {} with seed {} ({} bytes)",
        result.strategy(),
        result.seed(),
        result.champion.payload.len()
    );
    Ok(result)
}

fn stream_response(state: &AppState, seed: u32, strategy: Strategy, payload: Vec<u8>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"));
    headers.insert(CONTENT_LENGTH, HeaderValue::from(payload.len()));
    headers.insert(X_GENERATED_SEED, HeaderValue::from(seed));
    headers.insert(X_CHAMPION_STRATEGY, HeaderValue::from_static(strategy.as_str()));

    (headers, Body::from_stream(state.delivery.stream(payload))).into_response()
}

pub async fn generate_from_base64(
    State(state): State<Arc<AppState>>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<GenerateResponse>, AppError> {
    let images = req
        .prompt_images
        .iter()
        .map(|encoded| STANDARD.decode(encoded.trim()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| AppError::BadRequest(format!("prompt_images must be base64: {e}")))?;

    let result = run_champion(&state, "/generate_from_base64", images, req.seed, req.params).await?;
    let (seed, strategy) = (result.seed(), result.strategy());
    let packaged = state.delivery.package(result.into_payload()).await?;

    Ok(Json(GenerateResponse {
        ply_file_base64: packaged.to_base64(),
        seed,
        strategy,
        compressed: packaged.compressed,
    }))
}

/// Champion PLY as a chunked binary stream.
pub async fn generate(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_upload(multipart).await?;
    let result = run_champion(&state, "/generate", form.images, form.seed, None).await?;
    let (seed, strategy) = (result.seed(), result.strategy());
    let payload = result.into_payload();
    if payload.is_empty() {
        return Err(ds_core::Error::EmptyInput("generated content is empty".into()).into());
    }

    Ok(stream_response(&state, seed, strategy, payload))
}

/// Champion compressed to SPZ regardless of the service-wide setting.
pub async fn generate_spz(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, AppError> {
    let form = read_upload(multipart).await?;
    let result = run_champion(&state, "/generate-spz", form.images, form.seed, None).await?;
    if result.champion.payload.is_empty() {
        return Err(ds_core::Error::EmptyInput("generated content is empty".into()).into());
    }
    let compressed = state.delivery.compress(&result.champion.payload).await?;

    Ok(stream_response(&state, result.seed(), result.strategy(), compressed))
}
