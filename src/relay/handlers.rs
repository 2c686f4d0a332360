use axum::extract::State;
use axum::Json;
use serde_json::Value;
use tracing::{info, warn};

use crate::error::RelayResult;
use crate::extractors::MultipartForm;
use crate::relay::models::{Endpoints, HealthResponse, InfoResponse, DEFAULT_PROMPT, SERVICE_NAME};
use crate::relay::upload::{image_form, UploadForm};
use crate::relay::AppState;
use crate::upstream::{ANALYZE_PATH, COSINE_SIM_PATH, EMBED_PATH};

const FILE_FIELD: &str = "file";
const FIRST_FILE_FIELD: &str = "file1";
const SECOND_FILE_FIELD: &str = "file2";
const PROMPT_FIELD: &str = "prompt";

#[axum_macros::debug_handler]
pub(crate) async fn handle_info_request(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        message: SERVICE_NAME,
        status: "running",
        colab_server: state.upstream.base_url().to_string(),
        endpoints: Endpoints::default(),
    })
}

/// Always answers 200; upstream reachability is reported in the body.
#[axum_macros::debug_handler]
pub(crate) async fn handle_health_request(State(state): State<AppState>) -> Json<HealthResponse> {
    match state.upstream.probe_health().await {
        Ok(details) => Json(HealthResponse::connected(details)),
        Err(err) => {
            warn!("Upstream health probe failed: {}", err);
            Json(HealthResponse::disconnected(
                err.to_string(),
                state.upstream.base_url(),
            ))
        }
    }
}

#[axum_macros::debug_handler]
pub(crate) async fn handle_analyze_request(
    State(state): State<AppState>,
    MultipartForm(multipart): MultipartForm,
) -> RelayResult<Json<Value>> {
    let mut form = UploadForm::read(multipart, &[FILE_FIELD], &[PROMPT_FIELD]).await?;
    let image = form.take_image(FILE_FIELD)?;
    let prompt = form
        .take_text(PROMPT_FIELD)
        .filter(|prompt| !prompt.is_empty())
        .unwrap_or_else(|| DEFAULT_PROMPT.to_string());

    info!("Received image: {}", image.display_name());
    info!("Prompt: {}", prompt);
    info!("Forwarding to upstream server: {}", state.upstream.base_url());

    let outbound = image_form(vec![image])?.text(PROMPT_FIELD, prompt);
    let result = state.upstream.forward(ANALYZE_PATH, outbound).await?;
    info!("Response from upstream: {}", summarize(&result, "response"));

    Ok(Json(result))
}

#[axum_macros::debug_handler]
pub(crate) async fn handle_embed_request(
    State(state): State<AppState>,
    MultipartForm(multipart): MultipartForm,
) -> RelayResult<Json<Value>> {
    let mut form = UploadForm::read(multipart, &[FILE_FIELD], &[]).await?;
    let image = form.take_image(FILE_FIELD)?;

    info!("Received image for embedding: {}", image.display_name());
    info!("Forwarding to upstream server: {}", state.upstream.base_url());

    let result = state
        .upstream
        .forward(EMBED_PATH, image_form(vec![image])?)
        .await?;
    info!(
        "Embedding generated successfully, shape: {}",
        summarize(&result, "embedding_shape")
    );

    Ok(Json(result))
}

#[axum_macros::debug_handler]
pub(crate) async fn handle_cosine_sim_request(
    State(state): State<AppState>,
    MultipartForm(multipart): MultipartForm,
) -> RelayResult<Json<Value>> {
    let mut form =
        UploadForm::read(multipart, &[FIRST_FILE_FIELD, SECOND_FILE_FIELD], &[]).await?;
    let first = form.take_image(FIRST_FILE_FIELD)?;
    let second = form.take_image(SECOND_FILE_FIELD)?;

    info!(
        "Received images for similarity: {} and {}",
        first.display_name(),
        second.display_name()
    );
    info!("Forwarding to upstream server: {}", state.upstream.base_url());

    let result = state
        .upstream
        .forward(COSINE_SIM_PATH, image_form(vec![first, second])?)
        .await?;
    info!(
        "Cosine similarity: {}",
        summarize(&result, "cosine_similarity")
    );

    Ok(Json(result))
}

fn summarize(result: &Value, key: &str) -> String {
    match result.get(key) {
        Some(Value::String(text)) => text.clone(),
        Some(value) => value.to_string(),
        None => "N/A".to_string(),
    }
}
