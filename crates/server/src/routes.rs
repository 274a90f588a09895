//! Handlers for the detection front-end: /, /health, /train, /predict, /live

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::State;
use axum::response::Html;
use detect_common::{decode_base64_image, encode_image_file};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::AppError;
use crate::state::AppState;

const INDEX_HTML: &str = include_str!("../assets/index.html");

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictResponse {
    pub image: String,
}

/// GET / - upload page
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /train - runs the training pipeline when enabled in config
pub async fn train(State(state): State<Arc<AppState>>) -> Result<String, AppError> {
    if !state.config.training.enabled {
        return Ok(format!(
            "Training disabled. Use /predict with {}",
            state.config.detection.weights
        ));
    }

    let _guard = state.detect_lock.lock().await;
    let worker = state.clone();
    let artifact = tokio::task::spawn_blocking(move || worker.runner.train()).await??;

    Ok(format!(
        "Training successful. Weights written to {}",
        artifact.trained_model_file_path.display()
    ))
}

/// POST /predict - `{"image": "<base64>"}` in, annotated `{"image": "<base64>"}` out
pub async fn predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PredictResponse>, AppError> {
    // a body that is not JSON is treated like an empty object
    let request: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let payload = match request.get("image") {
        Some(Value::String(payload)) => payload,
        Some(_) => {
            return Err(AppError::BadRequest(
                "'image' must be a base64 string.".to_string(),
            ));
        }
        None => {
            return Err(AppError::BadRequest(
                "Send JSON with key 'image' (base64).".to_string(),
            ));
        }
    };

    let bytes = decode_base64_image(payload).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let format = image::guess_format(&bytes).map_err(|_| {
        AppError::BadRequest("Decoded payload is not a recognised image format.".to_string())
    })?;
    tracing::info!(bytes = bytes.len(), ?format, "Received image");

    let _guard = state.detect_lock.lock().await;

    let input_path = state
        .runner
        .layout()
        .input_path(&state.config.detection.input_filename);
    tokio::fs::write(&input_path, &bytes).await?;
    if !input_path.exists() {
        return Err(AppError::Internal(format!(
            "Failed to save image at {}",
            input_path.display()
        )));
    }

    let worker = state.clone();
    let image = tokio::task::spawn_blocking(move || -> Result<String, AppError> {
        let output_path = worker.runner.detect_image(&input_path)?;
        Ok(encode_image_file(&output_path)?)
    })
    .await??;

    Ok(Json(PredictResponse { image }))
}

/// GET /live - detection on the webcam; returns once the CLI exits
pub async fn live(State(state): State<Arc<AppState>>) -> Result<&'static str, AppError> {
    let _guard = state.detect_lock.lock().await;
    let worker = state.clone();
    tokio::task::spawn_blocking(move || worker.runner.live()).await??;
    Ok("Camera starting!!")
}
