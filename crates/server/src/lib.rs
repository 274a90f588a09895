//! HTTP front-end for the YOLOv5 detection CLI.
//!
//! A client posts a base64 image to `/predict`; the image is written to the
//! data directory, `detect.py` is run on it, and the annotated result comes
//! back base64-encoded.

pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::{AppError, StartupError};
pub use state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let server = &state.config.server;

    let mut app = Router::new()
        .route("/", get(routes::index))
        .route("/health", get(routes::health))
        .route("/train", get(routes::train))
        .route("/predict", post(routes::predict))
        .route("/live", get(routes::live))
        .layer(DefaultBodyLimit::max(server.max_body_bytes))
        .layer(TraceLayer::new_for_http());

    if server.cors {
        app = app.layer(CorsLayer::permissive());
    }

    app.with_state(state)
}
