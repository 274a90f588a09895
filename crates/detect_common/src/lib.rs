//! # Detect Common - Shared Types and Utilities
//!
//! Configuration, on-disk layout and the base64 image codec shared by the
//! detection driver, the HTTP front-end and the command-line tool.
//!
//! ## Example
//!
//! ```rust
//! use detect_common::AppConfig;
//!
//! let config = AppConfig::from_toml(r#"
//! [detection]
//! weights = "best.pt"
//! "#).unwrap();
//!
//! let layout = config.layout();
//! assert!(layout.weights_path(&config.detection.weights).ends_with("yolov5/best.pt"));
//! ```

pub mod codec;
pub mod config;
pub mod layout;

use thiserror::Error;

pub use codec::{decode_base64_image, encode_image_file};
pub use config::{AppConfig, DetectionParams, PathsConfig, PythonConfig, ServerConfig, TrainingParams};
pub use layout::ProjectLayout;

/// Result type for shared operations
pub type Result<T> = std::result::Result<T, CommonError>;

/// Standard error type for configuration and codec operations
#[derive(Error, Debug)]
pub enum CommonError {
    #[error("Invalid base64 image payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("Image payload is empty")]
    EmptyPayload,

    #[error("Unsupported config format. Please use .toml or .json files")]
    UnsupportedConfigFormat,

    #[error("Configuration validation failed: {details}")]
    ValidationFailed { details: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    TomlDe(#[from] toml::de::Error),

    #[error(transparent)]
    TomlSer(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
