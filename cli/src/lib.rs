use std::fs;
use std::path::{Path, PathBuf};

use detect_common::{AppConfig, CommonError};
use thiserror::Error;
use yolo::driver::Driver;
use yolo::{Runner, YoloError};

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] CommonError),
    #[error(transparent)]
    Yolo(#[from] YoloError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("Input image not found: {}", .0.display())]
    MissingInput(PathBuf),
}

/// Load configuration from `path`, or fall back to defaults
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, CliError> {
    match path {
        Some(path) => Ok(AppConfig::from_file(path)?),
        None => Ok(AppConfig::default()),
    }
}

/// Run detection on `image`. With `output`, the annotated image is copied there.
/// Returns the path of the annotated image that should be reported.
pub fn detect_file<D: Driver>(
    runner: &Runner<D>,
    image: &Path,
    output: Option<&Path>,
) -> Result<PathBuf, CliError> {
    if !image.is_file() {
        return Err(CliError::MissingInput(image.to_path_buf()));
    }

    let annotated = runner.detect_image(image)?;

    match output {
        Some(output) => {
            if let Some(parent) = output.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(&annotated, output)?;
            Ok(output.to_path_buf())
        }
        None => Ok(annotated),
    }
}

/// Pretty JSON schema of the configuration file
pub fn config_schema() -> Result<String, CliError> {
    Ok(serde_json::to_string_pretty(&AppConfig::schema())?)
}
