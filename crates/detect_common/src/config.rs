use std::fs;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{CommonError, Result, layout::ProjectLayout};

/// Top-level service configuration. Every field has a default, so a partial file is fine.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub paths: PathsConfig,
    pub python: PythonConfig,
    pub detection: DetectionParams,
    pub training: TrainingParams,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound on a request body; base64 inflates images by a third
    pub max_body_bytes: usize,
    /// Allow cross-origin requests from any origin
    pub cors: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_body_bytes: 16 * 1024 * 1024,
            cors: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// Project root; everything else is resolved against it
    pub base_dir: PathBuf,
    /// YOLOv5 checkout (defaults to `<base_dir>/yolov5`)
    pub yolo_dir: Option<PathBuf>,
    /// Upload directory (defaults to `<base_dir>/data`)
    pub data_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            base_dir: PathBuf::from("."),
            yolo_dir: None,
            data_dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Default)]
#[serde(default)]
pub struct PythonConfig {
    /// Interpreter used to run the YOLOv5 scripts; discovered on PATH when unset
    pub interpreter: Option<PathBuf>,
}

/// Flags passed to `detect.py`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct DetectionParams {
    /// Weights file name inside the YOLOv5 directory
    pub weights: String,
    pub img_size: u32,
    #[schemars(range(min = 0.0, max = 1.0))]
    pub conf_threshold: f32,
    pub device: String,
    /// `--project`, relative to the YOLOv5 directory
    pub project: String,
    /// `--name`; reused on every run thanks to `--exist-ok`
    pub run_name: String,
    /// File name uploads are written to inside the data directory
    pub input_filename: String,
    /// Source argument used by the live camera route
    pub webcam_source: String,
}

impl Default for DetectionParams {
    fn default() -> Self {
        Self {
            weights: "my_model.pt".to_string(),
            img_size: 320,
            conf_threshold: 0.5,
            device: "cpu".to_string(),
            project: "runs/detect".to_string(),
            run_name: "result".to_string(),
            input_filename: "inputImage.jpg".to_string(),
            webcam_source: "0".to_string(),
        }
    }
}

/// Settings for the one-shot training pipeline
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(default)]
pub struct TrainingParams {
    /// The HTTP `/train` route only trains when this is set
    pub enabled: bool,
    /// Pretrained weights to start from; its stem also names the model config
    pub weight_name: String,
    pub batch_size: u32,
    pub epochs: u32,
    pub img_size: u32,
    pub run_name: String,
    /// Dataset archive, relative to the base directory
    pub dataset_zip: PathBuf,
    /// Where a copy of the trained weights is archived, relative to the base directory
    pub artifacts_dir: PathBuf,
    pub cache: bool,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            enabled: false,
            weight_name: "yolov5s.pt".to_string(),
            batch_size: 16,
            epochs: 1,
            img_size: 416,
            run_name: "yolov5s_results".to_string(),
            dataset_zip: PathBuf::from("data.zip"),
            artifacts_dir: PathBuf::from("artifacts/model_trainer"),
            cache: true,
        }
    }
}

impl TrainingParams {
    /// Model config stem: the weight name up to its first dot (`yolov5s.pt` -> `yolov5s`)
    pub fn model_config_name(&self) -> &str {
        self.weight_name
            .split('.')
            .next()
            .unwrap_or(&self.weight_name)
    }
}

impl AppConfig {
    /// Auto-detect file format and load configuration
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        let config = match path_ref.extension().and_then(|ext| ext.to_str()) {
            Some("toml") => Self::from_toml(&fs::read_to_string(path_ref)?)?,
            Some("json") => Self::from_json(&fs::read_to_string(path_ref)?)?,
            _ => return Err(CommonError::UnsupportedConfigFormat),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a JSON string
    pub fn from_json(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Get the JSON schema for the configuration file
    pub fn schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(AppConfig)
    }

    pub fn layout(&self) -> ProjectLayout {
        ProjectLayout::from_config(&self.paths)
    }

    pub fn validate(&self) -> Result<()> {
        let mut problems = Vec::new();

        let detection = &self.detection;
        if !(0.0..=1.0).contains(&detection.conf_threshold) {
            problems.push(format!(
                "detection.conf_threshold must be within [0, 1], got {}",
                detection.conf_threshold
            ));
        }
        if detection.img_size == 0 {
            problems.push("detection.img_size must be positive".to_string());
        }
        for (field, value) in [
            ("detection.weights", &detection.weights),
            ("detection.input_filename", &detection.input_filename),
            ("detection.run_name", &detection.run_name),
            ("training.weight_name", &self.training.weight_name),
        ] {
            if value.trim().is_empty() {
                problems.push(format!("{} must not be empty", field));
            }
        }

        let training = &self.training;
        if training.batch_size == 0 {
            problems.push("training.batch_size must be positive".to_string());
        }
        if training.epochs == 0 {
            problems.push("training.epochs must be positive".to_string());
        }
        if training.img_size == 0 {
            problems.push("training.img_size must be positive".to_string());
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(CommonError::ValidationFailed {
                details: problems.join("; "),
            })
        }
    }
}
