//! One-shot training: unpack a labelled dataset, patch the model config with
//! the dataset's class count, run the training script and collect `best.pt`.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use detect_common::{ProjectLayout, TrainingParams};
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use thiserror::Error;

use crate::driver::{Driver, DriverError, TrainSpec};

#[derive(Error, Debug)]
pub enum TrainingError {
    #[error(
        "{} not found in project root. Data ingestion step must download it first.",
        .0.display()
    )]
    DatasetMissing(PathBuf),
    #[error(
        "{} not found after unzipping. Expected train/, valid/, and data.yaml from dataset zip.",
        .0.display()
    )]
    DataYamlMissing(PathBuf),
    #[error("YOLO model config not found: {}", .0.display())]
    ModelConfigMissing(PathBuf),
    #[error("Trained model not found: {}", .0.display())]
    WeightsMissing(PathBuf),
    #[error("Invalid class count in {}: {reason}", .path.display())]
    ClassCount { path: PathBuf, reason: String },
    #[error("Dataset archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error(transparent)]
    Driver(#[from] DriverError),
}

/// Where the trained weights ended up
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrainingArtifact {
    /// Copy next to the detection script, ready to be used as `--weights`
    pub trained_model_file_path: PathBuf,
    /// Archived copy under the artifacts directory
    pub archived_model_file_path: PathBuf,
}

/// Runs the training steps against a project layout using any [`Driver`]
pub struct TrainingPipeline<'a, D: Driver> {
    driver: &'a D,
    layout: &'a ProjectLayout,
    params: &'a TrainingParams,
}

impl<'a, D: Driver> TrainingPipeline<'a, D> {
    pub fn new(driver: &'a D, layout: &'a ProjectLayout, params: &'a TrainingParams) -> Self {
        Self {
            driver,
            layout,
            params,
        }
    }

    pub fn data_yaml(&self) -> PathBuf {
        self.layout.base_dir.join("data.yaml")
    }

    pub fn base_model_config(&self) -> PathBuf {
        self.layout
            .models_dir()
            .join(format!("{}.yaml", self.params.model_config_name()))
    }

    pub fn custom_model_config(&self) -> PathBuf {
        self.layout
            .models_dir()
            .join(format!("custom_{}.yaml", self.params.model_config_name()))
    }

    /// `best.pt` as written by the training script
    pub fn trained_weights(&self) -> PathBuf {
        self.layout
            .runs_dir()
            .join("train")
            .join(&self.params.run_name)
            .join("weights")
            .join("best.pt")
    }

    pub fn run(&self) -> Result<TrainingArtifact, TrainingError> {
        tracing::info!("Entered training pipeline");

        let dataset = self.layout.resolve(&self.params.dataset_zip);
        tracing::info!("Unzipping {}", dataset.display());
        unpack_dataset(&dataset, &self.layout.base_dir)?;

        let data_yaml = self.data_yaml();
        if !data_yaml.exists() {
            return Err(TrainingError::DataYamlMissing(data_yaml));
        }
        let num_classes = read_class_count(&data_yaml)?;
        tracing::info!("Dataset declares {} classes", num_classes);

        let base_cfg = self.base_model_config();
        tracing::info!("Base model config inferred: {}", base_cfg.display());
        let custom_cfg = self.custom_model_config();
        patch_model_config(&base_cfg, &custom_cfg, num_classes)?;

        let spec = TrainSpec {
            data_yaml,
            model_cfg: custom_cfg,
            params: self.params.clone(),
        };
        self.driver.train(&spec)?;

        let artifact = self.collect_weights()?;
        self.cleanup();

        tracing::info!("Model trainer artifact: {:?}", artifact);
        Ok(artifact)
    }

    fn collect_weights(&self) -> Result<TrainingArtifact, TrainingError> {
        let best = self.trained_weights();
        if !best.exists() {
            return Err(TrainingError::WeightsMissing(best));
        }

        let trained_model_file_path = self.layout.yolo_dir.join("best.pt");
        fs::copy(&best, &trained_model_file_path)?;

        let artifacts_dir = self.layout.resolve(&self.params.artifacts_dir);
        fs::create_dir_all(&artifacts_dir)?;
        let archived_model_file_path = artifacts_dir.join("best.pt");
        fs::copy(&best, &archived_model_file_path)?;

        Ok(TrainingArtifact {
            trained_model_file_path,
            archived_model_file_path,
        })
    }

    /// Remove training leftovers. Failures are logged, never fatal.
    fn cleanup(&self) {
        let base = &self.layout.base_dir;
        for dir in [self.layout.runs_dir(), base.join("train"), base.join("valid")] {
            if dir.exists() {
                if let Err(e) = fs::remove_dir_all(&dir) {
                    tracing::warn!("Could not remove {}: {}", dir.display(), e);
                }
            }
        }

        match fs::remove_file(self.data_yaml()) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => tracing::warn!("Could not remove data.yaml: {}", e),
        }
    }
}

/// Extract `archive` into `dest`, then delete the archive
pub fn unpack_dataset(archive: &Path, dest: &Path) -> Result<(), TrainingError> {
    if !archive.exists() {
        return Err(TrainingError::DatasetMissing(archive.to_path_buf()));
    }

    let mut zip = zip::ZipArchive::new(File::open(archive)?)?;
    tracing::debug!("Extracting {} entries into {}", zip.len(), dest.display());
    zip.extract(dest)?;
    fs::remove_file(archive)?;
    Ok(())
}

/// Read `nc` from a dataset description. Accepts an integer or a numeric string.
pub fn read_class_count(data_yaml: &Path) -> Result<u32, TrainingError> {
    let content = fs::read_to_string(data_yaml)?;
    let value: Value = serde_yaml::from_str(&content)?;

    let invalid = |reason: &str| TrainingError::ClassCount {
        path: data_yaml.to_path_buf(),
        reason: reason.to_string(),
    };

    match value.get("nc") {
        Some(Value::Number(n)) => n
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| invalid("nc must be a non-negative integer")),
        Some(Value::String(s)) => s
            .trim()
            .parse()
            .map_err(|_| invalid("nc must be a non-negative integer")),
        Some(_) => Err(invalid("nc must be a non-negative integer")),
        None => Err(invalid("missing key 'nc'")),
    }
}

/// Copy the model config at `base` to `custom` with `nc` replaced, keeping key order
pub fn patch_model_config(base: &Path, custom: &Path, num_classes: u32) -> Result<(), TrainingError> {
    if !base.exists() {
        return Err(TrainingError::ModelConfigMissing(base.to_path_buf()));
    }

    let mut config: Mapping = serde_yaml::from_str(&fs::read_to_string(base)?)?;
    config.insert(Value::from("nc"), Value::from(num_classes));
    fs::write(custom, serde_yaml::to_string(&config)?)?;
    Ok(())
}
