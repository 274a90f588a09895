pub mod yolov5;

use std::path::PathBuf;
use std::process::ExitStatus;

use detect_common::TrainingParams;

use crate::sources::{DetectSource, RunSink};

#[derive(thiserror::Error, Debug)]
pub enum DriverError {
    #[error("Failed to initialize driver: {0}")]
    Initialization(String),
    #[error("{what} not found: {}", .path.display())]
    MissingFile { what: &'static str, path: PathBuf },
    #[error("Failed to execute {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("{tool} failed ({status}).\nSTDOUT:\n{stdout}\nSTDERR:\n{stderr}")]
    Failed {
        tool: String,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },
}

/// Everything the training script needs, resolved to concrete paths
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSpec {
    /// Dataset description produced by unpacking the archive
    pub data_yaml: PathBuf,
    /// Model config patched with the dataset's class count
    pub model_cfg: PathBuf,
    pub params: TrainingParams,
}

/// A backend that runs the external detection and training tools.
///
/// Implementations only spawn processes; path bookkeeping around a run
/// (clearing output, locating artifacts) lives in [`crate::Runner`].
pub trait Driver {
    /// Run detection on `source`, writing annotated output into `sink`
    fn detect(&self, source: &DetectSource, sink: &RunSink) -> Result<(), DriverError>;

    /// Run the training script to completion
    fn train(&self, spec: &TrainSpec) -> Result<(), DriverError>;
}
