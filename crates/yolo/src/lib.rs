pub mod driver;
pub mod sources;
pub mod training;

use std::path::{Path, PathBuf};

use detect_common::{AppConfig, DetectionParams, ProjectLayout, TrainingParams};
use serde::{Deserialize, Serialize};
use strum::{Display, IntoStaticStr, VariantNames};
use thiserror::Error;

use driver::{Driver, DriverError, yolov5::Yolov5Driver};
use sources::{DetectSource, RunSink, Sink};
use training::{TrainingArtifact, TrainingError, TrainingPipeline};

#[derive(Error, Debug)]
pub enum YoloError {
    #[error(transparent)]
    Driver(#[from] DriverError),
    #[error("Detection ran but output image not found.")]
    MissingOutput { expected: PathBuf, hint: String },
    #[error("Source has no file name: {}", .0.display())]
    InvalidSource(PathBuf),
    #[error(transparent)]
    Training(#[from] TrainingError),
}

#[derive(Debug, Clone, Serialize, Deserialize, Display, VariantNames, IntoStaticStr, PartialEq)]
#[serde(tag = "type", content = "params", rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum YoloOperation {
    /// Annotate a single image file
    Detect { source: PathBuf },
    /// Run detection on the configured webcam until the CLI exits
    Live,
    /// Unpack the dataset, train, and install the resulting weights
    Train,
}

/// What an operation left behind on disk
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Artifact {
    AnnotatedImage { path: PathBuf },
    LiveSession,
    TrainedWeights(TrainingArtifact),
}

/// Runs detection and training operations against one project layout
pub struct Runner<D: Driver> {
    driver: D,
    layout: ProjectLayout,
    detection: DetectionParams,
    training: TrainingParams,
}

impl<D: Driver> Runner<D> {
    pub fn new(
        driver: D,
        layout: ProjectLayout,
        detection: DetectionParams,
        training: TrainingParams,
    ) -> Self {
        Self {
            driver,
            layout,
            detection,
            training,
        }
    }

    pub fn execute(&self, operation: YoloOperation) -> Result<Artifact, YoloError> {
        let name: &'static str = (&operation).into();
        let _span = tracing::info_span!("yolo", operation = name).entered();

        match operation {
            YoloOperation::Detect { source } => {
                let path = self.detect_image(&source)?;
                Ok(Artifact::AnnotatedImage { path })
            }
            YoloOperation::Live => {
                self.live()?;
                Ok(Artifact::LiveSession)
            }
            YoloOperation::Train => Ok(Artifact::TrainedWeights(self.train()?)),
        }
    }

    /// Clear previous runs, annotate `image`, and return the annotated file
    pub fn detect_image(&self, image: &Path) -> Result<PathBuf, YoloError> {
        let sink = self.sink();
        let expected = sink
            .output_for(image)
            .ok_or_else(|| YoloError::InvalidSource(image.to_path_buf()))?;

        sink.prepare()?;
        self.driver.detect(&DetectSource::image(image), &sink)?;

        if !expected.exists() {
            return Err(YoloError::MissingOutput {
                hint: format!("Check {}", sink.output_dir.display()),
                expected,
            });
        }
        Ok(expected)
    }

    /// Clear previous runs and stream detection from the webcam
    pub fn live(&self) -> Result<(), YoloError> {
        let sink = self.sink();
        sink.prepare()?;
        self.driver
            .detect(&DetectSource::webcam(&self.detection.webcam_source), &sink)?;
        Ok(())
    }

    pub fn train(&self) -> Result<TrainingArtifact, YoloError> {
        Ok(TrainingPipeline::new(&self.driver, &self.layout, &self.training).run()?)
    }

    fn sink(&self) -> RunSink {
        RunSink::new(&self.layout, &self.detection)
    }

    /// Get reference to the driver for advanced usage
    pub fn driver(&self) -> &D {
        &self.driver
    }

    pub fn layout(&self) -> &ProjectLayout {
        &self.layout
    }
}

impl Runner<Yolov5Driver> {
    /// Build a YOLOv5-backed runner from service configuration
    pub fn from_config(config: &AppConfig) -> Result<Self, YoloError> {
        let layout = config.layout();
        let driver = match &config.python.interpreter {
            Some(python) => {
                Yolov5Driver::with_python(python, layout.clone(), config.detection.clone())?
            }
            None => Yolov5Driver::new(layout.clone(), config.detection.clone()),
        };
        tracing::debug!("Using Python interpreter {}", driver.python().display());

        Ok(Self::new(
            driver,
            layout,
            config.detection.clone(),
            config.training.clone(),
        ))
    }
}
