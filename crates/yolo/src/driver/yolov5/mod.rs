use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use detect_common::{DetectionParams, ProjectLayout};

use crate::driver::{Driver, DriverError, TrainSpec};
use crate::sources::{DetectSource, RunSink, Sink, Source};

/// Drives a YOLOv5 checkout through its `detect.py` and `train.py` scripts
#[derive(Debug, Clone)]
pub struct Yolov5Driver {
    python: PathBuf,
    layout: ProjectLayout,
    detection: DetectionParams,
}

impl Yolov5Driver {
    /// Create a driver using the first Python interpreter found on PATH
    pub fn new(layout: ProjectLayout, detection: DetectionParams) -> Self {
        Self {
            python: Self::find_python_executable(),
            layout,
            detection,
        }
    }

    /// Create a driver with an explicit interpreter.
    /// Bare program names are resolved by the OS at spawn time; paths must exist.
    pub fn with_python(
        python: impl Into<PathBuf>,
        layout: ProjectLayout,
        detection: DetectionParams,
    ) -> Result<Self, DriverError> {
        let python = python.into();

        if python.components().count() > 1 && !python.exists() {
            return Err(DriverError::Initialization(format!(
                "Python interpreter not found at: {}",
                python.display()
            )));
        }

        Ok(Self {
            python,
            layout,
            detection,
        })
    }

    pub fn python(&self) -> &Path {
        &self.python
    }

    fn find_python_executable() -> PathBuf {
        for candidate in ["python3", "python"] {
            if let Ok(output) = Command::new("which").arg(candidate).output() {
                if output.status.success() {
                    let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
                    if !path.is_empty() {
                        return PathBuf::from(path);
                    }
                }
            }
        }

        // Let the OS resolve it at spawn time
        PathBuf::from("python")
    }

    /// `python detect.py --weights .. --img .. --conf .. --source .. --project .. --name .. --exist-ok --device ..`,
    /// run from inside the YOLOv5 directory.
    pub fn build_detect_command(
        &self,
        source: &DetectSource,
        sink: &RunSink,
    ) -> Result<Command, DriverError> {
        let weights = self.layout.weights_path(&self.detection.weights);
        if !weights.exists() {
            return Err(DriverError::MissingFile {
                what: "Model",
                path: weights,
            });
        }

        let detect_script = self.layout.detect_script();
        if !detect_script.exists() {
            return Err(DriverError::MissingFile {
                what: "detect.py",
                path: detect_script,
            });
        }

        let mut cmd = Command::new(&self.python);
        cmd.current_dir(&self.layout.yolo_dir)
            .arg("detect.py")
            .arg("--weights")
            .arg(&weights)
            .args(["--img", &self.detection.img_size.to_string()])
            .args(["--conf", &self.detection.conf_threshold.to_string()])
            .args(["--source", &source.as_arg()])
            .args(["--project", &sink.project])
            .args(["--name", &sink.run_name])
            .arg("--exist-ok")
            .args(["--device", &self.detection.device]);
        Ok(cmd)
    }

    /// `python yolov5/train.py --img .. --batch .. --epochs .. --data .. --cfg .. --weights .. --name .. [--cache]`,
    /// run from the project root.
    pub fn build_train_command(&self, spec: &TrainSpec) -> Result<Command, DriverError> {
        let train_script = self.layout.train_script();
        if !train_script.exists() {
            return Err(DriverError::MissingFile {
                what: "train.py",
                path: train_script,
            });
        }

        let params = &spec.params;
        let mut cmd = Command::new(&self.python);
        cmd.current_dir(&self.layout.base_dir)
            .arg(&train_script)
            .args(["--img", &params.img_size.to_string()])
            .args(["--batch", &params.batch_size.to_string()])
            .args(["--epochs", &params.epochs.to_string()])
            .arg("--data")
            .arg(&spec.data_yaml)
            .arg("--cfg")
            .arg(&spec.model_cfg)
            .args(["--weights", &params.weight_name])
            .args(["--name", &params.run_name]);
        if params.cache {
            cmd.arg("--cache");
        }
        Ok(cmd)
    }

    fn execute_captured(&self, mut cmd: Command, tool: &str) -> Result<Output, DriverError> {
        tracing::info!("Executing {}: {:?}", tool, cmd);

        let output = cmd
            .stdin(Stdio::null())
            .output()
            .map_err(|e| DriverError::Spawn {
                program: self.python.display().to_string(),
                source: e,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(DriverError::Failed {
                tool: tool.to_string(),
                status: output.status,
                stdout,
                stderr,
            });
        }

        tracing::debug!(%stdout, %stderr, "{} output", tool);
        tracing::info!("{} executed successfully", tool);
        Ok(output)
    }

    fn execute_inherited(&self, mut cmd: Command, tool: &str) -> Result<(), DriverError> {
        tracing::info!("Executing {}: {:?}", tool, cmd);

        // training runs for a long time; let progress reach the terminal
        let status = cmd.status().map_err(|e| DriverError::Spawn {
            program: self.python.display().to_string(),
            source: e,
        })?;

        if !status.success() {
            return Err(DriverError::Failed {
                tool: tool.to_string(),
                status,
                stdout: "(streamed to terminal)".to_string(),
                stderr: "(streamed to terminal)".to_string(),
            });
        }

        tracing::info!("{} executed successfully", tool);
        Ok(())
    }
}

impl Driver for Yolov5Driver {
    fn detect(&self, source: &DetectSource, sink: &RunSink) -> Result<(), DriverError> {
        source.validate()?;
        tracing::info!("{} -> {}", source.description(), sink.description());

        let cmd = self.build_detect_command(source, sink)?;
        self.execute_captured(cmd, "YOLO detect")?;
        Ok(())
    }

    fn train(&self, spec: &TrainSpec) -> Result<(), DriverError> {
        let cmd = self.build_train_command(spec)?;
        self.execute_inherited(cmd, "YOLOv5 training")
    }
}
