use std::fmt::Debug;
use std::path::{Path, PathBuf};

use detect_common::{DetectionParams, ProjectLayout};

use crate::driver::DriverError;

/// Something the detection CLI can read from (`--source`)
pub trait Source: Debug + Clone {
    /// Type-specific validation that the source is accessible
    fn validate(&self) -> Result<(), DriverError>;

    /// Get a human-readable description of this source
    fn description(&self) -> String;

    /// The value passed as `--source`
    fn as_arg(&self) -> String;
}

/// Where the detection CLI writes its annotated output
pub trait Sink: Debug + Clone {
    /// Make the destination ready for a fresh run
    fn prepare(&self) -> Result<(), DriverError>;

    /// Get a human-readable description of this sink
    fn description(&self) -> String;
}

/// A single image on disk
#[derive(Debug, Clone, PartialEq)]
pub struct ImageFileSource {
    pub path: PathBuf,
}

impl ImageFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Source for ImageFileSource {
    fn validate(&self) -> Result<(), DriverError> {
        if self.path.is_file() {
            Ok(())
        } else {
            Err(DriverError::MissingFile {
                what: "Input image",
                path: self.path.clone(),
            })
        }
    }

    fn description(&self) -> String {
        format!("Image file: {}", self.path.display())
    }

    fn as_arg(&self) -> String {
        self.path.to_string_lossy().into_owned()
    }
}

/// A camera device, identified the way the detection CLI expects (`"0"`)
#[derive(Debug, Clone, PartialEq)]
pub struct WebcamSource {
    pub device: String,
}

impl WebcamSource {
    pub fn new(device: impl Into<String>) -> Self {
        Self { device: device.into() }
    }
}

impl Source for WebcamSource {
    fn validate(&self) -> Result<(), DriverError> {
        // the CLI opens the device itself and reports failures on exit
        Ok(())
    }

    fn description(&self) -> String {
        format!("Webcam: {}", self.device)
    }

    fn as_arg(&self) -> String {
        self.device.clone()
    }
}

/// Either kind of source, so a single driver method covers both routes
#[derive(Debug, Clone, PartialEq)]
pub enum DetectSource {
    Image(ImageFileSource),
    Webcam(WebcamSource),
}

impl DetectSource {
    pub fn image(path: impl Into<PathBuf>) -> Self {
        Self::Image(ImageFileSource::new(path))
    }

    pub fn webcam(device: impl Into<String>) -> Self {
        Self::Webcam(WebcamSource::new(device))
    }
}

impl Source for DetectSource {
    fn validate(&self) -> Result<(), DriverError> {
        match self {
            Self::Image(source) => source.validate(),
            Self::Webcam(source) => source.validate(),
        }
    }

    fn description(&self) -> String {
        match self {
            Self::Image(source) => source.description(),
            Self::Webcam(source) => source.description(),
        }
    }

    fn as_arg(&self) -> String {
        match self {
            Self::Image(source) => source.as_arg(),
            Self::Webcam(source) => source.as_arg(),
        }
    }
}

/// The fixed `--project/--name` run directory under the YOLOv5 checkout.
///
/// Every run reuses the same directory (`--exist-ok`), so `prepare` wipes the
/// whole `runs/` tree to stop a stale annotated image from being served.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSink {
    pub runs_dir: PathBuf,
    pub project: String,
    pub run_name: String,
    pub output_dir: PathBuf,
}

impl RunSink {
    pub fn new(layout: &ProjectLayout, params: &DetectionParams) -> Self {
        Self {
            runs_dir: layout.runs_dir(),
            project: params.project.clone(),
            run_name: params.run_name.clone(),
            output_dir: layout.yolo_dir.join(&params.project).join(&params.run_name),
        }
    }

    /// Annotated image the CLI writes for `source`: same file name, inside the run directory
    pub fn output_for(&self, source: &Path) -> Option<PathBuf> {
        source.file_name().map(|name| self.output_dir.join(name))
    }
}

impl Sink for RunSink {
    fn prepare(&self) -> Result<(), DriverError> {
        let mut stale = vec![&self.runs_dir];
        // a custom `project` can place the run directory outside runs/
        if !self.output_dir.starts_with(&self.runs_dir) {
            stale.push(&self.output_dir);
        }

        for dir in stale {
            if dir.exists() {
                if let Err(e) = std::fs::remove_dir_all(dir) {
                    tracing::warn!("Could not delete run folder {}: {}", dir.display(), e);
                }
            }
        }
        Ok(())
    }

    fn description(&self) -> String {
        format!("Run directory: {}", self.output_dir.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_sink_paths() {
        let layout = ProjectLayout::new("/srv/app");
        let sink = RunSink::new(&layout, &DetectionParams::default());

        assert_eq!(sink.runs_dir, PathBuf::from("/srv/app/yolov5/runs"));
        assert_eq!(sink.output_dir, PathBuf::from("/srv/app/yolov5/runs/detect/result"));
        assert_eq!(
            sink.output_for(Path::new("/srv/app/data/inputImage.jpg")),
            Some(PathBuf::from("/srv/app/yolov5/runs/detect/result/inputImage.jpg"))
        );
    }

    #[test]
    fn test_prepare_clears_previous_runs() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());
        let sink = RunSink::new(&layout, &DetectionParams::default());

        std::fs::create_dir_all(&sink.output_dir).unwrap();
        std::fs::write(sink.output_dir.join("stale.jpg"), b"old").unwrap();

        sink.prepare().unwrap();
        assert!(!sink.runs_dir.exists());

        // nothing to delete is not an error
        sink.prepare().unwrap();
    }

    #[test]
    fn test_prepare_clears_output_outside_runs() {
        let dir = tempfile::tempdir().unwrap();
        let layout = ProjectLayout::new(dir.path());
        let params = DetectionParams {
            project: "results".to_string(),
            ..Default::default()
        };
        let sink = RunSink::new(&layout, &params);
        assert_eq!(sink.output_dir, dir.path().join("yolov5/results/result"));

        std::fs::create_dir_all(&sink.output_dir).unwrap();
        std::fs::write(sink.output_dir.join("inputImage.jpg"), b"previous request").unwrap();

        sink.prepare().unwrap();
        assert!(!sink.output_dir.exists());
        // the sibling project directory is left alone
        assert!(dir.path().join("yolov5/results").is_dir());
    }

    #[test]
    fn test_sources() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("in.jpg");

        let source = DetectSource::image(&image);
        assert!(matches!(source.validate(), Err(DriverError::MissingFile { .. })));
        std::fs::write(&image, b"jpeg").unwrap();
        assert!(source.validate().is_ok());
        assert_eq!(source.as_arg(), image.to_string_lossy());

        let webcam = DetectSource::webcam("0");
        assert!(webcam.validate().is_ok());
        assert_eq!(webcam.as_arg(), "0");
        assert_eq!(webcam.description(), "Webcam: 0");
    }
}
