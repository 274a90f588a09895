use std::path::{Path, PathBuf};

use crate::config::PathsConfig;

/// Every path the service reads or writes, resolved from one base directory.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectLayout {
    pub base_dir: PathBuf,
    pub yolo_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl ProjectLayout {
    /// Layout with the conventional `yolov5/` and `data/` children of `base_dir`
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            yolo_dir: base_dir.join("yolov5"),
            data_dir: base_dir.join("data"),
            base_dir,
        }
    }

    /// Build a layout from config, resolving relative overrides against the base directory
    pub fn from_config(paths: &PathsConfig) -> Self {
        let mut layout = Self::new(&paths.base_dir);
        if let Some(yolo_dir) = &paths.yolo_dir {
            layout.yolo_dir = layout.resolve(yolo_dir);
        }
        if let Some(data_dir) = &paths.data_dir {
            layout.data_dir = layout.resolve(data_dir);
        }
        layout
    }

    /// Join a relative path onto the base directory; absolute paths pass through
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Output tree of the detection CLI, wiped before every run
    pub fn runs_dir(&self) -> PathBuf {
        self.yolo_dir.join("runs")
    }

    pub fn weights_path(&self, name: &str) -> PathBuf {
        self.yolo_dir.join(name)
    }

    pub fn detect_script(&self) -> PathBuf {
        self.yolo_dir.join("detect.py")
    }

    pub fn train_script(&self) -> PathBuf {
        self.yolo_dir.join("train.py")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.yolo_dir.join("models")
    }

    /// Where an uploaded image with the given file name is stored
    pub fn input_path(&self, filename: &str) -> PathBuf {
        self.data_dir.join(filename)
    }

    /// Create the data directory if it does not exist yet
    pub fn ensure_data_dir(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)
    }
}

impl Default for ProjectLayout {
    fn default() -> Self {
        Self::new(".")
    }
}
