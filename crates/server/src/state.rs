use detect_common::AppConfig;
use tokio::sync::Mutex;
use yolo::Runner;
use yolo::driver::yolov5::Yolov5Driver;

use crate::error::StartupError;

pub struct AppState {
    pub config: AppConfig,
    pub runner: Runner<Yolov5Driver>,
    /// Held for the whole write-detect-read cycle: every request shares one
    /// input file name and one run directory.
    ///
    /// `/live` holds it until the webcam process exits, so `/predict` and
    /// `/train` wait for the end of a live session.
    pub detect_lock: Mutex<()>,
}

impl AppState {
    pub fn new(config: AppConfig) -> Result<Self, StartupError> {
        config.validate()?;
        let runner = Runner::from_config(&config)?;
        runner.layout().ensure_data_dir()?;

        Ok(Self {
            config,
            runner,
            detect_lock: Mutex::new(()),
        })
    }
}
