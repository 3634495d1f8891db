//! Configuration
//!
//! Env-driven defaults with CLI overrides layered on top by `main`. Every
//! interval the pipeline uses lives here rather than as literals at the call
//! sites.

use std::path::PathBuf;
use std::time::Duration;

use crate::readiness::BackoffPolicy;
use crate::{Error, Result};

/// Default backend base URL
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";

/// Default capture rate
pub const DEFAULT_FPS: u32 = 10;

/// Default per-request timeout
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for the translation warm-up call, which loads the model
pub const DEFAULT_TRANSLATE_WARMUP_TIMEOUT: Duration = Duration::from_secs(120);

/// Drishti configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Backend base URL
    pub backend_url: String,

    /// Data directory (profile cache)
    pub data_dir: PathBuf,

    /// Directory of JPEG frames used instead of a camera
    pub frames_dir: Option<PathBuf>,

    /// Replay the frames directory in a loop
    pub loop_frames: bool,

    /// V4L2 device path (used with the `camera-v4l2` feature)
    pub camera_device: String,

    /// Time between detection ticks
    pub frame_interval: Duration,

    /// Minimum interval between detection-triggered announcements
    pub announce_interval: Duration,

    /// Gap between consecutive spoken announcements
    pub speech_gap: Duration,

    /// Timeout applied to backend requests
    pub request_timeout: Duration,

    /// Timeout for the first translation call
    pub translate_warmup_timeout: Duration,

    /// Readiness polling delays
    pub readiness: BackoffPolicy,
}

impl Config {
    /// Load configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns error if a value fails to parse or no data directory can be
    /// determined
    pub fn load() -> Result<Self> {
        let backend_url = std::env::var("DRISHTI_BACKEND_URL")
            .unwrap_or_else(|_| DEFAULT_BACKEND_URL.to_string());

        let data_dir = match std::env::var("DRISHTI_DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => directories::ProjectDirs::from("dev", "Drishti", "drishti")
                .map(|dirs| dirs.data_dir().to_path_buf())
                .ok_or_else(|| Error::Config("could not determine data directory".to_string()))?,
        };

        let fps = match std::env::var("DRISHTI_FPS") {
            Ok(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|fps| *fps > 0)
                .ok_or_else(|| Error::Config(format!("invalid DRISHTI_FPS: {raw}")))?,
            Err(_) => DEFAULT_FPS,
        };

        let frames_dir = std::env::var("DRISHTI_FRAMES_DIR").ok().map(PathBuf::from);
        let camera_device =
            std::env::var("DRISHTI_CAMERA").unwrap_or_else(|_| "/dev/video0".to_string());

        Ok(Self {
            backend_url,
            data_dir,
            frames_dir,
            loop_frames: true,
            camera_device,
            frame_interval: Duration::from_secs_f64(1.0 / f64::from(fps)),
            announce_interval: crate::detection::DEFAULT_ANNOUNCE_INTERVAL,
            speech_gap: crate::announce::DEFAULT_SPEECH_GAP,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            translate_warmup_timeout: DEFAULT_TRANSLATE_WARMUP_TIMEOUT,
            readiness: BackoffPolicy::default(),
        })
    }
}
