//! Drishti - camera-to-speech narration client for assistive vision backends
//!
//! Drishti feeds camera frames to a detection backend over HTTP and narrates
//! what it sees through translated, serialized speech. All model inference
//! (detection, translation, speech synthesis) runs in the backend; this crate
//! owns frame capture, readiness polling, announcement sequencing, and audio
//! playback.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  JPEG   ┌───────────────────┐  phrases  ┌──────────────┐
//! │ FrameSource  ├────────►│ Detection loop     ├──────────►│ Announcer    │
//! │ (files/V4L2) │         │ + narrator gates   │           │ (FIFO queue) │
//! └──────────────┘         └─────────┬─────────┘           └──────┬───────┘
//!                                    │                            │ drain
//!                          ┌─────────▼─────────┐       ┌──────────▼────────┐
//!                          │ Backend (models)   │◄──────┤ translate → speak │
//!                          └───────────────────┘       │ → cpal playback   │
//!                                                       └───────────────────┘
//! ```

pub mod announce;
pub mod backend;
pub mod camera;
pub mod config;
pub mod currency;
pub mod daemon;
pub mod detection;
pub mod error;
pub mod playback;
pub mod profile;
pub mod readiness;
pub mod speech;
pub mod translate;

pub use announce::{Announcement, Announcer, Phase};
pub use backend::{BackendClient, ModelStatus};
pub use camera::{FileSource, FrameSource, JpegFrame};
pub use config::Config;
pub use daemon::Daemon;
pub use detection::{DetectedObject, DetectionNarrator, DetectionResult, FramePosition};
pub use error::{Error, Result};
pub use profile::{ProfileStore, UserProfile};
pub use readiness::BackoffPolicy;
pub use speech::{NullSpeaker, Speaker, SpeechClient};
pub use translate::{MbartTranslator, Translator};

#[cfg(feature = "camera-v4l2")]
pub use camera::V4l2Source;
