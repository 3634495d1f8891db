//! Daemon - the narration service
//!
//! Orchestrates the pipeline: wait for backend readiness, then on a fixed
//! cadence capture a frame, submit it for detection, and feed the narrator's
//! phrases into the announcement queue.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;

use crate::announce::Announcer;
use crate::backend::BackendClient;
use crate::camera::FrameSource;
use crate::detection::DetectionNarrator;
use crate::readiness;
use crate::{Config, Result};

/// How long the stop sequence waits for its final announcement
const STOP_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// The Drishti daemon
pub struct Daemon {
    config: Config,
    backend: Arc<BackendClient>,
    announcer: Announcer,
}

impl Daemon {
    /// Create a daemon over an already-wired backend and announcer
    #[must_use]
    pub const fn new(config: Config, backend: Arc<BackendClient>, announcer: Announcer) -> Self {
        Self {
            config,
            backend,
            announcer,
        }
    }

    /// Run until shutdown is requested or the frame source is exhausted
    ///
    /// # Errors
    ///
    /// Returns error only on fatal setup problems; per-tick failures log and
    /// the loop continues
    pub async fn run(
        self,
        mut frames: Box<dyn FrameSource>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) -> Result<()> {
        tracing::info!(backend = %self.config.backend_url, "waiting for detection models");
        if !readiness::wait_until_ready(&self.backend, &self.config.readiness, &mut shutdown_rx)
            .await
        {
            tracing::info!("shutdown before models became ready");
            self.announcer.shutdown().await;
            return Ok(());
        }

        self.announcer
            .enqueue_forced("Camera started. Looking for objects.");

        let mut narrator = DetectionNarrator::new(self.config.announce_interval);
        let mut ticker = tokio::time::interval(self.config.frame_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    let frame = match frames.next_frame().await {
                        Ok(Some(frame)) => frame,
                        Ok(None) => {
                            tracing::info!("frame source exhausted");
                            break;
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "frame capture failed");
                            continue;
                        }
                    };

                    match self.backend.detect_frame(&frame).await {
                        Ok(result) => {
                            tracing::trace!(
                                objects = result.objects.len(),
                                person_count = result.person_count,
                                "frame detected"
                            );
                            for object in &result.objects {
                                tracing::debug!(
                                    label = %object.label,
                                    confidence = object.confidence,
                                    position = ?object.position,
                                    bounding_box = ?object.bounding_box,
                                    "detection"
                                );
                            }
                            if let Some(phrase) = narrator.observe(&result) {
                                self.announcer.enqueue(phrase);
                            }
                        }
                        Err(e) => tracing::warn!(error = %e, "frame detection failed"),
                    }
                }
            }
        }

        // Stop sequence: discard pending narration, announce the stop, and
        // let that single item finish before the worker goes away
        narrator.reset();
        self.announcer.clear();
        self.announcer.enqueue_forced("Camera stopped");
        if !self.announcer.wait_idle(STOP_DRAIN_TIMEOUT).await {
            tracing::warn!("stop announcement did not finish in time");
        }
        self.announcer.shutdown().await;

        tracing::info!("daemon stopped");
        Ok(())
    }
}
