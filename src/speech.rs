//! Speech synthesis and playback
//!
//! At most one speech session is active at any instant. Starting a new one
//! cancels the prior session, and the speaking flag resets on every exit
//! path, success or not.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;

use crate::backend::BackendClient;
use crate::playback::AudioSink;
use crate::{Error, Result};

/// Speaks announcement text aloud
#[async_trait]
pub trait Speaker: Send + Sync {
    /// Speak `text`, resolving when playback finishes or fails
    ///
    /// # Errors
    ///
    /// Returns error if synthesis or playback fails; callers treat an error
    /// like a completed announcement
    async fn speak(&self, text: &str, language: &str) -> Result<()>;

    /// Stop any in-flight playback immediately
    fn cancel(&self);

    /// Whether a session is currently playing
    fn is_speaking(&self) -> bool;
}

/// Production speaker: backend synthesis piped into an audio sink
pub struct SpeechClient {
    backend: Arc<BackendClient>,
    sink: Arc<dyn AudioSink>,
    speaking: AtomicBool,
    /// Cancel flag of the current session; swapped out when a new one starts
    session: Mutex<Arc<AtomicBool>>,
}

impl SpeechClient {
    /// Create a speaker over the given backend and sink
    #[must_use]
    pub fn new(backend: Arc<BackendClient>, sink: Arc<dyn AudioSink>) -> Self {
        Self {
            backend,
            sink,
            speaking: AtomicBool::new(false),
            session: Mutex::new(Arc::new(AtomicBool::new(true))),
        }
    }

    /// Cancel the prior session and hand out a fresh cancel flag
    fn begin_session(&self) -> Arc<AtomicBool> {
        let mut current = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        current.store(true, Ordering::SeqCst);
        let fresh = Arc::new(AtomicBool::new(false));
        *current = Arc::clone(&fresh);
        fresh
    }

    async fn speak_inner(&self, text: &str, language: &str, cancel: Arc<AtomicBool>) -> Result<()> {
        let audio = self.backend.speak(text, language).await?;
        if cancel.load(Ordering::SeqCst) {
            tracing::debug!("speech cancelled before playback");
            return Ok(());
        }

        // cpal playback blocks; keep it off the async runtime
        let sink = Arc::clone(&self.sink);
        tokio::task::spawn_blocking(move || sink.play_mp3(&audio, &cancel))
            .await
            .map_err(|e| Error::Audio(format!("playback task failed: {e}")))?
    }
}

#[async_trait]
impl Speaker for SpeechClient {
    async fn speak(&self, text: &str, language: &str) -> Result<()> {
        let cancel = self.begin_session();
        self.speaking.store(true, Ordering::SeqCst);
        tracing::debug!(text, language, "speaking");

        let result = self.speak_inner(text, language, cancel).await;

        // Flag resets on every exit path
        self.speaking.store(false, Ordering::SeqCst);
        if let Err(ref e) = result {
            tracing::warn!(error = %e, "speech failed");
        }
        result
    }

    fn cancel(&self) {
        let current = self.session.lock().unwrap_or_else(PoisonError::into_inner);
        current.store(true, Ordering::SeqCst);
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }
}

/// Logs announcements instead of playing them; for headless runs and tests
#[derive(Debug, Default)]
pub struct NullSpeaker;

#[async_trait]
impl Speaker for NullSpeaker {
    async fn speak(&self, text: &str, language: &str) -> Result<()> {
        tracing::info!(text, language, "announcement (audio disabled)");
        Ok(())
    }

    fn cancel(&self) {}

    fn is_speaking(&self) -> bool {
        false
    }
}
