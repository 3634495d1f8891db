//! Announcement queue
//!
//! The core of the narration pipeline: an ordered queue of pending phrases
//! drained by a single worker task through translate then speak. Invariants:
//! at most one item is in flight; items are spoken in enqueue order; an item
//! equal to the most recently accepted text is suppressed unless forced; and
//! nothing else drops items silently — only suppression and explicit
//! `clear()` (mute, camera stop, language change) discard work.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Notify, mpsc};
use tokio::task::JoinHandle;

use crate::profile;
use crate::speech::Speaker;
use crate::translate::{SOURCE_LANGUAGE, Translator};

/// Gap between consecutive announcements, so clips never run together
pub const DEFAULT_SPEECH_GAP: Duration = Duration::from_millis(300);

/// One queued phrase
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    /// Source-language text to speak
    pub text: String,
    /// Bypass duplicate suppression
    pub forced: bool,
}

/// Where the drain currently is for the in-flight item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No item in flight
    Idle,
    /// Translating the head item
    Translating,
    /// Playing the head item
    Speaking,
}

#[derive(Debug)]
struct QueueState {
    pending: VecDeque<Announcement>,
    /// Most recently accepted text; the duplicate-suppression memory
    last_accepted: Option<String>,
    muted: bool,
}

struct Inner {
    state: Mutex<QueueState>,
    /// Bumped by `clear()`; an in-flight drain abandons when it observes a bump
    epoch: AtomicU64,
    phase: Mutex<Phase>,
    notify: Notify,
    speaker: Arc<dyn Speaker>,
    translator: Arc<dyn Translator>,
    language: Mutex<String>,
    gap: Duration,
}

impl Inner {
    fn lock_state(&self) -> std::sync::MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_phase(&self, phase: Phase) {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner) = phase;
    }

    fn phase(&self) -> Phase {
        *self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn language(&self) -> String {
        self.language
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn pop(&self) -> Option<(Announcement, u64)> {
        let item = self.lock_state().pending.pop_front()?;
        Some((item, self.epoch.load(Ordering::SeqCst)))
    }

    fn has_pending(&self) -> bool {
        !self.lock_state().pending.is_empty()
    }

    fn epoch_changed(&self, seen: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) != seen
    }
}

/// Handle to the announcement queue and its worker task
#[derive(Clone)]
pub struct Announcer {
    inner: Arc<Inner>,
    shutdown_tx: mpsc::Sender<()>,
    worker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl Announcer {
    /// Create the queue and spawn its worker
    #[must_use]
    pub fn new(
        speaker: Arc<dyn Speaker>,
        translator: Arc<dyn Translator>,
        language: String,
        gap: Duration,
    ) -> Self {
        let inner = Arc::new(Inner {
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                last_accepted: None,
                muted: false,
            }),
            epoch: AtomicU64::new(0),
            phase: Mutex::new(Phase::Idle),
            notify: Notify::new(),
            speaker,
            translator,
            language: Mutex::new(language),
            gap,
        });

        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let worker = tokio::spawn(run_worker(Arc::clone(&inner), shutdown_rx));

        Self {
            inner,
            shutdown_tx,
            worker: Arc::new(Mutex::new(Some(worker))),
        }
    }

    /// Append a phrase unless it duplicates the most recently accepted one
    pub fn enqueue(&self, text: impl Into<String>) {
        self.push(text.into(), false);
    }

    /// Append a phrase, bypassing duplicate suppression
    pub fn enqueue_forced(&self, text: impl Into<String>) {
        self.push(text.into(), true);
    }

    fn push(&self, text: String, forced: bool) {
        if text.is_empty() {
            return;
        }
        {
            let mut state = self.inner.lock_state();
            if state.muted {
                tracing::debug!(text, "announcement dropped while muted");
                return;
            }
            if !forced && state.last_accepted.as_deref() == Some(text.as_str()) {
                tracing::debug!(text, "duplicate announcement suppressed");
                return;
            }
            state.last_accepted = Some(text.clone());
            state.pending.push_back(Announcement { text, forced });
        }
        self.inner.notify.notify_one();
    }

    /// Drop all pending items and abandon the in-flight one
    ///
    /// Resets the duplicate-suppression memory so work after a clear starts
    /// fresh, and cancels the speaker without waiting for it.
    pub fn clear(&self) {
        {
            let mut state = self.inner.lock_state();
            state.pending.clear();
            state.last_accepted = None;
        }
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
        self.inner.speaker.cancel();
        self.inner.set_phase(Phase::Idle);
    }

    /// Mute or unmute; muting clears the queue and drops later enqueues
    pub fn set_muted(&self, muted: bool) {
        self.inner.lock_state().muted = muted;
        if muted {
            self.clear();
        }
    }

    /// Switch the announcement language
    ///
    /// On an actual change the queue is cleared and a forced confirmation
    /// becomes the sole next item spoken.
    pub fn set_language(&self, code: &str) {
        let changed = {
            let mut language = self
                .inner
                .language
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if *language == code {
                false
            } else {
                tracing::info!(from = %language, to = code, "announcement language changed");
                *language = code.to_string();
                true
            }
        };
        if changed {
            self.clear();
            let name = profile::language_name(code).unwrap_or(code);
            self.enqueue_forced(format!("Language changed to {name}"));
        }
    }

    /// Current announcement language code
    #[must_use]
    pub fn language(&self) -> String {
        self.inner.language()
    }

    /// Where the drain currently is
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.inner.phase()
    }

    /// Number of items waiting behind the in-flight one
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inner.lock_state().pending.len()
    }

    /// Wait until the queue is empty and the drain idle, up to `timeout`
    ///
    /// Returns false if the deadline passed first.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.phase() == Phase::Idle && self.pending() == 0 {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    }

    /// Stop the worker task and wait for it to exit
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(()).await;
        let handle = self
            .worker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "announcement worker did not stop cleanly");
            }
        }
    }
}

/// The single drain loop; everything the queue speaks flows through here
async fn run_worker(inner: Arc<Inner>, mut shutdown_rx: mpsc::Receiver<()>) {
    loop {
        tokio::select! {
            () = inner.notify.notified() => drain(&inner).await,
            _ = shutdown_rx.recv() => break,
        }
    }
    tracing::debug!("announcement worker stopped");
}

async fn drain(inner: &Arc<Inner>) {
    while let Some((item, epoch)) = inner.pop() {
        inner.set_phase(Phase::Translating);
        let language = inner.language();
        let spoken = if language == SOURCE_LANGUAGE {
            item.text.clone()
        } else {
            inner.translator.translate(&item.text, &language).await
        };

        if inner.epoch_changed(epoch) {
            inner.set_phase(Phase::Idle);
            break;
        }

        inner.set_phase(Phase::Speaking);
        if let Err(e) = inner.speaker.speak(&spoken, &language).await {
            // Errors count as completion; the queue moves on
            tracing::warn!(error = %e, text = %item.text, "announcement failed");
        }
        inner.set_phase(Phase::Idle);

        if inner.epoch_changed(epoch) {
            break;
        }
        if inner.has_pending() {
            tokio::time::sleep(inner.gap).await;
        }
    }
}
