//! Shared test utilities
//!
//! A scriptable in-process HTTP backend plus fake speaker/translator
//! implementations, so the pipeline can be exercised without models,
//! audio hardware, or a network.

#![allow(dead_code, clippy::unused_async)]

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU16, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use drishti::detection::DetectionResult;
use drishti::playback::AudioSink;
use drishti::profile::UserProfile;
use drishti::speech::Speaker;
use drishti::translate::Translator;

/// Scriptable state behind the fake backend
pub struct BackendState {
    /// Number of not-ready `/api/model_status` responses before ready
    pub ready_after: AtomicUsize,
    /// Total `/api/model_status` calls observed
    pub status_calls: AtomicUsize,
    /// Scripted detection results, popped in order; empty falls back to default
    pub detections: Mutex<VecDeque<DetectionResult>>,
    /// Total `/api/detect_frame` calls observed
    pub detect_calls: AtomicUsize,
    /// HTTP status `/api/detect_frame` answers with
    pub detect_status: AtomicU16,
    /// HTTP status `/api/profile` answers with
    pub profile_status: AtomicU16,
    /// HTTP status `/api/speak` answers with
    pub speak_status: AtomicU16,
    /// Recorded (text, language) pairs from successful `/api/speak` calls
    pub spoken: Mutex<Vec<(String, String)>>,
    /// HTTP status `/api/translate` answers with
    pub translate_status: AtomicU16,
    /// Total `/api/translate` calls observed
    pub translate_calls: AtomicUsize,
    /// Stored profile, if any was saved
    pub profile: Mutex<Option<UserProfile>>,
}

impl Default for BackendState {
    fn default() -> Self {
        Self {
            ready_after: AtomicUsize::new(0),
            status_calls: AtomicUsize::new(0),
            detections: Mutex::new(VecDeque::new()),
            detect_calls: AtomicUsize::new(0),
            detect_status: AtomicU16::new(200),
            profile_status: AtomicU16::new(200),
            speak_status: AtomicU16::new(200),
            spoken: Mutex::new(Vec::new()),
            translate_status: AtomicU16::new(200),
            translate_calls: AtomicUsize::new(0),
            profile: Mutex::new(None),
        }
    }
}

impl BackendState {
    /// Queue a detection result for the next `/api/detect_frame` call
    pub fn push_detection(&self, result: DetectionResult) {
        self.detections.lock().unwrap().push_back(result);
    }

    /// Texts spoken so far, in order
    pub fn spoken_texts(&self) -> Vec<String> {
        self.spoken
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }
}

/// Start the fake backend on an ephemeral port; returns its base URL
pub async fn spawn_backend(state: Arc<BackendState>) -> String {
    let app = Router::new()
        .route("/api/model_status", get(model_status))
        .route("/api/detect_frame", post(detect_frame))
        .route("/api/speak", post(speak))
        .route("/api/translate", post(translate))
        .route("/api/profile", get(get_profile).post(set_profile))
        .route("/api/detect_currency", post(detect_currency))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind test backend");
    let addr: SocketAddr = listener.local_addr().expect("no local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("test backend died");
    });

    format!("http://{addr}")
}

async fn model_status(State(state): State<Arc<BackendState>>) -> Json<serde_json::Value> {
    let calls = state.status_calls.fetch_add(1, Ordering::SeqCst) + 1;
    if calls > state.ready_after.load(Ordering::SeqCst) {
        Json(serde_json::json!({ "is_ready": true }))
    } else {
        Json(serde_json::json!({ "is_ready": false, "message": "Loading models..." }))
    }
}

async fn detect_frame(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<DetectionResult>, StatusCode> {
    state.detect_calls.fetch_add(1, Ordering::SeqCst);
    let status = StatusCode::from_u16(state.detect_status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if !status.is_success() {
        return Err(status);
    }
    let frame = body["frame"].as_str().unwrap_or_default();
    if !frame.starts_with("data:image/jpeg;base64,") {
        return Err(StatusCode::BAD_REQUEST);
    }
    let result = state
        .detections
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_default();
    Ok(Json(result))
}

async fn speak(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Vec<u8>, (StatusCode, String)> {
    let status = StatusCode::from_u16(state.speak_status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if !status.is_success() {
        return Err((status, "synthesis unavailable".to_string()));
    }
    let text = body["text"].as_str().unwrap_or_default().to_string();
    let language = body["language"].as_str().unwrap_or_default().to_string();
    state.spoken.lock().unwrap().push((text, language));
    Ok(b"ID3\x04fake-mp3-bytes".to_vec())
}

async fn translate(
    State(state): State<Arc<BackendState>>,
    Json(body): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    state.translate_calls.fetch_add(1, Ordering::SeqCst);
    let status = StatusCode::from_u16(state.translate_status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if !status.is_success() {
        return Err((status, "model load failed".to_string()));
    }
    let text = body["text"].as_str().unwrap_or_default();
    let target = body["target_lang"].as_str().unwrap_or_default();
    Ok(Json(serde_json::json!({
        "translated_text": format!("[{target}] {text}")
    })))
}

async fn get_profile(
    State(state): State<Arc<BackendState>>,
) -> Result<Json<UserProfile>, StatusCode> {
    let status = StatusCode::from_u16(state.profile_status.load(Ordering::SeqCst))
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if !status.is_success() {
        return Err(status);
    }
    Ok(Json(state.profile.lock().unwrap().clone().unwrap_or_default()))
}

async fn set_profile(
    State(state): State<Arc<BackendState>>,
    Json(profile): Json<UserProfile>,
) -> Json<serde_json::Value> {
    *state.profile.lock().unwrap() = Some(profile);
    Json(serde_json::json!({ "status": "ok" }))
}

async fn detect_currency(State(_state): State<Arc<BackendState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "currency_value": "10" }))
}

/// Speaker that records texts instead of playing audio
#[derive(Default)]
pub struct FakeSpeaker {
    /// Spoken texts, recorded as playback starts
    pub spoken: Mutex<Vec<String>>,
    /// How long each "playback" takes
    pub delay: Duration,
    /// When set, the next speak call fails instead of recording
    pub fail_next: AtomicBool,
    /// Number of cancel calls observed
    pub cancelled: AtomicUsize,
    speaking: AtomicBool,
}

impl FakeSpeaker {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    pub fn spoken_texts(&self) -> Vec<String> {
        self.spoken.lock().unwrap().clone()
    }
}

#[async_trait]
impl Speaker for FakeSpeaker {
    async fn speak(&self, text: &str, _language: &str) -> drishti::Result<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(drishti::Error::Tts("scripted failure".to_string()));
        }
        self.speaking.store(true, Ordering::SeqCst);
        self.spoken.lock().unwrap().push(text.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.speaking.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn cancel(&self) {
        self.cancelled.fetch_add(1, Ordering::SeqCst);
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }
}

/// Translator that tags text with the target language instead of translating
#[derive(Debug, Default)]
pub struct FakeTranslator;

#[async_trait]
impl Translator for FakeTranslator {
    async fn translate(&self, text: &str, target: &str) -> String {
        format!("[{target}] {text}")
    }
}

/// Audio sink that records clip sizes instead of opening a device
#[derive(Default)]
pub struct RecordingSink {
    /// Byte lengths of the clips played
    pub clips: Mutex<Vec<usize>>,
}

impl AudioSink for RecordingSink {
    fn play_mp3(&self, mp3_data: &[u8], _cancel: &AtomicBool) -> drishti::Result<()> {
        self.clips.lock().unwrap().push(mp3_data.len());
        Ok(())
    }
}

/// Poll until `check` passes or `timeout` elapses
pub async fn wait_for(timeout: Duration, mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
