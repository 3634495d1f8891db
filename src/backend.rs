//! HTTP client for the detection backend
//!
//! The backend owns all model inference: object/person detection, currency
//! recognition, mbart translation, and gTTS speech synthesis. This client is
//! the single place its wire contract lives.

use std::time::Duration;

use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use crate::camera::JpegFrame;
use crate::detection::DetectionResult;
use crate::profile::UserProfile;
use crate::{Error, Result};

/// Model warm-up status reported by the backend
#[derive(Debug, Clone, Deserialize)]
pub struct ModelStatus {
    /// Whether the detection models are loaded and ready
    #[serde(alias = "ready")]
    pub is_ready: bool,
    /// Optional human-readable progress message
    #[serde(default)]
    pub message: Option<String>,
}

/// Client for the backend HTTP API
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a client for the backend at `base_url`
    ///
    /// Every request carries `timeout` unless a call overrides it; a hung
    /// backend request must not stall the announcement pipeline.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be constructed
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Ask whether the detection models are warmed up
    ///
    /// # Errors
    ///
    /// Returns error on network failure or a non-success response
    pub async fn model_status(&self) -> Result<ModelStatus> {
        let response = self.client.get(self.url("/api/model_status")).send().await?;
        let response = check_status(response, "model status", Error::Backend).await?;
        Ok(response.json().await?)
    }

    /// Submit a frame for detection
    ///
    /// # Errors
    ///
    /// Returns error on network failure or a non-success response
    pub async fn detect_frame(&self, frame: &JpegFrame) -> Result<DetectionResult> {
        #[derive(serde::Serialize)]
        struct DetectRequest {
            frame: String,
        }

        let request = DetectRequest {
            frame: frame.to_data_url(),
        };

        let response = self
            .client
            .post(self.url("/api/detect_frame"))
            .json(&request)
            .send()
            .await?;
        let response = check_status(response, "frame detection", Error::Detection).await?;
        Ok(response.json().await?)
    }

    /// Synthesize speech; returns MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error on network failure or a non-success response
    pub async fn speak(&self, text: &str, language: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct SpeakRequest<'a> {
            text: &'a str,
            language: &'a str,
        }

        let request = SpeakRequest { text, language };

        let response = self
            .client
            .post(self.url("/api/speak"))
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Tts(format!("synthesis failed with {status}: {}", snippet(&body))));
        }

        let audio = response.bytes().await?;
        Ok(audio.to_vec())
    }

    /// Translate text between mbart locale tags (e.g. `en_XX` to `te_IN`)
    ///
    /// The per-call `timeout` overrides the client default; the first call
    /// after backend start loads the model and needs far longer.
    ///
    /// # Errors
    ///
    /// Returns error on network failure or a non-success response
    pub async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
        timeout: Duration,
    ) -> Result<String> {
        #[derive(serde::Serialize)]
        struct TranslateRequest<'a> {
            text: &'a str,
            source_lang: &'a str,
            target_lang: &'a str,
        }

        #[derive(Deserialize)]
        struct TranslateResponse {
            #[serde(alias = "translation_text")]
            translated_text: String,
        }

        let request = TranslateRequest {
            text,
            source_lang,
            target_lang,
        };

        let response = self
            .client
            .post(self.url("/api/translate"))
            .timeout(timeout)
            .json(&request)
            .send()
            .await?;
        let response = check_status(response, "translation", Error::Translate).await?;
        let body: TranslateResponse = response.json().await?;
        Ok(body.translated_text)
    }

    /// Fetch the stored user profile
    ///
    /// # Errors
    ///
    /// Returns error on network failure or a non-success response
    pub async fn fetch_profile(&self) -> Result<UserProfile> {
        let response = self.client.get(self.url("/api/profile")).send().await?;
        let response = check_status(response, "profile fetch", Error::Profile).await?;
        Ok(response.json().await?)
    }

    /// Store the user profile
    ///
    /// # Errors
    ///
    /// Returns error on network failure or a non-success response
    pub async fn save_profile(&self, profile: &UserProfile) -> Result<()> {
        let response = self
            .client
            .post(self.url("/api/profile"))
            .json(profile)
            .send()
            .await?;
        check_status(response, "profile save", Error::Profile).await?;
        Ok(())
    }

    /// Recognize a currency note from a still image; returns the denomination
    ///
    /// # Errors
    ///
    /// Returns error on network failure or a non-success response
    pub async fn detect_currency(&self, image: Vec<u8>, filename: &str) -> Result<String> {
        #[derive(Deserialize)]
        struct CurrencyResponse {
            #[serde(alias = "value")]
            currency_value: String,
        }

        let part = Part::bytes(image)
            .file_name(filename.to_string())
            .mime_str("image/jpeg")
            .map_err(|e| Error::Currency(format!("invalid image part: {e}")))?;
        let form = Form::new().part("image", part);

        let response = self
            .client
            .post(self.url("/api/detect_currency"))
            .multipart(form)
            .send()
            .await?;
        let response = check_status(response, "currency detection", Error::Currency).await?;
        let body: CurrencyResponse = response.json().await?;
        Ok(body.currency_value)
    }
}

/// Map a non-success response to the caller's error variant, carrying
/// status and a body snippet
async fn check_status(
    response: reqwest::Response,
    what: &str,
    wrap: fn(String) -> Error,
) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(wrap(format!(
        "{what} failed with {status}: {}",
        snippet(&body)
    )))
}

/// First part of a response body, for error messages
fn snippet(body: &str) -> &str {
    let end = body
        .char_indices()
        .take(200)
        .last()
        .map_or(0, |(i, c)| i + c.len_utf8());
    &body[..end]
}
