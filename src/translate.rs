//! Announcement translation via the backend's mbart model
//!
//! The backend loads `facebook/mbart-large-50-many-to-many-mmt` on the first
//! `/api/translate` call, so the first translation pays the model-load cost.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::backend::BackendClient;

/// Language announcements are produced in before translation
pub const SOURCE_LANGUAGE: &str = "en";

/// mbart locale tag for the source language
pub const SOURCE_LOCALE: &str = "en_XX";

/// Map an internal language code to the mbart locale tag.
///
/// Returns `None` for unmapped codes; callers treat that as "no translation
/// available" and pass the source text through unchanged.
#[must_use]
pub fn locale_tag(code: &str) -> Option<&'static str> {
    match code {
        "en" => Some("en_XX"),
        "te" => Some("te_IN"),
        "hi" => Some("hi_IN"),
        _ => None,
    }
}

/// Translates announcement text into the user's language.
///
/// Infallible by contract: on any internal failure the original text comes
/// back unchanged, so the announcement pipeline never stalls on translation.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` into `target` (internal language code, e.g. "te")
    async fn translate(&self, text: &str, target: &str) -> String;
}

/// Engine readiness, tracked across calls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EngineState {
    /// No call has been made yet; the next one warms the model up
    Cold,
    /// The model answered at least once
    Ready,
    /// The warm-up call failed; every later call short-circuits to passthrough
    Failed,
}

/// Backend-backed `Translator`
///
/// The warm-up call gets a longer timeout than regular calls because the
/// backend loads the model lazily. A failed warm-up is sticky: the engine is
/// marked failed and no further network calls are attempted. Failures after a
/// successful warm-up log and pass through without becoming sticky.
pub struct MbartTranslator {
    backend: Arc<BackendClient>,
    state: Mutex<EngineState>,
    warmup_timeout: Duration,
    call_timeout: Duration,
}

impl MbartTranslator {
    /// Create a translator over the given backend
    #[must_use]
    pub fn new(backend: Arc<BackendClient>, warmup_timeout: Duration, call_timeout: Duration) -> Self {
        Self {
            backend,
            state: Mutex::new(EngineState::Cold),
            warmup_timeout,
            call_timeout,
        }
    }
}

#[async_trait]
impl Translator for MbartTranslator {
    async fn translate(&self, text: &str, target: &str) -> String {
        let Some(target_tag) = locale_tag(target) else {
            tracing::debug!(target, "no locale tag for language, passing text through");
            return text.to_string();
        };

        if target_tag == SOURCE_LOCALE {
            return text.to_string();
        }

        let mut state = self.state.lock().await;
        match *state {
            EngineState::Failed => text.to_string(),
            EngineState::Cold => {
                tracing::info!("warming up translation model, first call may be slow");
                match self
                    .backend
                    .translate(text, SOURCE_LOCALE, target_tag, self.warmup_timeout)
                    .await
                {
                    Ok(translated) => {
                        *state = EngineState::Ready;
                        translated
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "translation model failed to load");
                        *state = EngineState::Failed;
                        text.to_string()
                    }
                }
            }
            EngineState::Ready => {
                drop(state);
                match self
                    .backend
                    .translate(text, SOURCE_LOCALE, target_tag, self.call_timeout)
                    .await
                {
                    Ok(translated) => translated,
                    Err(e) => {
                        tracing::warn!(error = %e, "translation failed, using original text");
                        text.to_string()
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_supported_languages() {
        assert_eq!(locale_tag("te"), Some("te_IN"));
        assert_eq!(locale_tag("hi"), Some("hi_IN"));
        assert_eq!(locale_tag("en"), Some("en_XX"));
    }

    #[test]
    fn unmapped_language_has_no_tag() {
        assert_eq!(locale_tag("fr"), None);
        assert_eq!(locale_tag(""), None);
        assert_eq!(locale_tag("te_IN"), None);
    }

    #[test]
    fn source_locale_matches_source_language() {
        assert_eq!(locale_tag(SOURCE_LANGUAGE), Some(SOURCE_LOCALE));
    }
}
