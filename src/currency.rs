//! Currency note recognition
//!
//! One-shot flow: upload a still image, get the denomination back, phrase it
//! for speech.

use std::path::Path;

use crate::Result;
use crate::backend::BackendClient;

/// Spoken phrase for a recognized denomination
#[must_use]
pub fn note_phrase(value: &str) -> String {
    format!("Detected a {value} rupee note")
}

/// Recognize the note in `image_path` and return the announcement phrase
///
/// # Errors
///
/// Returns error if the image cannot be read or the backend call fails
pub async fn read_note(backend: &BackendClient, image_path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(image_path).await?;
    let filename = image_path
        .file_name()
        .map_or_else(|| "note.jpg".to_string(), |n| n.to_string_lossy().into_owned());

    let value = backend.detect_currency(bytes, &filename).await?;
    tracing::info!(value, "currency note recognized");
    Ok(note_phrase(&value))
}
