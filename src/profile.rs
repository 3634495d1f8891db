//! User profile types and storage
//!
//! The backend is the profile's home; a local JSON cache keeps the last known
//! copy so the daemon can pick the user's language when the backend is down.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::Result;
use crate::backend::BackendClient;

/// Supported announcement languages: code and display name
pub const LANGUAGES: &[(&str, &str)] = &[("en", "English"), ("te", "Telugu"), ("hi", "Hindi")];

/// Display name for a language code
#[must_use]
pub fn language_name(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, name)| *name)
}

/// Whether a language code is in the supported catalog
#[must_use]
pub fn is_supported_language(code: &str) -> bool {
    language_name(code).is_some()
}

/// Emergency contact details
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyContact {
    /// Contact name
    #[serde(default)]
    pub name: String,
    /// Relationship to the user
    #[serde(default)]
    pub relationship: String,
    /// Contact phone number
    #[serde(default)]
    pub phone: String,
}

/// User profile as the backend stores it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User name
    #[serde(default)]
    pub name: String,
    /// User phone number
    #[serde(default)]
    pub phone: String,
    /// Preferred announcement language code
    #[serde(default = "default_language")]
    pub language: String,
    /// Emergency contact
    #[serde(default, rename = "emergencyContact")]
    pub emergency_contact: EmergencyContact,
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            name: String::new(),
            phone: String::new(),
            language: default_language(),
            emergency_contact: EmergencyContact::default(),
        }
    }
}

/// Backend-first profile storage with a local cache fallback
pub struct ProfileStore {
    backend: Arc<BackendClient>,
    cache_path: PathBuf,
}

impl ProfileStore {
    /// Create a store caching under `data_dir`
    #[must_use]
    pub fn new(backend: Arc<BackendClient>, data_dir: &Path) -> Self {
        Self {
            backend,
            cache_path: data_dir.join("profile.json"),
        }
    }

    /// Load the profile: backend first, then cache, then defaults
    pub async fn load(&self) -> UserProfile {
        match self.backend.fetch_profile().await {
            Ok(profile) => {
                if let Err(e) = self.write_cache(&profile) {
                    tracing::warn!(error = %e, "failed to cache profile");
                }
                profile
            }
            Err(e) => {
                tracing::warn!(error = %e, "profile fetch failed, falling back to cache");
                self.read_cache().unwrap_or_else(|e| {
                    tracing::debug!(error = %e, "no usable profile cache, using defaults");
                    UserProfile::default()
                })
            }
        }
    }

    /// Save the profile to the backend, then refresh the cache
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the save; a failed cache write
    /// only logs
    pub async fn save(&self, profile: &UserProfile) -> Result<()> {
        self.backend.save_profile(profile).await?;
        if let Err(e) = self.write_cache(profile) {
            tracing::warn!(error = %e, "failed to cache profile");
        }
        Ok(())
    }

    fn read_cache(&self) -> Result<UserProfile> {
        let raw = std::fs::read_to_string(&self.cache_path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    fn write_cache(&self, profile: &UserProfile) -> Result<()> {
        if let Some(parent) = self.cache_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.cache_path, serde_json::to_string_pretty(profile)?)?;
        Ok(())
    }
}
