//! Detection wire types and announcement phrasing
//!
//! The backend runs the models; this module turns its per-frame results into
//! spoken phrases and decides when a frame is worth announcing at all.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Minimum interval between detection-triggered announcements
pub const DEFAULT_ANNOUNCE_INTERVAL: Duration = Duration::from_secs(3);

/// Horizontal third of the frame an object sits in
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FramePosition {
    /// Left third
    Left,
    /// Middle third
    Center,
    /// Right third
    Right,
    /// Anything the backend sends that we don't recognize
    #[default]
    #[serde(other)]
    Unknown,
}

impl FramePosition {
    /// Spoken direction for this position
    #[must_use]
    pub const fn spoken(self) -> &'static str {
        match self {
            Self::Left => "to your left",
            Self::Right => "to your right",
            Self::Center | Self::Unknown => "ahead of you",
        }
    }
}

/// One object the backend found in a frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Class label, e.g. "person" or "chair"
    pub label: String,
    /// Model confidence in 0..1
    pub confidence: f32,
    /// Horizontal position in the frame
    #[serde(default)]
    pub position: FramePosition,
    /// Estimated distance as a display string, e.g. "2.5m"
    #[serde(default)]
    pub distance: Option<String>,
    /// Bounding box as x1, y1, x2, y2
    #[serde(rename = "box", default)]
    pub bounding_box: [f32; 4],
}

/// Backend response for one detected frame
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Objects found in the frame
    #[serde(default)]
    pub objects: Vec<DetectedObject>,
    /// Number of people in the frame
    #[serde(default)]
    pub person_count: u32,
    /// Source frame width in pixels
    #[serde(default)]
    pub frame_width: u32,
    /// Source frame height in pixels
    #[serde(default)]
    pub frame_height: u32,
}

/// Phrase for the number of people in frame
#[must_use]
pub fn person_count_phrase(count: u32) -> String {
    match count {
        0 => "No people detected".to_string(),
        1 => "1 person detected".to_string(),
        n => format!("{n} people detected"),
    }
}

/// Phrase for a single detected object
#[must_use]
pub fn object_phrase(object: &DetectedObject) -> String {
    let direction = object.position.spoken();
    match &object.distance {
        Some(distance) => format!("{} detected {distance} away {direction}", object.label),
        None => format!("{} detected {direction}", object.label),
    }
}

/// Turns detection results into rate-limited announcement phrases.
///
/// Two gates apply to every frame, layered independently: a minimum interval
/// since the last accepted announcement (regardless of text), and suppression
/// of a phrase identical to the last accepted one. The person-count part of
/// the phrase is included when the count changed or is non-zero.
#[derive(Debug)]
pub struct DetectionNarrator {
    min_interval: Duration,
    last_accepted_at: Option<Instant>,
    last_phrase: Option<String>,
    prev_person_count: u32,
}

impl DetectionNarrator {
    /// Create a narrator with the given minimum announcement interval
    #[must_use]
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_accepted_at: None,
            last_phrase: None,
            prev_person_count: 0,
        }
    }

    /// Feed one frame's result; returns the phrase to announce, if any
    pub fn observe(&mut self, result: &DetectionResult) -> Option<String> {
        let mut parts = Vec::with_capacity(result.objects.len() + 1);
        if result.person_count != self.prev_person_count || result.person_count > 0 {
            parts.push(person_count_phrase(result.person_count));
        }
        for object in &result.objects {
            parts.push(object_phrase(object));
        }
        if parts.is_empty() {
            return None;
        }
        let phrase = parts.join(". ");

        let now = Instant::now();
        if let Some(last) = self.last_accepted_at {
            if now.duration_since(last) < self.min_interval {
                return None;
            }
        }
        if self.last_phrase.as_deref() == Some(phrase.as_str()) {
            return None;
        }

        self.prev_person_count = result.person_count;
        self.last_phrase = Some(phrase.clone());
        self.last_accepted_at = Some(now);
        Some(phrase)
    }

    /// Forget all gating state; used when the camera stops
    pub fn reset(&mut self) {
        self.last_accepted_at = None;
        self.last_phrase = None;
        self.prev_person_count = 0;
    }
}
