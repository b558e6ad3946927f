//! Engine configuration.
//!
//! Every section deserializes with `#[serde(default)]`, so a config file only
//! needs to name the values it overrides:
//!
//! ```json
//! { "gesture": { "long_press_ms": 650 }, "fusion": { "window_ms": 1500 } }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{InteractionError, InteractionResult};
use crate::event::GestureType;

/// Top-level configuration for an [`InteractionManager`](crate::InteractionManager).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteractionConfig {
    /// Gesture recognition thresholds.
    pub gesture: GestureConfig,
    /// Voice command filtering.
    pub voice: VoiceConfig,
    /// Multi-modal fusion settings.
    pub fusion: FusionConfig,
    /// Zoom limits and steps.
    pub zoom: ZoomConfig,
}

impl InteractionConfig {
    /// Parse a configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed, has wrongly typed fields,
    /// or fails [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> InteractionResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns [`InteractionError::InvalidConfig`] for zoom limits that are
    /// not finite with `0 < min <= max`, a non-positive fit padding, or a
    /// negative zoom step.
    pub fn validate(&self) -> InteractionResult<()> {
        let zoom = &self.zoom;
        let limits_ok =
            zoom.min.is_finite() && zoom.max.is_finite() && zoom.min > 0.0 && zoom.min <= zoom.max;
        if !limits_ok {
            return Err(InteractionError::InvalidConfig(format!(
                "zoom limits must satisfy 0 < min <= max (min {}, max {})",
                zoom.min, zoom.max
            )));
        }
        if !(zoom.fit_padding.is_finite() && zoom.fit_padding > 0.0) {
            return Err(InteractionError::InvalidConfig(format!(
                "zoom.fit_padding must be positive, got {}",
                zoom.fit_padding
            )));
        }
        if !(zoom.step.is_finite() && zoom.step >= 0.0) {
            return Err(InteractionError::InvalidConfig(format!(
                "zoom.step must be non-negative, got {}",
                zoom.step
            )));
        }
        Ok(())
    }

    /// Load a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> InteractionResult<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }
}

/// Number of direction buckets used to classify swipes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeBuckets {
    /// Up, down, left, right.
    #[default]
    Four,
    /// Cardinal directions plus diagonals.
    Eight,
}

/// Gesture recognition thresholds.
///
/// Distances are in canvas units, durations in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Maximum displacement for a tap or long press.
    pub tap_max_distance: f32,
    /// Tap must be released before this duration.
    pub tap_max_ms: u64,
    /// Long press fires at or after this duration.
    pub long_press_ms: u64,
    /// Minimum displacement for a swipe.
    pub swipe_min_distance: f32,
    /// Direction classification for swipes.
    pub swipe_buckets: SwipeBuckets,
    /// Minimum `|scale - 1|` for a pinch.
    pub pinch_scale_threshold: f32,
    /// Minimum absolute rotation (radians) for a rotate.
    pub rotate_threshold: f32,
    /// A second pointer joins an existing candidate if it lands within this
    /// time of the candidate start.
    pub multi_pointer_join_ms: u64,
    /// A candidate with no new samples for this long is force-evaluated.
    pub idle_timeout_ms: u64,
    /// Detector priority, highest first. The first matching detector wins.
    pub priority: Vec<GestureType>,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            tap_max_distance: 10.0,
            tap_max_ms: 300,
            long_press_ms: 500,
            swipe_min_distance: 30.0,
            swipe_buckets: SwipeBuckets::Four,
            pinch_scale_threshold: 0.1,
            rotate_threshold: 0.26,
            multi_pointer_join_ms: 250,
            idle_timeout_ms: 1000,
            priority: vec![
                GestureType::LongPress,
                GestureType::Pinch,
                GestureType::Rotate,
                GestureType::Swipe,
                GestureType::Tap,
            ],
        }
    }
}

/// Voice command filtering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceConfig {
    /// Transcripts below this confidence are ignored.
    pub min_confidence: f32,
    /// Ignore interim (non-final) transcript chunks.
    pub final_only: bool,
}

impl Default for VoiceConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.0,
            final_only: true,
        }
    }
}

/// Multi-modal fusion settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    /// Default fusion window in milliseconds, used by bindings that do not
    /// override it.
    pub window_ms: u64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self { window_ms: 500 }
    }
}

/// Zoom limits and steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZoomConfig {
    /// Minimum zoom level.
    pub min: f32,
    /// Maximum zoom level.
    pub max: f32,
    /// Increment used by `zoom_in` / `zoom_out`.
    pub step: f32,
    /// Fraction of the container filled by `fit_to_screen`.
    pub fit_padding: f32,
}

impl Default for ZoomConfig {
    fn default() -> Self {
        Self {
            min: 0.1,
            max: 5.0,
            step: 0.1,
            fit_padding: 0.9,
        }
    }
}
