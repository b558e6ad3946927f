//! Error types for interaction engine operations.
//!
//! Recognition itself never fails: a candidate that matches no detector or a
//! transcript that matches no pattern simply produces no event. The variants
//! here cover setup work (attaching sources, compiling patterns, loading
//! configuration) where the caller needs to know something went wrong.

use thiserror::Error;

/// Result type for interaction operations.
pub type InteractionResult<T> = Result<T, InteractionError>;

/// Errors that can occur while configuring or attaching the engine.
#[derive(Debug, Error)]
pub enum InteractionError {
    /// The speech source could not be started (unavailable or permission denied).
    #[error("Speech input unavailable: {0}")]
    SpeechUnavailable(String),

    /// A pointer source could not be attached.
    #[error("Failed to attach input source: {0}")]
    SourceAttach(String),

    /// Canvas/container references have not been supplied.
    #[error("Canvas and container references are not set")]
    MissingReferences,

    /// A voice pattern failed to compile.
    #[error("Invalid voice pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A multi-modal builder chain was finished without all of its parts.
    #[error("Binding '{name}' is incomplete: missing {missing}")]
    IncompleteBinding {
        /// Binding name.
        name: String,
        /// The builder step that was never called.
        missing: &'static str,
    },

    /// Zoom limits must be finite with `0 < min <= max`.
    #[error("Invalid zoom limits: min {min}, max {max}")]
    InvalidZoomLimits {
        /// Requested minimum.
        min: f32,
        /// Requested maximum.
        max: f32,
    },

    /// A configuration value is out of range.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] serde_json::Error),

    /// Configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The manager has been destroyed and no longer accepts registrations.
    #[error("Interaction manager has been destroyed")]
    Destroyed,
}
