//! # Canvas Interact
//!
//! Multi-modal interaction engine for visual editors. Pointer gestures and
//! spoken commands, alone or fused ("say X while doing Y"), are recognized
//! and dispatched as named intents.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │             InteractionManager              │
//! ├─────────────────────────────────────────────┤
//! │  Coordinate Transform │  Voice Matcher      │
//! │  - Zoom / pan         │  - Exact phrases    │
//! │  - Screen <-> canvas  │  - Keyword sets     │
//! │                       │  - Regex captures   │
//! ├─────────────────────────────────────────────┤
//! │  Gesture Detector     │  Multi-Modal        │
//! │  - Candidates         │  Combinator         │
//! │  - Pattern detectors  │  - Fusion window    │
//! │  - Long-press timers  │  - Half-matches     │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! The engine is synchronous and single-threaded. Hosts feed it
//! [`InputEvent`]s and advance time with [`InteractionManager::tick`].

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod event;
pub mod fusion;
pub mod gesture;
pub mod manager;
pub mod pattern;
pub mod source;
pub mod timer;
pub mod transform;
pub mod voice;

pub use config::{
    FusionConfig, GestureConfig, InteractionConfig, SwipeBuckets, VoiceConfig, ZoomConfig,
};
pub use error::{InteractionError, InteractionResult};
pub use event::{
    FusedEvent, GestureDetail, GestureEvent, GestureMatch, GestureType, InputEvent, Point,
    PointerInput, PointerPhase, PointerSample, SwipeDirection, Transcript, UnknownGesture,
    VoiceEvent,
};
pub use fusion::{BindingBuilder, BindingOptions, MultiModalCombinator};
pub use gesture::{CandidateId, CandidateSnapshot, CandidateState, GestureDetector};
pub use manager::{Intent, InteractionManager, SubscriptionId, TraceEntry, DEBUG_TRACE_CAPACITY};
pub use pattern::{
    CandidateView, DetectorRegistry, LongPressDetector, PatternDetector, PinchDetector,
    RotateDetector, SwipeDetector, TapDetector,
};
pub use source::{InputSource, Modality, ScriptedSource};
pub use timer::{TimerId, TimerQueue};
pub use transform::{Bounds, CoordinateTransform, TransformChanged, ZoomState};
pub use voice::{KeywordMode, PatternSpec, VoiceCommandMatcher, VoicePattern};

/// Canvas interact version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
