//! Input sources the engine subscribes to.
//!
//! A source is anything that yields [`InputEvent`]s: a window system, a
//! speech recognizer, or a scripted stream in tests. The manager attaches a
//! source once and then drains it with [`InteractionManager::pump`].
//!
//! [`InteractionManager::pump`]: crate::InteractionManager::pump

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{InteractionError, InteractionResult};
use crate::event::InputEvent;

/// Which channel a source feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// Pointer and touch input.
    Pointer,
    /// Speech transcripts.
    Speech,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pointer => write!(f, "pointer"),
            Self::Speech => write!(f, "speech"),
        }
    }
}

/// A producer of input events.
pub trait InputSource {
    /// The channel this source feeds.
    fn modality(&self) -> Modality;

    /// Acquire the underlying device or service.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be started, e.g. the speech
    /// service is unavailable or permission was denied.
    fn start(&mut self) -> InteractionResult<()>;

    /// Next pending event, if any. Must not block.
    fn poll(&mut self) -> Option<InputEvent>;

    /// Release the underlying device or service.
    fn stop(&mut self) {}
}

/// A source that replays a fixed list of events.
#[derive(Debug, Clone)]
pub struct ScriptedSource {
    modality: Modality,
    events: VecDeque<InputEvent>,
    failure: Option<String>,
    started: bool,
}

impl ScriptedSource {
    /// Create a source that yields `events` in order.
    pub fn new(modality: Modality, events: impl IntoIterator<Item = InputEvent>) -> Self {
        Self {
            modality,
            events: events.into_iter().collect(),
            failure: None,
            started: false,
        }
    }

    /// Make [`start`](InputSource::start) fail with `reason`.
    #[must_use]
    pub fn failing(mut self, reason: impl Into<String>) -> Self {
        self.failure = Some(reason.into());
        self
    }

    /// Queue another event.
    pub fn push(&mut self, event: InputEvent) {
        self.events.push_back(event);
    }

    /// Number of events not yet polled.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.events.len()
    }

    /// Whether the source has been started.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        self.started
    }
}

impl InputSource for ScriptedSource {
    fn modality(&self) -> Modality {
        self.modality
    }

    fn start(&mut self) -> InteractionResult<()> {
        if let Some(reason) = &self.failure {
            return Err(match self.modality {
                Modality::Speech => InteractionError::SpeechUnavailable(reason.clone()),
                Modality::Pointer => InteractionError::SourceAttach(reason.clone()),
            });
        }
        self.started = true;
        Ok(())
    }

    fn poll(&mut self) -> Option<InputEvent> {
        if !self.started {
            return None;
        }
        self.events.pop_front()
    }

    fn stop(&mut self) {
        self.started = false;
    }
}
