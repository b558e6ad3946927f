//! Replay scripts: registrations plus a timeline of synthetic input.
//!
//! ```json
//! {
//!   "commands": [{ "name": "undo", "pattern": { "exact": "undo" } }],
//!   "bindings": [{
//!     "name": "delete-swipe",
//!     "pattern": { "keywords": { "words": ["delete", "remove"] } },
//!     "gesture": "swipe",
//!     "options": { "window_ms": 800 }
//!   }],
//!   "events": [
//!     {
//!       "type": "transcript",
//!       "data": { "text": "delete", "confidence": 0.9, "timestamp_ms": 0 }
//!     },
//!     {
//!       "type": "pointer",
//!       "data": {
//!         "phase": "down", "pointer_id": 1, "screen_x": 0, "screen_y": 0, "timestamp_ms": 100
//!       }
//!     }
//!   ]
//! }
//! ```

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use canvas_interact::{
    BindingOptions, Bounds, GestureType, InputEvent, Intent, InteractionConfig, InteractionManager,
    Modality, PatternSpec, ScriptedSource,
};
use serde::Deserialize;

/// Canvas and container geometry.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct References {
    /// Canvas content bounds.
    pub canvas: Bounds,
    /// Container bounds on screen.
    pub container: Bounds,
}

/// A voice command registration.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandSpec {
    /// Command name.
    pub name: String,
    /// Pattern to match.
    pub pattern: PatternSpec,
}

/// A multi-modal binding registration.
#[derive(Debug, Clone, Deserialize)]
pub struct BindingSpec {
    /// Binding name.
    pub name: String,
    /// Voice half.
    pub pattern: PatternSpec,
    /// Gesture half.
    pub gesture: GestureType,
    /// Window and direction options.
    #[serde(default)]
    pub options: BindingOptions,
}

/// A complete replay script.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ReplayScript {
    /// Engine configuration; `--config` takes precedence.
    pub config: Option<InteractionConfig>,
    /// Canvas/container references.
    pub references: Option<References>,
    /// Voice commands.
    pub commands: Vec<CommandSpec>,
    /// Multi-modal bindings.
    pub bindings: Vec<BindingSpec>,
    /// Simulate a speech source that fails to start with this reason.
    pub speech_unavailable: Option<String>,
    /// Input timeline.
    pub events: Vec<InputEvent>,
    /// Stop running timers after this time. Defaults to draining all of them.
    pub end_ms: Option<u64>,
}

impl ReplayScript {
    /// Parse a script from JSON.
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse replay script")
    }

    /// Load a script from a file.
    pub fn from_path(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay script {}", path.display()))?;
        Self::from_json_str(&json)
    }

    /// Build a manager with every registration in the script.
    pub fn build_manager(&self, config: InteractionConfig) -> anyhow::Result<InteractionManager> {
        let mut manager = InteractionManager::new(config);
        if let Some(refs) = self.references {
            manager.set_references(refs.canvas, refs.container);
        }

        for command in &self.commands {
            let pattern = command
                .pattern
                .compile()
                .with_context(|| format!("Invalid pattern for command '{}'", command.name))?;
            manager.voice(command.name.clone(), pattern, |_| {})?;
        }

        for binding in &self.bindings {
            let pattern = binding
                .pattern
                .compile()
                .with_context(|| format!("Invalid pattern for binding '{}'", binding.name))?;
            manager
                .multi_modal_gesture(binding.name.clone())
                .when_saying(pattern)
                .while_gesturing(binding.gesture, binding.options)
                .then(|_| {})?;
        }

        let mut speech = ScriptedSource::new(Modality::Speech, Vec::new());
        if let Some(reason) = &self.speech_unavailable {
            speech = speech.failing(reason.clone());
        }
        if let Err(e) = manager.attach(Box::new(speech)) {
            tracing::warn!("Running gesture-only: {}", e);
        }

        tracing::info!(
            commands = self.commands.len(),
            bindings = self.bindings.len(),
            events = self.events.len(),
            "Replay script loaded"
        );
        Ok(manager)
    }
}

fn emit(out: &mut impl Write, intents: &[Intent]) -> anyhow::Result<()> {
    for intent in intents {
        serde_json::to_writer(&mut *out, intent)?;
        writeln!(out)?;
    }
    Ok(())
}

/// Feed the script's events through `manager`, writing each intent as a JSON
/// line. Returns the number of intents written.
pub async fn run(
    script: &ReplayScript,
    manager: &mut InteractionManager,
    realtime: bool,
    out: &mut impl Write,
) -> anyhow::Result<usize> {
    let mut written = 0;
    let mut last_ms: Option<u64> = None;

    for event in &script.events {
        let timestamp = event.timestamp_ms();
        if realtime {
            if let Some(prev) = last_ms {
                tokio::time::sleep(Duration::from_millis(timestamp.saturating_sub(prev))).await;
            }
        }
        last_ms = Some(timestamp);

        if matches!(event, InputEvent::Transcript(_)) && !manager.speech_available() {
            tracing::debug!(timestamp, "Transcript dropped without speech input");
            continue;
        }
        let intents = manager.handle(event.clone());
        emit(out, &intents)?;
        written += intents.len();
    }

    while let Some(deadline) = manager.next_deadline() {
        if script.end_ms.is_some_and(|end| deadline > end) {
            break;
        }
        let intents = manager.tick(deadline);
        emit(out, &intents)?;
        written += intents.len();
    }
    if let Some(end) = script.end_ms {
        let intents = manager.tick(end);
        emit(out, &intents)?;
        written += intents.len();
    }

    Ok(written)
}
